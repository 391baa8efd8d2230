//! Match timeline model (`match/v5/matches/{id}/timeline`).

use serde::{Deserialize, Serialize};

use super::ItemId;

/// Event type carried by item purchases.
pub const ITEM_PURCHASED: &str = "ITEM_PURCHASED";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Timeline {
    #[serde(default)]
    pub info: TimelineInfo,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimelineInfo {
    #[serde(default)]
    pub frames: Vec<Frame>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Frame {
    #[serde(default)]
    pub events: Vec<TimelineEvent>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEvent {
    #[serde(rename = "type", default)]
    pub kind: String,

    #[serde(default)]
    pub timestamp: i64,

    #[serde(default)]
    pub participant_id: Option<u32>,

    #[serde(default)]
    pub item_id: Option<ItemId>,
}

impl Timeline {
    /// Item ids bought by one participant, in chronological order. Events with
    /// equal timestamps keep their document order.
    pub fn purchases_for(&self, participant_id: u32) -> Vec<ItemId> {
        let mut purchases: Vec<(i64, ItemId)> = self
            .info
            .frames
            .iter()
            .flat_map(|frame| frame.events.iter())
            .filter(|event| event.kind == ITEM_PURCHASED)
            .filter(|event| event.participant_id == Some(participant_id))
            .filter_map(|event| event.item_id.map(|item| (event.timestamp, item)))
            .collect();

        purchases.sort_by_key(|(ts, _)| *ts);
        purchases.into_iter().map(|(_, item)| item).collect()
    }
}
