//! Tracked queue types.

use serde::{Deserialize, Serialize};

/// Ranked solo/duo.
pub const QUEUE_RANKED_SOLO: u32 = 420;
/// Normal draft.
pub const QUEUE_NORMAL_DRAFT: u32 = 400;
/// Normal blind/quickplay.
pub const QUEUE_NORMAL_BLIND: u32 = 430;

/// Output partition of tracked queues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueGroup {
    Ranked,
    Casual,
}

impl QueueGroup {
    pub const ALL: [QueueGroup; 2] = [QueueGroup::Ranked, QueueGroup::Casual];

    /// Group of a queue id; `None` for untracked queues (ARAM, arena, ...).
    pub fn from_queue_id(queue_id: u32) -> Option<Self> {
        match queue_id {
            QUEUE_RANKED_SOLO => Some(QueueGroup::Ranked),
            QUEUE_NORMAL_DRAFT | QUEUE_NORMAL_BLIND => Some(QueueGroup::Casual),
            _ => None,
        }
    }

    /// Queue ids belonging to this group.
    pub fn queue_ids(&self) -> &'static [u32] {
        match self {
            QueueGroup::Ranked => &[QUEUE_RANKED_SOLO],
            QueueGroup::Casual => &[QUEUE_NORMAL_DRAFT, QUEUE_NORMAL_BLIND],
        }
    }

    /// Finalized output filename for this group.
    pub fn output_filename(&self) -> &'static str {
        match self {
            QueueGroup::Ranked => "meta_builds_ranked.json",
            QueueGroup::Casual => "meta_builds_casual.json",
        }
    }
}

/// Whether a queue id is crawled and aggregated.
pub fn is_tracked_queue(queue_id: u32) -> bool {
    QueueGroup::from_queue_id(queue_id).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_group_mapping() {
        assert_eq!(QueueGroup::from_queue_id(420), Some(QueueGroup::Ranked));
        assert_eq!(QueueGroup::from_queue_id(400), Some(QueueGroup::Casual));
        assert_eq!(QueueGroup::from_queue_id(430), Some(QueueGroup::Casual));
        assert_eq!(QueueGroup::from_queue_id(450), None);
        assert_eq!(QueueGroup::from_queue_id(440), None);
    }

    #[test]
    fn test_queue_ids_round_trip() {
        for group in QueueGroup::ALL {
            for id in group.queue_ids() {
                assert_eq!(QueueGroup::from_queue_id(*id), Some(group));
            }
        }
    }

    #[test]
    fn test_is_tracked_queue() {
        assert!(is_tracked_queue(420));
        assert!(!is_tracked_queue(1700));
    }
}
