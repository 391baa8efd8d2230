//! Build-signature extraction.
//!
//! A build is one boots item plus up to three core items. Two strategies
//! produce it: the participant's final six item slots, or a replay of their
//! purchase events from the match timeline.

use std::collections::HashSet;

use crate::models::{ItemCatalog, ItemId};

/// Boots ids used while crawling, in preference order (upgraded boots first).
pub const HARDCODED_BOOTS: [ItemId; 9] = [3006, 3009, 3020, 3047, 3111, 3117, 3158, 2422, 1001];

/// Consumables, trinkets and starter items that never count as core.
pub const CORE_BLACKLIST: [ItemId; 22] = [
    // potions and elixirs
    2003, 2010, 2031, 2033, 2138, 2139, 2140, 2150, 2151, 2152,
    // wards and trinkets
    2055, 3330, 3340, 3363, 3364, 3513,
    // starters
    1054, 1055, 1056, 1082, 1083, 3865,
];

/// Maximum number of core items in a signature.
pub const CORE_SIZE: usize = 3;

pub fn is_blacklisted(item: ItemId) -> bool {
    CORE_BLACKLIST.contains(&item)
}

/// A classification of which item ids are boots.
#[derive(Debug, Clone)]
pub struct BootsSet {
    order: Vec<ItemId>,
    members: HashSet<ItemId>,
}

impl BootsSet {
    /// The fixed set used by the crawler.
    pub fn hardcoded() -> Self {
        Self::from_ids(HARDCODED_BOOTS)
    }

    /// A set with the given preference order. Duplicates are dropped.
    pub fn from_ids(ids: impl IntoIterator<Item = ItemId>) -> Self {
        let mut order = Vec::new();
        let mut members = HashSet::new();
        for id in ids {
            if id != 0 && members.insert(id) {
                order.push(id);
            }
        }
        Self { order, members }
    }

    /// Tag-driven set from item metadata. Ids known to the hardcoded set keep
    /// their preference order; any others follow in ascending order.
    pub fn from_catalog(catalog: &ItemCatalog) -> Self {
        let tagged: HashSet<ItemId> = catalog.boots_ids().iter().copied().collect();
        let known = HARDCODED_BOOTS.iter().copied().filter(|id| tagged.contains(id));
        let extra = catalog
            .boots_ids()
            .iter()
            .copied()
            .filter(|id| !HARDCODED_BOOTS.contains(id));
        Self::from_ids(known.chain(extra))
    }

    pub fn contains(&self, item: ItemId) -> bool {
        self.members.contains(&item)
    }

    /// The most preferred boots id present in `items`.
    pub fn first_in(&self, items: &[ItemId]) -> Option<ItemId> {
        self.order.iter().copied().find(|id| items.contains(id))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Boots and core items for one participant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedBuild {
    pub boots: Option<ItemId>,
    /// Ascending, unique, at most three ids
    pub core: Vec<ItemId>,
}

impl ExtractedBuild {
    pub fn new(boots: Option<ItemId>, core: &[ItemId]) -> Self {
        Self {
            boots,
            core: canonical_core(core),
        }
    }

    pub fn signature(&self) -> String {
        build_signature(self.boots, &self.core)
    }

    /// Display order: boots first, then core.
    pub fn items(&self) -> Vec<ItemId> {
        self.boots.iter().copied().chain(self.core.iter().copied()).collect()
    }
}

/// Deduplicate, sort ascending, truncate to three.
pub fn canonical_core(core: &[ItemId]) -> Vec<ItemId> {
    let mut core: Vec<ItemId> = core.iter().copied().filter(|&id| id != 0).collect();
    core.sort_unstable();
    core.dedup();
    core.truncate(CORE_SIZE);
    core
}

/// Canonical build key, e.g. `b=3006|c=3031,3046,6672`.
pub fn build_signature(boots: Option<ItemId>, core: &[ItemId]) -> String {
    let core = canonical_core(core)
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",");
    format!("b={}|c={}", boots.unwrap_or(0), core)
}

/// Build from the final item slots.
pub fn extract_final_items(items: &[ItemId], boots_set: &BootsSet) -> ExtractedBuild {
    let boots = boots_set.first_in(items);
    let core: Vec<ItemId> = items
        .iter()
        .copied()
        .filter(|&id| id != 0 && !boots_set.contains(id) && !is_blacklisted(id))
        .collect();
    ExtractedBuild::new(boots, &core)
}

/// Build from chronological purchases, backfilled from the final slots.
///
/// Timeline findings are never replaced: backfill only fills a missing boots
/// slot and tops core up to three.
pub fn extract_timeline(
    purchases: &[ItemId],
    final_items: &[ItemId],
    boots_set: &BootsSet,
) -> ExtractedBuild {
    let mut boots = None;
    let mut core: Vec<ItemId> = Vec::with_capacity(CORE_SIZE);

    for &item in purchases {
        if core.len() >= CORE_SIZE {
            break;
        }
        if item == 0 {
            continue;
        }
        if boots_set.contains(item) {
            if boots.is_none() {
                boots = Some(item);
            }
            continue;
        }
        if !is_blacklisted(item) && !core.contains(&item) {
            core.push(item);
        }
    }

    let fallback = extract_final_items(final_items, boots_set);
    if boots.is_none() {
        boots = fallback.boots;
    }
    for item in fallback.core {
        if core.len() >= CORE_SIZE {
            break;
        }
        if !core.contains(&item) {
            core.push(item);
        }
    }

    ExtractedBuild::new(boots, &core)
}
