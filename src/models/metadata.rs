//! Data Dragon metadata (`item.json`, `champion.json`) read from local files.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

use super::{ChampionId, ItemId};
use crate::storage::{read_json_opt, StorageError};

/// Tag Data Dragon puts on every boots item.
pub const BOOTS_TAG: &str = "Boots";

#[derive(Debug, Deserialize)]
struct ItemFile {
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    data: BTreeMap<String, ItemData>,
}

#[derive(Debug, Deserialize)]
struct ItemData {
    #[serde(default)]
    tags: Vec<String>,
}

/// Item metadata needed by the finalizer.
#[derive(Debug, Clone, Default)]
pub struct ItemCatalog {
    pub version: Option<String>,
    boots: Vec<ItemId>,
}

impl ItemCatalog {
    /// Load `item.json`. Returns `Ok(None)` when the file does not exist.
    pub fn load(path: &Path) -> Result<Option<Self>, StorageError> {
        let Some(file) = read_json_opt::<ItemFile>(path)? else {
            return Ok(None);
        };
        Ok(Some(Self::from_file(file)))
    }

    /// Parse an `item.json` document.
    pub fn from_json(raw: &str) -> Result<Self, StorageError> {
        Ok(Self::from_file(serde_json::from_str(raw)?))
    }

    fn from_file(file: ItemFile) -> Self {
        let mut item_count = 0;
        let mut boots = Vec::new();

        for (key, item) in file.data {
            let Ok(id) = key.parse::<ItemId>() else {
                warn!("Skipping item with non-numeric key {}", key);
                continue;
            };
            if item.tags.iter().any(|t| t == BOOTS_TAG) {
                boots.push(id);
            }
            item_count += 1;
        }

        boots.sort_unstable();
        debug!("Loaded {} items ({} boots)", item_count, boots.len());
        Self {
            version: file.version,
            boots,
        }
    }

    /// Item ids tagged as boots, ascending.
    pub fn boots_ids(&self) -> &[ItemId] {
        &self.boots
    }
}

#[derive(Debug, Deserialize)]
struct ChampionFile {
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    data: BTreeMap<String, ChampionData>,
}

#[derive(Debug, Deserialize)]
struct ChampionData {
    id: String,
    key: String,
    name: String,
}

/// Display data for one champion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChampionInfo {
    pub name: String,
    pub slug: String,
}

/// Champion key → display data.
#[derive(Debug, Clone, Default)]
pub struct ChampionCatalog {
    pub version: Option<String>,
    champions: HashMap<ChampionId, ChampionInfo>,
}

impl ChampionCatalog {
    /// Load `champion.json`. Returns `Ok(None)` when the file does not exist.
    pub fn load(path: &Path) -> Result<Option<Self>, StorageError> {
        let Some(file) = read_json_opt::<ChampionFile>(path)? else {
            return Ok(None);
        };
        Ok(Some(Self::from_file(file)))
    }

    pub fn from_json(raw: &str) -> Result<Self, StorageError> {
        Ok(Self::from_file(serde_json::from_str(raw)?))
    }

    fn from_file(file: ChampionFile) -> Self {
        let champions = file
            .data
            .into_values()
            .filter_map(|c| {
                let key = c.key.parse::<ChampionId>().ok()?;
                Some((
                    key,
                    ChampionInfo {
                        slug: slugify(&c.id),
                        name: c.name,
                    },
                ))
            })
            .collect();

        Self {
            version: file.version,
            champions,
        }
    }

    pub fn get(&self, id: ChampionId) -> Option<&ChampionInfo> {
        self.champions.get(&id)
    }

    pub fn len(&self) -> usize {
        self.champions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.champions.is_empty()
    }
}

/// Lowercase ASCII alphanumerics only (`MonkeyKing` → `monkeyking`).
pub fn slugify(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const ITEMS: &str = r#"{
        "type": "item",
        "version": "14.23.1",
        "data": {
            "1001": {"name": "Boots", "tags": ["Boots"]},
            "3006": {"name": "Berserker's Greaves", "tags": ["AttackSpeed", "Boots"]},
            "3031": {"name": "Infinity Edge", "tags": ["Damage", "CriticalStrike"]},
            "2055": {"name": "Control Ward", "tags": ["Consumable", "Vision"]},
            "abc": {"name": "Broken", "tags": []}
        }
    }"#;

    #[test]
    fn test_item_catalog_boots_from_tags() {
        let catalog = ItemCatalog::from_json(ITEMS).unwrap();

        assert_eq!(catalog.boots_ids(), &[1001, 3006]);
        assert_eq!(catalog.version.as_deref(), Some("14.23.1"));
    }

    #[test]
    fn test_item_catalog_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let loaded = ItemCatalog::load(&temp_dir.path().join("item.json")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_champion_catalog() {
        let catalog = ChampionCatalog::from_json(
            r#"{
                "version": "14.23.1",
                "data": {
                    "Aatrox": {"id": "Aatrox", "key": "266", "name": "Aatrox"},
                    "MonkeyKing": {"id": "MonkeyKing", "key": "62", "name": "Wukong"}
                }
            }"#,
        )
        .unwrap();

        assert_eq!(catalog.len(), 2);
        assert_eq!(
            catalog.get(62),
            Some(&ChampionInfo {
                name: "Wukong".to_string(),
                slug: "monkeyking".to_string(),
            })
        );
        assert!(catalog.get(1).is_none());
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Kai'Sa"), "kaisa");
        assert_eq!(slugify("Dr. Mundo"), "drmundo");
    }
}
