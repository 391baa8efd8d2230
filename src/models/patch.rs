//! Game version parsing and patch bucketing.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A game patch (`major.minor`) parsed from a client version string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Patch {
    pub major: u32,
    pub minor: u32,
}

impl Patch {
    /// Parse `14.23.636.2135` (or `14.23`) into a patch. Returns `None` when
    /// the first two components are not numeric.
    pub fn parse(version: &str) -> Option<Self> {
        let mut parts = version.trim().split('.');
        let major = parts.next()?.parse().ok()?;
        let minor = parts.next()?.parse().ok()?;
        Some(Self { major, minor })
    }

    /// Bucket label for the given granularity.
    pub fn bucket(&self, granularity: PatchBucket) -> String {
        match granularity {
            PatchBucket::Minor => self.to_string(),
            PatchBucket::Major => self.major.to_string(),
        }
    }
}

impl fmt::Display for Patch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Granularity used to partition finalized statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchBucket {
    /// `major.minor`
    #[default]
    Minor,
    /// `major` only
    Major,
}

impl FromStr for PatchBucket {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minor" => Ok(PatchBucket::Minor),
            "major" => Ok(PatchBucket::Major),
            other => Err(format!("must be minor or major, got {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_parse() {
        assert_eq!(
            Patch::parse("14.23.636.2135"),
            Some(Patch { major: 14, minor: 23 })
        );
        assert_eq!(Patch::parse("15.1"), Some(Patch { major: 15, minor: 1 }));
        assert_eq!(Patch::parse("14"), None);
        assert_eq!(Patch::parse(""), None);
        assert_eq!(Patch::parse("abc.def"), None);
    }

    #[test]
    fn test_patch_bucket_labels() {
        let patch = Patch { major: 14, minor: 3 };
        assert_eq!(patch.bucket(PatchBucket::Minor), "14.3");
        assert_eq!(patch.bucket(PatchBucket::Major), "14");
    }

    #[test]
    fn test_patch_ordering() {
        assert!(Patch { major: 14, minor: 23 } < Patch { major: 15, minor: 1 });
        assert!(Patch { major: 14, minor: 3 } < Patch { major: 14, minor: 10 });
    }

    #[test]
    fn test_patch_bucket_from_str() {
        assert_eq!("minor".parse::<PatchBucket>(), Ok(PatchBucket::Minor));
        assert_eq!("MAJOR".parse::<PatchBucket>(), Ok(PatchBucket::Major));
        assert!("weekly".parse::<PatchBucket>().is_err());
    }
}
