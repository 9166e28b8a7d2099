//! Identifier types shared by the codec, the order table and the trackers

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

/// Upstream document identifier
pub type DocumentId = u64;

/// 1-based page number as used by the upstream reader
pub type PageIndex = u32;

/// Tile position within a page (0..tiles_per_page)
pub type SlotIndex = usize;

/// Opaque value that pairs a tile exchange with the pre-tile exchange
/// that announced its slot.
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResolutionKey(String);

impl ResolutionKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ResolutionKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for ResolutionKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl fmt::Display for ResolutionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Lenient number fields
// ============================================================================

/// Upstream JSON mixes `"pnum": "3"` and `"pnum": 3`; accept both.
#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(u64),
    Text(String),
}

impl NumberOrText {
    fn parse<T, E>(self) -> Result<T, E>
    where
        T: TryFrom<u64> + FromStr,
        E: de::Error,
    {
        match self {
            NumberOrText::Number(n) => {
                T::try_from(n).map_err(|_| E::custom(format!("number out of range: {}", n)))
            }
            NumberOrText::Text(s) => s
                .trim()
                .parse::<T>()
                .map_err(|_| E::custom(format!("not a number: {:?}", s))),
        }
    }
}

/// `deserialize_with` helper for numeric fields that may arrive as strings
pub fn lenient_number<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<u64> + FromStr,
{
    NumberOrText::deserialize(deserializer)?.parse()
}

/// Optional variant of [`lenient_number`]; pair with `#[serde(default)]`
pub fn lenient_optional_number<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<u64> + FromStr,
{
    match Option::<NumberOrText>::deserialize(deserializer)? {
        Some(value) => value.parse().map(Some),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Sample {
        #[serde(deserialize_with = "lenient_number")]
        page: u32,
        #[serde(default, deserialize_with = "lenient_optional_number")]
        slot: Option<u32>,
    }

    #[test]
    fn test_accepts_numbers_and_numeric_strings() {
        let a: Sample = serde_json::from_str(r#"{"page": 3, "slot": "2"}"#).unwrap();
        assert_eq!(a.page, 3);
        assert_eq!(a.slot, Some(2));

        let b: Sample = serde_json::from_str(r#"{"page": " 12 "}"#).unwrap();
        assert_eq!(b.page, 12);
        assert_eq!(b.slot, None);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(serde_json::from_str::<Sample>(r#"{"page": "twelve"}"#).is_err());
        assert!(serde_json::from_str::<Sample>(r#"{"page": 99999999999}"#).is_err());
    }
}
