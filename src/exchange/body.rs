//! Response body envelopes
//!
//! Every JSON response wraps its payload in `{"data": ...}`.

use serde::Deserialize;
use serde_json::Value;

use super::error::ExchangeResult;
use crate::types::lenient_number;

/// `data` of a metadata response
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MetadataBody {
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub name: String,
    #[serde(deserialize_with = "lenient_number")]
    pub pages: u32,
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

pub fn parse_metadata(body: &[u8]) -> ExchangeResult<MetadataBody> {
    let envelope: Envelope<MetadataBody> = serde_json::from_slice(body)?;
    Ok(envelope.data)
}

/// Base64 ciphertext of a pre-tile response. Upstream occasionally sends
/// an empty or null `data`; that comes back as an empty string.
pub fn parse_pre_tile(body: &[u8]) -> ExchangeResult<String> {
    let envelope: Envelope<Option<String>> = serde_json::from_slice(body)?;
    Ok(envelope.data.unwrap_or_default())
}

/// Outline tree of a bookmark response, kept as raw JSON so it can be
/// persisted verbatim
pub fn parse_bookmark(body: &[u8]) -> ExchangeResult<Value> {
    let envelope: Envelope<Value> = serde_json::from_slice(body)?;
    Ok(envelope.data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_metadata() {
        let body = br#"{"code":0,"data":{"author":"Ada","name":"Notes","pages":"312","extra":1}}"#;
        let meta = parse_metadata(body).unwrap();
        assert_eq!(meta.author, "Ada");
        assert_eq!(meta.name, "Notes");
        assert_eq!(meta.pages, 312);

        assert!(parse_metadata(br#"{"data":{"name":"x"}}"#).is_err());
        assert!(parse_metadata(b"<html>").is_err());
    }

    #[test]
    fn test_parse_pre_tile() {
        assert_eq!(parse_pre_tile(br#"{"data":"QUJD"}"#).unwrap(), "QUJD");
        assert_eq!(parse_pre_tile(br#"{"data":""}"#).unwrap(), "");
        assert_eq!(parse_pre_tile(br#"{"data":null}"#).unwrap(), "");
        assert!(parse_pre_tile(br#"{"data":42}"#).is_err());
        assert!(parse_pre_tile(b"").is_err());
    }

    #[test]
    fn test_parse_bookmark() {
        let tree = parse_bookmark(br#"{"data":[{"label":"Cover","pnum":"1","children":null}]}"#).unwrap();
        assert_eq!(tree, json!([{"label": "Cover", "pnum": "1", "children": null}]));
    }
}
