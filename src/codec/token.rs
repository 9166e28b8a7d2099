//! Unverified token claims
//!
//! The upstream reader signs its correlation tokens with a secret this
//! service does not hold. Tokens are therefore decoded WITHOUT signature
//! verification and every claim is untrusted input: it only tells us which
//! document, page and slot an exchange claims to belong to.

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use serde_json::Value;

use super::error::{CodecError, CodecResult};
use crate::types::{lenient_number, lenient_optional_number, DocumentId, PageIndex, ResolutionKey};

/// Number of characters of the `i` field used as the AES key
pub const KEY_CHARS: usize = 16;

#[derive(Debug, Deserialize)]
struct RawClaims {
    #[serde(deserialize_with = "lenient_number")]
    b: DocumentId,
    #[serde(deserialize_with = "lenient_number")]
    p: PageIndex,
    #[serde(default, deserialize_with = "lenient_optional_number")]
    zn: Option<u32>,
    k: String,
}

/// Claims carried by a pre-tile or tile token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    pub document_id: DocumentId,
    pub page_index: PageIndex,
    /// Slot announced by a pre-tile token; absent on tile tokens
    pub local_seq: Option<u32>,
    /// Nested JSON document (`k` claim)
    pub payload: String,
}

impl From<RawClaims> for TokenClaims {
    fn from(raw: RawClaims) -> Self {
        Self {
            document_id: raw.b,
            page_index: raw.p,
            local_seq: raw.zn,
            payload: raw.k,
        }
    }
}

impl TokenClaims {
    /// Symmetric key embedded in a pre-tile token: the first
    /// [`KEY_CHARS`] characters of the payload's `i` field.
    pub fn key_material(&self) -> CodecResult<Vec<u8>> {
        let payload = parse_payload(&self.payload)?;
        let secret = payload
            .get("i")
            .and_then(Value::as_str)
            .ok_or_else(|| CodecError::MalformedPayload("missing `i` field".to_string()))?;
        Ok(secret.chars().take(KEY_CHARS).collect::<String>().into_bytes())
    }

    /// Resolution key embedded in a tile token (payload `zn` field)
    pub fn resolution_key(&self) -> CodecResult<ResolutionKey> {
        resolution_key_from_json(&self.payload)
    }
}

/// Decode a token's claims without verifying its signature.
///
/// Failures are logged with the raw token and returned as a miss.
pub fn decode_unverified_claims(token: &str) -> CodecResult<TokenClaims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    match decode::<RawClaims>(token, &DecodingKey::from_secret(&[]), &validation) {
        Ok(data) => Ok(data.claims.into()),
        Err(e) => {
            tracing::error!(token = %token, error = %e, "Failed to decode token claims");
            Err(CodecError::MalformedToken(e.to_string()))
        }
    }
}

/// Extract the `zn` field of a JSON object as a resolution key.
///
/// Shared by tile token payloads and decrypted pre-tile payloads.
pub fn resolution_key_from_json(text: &str) -> CodecResult<ResolutionKey> {
    let value = parse_payload(text)?;
    match value.get("zn") {
        Some(Value::String(s)) if !s.is_empty() => Ok(ResolutionKey::new(s.as_str())),
        Some(Value::Number(n)) => Ok(ResolutionKey::new(n.to_string())),
        _ => Err(CodecError::MalformedPayload(
            "missing `zn` field".to_string(),
        )),
    }
}

fn parse_payload(text: &str) -> CodecResult<Value> {
    serde_json::from_str(text).map_err(|e| CodecError::MalformedPayload(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    fn sign(claims: Value) -> String {
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"upstream-secret-we-never-see"),
        )
        .unwrap()
    }

    #[test]
    fn test_decodes_pre_tile_claims_without_the_secret() {
        let token = sign(json!({
            "b": 3238891,
            "p": 3,
            "zn": 2,
            "k": r#"{"i":"0123456789abcdefTRAILING"}"#,
        }));

        let claims = decode_unverified_claims(&token).unwrap();
        assert_eq!(claims.document_id, 3238891);
        assert_eq!(claims.page_index, 3);
        assert_eq!(claims.local_seq, Some(2));
        assert_eq!(claims.key_material().unwrap(), b"0123456789abcdef".to_vec());
    }

    #[test]
    fn test_decodes_tile_claims_with_string_numbers() {
        let token = sign(json!({
            "b": "42",
            "p": "7",
            "k": r#"{"zn":"ha1TgXQ9J1c"}"#,
        }));

        let claims = decode_unverified_claims(&token).unwrap();
        assert_eq!(claims.document_id, 42);
        assert_eq!(claims.page_index, 7);
        assert_eq!(claims.local_seq, None);
        assert_eq!(claims.resolution_key().unwrap().as_str(), "ha1TgXQ9J1c");
    }

    #[test]
    fn test_ignores_expired_tokens() {
        let token = sign(json!({
            "b": 1, "p": 1, "k": r#"{"zn":"x"}"#, "exp": 1,
        }));
        assert!(decode_unverified_claims(&token).is_ok());
    }

    #[test]
    fn test_malformed_tokens_are_misses() {
        assert!(matches!(
            decode_unverified_claims("not-a-token"),
            Err(CodecError::MalformedToken(_))
        ));
        assert!(decode_unverified_claims("").is_err());
        assert!(decode_unverified_claims("a.b.c").is_err());

        // Well-formed token, wrong claim shape
        let token = sign(json!({ "sub": "someone" }));
        assert!(decode_unverified_claims(&token).is_err());
    }

    #[test]
    fn test_payload_errors() {
        let claims = TokenClaims {
            document_id: 1,
            page_index: 1,
            local_seq: None,
            payload: "{not json".to_string(),
        };
        assert!(matches!(claims.key_material(), Err(CodecError::MalformedPayload(_))));
        assert!(resolution_key_from_json(r#"{"zn":""}"#).is_err());
        assert_eq!(resolution_key_from_json(r#"{"zn":17}"#).unwrap().as_str(), "17");
    }
}
