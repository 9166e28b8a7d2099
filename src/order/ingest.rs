//! Feeding the order table from raw exchange data

use super::OrderTable;
use crate::codec::{
    decode_unverified_claims, decrypt_payload, resolution_key_from_json, CodecError, CodecResult,
    TokenClaims,
};
use crate::types::{DocumentId, PageIndex, ResolutionKey};

/// An announcement learned from a pre-tile exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingOrder {
    pub document_id: DocumentId,
    pub page_index: PageIndex,
    pub local_seq: u32,
    pub key: ResolutionKey,
}

/// Outcome of looking up a tile token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedOrder {
    /// The tile belongs at `local_seq`; the pending entry has been consumed
    Found {
        document_id: DocumentId,
        page_index: PageIndex,
        local_seq: u32,
    },
    /// Nothing pending for this key (duplicate or reordered exchange)
    NotFound {
        document_id: DocumentId,
        page_index: PageIndex,
        key: ResolutionKey,
    },
}

impl OrderTable {
    /// Decode a pre-tile token and payload and record the announcement.
    ///
    /// Any decode failure is a miss and leaves the table untouched.
    pub fn record_pre_tile(&self, token: &str, ciphertext_base64: &str) -> CodecResult<PendingOrder> {
        let claims = decode_unverified_claims(token)?;

        let pending = pending_from_claims(&claims, ciphertext_base64).inspect_err(|e| {
            tracing::warn!(
                document_id = claims.document_id,
                page = claims.page_index,
                error = %e,
                "Dropping pre-tile exchange"
            );
        })?;

        tracing::debug!(
            document_id = pending.document_id,
            page = pending.page_index,
            local_seq = pending.local_seq,
            key = %pending.key,
            "Recorded tile order"
        );
        self.record(
            pending.document_id,
            pending.page_index,
            pending.local_seq,
            pending.key.clone(),
        );

        Ok(pending)
    }

    /// Decode a tile token and consume its pending entry, if any.
    pub fn resolve_tile(&self, token: &str) -> CodecResult<ResolvedOrder> {
        let claims = decode_unverified_claims(token)?;
        let key = claims.resolution_key().inspect_err(|e| {
            tracing::warn!(
                document_id = claims.document_id,
                page = claims.page_index,
                error = %e,
                "Dropping tile exchange"
            );
        })?;

        let resolved = match self.resolve(claims.document_id, claims.page_index, &key) {
            Some(local_seq) => ResolvedOrder::Found {
                document_id: claims.document_id,
                page_index: claims.page_index,
                local_seq,
            },
            None => {
                tracing::debug!(
                    document_id = claims.document_id,
                    page = claims.page_index,
                    key = %key,
                    "No pending order for tile"
                );
                ResolvedOrder::NotFound {
                    document_id: claims.document_id,
                    page_index: claims.page_index,
                    key,
                }
            }
        };

        Ok(resolved)
    }
}

fn pending_from_claims(claims: &TokenClaims, ciphertext_base64: &str) -> CodecResult<PendingOrder> {
    let local_seq = claims
        .local_seq
        .ok_or_else(|| CodecError::MalformedToken("missing `zn` claim".to_string()))?;
    let key_bytes = claims.key_material()?;
    let plaintext = decrypt_payload(ciphertext_base64, &key_bytes)?;
    tracing::debug!(plaintext = %plaintext, "Decrypted pre-tile payload");
    let key = resolution_key_from_json(&plaintext)?;

    Ok(PendingOrder {
        document_id: claims.document_id,
        page_index: claims.page_index,
        local_seq,
        key,
    })
}
