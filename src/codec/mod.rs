//! Token and payload codec
//!
//! Exchanges correlate through an opaque signed token (`k` query
//! parameter). Pre-tile tokens announce a slot and carry the key for the
//! encrypted pre-tile payload; tile tokens carry the resolution key that
//! names which announcement a tile belongs to.
//!
//! Both operations are pure functions of their inputs and safe to call
//! from any thread.

mod cipher;
mod error;
mod token;

pub use cipher::decrypt_payload;
pub use error::{CodecError, CodecResult};
pub use token::{decode_unverified_claims, resolution_key_from_json, TokenClaims, KEY_CHARS};
