//! Codec error types
//!
//! Every variant is a recoverable decode miss: the triggering exchange is
//! dropped and nothing downstream is touched.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    /// Token is not a well-formed three-part token or its claims do not parse
    #[error("Malformed token: {0}")]
    MalformedToken(String),

    /// The nested JSON carried inside a claim is missing or invalid
    #[error("Malformed claim payload: {0}")]
    MalformedPayload(String),

    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Ciphertext length {0} is not a positive multiple of the block size")]
    CiphertextLength(usize),

    #[error("Unsupported key length: {0} bytes")]
    KeyLength(usize),

    #[error("Invalid padding")]
    Padding,

    #[error("Plaintext is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

pub type CodecResult<T> = std::result::Result<T, CodecError>;
