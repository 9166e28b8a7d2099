//! Exchange parsing errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExchangeError {
    /// Required query parameter absent from the URL
    #[error("Missing query parameter `{0}`")]
    MissingParam(&'static str),

    /// Tile URLs end in `/<document>/<page>`
    #[error("URL path has no `/<document>/<page>` suffix: {0}")]
    MissingPathSegment(String),

    #[error("Invalid value for `{name}`: {value:?}")]
    InvalidParam { name: &'static str, value: String },

    /// Response body is not the expected JSON envelope
    #[error("Malformed body: {0}")]
    Body(#[from] serde_json::Error),
}

pub type ExchangeResult<T> = std::result::Result<T, ExchangeError>;
