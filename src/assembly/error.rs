//! Assembly error types

use thiserror::Error;

use crate::types::SlotIndex;

#[derive(Debug, Error)]
pub enum AssemblyError {
    /// Slot outside `[0, capacity)`
    #[error("Slot {slot} out of range (capacity {capacity})")]
    SlotOutOfRange { slot: SlotIndex, capacity: usize },

    /// Composition requested before every slot was filled
    #[error("Page incomplete: {filled}/{capacity} tiles")]
    Incomplete { filled: usize, capacity: usize },

    /// A tile's bytes could not be decoded as an image
    #[error("Failed to decode tile {slot}: {message}")]
    TileDecode { slot: SlotIndex, message: String },

    /// Image error (encoding or reading a persisted page)
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

pub type AssemblyResult<T> = std::result::Result<T, AssemblyError>;
