//! Page assembly
//!
//! A page arrives as N vertical strips (tiles). [`PageAssembler`] collects
//! them by slot and stitches them side by side once all N are present:
//!
//! ```text
//!   Empty ──add_tile──▶ Filling ──(N distinct slots)──▶ Complete ──compose──▶ RgbImage
//! ```

mod encode;
mod error;
mod page;
mod types;

pub use encode::{encode_page, load_as_jpeg, EmbeddableJpeg};
pub use error::{AssemblyError, AssemblyResult};
pub use page::PageAssembler;
pub use types::{ImageFormat, PageState, DEFAULT_TILES_PER_PAGE};

#[cfg(test)]
pub(crate) use page::fixtures;
