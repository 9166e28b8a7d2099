//! Per-page tile accumulation and composition

use image::{imageops, RgbImage};

use super::error::{AssemblyError, AssemblyResult};
use super::types::PageState;
use crate::types::SlotIndex;

/// Collects the tiles of one page until every slot is filled.
///
/// A slot may be written more than once (retried exchange); the last write
/// wins. Composition depends only on the final content of each slot.
#[derive(Debug)]
pub struct PageAssembler {
    slots: Vec<Option<Vec<u8>>>,
}

impl PageAssembler {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of distinct slots written so far
    pub fn filled(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn state(&self) -> PageState {
        match self.filled() {
            0 => PageState::Empty,
            n if n == self.capacity() => PageState::Complete,
            _ => PageState::Filling,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.state() == PageState::Complete
    }

    /// Store a tile at `slot`. Out-of-range slots are rejected without
    /// touching the page.
    pub fn add_tile(&mut self, slot: SlotIndex, bytes: Vec<u8>) -> AssemblyResult<()> {
        let capacity = self.capacity();
        let entry = self
            .slots
            .get_mut(slot)
            .ok_or(AssemblyError::SlotOutOfRange { slot, capacity })?;
        *entry = Some(bytes);
        Ok(())
    }

    /// Stitch the tiles left to right in slot order.
    ///
    /// The canvas is as wide as all tiles together and as tall as the
    /// tallest tile; each tile is pasted at the top edge. Consumes the
    /// assembler so tile bytes are released once composed.
    pub fn compose(self) -> AssemblyResult<RgbImage> {
        let capacity = self.capacity();
        let filled = self.filled();
        if filled != capacity {
            return Err(AssemblyError::Incomplete { filled, capacity });
        }

        let mut tiles = Vec::with_capacity(capacity);
        for (slot, bytes) in self.slots.into_iter().enumerate() {
            let bytes = bytes.ok_or(AssemblyError::Incomplete { filled, capacity })?;
            let tile = image::load_from_memory(&bytes)
                .map_err(|e| AssemblyError::TileDecode {
                    slot,
                    message: e.to_string(),
                })?
                .to_rgb8();
            tiles.push(tile);
        }

        let width = tiles.iter().map(RgbImage::width).sum::<u32>();
        let height = tiles.iter().map(RgbImage::height).max().unwrap_or(0);

        let mut canvas = RgbImage::new(width, height);
        let mut x_offset: i64 = 0;
        for tile in &tiles {
            imageops::replace(&mut canvas, tile, x_offset, 0);
            x_offset += i64::from(tile.width());
        }

        Ok(canvas)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::io::Cursor;

    use image::{Rgb, RgbImage};

    /// PNG-encoded single-color tile
    pub fn solid_tile(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb(color));
        let mut out = Vec::new();
        img.write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
            .unwrap();
        out
    }

    /// Distinct color per slot so composition order is observable
    pub fn slot_color(slot: usize) -> [u8; 3] {
        [(slot as u8) * 40, 255 - (slot as u8) * 40, 100]
    }
}
