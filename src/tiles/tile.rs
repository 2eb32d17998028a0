//! Tile bookkeeping records and handles.

use crate::config::constants::TILE_PIXELS;
use crate::swap::FreeRegion;

/// Generation-counted reference to a tile slot.
///
/// Handles are plain values; copying one does not affect the tile's
/// reference count (use [`TileManager::snapshot`](super::TileManager::snapshot)
/// for that). A handle whose tile has been released, or whose slot has been
/// recycled for a new tile, is *stale*: every manager operation rejects it
/// instead of touching the wrong tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileHandle {
    pub(super) index: u32,
    pub(super) generation: u32,
}

/// One 64x64 pixel tile.
///
/// A tile is *resident* while `data` holds its buffer and *swapped out*
/// while `data` is `None` and the bytes live at `swap_region` in the swap
/// file. A tile that has been swapped out once keeps its region while
/// resident, so re-evicting it reuses the same file bytes.
#[derive(Debug)]
pub(super) struct Tile {
    pub pixel_size: usize,
    /// Shared owners (device, snapshots). The tile dies when this hits 0.
    pub refs: u32,
    /// Active shared pin guards. Pinned tiles are off the swappable queue.
    pub pins: u32,
    /// Whether an exclusive (writable) pin guard is live. At most one, and
    /// never together with shared pins.
    pub write_pinned: bool,
    pub data: Option<Box<[u8]>>,
    pub swap_region: Option<FreeRegion>,
}

impl Tile {
    pub fn new(pixel_size: usize, data: Box<[u8]>) -> Self {
        debug_assert_eq!(data.len(), TILE_PIXELS * pixel_size);
        Tile {
            pixel_size,
            refs: 1,
            pins: 0,
            write_pinned: false,
            data: Some(data),
            swap_region: None,
        }
    }

    pub fn bytes(&self) -> usize {
        TILE_PIXELS * self.pixel_size
    }

    pub fn is_resident(&self) -> bool {
        self.data.is_some()
    }

    pub fn is_pinned(&self) -> bool {
        self.pins > 0 || self.write_pinned
    }
}
