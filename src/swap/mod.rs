//! # Swap Layer
//!
//! Cold tile data lives in an anonymous memory-mapped swap file. This module
//! owns everything below the tile manager's eviction policy:
//!
//! ```text
//! +--------------------+
//! |    TileManager     |   decides WHICH tile moves
//! +---------+----------+
//!           |
//! +---------v----------+
//! |  place() /FreeLists|   decides WHERE in the file it lands
//! +---------+----------+
//!           |
//! +---------v----------+
//! |     SwapStore      |   moves the bytes (mmap or in-memory)
//! +--------------------+
//! ```
//!
//! ## File Layout
//!
//! The swap file is an untyped byte arena. Each swapped-out tile occupies a
//! contiguous region sized `tile bytes = 64 * 64 * pixel_size`. Regions
//! freed when a swapped tile is dropped are recycled through [`FreeLists`],
//! keyed by pixel size so a region is only ever reused for a tile of the
//! exact same length. The file never shrinks; it grows at the end in
//! page-aligned increments.
//!
//! ## Durability
//!
//! None intended. The swap file is scratch space recreated on startup; a
//! crash loses nothing the user had not already saved elsewhere.

mod freelist;
mod store;

pub use freelist::{place, FreeLists, FreeRegion, Placement};
pub use store::{MemSwapStore, MmapSwapFile, SwapStore};
