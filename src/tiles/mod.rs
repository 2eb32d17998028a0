//! # Tile Layer
//!
//! Image pixels are stored in 64x64 tiles owned by a [`TileManager`];
//! devices and snapshots only hold [`TileHandle`]s. The manager enforces a
//! resident-tile budget by writing cold tiles to a swap file and faults
//! them back in on access, so an image can be far larger than RAM.
//!
//! See [`manager`] for the lifecycle and eviction rules and [`device`] for
//! the pixel-plane API built on top.

pub mod device;
pub mod manager;
pub mod pool;
mod tile;

pub use device::{DeviceSnapshot, TiledDevice};
pub use manager::{PinnedTile, PinnedTileMut, TileManager, TileStats};
pub use pool::TileBufferPool;
pub use tile::TileHandle;
