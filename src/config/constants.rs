//! # Engine Constants
//!
//! All numeric configuration values for the tile engine, grouped by
//! functional area.
//!
//! ## Dependency Graph
//!
//! ```text
//! TILE_WIDTH, TILE_HEIGHT (64)
//!   |
//!   +-> TILE_PIXELS (derived: TILE_WIDTH * TILE_HEIGHT)
//!         |
//!         +-> buffer pool slab sizing (TILE_PIXELS * pixel_size bytes)
//!         +-> swap region sizing (TILE_PIXELS * pixel_size bytes)
//!
//! POOLED_PIXEL_SIZE_MAX (10)
//!   |
//!   +-> POOL_CLASS_COUNT (4): number of distinct pixel-size classes the
//!       pool serves at once; sizes above the max bypass pooling entirely
//! ```
//!
//! ## Tuning Notes
//!
//! - `DEFAULT_MAX_TILES_IN_MEM`: higher = more resident pixel memory, fewer
//!   swap round-trips. 4000 RGBA8 tiles is 64 MB.
//! - `DEFAULT_SWAPPINESS`: lower = eviction digs further below the budget,
//!   trading a longer pause now for headroom later.
//! - `TILES_PER_POOL`: buffers pre-allocated per pixel-size class.

// ============================================================================
// TILE GEOMETRY
// ============================================================================

/// Tile width in pixels.
pub const TILE_WIDTH: usize = 64;

/// Tile height in pixels.
pub const TILE_HEIGHT: usize = 64;

/// Pixels per tile. A tile's byte size is `TILE_PIXELS * pixel_size`.
pub const TILE_PIXELS: usize = TILE_WIDTH * TILE_HEIGHT;

const _: () = assert!(
    TILE_PIXELS == TILE_WIDTH * TILE_HEIGHT,
    "TILE_PIXELS derivation mismatch"
);

// ============================================================================
// EVICTION DEFAULTS
// ============================================================================

/// Default maximum number of resident tiles.
pub const DEFAULT_MAX_TILES_IN_MEM: usize = 4000;

/// Default eviction depth: evict exactly down to the budget line.
pub const DEFAULT_SWAPPINESS: usize = 100;

/// Percentage of system RAM budgeted by `EngineConfig::auto_detect`.
pub const DEFAULT_BUDGET_PERCENT: usize = 25;

/// Floor for the auto-detected resident-tile budget.
pub const MIN_TILE_BUDGET: usize = 256;

// ============================================================================
// BUFFER POOL
// ============================================================================

/// Largest pixel size (bytes per pixel) served by the tile buffer pool.
/// Larger pixel sizes fall back to plain heap allocation.
pub const POOLED_PIXEL_SIZE_MAX: usize = 10;

/// Number of pixel-size classes the pool can hold simultaneously.
pub const POOL_CLASS_COUNT: usize = 4;

/// Buffers pre-allocated when a pool class is first used.
pub const TILES_PER_POOL: usize = 100;

const _: () = assert!(
    POOLED_PIXEL_SIZE_MAX >= 4,
    "the pool must at least serve RGBA8 tiles"
);

// ============================================================================
// SWAP FILE
// ============================================================================

/// Initial number of swap-size-classes in the free-list table. The table
/// grows on demand when a larger pixel size is deregistered.
pub const INITIAL_FREE_LIST_CLASSES: usize = 8;
