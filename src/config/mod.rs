//! # Configuration Module
//!
//! Centralizes the engine's configuration: compile-time constants with their
//! interdependencies documented and checked, plus the two runtime tunables
//! that govern eviction pressure.
//!
//! ## Why Centralization?
//!
//! The constants are interdependent: the buffer pool only serves pixel sizes
//! up to `POOLED_PIXEL_SIZE_MAX`, and the pool pre-sizing assumes
//! `TILE_PIXELS` bytes per pixel-size unit. Co-locating them with
//! compile-time assertions prevents the values from drifting apart.
//!
//! ## Runtime Tunables
//!
//! [`EngineConfig`] carries the two values the surrounding application may
//! change while running: the maximum number of resident tiles and the
//! swappiness percentage that sets how far below the budget an eviction
//! pass drives the resident count. The application persists
//! them itself; `TileManager::set_config` re-applies eviction pressure
//! immediately when they change.

pub mod constants;

pub use constants::*;

use sysinfo::System;

/// Runtime tunables for the tile engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Maximum number of tiles kept resident before eviction starts.
    pub max_tiles_in_mem: usize,
    /// Eviction depth as a percentage of the budget: once the budget is
    /// exceeded, tiles are evicted until the resident count falls to
    /// `max_tiles_in_mem * swappiness / 100`.
    pub swappiness: usize,
}

impl EngineConfig {
    pub fn new(max_tiles_in_mem: usize, swappiness: usize) -> Self {
        Self {
            max_tiles_in_mem,
            swappiness,
        }
    }

    /// Derive the resident-tile budget from total system memory.
    ///
    /// Budgets `DEFAULT_BUDGET_PERCENT` of RAM for resident tiles, assuming
    /// the common 4-byte pixel size, and never goes below
    /// `MIN_TILE_BUDGET` tiles.
    pub fn auto_detect() -> Self {
        let mut sys = System::new();
        sys.refresh_memory();
        let total = sys.total_memory() as usize;

        let budget_bytes = (total * DEFAULT_BUDGET_PERCENT) / 100;
        let tiles = (budget_bytes / (TILE_PIXELS * 4)).max(MIN_TILE_BUDGET);

        Self {
            max_tiles_in_mem: tiles,
            swappiness: DEFAULT_SWAPPINESS,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_tiles_in_mem: DEFAULT_MAX_TILES_IN_MEM,
            swappiness: DEFAULT_SWAPPINESS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_constants() {
        let cfg = EngineConfig::default();

        assert_eq!(cfg.max_tiles_in_mem, DEFAULT_MAX_TILES_IN_MEM);
        assert_eq!(cfg.swappiness, DEFAULT_SWAPPINESS);
    }

    #[test]
    fn auto_detect_respects_floor() {
        let cfg = EngineConfig::auto_detect();

        assert!(cfg.max_tiles_in_mem >= MIN_TILE_BUDGET);
        assert_eq!(cfg.swappiness, DEFAULT_SWAPPINESS);
    }
}
