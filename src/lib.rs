//! # rastile - Tiled Raster Storage Engine
//!
//! rastile is the memory-management and compositing core of a raster paint
//! application. It stores arbitrarily large images as a sparse grid of 64x64
//! pixel tiles, bounds resident pixel memory by transparently evicting cold
//! tiles to a memory-mapped swap file, and provides a pluggable per-pixel
//! color-space layer with a table of compositing operators.
//!
//! ## Architecture
//!
//! ```text
//! +-------------------------------------------+
//! |        Callers (paintops, iterators,      |
//! |         file-format codecs, undo)         |
//! +-------------------------------------------+
//! |   TiledDevice (grid of tiles, COW         |
//! |   snapshots, clamped pixel runs)          |
//! +---------------------+---------------------+
//! |  TileManager        |  ColorSpace trait   |
//! |  (arena, pin/unpin, |  (channel layout,   |
//! |  eviction queue,    |  conversions,       |
//! |  buffer pool)       |  bit_blt dispatch)  |
//! +---------------------+---------------------+
//! |  SwapStore (mmap'd temp file, page-       |
//! |  aligned growth, size-class free lists)   |
//! +-------------------------------------------+
//! ```
//!
//! ## Memory Model
//!
//! Every tile is either *resident* (its pixels live in a heap or pooled
//! buffer) or *evicted* (its pixels live only in a region of the swap file).
//! The [`tiles::TileManager`] tracks residency for every live tile and keeps
//! the number of resident tiles under a configured budget: when the budget is
//! exceeded, tiles are evicted from the front of a FIFO queue of unpinned
//! tiles until the resident count falls back to
//! `max_tiles_in_mem * swappiness / 100`.
//!
//! Access always goes through a pin guard: [`tiles::TileManager::pin`] hands
//! out any number of shared [`tiles::PinnedTile`] readers, while
//! [`tiles::TileManager::pin_mut`] hands out a single exclusive
//! [`tiles::PinnedTileMut`] writer. Pinning faults the tile back in if it was
//! evicted and removes it from the eviction queue; dropping the guard makes
//! the tile evictable again.
//!
//! ## Compositing
//!
//! A [`colorspace::ColorSpace`] defines the byte layout of one pixel and the
//! per-pixel arithmetic over it: conversion to and from a canonical RGB
//! color, a perceptual difference metric, alpha-weighted color mixing, and
//! `bit_blt`, which combines two pixel rectangles under an operator tag, an
//! opacity and an optional per-pixel mask. Arithmetic is 8-bit fixed point;
//! see [`colorspace::math`].
//!
//! ## Module Overview
//!
//! - [`config`]: centralized constants and the runtime tunables
//! - [`swap`]: swap-file abstraction, region placement, free lists
//! - [`tiles`]: tile arena, eviction engine, buffer pool, tiled device
//! - [`colorspace`]: color-space trait, concrete encodings, operator table

pub mod colorspace;
pub mod config;
pub mod swap;
pub mod tiles;

pub use colorspace::{Color, ColorSpace, ColorSpaceRegistry, CompositeOp};
pub use config::EngineConfig;
pub use tiles::{PinnedTile, PinnedTileMut, TileHandle, TileManager, TiledDevice};
