//! # Tile Manager
//!
//! Central accountant for every tile in the process: it owns the buffers,
//! the swap file, and the eviction policy. Devices hold [`TileHandle`]s;
//! all access to the bytes behind a handle goes through the manager.
//!
//! ## Lifecycle
//!
//! ```text
//!               create_tile
//!                    |
//!                    v
//!   +---------- RESIDENT (queued) ----------+
//!   |   pin            |                    |
//!   v                  | do_swapping        |
//! RESIDENT (pinned)    v                    | release (refs=0)
//!   |             SWAPPED OUT               |
//!   | drop guard       |                    v
//!   +------------------+---------------> FREED
//!                 pin (fault-in)     (region recycled)
//! ```
//!
//! ## Eviction
//!
//! Pins are reader/writer: a tile carries any number of shared pins or one
//! writable pin, never both, so a writable guard's buffer has no aliases.
//!
//! Resident, unpinned tiles sit on a FIFO queue threaded through the slot
//! arena (intrusive prev/next indices, so pinning unlinks in O(1)). When
//! the resident count exceeds the configured budget, tiles are written to
//! the swap file oldest-first until the count falls back under it.
//!
//! A tile that was swapped out before keeps its file region while resident,
//! so re-evicting it never consults the free lists; the bytes are simply
//! written to the same place.
//!
//! ## Failure Policy
//!
//! If writing to the swap file fails (disk full, typically), swapping is
//! disabled for the lifetime of the manager and painting continues from
//! RAM. Losing the user's image to a full /tmp is not an option.
//!
//! ## Locking
//!
//! One mutex around all state. Tile operations are short (the largest is a
//! 16KB-per-pixel-byte memcpy) and painting is coordinated by the caller,
//! so finer sharding has never been worth it.

use std::fmt;

use eyre::{bail, ensure, Result, WrapErr};
use parking_lot::Mutex;
use tracing::{debug, warn};

use super::pool::TileBufferPool;
use super::tile::{Tile, TileHandle};
use crate::config::EngineConfig;
use crate::swap::{place, FreeLists, MmapSwapFile, Placement, SwapStore};

pub struct TileManager {
    inner: Mutex<Inner>,
}

struct Slot {
    generation: u32,
    tile: Option<Tile>,
    /// Intrusive FIFO links, valid while `queued`.
    prev: Option<u32>,
    next: Option<u32>,
    queued: bool,
}

struct Inner {
    slots: Vec<Slot>,
    free_slots: Vec<u32>,
    /// Oldest queued tile; eviction starts here.
    queue_head: Option<u32>,
    queue_tail: Option<u32>,
    store: Box<dyn SwapStore>,
    free_lists: FreeLists,
    pool: TileBufferPool,
    config: EngineConfig,
    resident: usize,
    swapped: usize,
    swap_forbidden: bool,
}

/// Point-in-time counters, printable for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileStats {
    pub total: usize,
    pub resident: usize,
    pub swapped: usize,
    pub pooled_buffers: usize,
    pub swap_file_len: u64,
    pub swap_forbidden: bool,
}

impl fmt::Display for TileStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tiles: {} ({} resident, {} swapped), swap file: {} bytes, pooled buffers: {}, swapping {}",
            self.total,
            self.resident,
            self.swapped,
            self.swap_file_len,
            self.pooled_buffers,
            if self.swap_forbidden { "disabled" } else { "enabled" },
        )
    }
}

impl TileManager {
    /// Creates a manager backed by an unlinked temporary swap file.
    pub fn new(config: EngineConfig) -> Result<Self> {
        let store = MmapSwapFile::new().wrap_err("failed to set up tile swap")?;
        Ok(Self::with_store(config, Box::new(store)))
    }

    /// Creates a manager over an explicit backing store.
    pub fn with_store(config: EngineConfig, store: Box<dyn SwapStore>) -> Self {
        TileManager {
            inner: Mutex::new(Inner {
                slots: Vec::new(),
                free_slots: Vec::new(),
                queue_head: None,
                queue_tail: None,
                store,
                free_lists: FreeLists::new(),
                pool: TileBufferPool::new(),
                config,
                resident: 0,
                swapped: 0,
                swap_forbidden: false,
            }),
        }
    }

    /// Registers a new zero-filled tile and returns its handle. The caller
    /// owns one reference.
    pub fn create_tile(&self, pixel_size: usize) -> Result<TileHandle> {
        ensure!(pixel_size > 0, "pixel size must be at least 1");

        let mut inner = self.inner.lock();

        let mut data = inner.pool.acquire(pixel_size);
        data.fill(0);

        let handle = inner.insert_tile(Tile::new(pixel_size, data));
        inner.do_swapping();

        Ok(handle)
    }

    /// Adds a shared reference to the tile. Snapshots and devices that
    /// share tile contents copy-on-write use this; the actual copy happens
    /// in [`prepare_for_write`](Self::prepare_for_write).
    pub fn snapshot(&self, handle: TileHandle) -> Result<TileHandle> {
        let mut inner = self.inner.lock();
        let tile = inner.tile_mut(handle)?;
        tile.refs += 1;
        Ok(handle)
    }

    /// Drops one reference. The last reference frees the tile: its buffer
    /// returns to the pool and its swap region to the free lists.
    pub fn release(&self, handle: TileHandle) -> Result<()> {
        let mut inner = self.inner.lock();

        let tile = inner.tile_mut(handle)?;
        if tile.refs == 1 {
            ensure!(
                !tile.is_pinned(),
                "cannot release the last reference to a pinned tile"
            );
        }
        tile.refs -= 1;
        if tile.refs > 0 {
            return Ok(());
        }

        let index = handle.index;
        inner.unlink(index);

        let slot = &mut inner.slots[index as usize];
        let tile = slot.tile.take().unwrap_or_else(|| unreachable!());
        slot.generation = slot.generation.wrapping_add(1);
        inner.free_slots.push(index);

        match tile.data {
            Some(buffer) => {
                inner.pool.release(tile.pixel_size, buffer);
                inner.resident -= 1;
            }
            None => inner.swapped -= 1,
        }
        if let Some(region) = tile.swap_region {
            inner.free_lists.push(tile.pixel_size, region);
        }

        Ok(())
    }

    /// Copy-on-write barrier. With a single reference the handle is
    /// returned unchanged; with shared ownership the caller's reference is
    /// moved to a fresh private copy and the copy's handle returned. The
    /// original handle stays valid for the remaining owners.
    pub fn prepare_for_write(&self, handle: TileHandle) -> Result<TileHandle> {
        let mut inner = self.inner.lock();

        if inner.tile_mut(handle)?.refs == 1 {
            return Ok(handle);
        }

        inner.ensure_loaded(handle.index)?;

        let (pixel_size, copy) = {
            let tile = inner.tile_mut(handle)?;
            let source = tile
                .data
                .as_ref()
                .unwrap_or_else(|| unreachable!("ensure_loaded left tile resident"));
            (tile.pixel_size, source.to_vec())
        };

        let mut data = inner.pool.acquire(pixel_size);
        data.copy_from_slice(&copy);

        inner.tile_mut(handle)?.refs -= 1;

        let copy_handle = inner.insert_tile(Tile::new(pixel_size, data));
        inner.do_swapping();

        Ok(copy_handle)
    }

    /// Faults the tile in if needed, takes it off the swappable queue and
    /// returns a read-only guard over its bytes. The tile cannot be
    /// evicted or freed while the guard lives. Any number of shared pins
    /// may coexist; taking one fails while a writable pin is live.
    pub fn pin(&self, handle: TileHandle) -> Result<PinnedTile<'_>> {
        let mut inner = self.inner.lock();

        inner.check(handle)?;
        ensure!(
            !inner.tile_mut(handle)?.write_pinned,
            "tile is pinned for writing"
        );
        inner.ensure_loaded(handle.index)?;
        inner.unlink(handle.index);

        let tile = inner.tile_mut(handle)?;
        tile.pins += 1;

        let buffer = tile
            .data
            .as_ref()
            .unwrap_or_else(|| unreachable!("ensure_loaded left tile resident"));
        let ptr = buffer.as_ptr();
        let len = buffer.len();

        Ok(PinnedTile {
            manager: self,
            handle,
            ptr,
            len,
        })
    }

    /// Like [`pin`](Self::pin) but the guard also hands out mutable access.
    /// Exclusive: fails while any other pin on the tile is live, and blocks
    /// further pins until the guard drops.
    pub fn pin_mut(&self, handle: TileHandle) -> Result<PinnedTileMut<'_>> {
        let mut inner = self.inner.lock();

        inner.check(handle)?;
        ensure!(
            !inner.tile_mut(handle)?.is_pinned(),
            "tile is already pinned"
        );
        inner.ensure_loaded(handle.index)?;
        inner.unlink(handle.index);

        let tile = inner.tile_mut(handle)?;
        tile.write_pinned = true;

        let buffer = tile
            .data
            .as_mut()
            .unwrap_or_else(|| unreachable!("ensure_loaded left tile resident"));
        let ptr = buffer.as_mut_ptr();
        let len = buffer.len();

        Ok(PinnedTileMut {
            manager: self,
            handle,
            ptr,
            len,
        })
    }

    fn unpin(&self, handle: TileHandle) {
        let mut inner = self.inner.lock();

        let idle = match inner.tile_mut(handle) {
            Ok(tile) => {
                tile.pins -= 1;
                !tile.is_pinned()
            }
            Err(_) => return,
        };
        if idle {
            inner.enqueue(handle.index);
            inner.do_swapping();
        }
    }

    fn unpin_mut(&self, handle: TileHandle) {
        let mut inner = self.inner.lock();

        let idle = match inner.tile_mut(handle) {
            Ok(tile) => {
                tile.write_pinned = false;
                !tile.is_pinned()
            }
            Err(_) => return,
        };
        if idle {
            inner.enqueue(handle.index);
            inner.do_swapping();
        }
    }

    /// Borrows a tile-sized scratch buffer from the pool. Contents are
    /// unspecified.
    pub fn request_tile_data(&self, pixel_size: usize) -> Box<[u8]> {
        self.inner.lock().pool.acquire(pixel_size)
    }

    /// Returns a scratch buffer to the pool.
    pub fn dont_need_tile_data(&self, pixel_size: usize, data: Box<[u8]>) {
        self.inner.lock().pool.release(pixel_size, data);
    }

    /// Replaces the memory configuration and immediately enforces the new
    /// budget.
    pub fn set_config(&self, config: EngineConfig) {
        let mut inner = self.inner.lock();
        inner.config = config;
        inner.do_swapping();
    }

    pub fn config(&self) -> EngineConfig {
        self.inner.lock().config
    }

    pub fn stats(&self) -> TileStats {
        let inner = self.inner.lock();
        TileStats {
            total: inner.resident + inner.swapped,
            resident: inner.resident,
            swapped: inner.swapped,
            pooled_buffers: inner.pool.pooled_buffers(),
            swap_file_len: inner.store.len(),
            swap_forbidden: inner.swap_forbidden,
        }
    }
}

impl fmt::Debug for TileManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = self.stats();
        f.debug_struct("TileManager").field("stats", &stats).finish()
    }
}

impl Inner {
    /// Places a fresh resident tile into the arena and the queue.
    fn insert_tile(&mut self, tile: Tile) -> TileHandle {
        let index = match self.free_slots.pop() {
            Some(index) => {
                self.slots[index as usize].tile = Some(tile);
                index
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    tile: Some(tile),
                    prev: None,
                    next: None,
                    queued: false,
                });
                index
            }
        };

        self.resident += 1;
        self.enqueue(index);

        TileHandle {
            index,
            generation: self.slots[index as usize].generation,
        }
    }

    fn check(&self, handle: TileHandle) -> Result<()> {
        let Some(slot) = self.slots.get(handle.index as usize) else {
            bail!("stale tile handle (slot {} out of range)", handle.index);
        };
        ensure!(
            slot.generation == handle.generation && slot.tile.is_some(),
            "stale tile handle (slot {} reused or freed)",
            handle.index
        );
        Ok(())
    }

    fn tile_mut(&mut self, handle: TileHandle) -> Result<&mut Tile> {
        self.check(handle)?;
        Ok(self.slots[handle.index as usize]
            .tile
            .as_mut()
            .unwrap_or_else(|| unreachable!("check() verified the tile exists")))
    }

    fn enqueue(&mut self, index: u32) {
        let slot = &mut self.slots[index as usize];
        if slot.queued {
            return;
        }
        slot.queued = true;
        slot.next = None;
        slot.prev = self.queue_tail;

        match self.queue_tail {
            Some(tail) => self.slots[tail as usize].next = Some(index),
            None => self.queue_head = Some(index),
        }
        self.queue_tail = Some(index);
    }

    fn unlink(&mut self, index: u32) {
        let slot = &mut self.slots[index as usize];
        if !slot.queued {
            return;
        }
        slot.queued = false;
        let (prev, next) = (slot.prev.take(), slot.next.take());

        match prev {
            Some(p) => self.slots[p as usize].next = next,
            None => self.queue_head = next,
        }
        match next {
            Some(n) => self.slots[n as usize].prev = prev,
            None => self.queue_tail = prev,
        }
    }

    /// Evicts oldest-first until the resident count is back under the
    /// budget. Swappiness below 100 evicts past the budget line, making
    /// room for the next strokes up front.
    fn do_swapping(&mut self) {
        if self.swap_forbidden || self.resident <= self.config.max_tiles_in_mem {
            return;
        }

        let target = self.config.max_tiles_in_mem * self.config.swappiness.min(100) / 100;

        while self.resident > target && !self.swap_forbidden {
            let Some(index) = self.queue_head else {
                break;
            };
            self.unlink(index);
            self.swap_out(index);
        }
    }

    fn swap_out(&mut self, index: u32) {
        let (pixel_size, tile_bytes, existing_region) = {
            let tile = self.slots[index as usize]
                .tile
                .as_ref()
                .unwrap_or_else(|| unreachable!("queued slots hold live tiles"));
            debug_assert!(!tile.is_pinned());
            (tile.pixel_size, tile.bytes(), tile.swap_region)
        };

        let region = match existing_region {
            Some(region) => region,
            None => {
                let placement = place(
                    &mut self.free_lists,
                    pixel_size,
                    tile_bytes,
                    self.store.len(),
                    self.store.page_size(),
                );
                if let Placement::Grow { new_file_len, .. } = placement {
                    if let Err(err) = self.store.grow(new_file_len) {
                        warn!(
                            "failed to grow swap file to {} bytes, disabling swap: {err:#}",
                            new_file_len
                        );
                        self.swap_forbidden = true;
                        self.enqueue(index);
                        return;
                    }
                }
                placement.region()
            }
        };

        let write_result = {
            let tile = self.slots[index as usize]
                .tile
                .as_ref()
                .unwrap_or_else(|| unreachable!());
            let data = tile.data.as_ref().unwrap_or_else(|| unreachable!());
            self.store.write(region.file_pos, data)
        };

        if let Err(err) = write_result {
            warn!("failed to write tile to swap, disabling swap: {err:#}");
            self.swap_forbidden = true;
            if existing_region.is_none() {
                self.free_lists.push(pixel_size, region);
            }
            self.enqueue(index);
            return;
        }

        let tile = self.slots[index as usize]
            .tile
            .as_mut()
            .unwrap_or_else(|| unreachable!());
        tile.swap_region = Some(region);
        let buffer = tile.data.take().unwrap_or_else(|| unreachable!());
        self.pool.release(pixel_size, buffer);
        self.resident -= 1;
        self.swapped += 1;

        debug!(
            "swapped out tile {} to {}..{}",
            index,
            region.file_pos,
            region.file_pos + region.size as u64
        );
    }

    fn ensure_loaded(&mut self, index: u32) -> Result<()> {
        let Some(slot) = self.slots.get(index as usize) else {
            bail!("stale tile handle (slot {} out of range)", index);
        };
        let Some(tile) = slot.tile.as_ref() else {
            bail!("stale tile handle (slot {} freed)", index);
        };
        if tile.is_resident() {
            return Ok(());
        }

        let pixel_size = tile.pixel_size;
        let region = tile
            .swap_region
            .unwrap_or_else(|| unreachable!("non-resident tiles are in swap"));

        let mut buffer = self.pool.acquire(pixel_size);
        if let Err(err) = self.store.read(region.file_pos, &mut buffer) {
            self.pool.release(pixel_size, buffer);
            return Err(err).wrap_err("failed to read tile back from swap");
        }

        let pinned = {
            let tile = self.slots[index as usize]
                .tile
                .as_mut()
                .unwrap_or_else(|| unreachable!());
            tile.data = Some(buffer);
            tile.is_pinned()
        };
        self.swapped -= 1;
        self.resident += 1;

        if !pinned {
            self.enqueue(index);
        }

        debug!("faulted in tile {} from {}", index, region.file_pos);

        Ok(())
    }
}

/// Shared RAII pin guard. While it lives the tile stays resident at a
/// stable address; dropping it makes the tile evictable again. Read-only;
/// any number may coexist on one tile.
pub struct PinnedTile<'a> {
    manager: &'a TileManager,
    handle: TileHandle,
    ptr: *const u8,
    len: usize,
}

impl PinnedTile<'_> {
    pub fn handle(&self) -> TileHandle {
        self.handle
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn data(&self) -> &[u8] {
        // SAFETY: ptr/len were taken from the tile's heap buffer while the
        // pin count was raised. A pinned tile is off the swappable queue so
        // the buffer is never freed or replaced, release() refuses to drop
        // the last reference while pinned, and the Box allocation does not
        // move when the slot arena grows. No mutable alias exists: pin()
        // fails while a writable pin is live and pin_mut() fails while any
        // shared pin is live. The slice borrows self, so it cannot outlive
        // the guard.
        unsafe { std::slice::from_raw_parts(self.ptr, self.len) }
    }
}

impl Drop for PinnedTile<'_> {
    fn drop(&mut self) {
        self.manager.unpin(self.handle);
    }
}

impl fmt::Debug for PinnedTile<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PinnedTile")
            .field("handle", &self.handle)
            .field("len", &self.len)
            .finish()
    }
}

/// Exclusive RAII pin guard. Only one may exist per tile at a time, with
/// no shared guards alongside it, so its mutable slice never aliases.
pub struct PinnedTileMut<'a> {
    manager: &'a TileManager,
    handle: TileHandle,
    ptr: *mut u8,
    len: usize,
}

impl PinnedTileMut<'_> {
    pub fn handle(&self) -> TileHandle {
        self.handle
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn data(&self) -> &[u8] {
        // SAFETY: same residency invariants as PinnedTile::data. This
        // guard is the tile's only pin, so no other slice over the buffer
        // exists outside of self.
        unsafe { std::slice::from_raw_parts(self.ptr, self.len) }
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        // SAFETY: pin_mut() refused to create this guard while any other
        // pin was live and blocks new pins until it drops, making this the
        // only path to the buffer; &mut self makes the borrow itself
        // exclusive.
        unsafe { std::slice::from_raw_parts_mut(self.ptr, self.len) }
    }
}

impl Drop for PinnedTileMut<'_> {
    fn drop(&mut self) {
        self.manager.unpin_mut(self.handle);
    }
}

impl fmt::Debug for PinnedTileMut<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PinnedTileMut")
            .field("handle", &self.handle)
            .field("len", &self.len)
            .finish()
    }
}
