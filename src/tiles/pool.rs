//! # Tile Buffer Pool
//!
//! Painting churns through tile buffers: every stroke that crosses a tile
//! boundary allocates one, every eviction frees one. The pool keeps freed
//! buffers around, grouped by pixel size, so the common sizes are served
//! without touching the allocator.
//!
//! Only small pixel sizes are pooled. A buffer for a 4-byte pixel is 16KB;
//! exotic deep-color encodings produce buffers large enough that caching a
//! hundred of them would dwarf the tile budget, so those go straight to the
//! heap.

use smallvec::SmallVec;

use crate::config::constants::{
    POOLED_PIXEL_SIZE_MAX, POOL_CLASS_COUNT, TILES_PER_POOL, TILE_PIXELS,
};

struct Pool {
    pixel_size: usize,
    free: Vec<Box<[u8]>>,
}

/// Recycles tile-sized buffers for up to [`POOL_CLASS_COUNT`] distinct
/// pixel sizes. Classes are claimed first come, first served; a fifth
/// pixel size simply bypasses the pool.
pub struct TileBufferPool {
    pools: SmallVec<[Pool; POOL_CLASS_COUNT]>,
}

impl TileBufferPool {
    pub fn new() -> Self {
        TileBufferPool {
            pools: SmallVec::new(),
        }
    }

    /// Returns a buffer of `TILE_PIXELS * pixel_size` bytes. Contents are
    /// unspecified; callers overwrite the whole buffer.
    pub fn acquire(&mut self, pixel_size: usize) -> Box<[u8]> {
        let tile_bytes = TILE_PIXELS * pixel_size;

        if pixel_size > POOLED_PIXEL_SIZE_MAX {
            return vec![0u8; tile_bytes].into_boxed_slice();
        }

        if let Some(pool) = self.pools.iter_mut().find(|p| p.pixel_size == pixel_size) {
            return pool
                .free
                .pop()
                .unwrap_or_else(|| vec![0u8; tile_bytes].into_boxed_slice());
        }

        if self.pools.len() < POOL_CLASS_COUNT {
            // First tile of this pixel size claims a class and warms it up.
            let mut free = Vec::with_capacity(TILES_PER_POOL);
            for _ in 0..TILES_PER_POOL - 1 {
                free.push(vec![0u8; tile_bytes].into_boxed_slice());
            }
            self.pools.push(Pool { pixel_size, free });
        }

        vec![0u8; tile_bytes].into_boxed_slice()
    }

    /// Hands a buffer back. Buffers of unpooled sizes, or arriving when the
    /// class is already full, are dropped.
    pub fn release(&mut self, pixel_size: usize, buffer: Box<[u8]>) {
        debug_assert_eq!(buffer.len(), TILE_PIXELS * pixel_size);

        if let Some(pool) = self.pools.iter_mut().find(|p| p.pixel_size == pixel_size) {
            if pool.free.len() < TILES_PER_POOL {
                pool.free.push(buffer);
            }
        }
    }

    /// Buffers currently parked across all classes.
    pub fn pooled_buffers(&self) -> usize {
        self.pools.iter().map(|p| p.free.len()).sum()
    }
}

impl Default for TileBufferPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_returns_correctly_sized_buffers() {
        let mut pool = TileBufferPool::new();
        assert_eq!(pool.acquire(4).len(), TILE_PIXELS * 4);
        assert_eq!(pool.acquire(1).len(), TILE_PIXELS);
    }

    #[test]
    fn first_acquire_warms_the_class() {
        let mut pool = TileBufferPool::new();
        let _buf = pool.acquire(4);
        assert_eq!(pool.pooled_buffers(), TILES_PER_POOL - 1);
    }

    #[test]
    fn released_buffers_are_reused() {
        let mut pool = TileBufferPool::new();
        let buf = pool.acquire(2);
        let ptr = buf.as_ptr();
        pool.release(2, buf);

        let again = pool.acquire(2);
        assert_eq!(again.as_ptr(), ptr);
    }

    #[test]
    fn large_pixel_sizes_bypass_the_pool() {
        let mut pool = TileBufferPool::new();
        let buf = pool.acquire(POOLED_PIXEL_SIZE_MAX + 1);
        assert_eq!(buf.len(), TILE_PIXELS * (POOLED_PIXEL_SIZE_MAX + 1));
        pool.release(POOLED_PIXEL_SIZE_MAX + 1, buf);
        assert_eq!(pool.pooled_buffers(), 0);
    }

    #[test]
    fn only_four_classes_are_pooled() {
        let mut pool = TileBufferPool::new();
        for pixel_size in 1..=POOL_CLASS_COUNT {
            let buf = pool.acquire(pixel_size);
            pool.release(pixel_size, buf);
        }
        let warmed = pool.pooled_buffers();

        // A fifth class never pools its buffers.
        let buf = pool.acquire(POOL_CLASS_COUNT + 1);
        pool.release(POOL_CLASS_COUNT + 1, buf);
        assert_eq!(pool.pooled_buffers(), warmed);
    }

    #[test]
    fn full_class_drops_excess_buffers() {
        let mut pool = TileBufferPool::new();
        let buf = pool.acquire(1);
        // The class already holds TILES_PER_POOL - 1 warm buffers.
        pool.release(1, buf);
        assert_eq!(pool.pooled_buffers(), TILES_PER_POOL);

        let extra = vec![0u8; TILE_PIXELS].into_boxed_slice();
        pool.release(1, extra);
        assert_eq!(pool.pooled_buffers(), TILES_PER_POOL);
    }
}
