//! # Swap-File Region Recycling
//!
//! When a swapped-out tile is dropped its file region cannot be returned to
//! the filesystem (the file never shrinks), so it is parked on a free list
//! and handed to the next tile of the same pixel size. Lists are keyed by
//! pixel size because every tile of a given pixel size occupies exactly
//! `64 * 64 * pixel_size` bytes; a region recycled within its class always
//! fits exactly.
//!
//! [`place`] is the single decision point for where a tile lands in the
//! file. It either pops a recycled region or appends at the end, rounding
//! the new file length up to the next page boundary so growth happens in
//! page-aligned increments.

use crate::config::constants::INITIAL_FREE_LIST_CLASSES;

/// A contiguous byte range of the swap file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeRegion {
    pub file_pos: u64,
    pub size: usize,
}

/// Where the next swapped-out tile goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// A previously freed region of the right class is reused; the file
    /// does not grow.
    Reuse(FreeRegion),
    /// The tile is appended at the current end of the file, which must
    /// first be extended to `new_file_len`.
    Grow {
        new_file_len: u64,
        region: FreeRegion,
    },
}

impl Placement {
    pub fn region(&self) -> FreeRegion {
        match *self {
            Placement::Reuse(region) => region,
            Placement::Grow { region, .. } => region,
        }
    }
}

/// Free regions grouped by pixel size.
#[derive(Debug)]
pub struct FreeLists {
    /// Indexed by pixel size; index 0 is unused.
    lists: Vec<Vec<FreeRegion>>,
}

impl FreeLists {
    pub fn new() -> Self {
        let mut lists = Vec::with_capacity(INITIAL_FREE_LIST_CLASSES + 1);
        lists.resize_with(INITIAL_FREE_LIST_CLASSES + 1, Vec::new);
        FreeLists { lists }
    }

    pub fn push(&mut self, pixel_size: usize, region: FreeRegion) {
        if pixel_size >= self.lists.len() {
            self.lists.resize_with(pixel_size + 1, Vec::new);
        }
        self.lists[pixel_size].push(region);
    }

    pub fn pop(&mut self, pixel_size: usize) -> Option<FreeRegion> {
        self.lists.get_mut(pixel_size)?.pop()
    }

    /// Total number of parked regions, all classes.
    pub fn len(&self) -> usize {
        self.lists.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.iter().all(Vec::is_empty)
    }
}

impl Default for FreeLists {
    fn default() -> Self {
        Self::new()
    }
}

/// Picks the file region for a tile of `tile_bytes = 64 * 64 * pixel_size`
/// bytes about to be swapped out.
pub fn place(
    free: &mut FreeLists,
    pixel_size: usize,
    tile_bytes: usize,
    file_len: u64,
    page_size: u64,
) -> Placement {
    if let Some(region) = free.pop(pixel_size) {
        debug_assert_eq!(region.size, tile_bytes);
        return Placement::Reuse(region);
    }

    let region = FreeRegion {
        file_pos: file_len,
        size: tile_bytes,
    };

    let mut new_file_len = file_len + tile_bytes as u64;
    let rem = new_file_len % page_size;
    if rem != 0 {
        new_file_len += page_size - rem;
    }

    Placement::Grow {
        new_file_len,
        region,
    }
}
