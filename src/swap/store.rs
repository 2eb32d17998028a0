//! # Swap Backing Stores
//!
//! `SwapStore` abstracts the byte arena that swapped-out tiles are copied
//! into. The production implementation is `MmapSwapFile`, an unlinked
//! temporary file accessed through a mutable memory map. `MemSwapStore` is
//! a plain heap vector with identical semantics, used by tests and as a
//! fallback when no writable temporary directory exists.
//!
//! ## Remap Discipline
//!
//! A memory map becomes invalid when the file is resized. `grow()` takes
//! `&mut self`, so the borrow checker guarantees no slice into the old map
//! survives a remap; no epoch tracking or reference counting is needed.
//!
//! ## Paging Hints
//!
//! Around each copy the mapped region is advised `MADV_WILLNEED` so the
//! kernel faults the pages in bulk, and `MADV_DONTNEED` afterwards so a
//! tile parked in swap does not keep resident pages alive.

use std::fmt;
use std::fs::File;

use eyre::{bail, ensure, Result, WrapErr};
use memmap2::MmapMut;

/// Byte arena holding swapped-out tile data.
///
/// Positions are stable for the lifetime of the store: once a tile is
/// written at `pos`, `read(pos, ..)` returns those bytes until the region
/// is overwritten.
pub trait SwapStore: fmt::Debug + Send {
    /// Current arena length in bytes.
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Granularity the arena grows in.
    fn page_size(&self) -> u64;

    /// Extends the arena to `new_len` bytes. Never shrinks.
    fn grow(&mut self, new_len: u64) -> Result<()>;

    /// Copies `data` into the arena at `pos`.
    fn write(&mut self, pos: u64, data: &[u8]) -> Result<()>;

    /// Copies `buf.len()` bytes out of the arena at `pos`.
    fn read(&self, pos: u64, buf: &mut [u8]) -> Result<()>;
}

/// Unlinked temporary file accessed through a mutable memory map.
pub struct MmapSwapFile {
    file: File,
    /// `None` while the file is still empty; mapping a zero-length file
    /// is an error on every platform we care about.
    mmap: Option<MmapMut>,
    len: u64,
    page_size: u64,
}

impl fmt::Debug for MmapSwapFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MmapSwapFile")
            .field("len", &self.len)
            .field("page_size", &self.page_size)
            .finish()
    }
}

impl MmapSwapFile {
    /// Creates an empty swap file in the system temporary directory. The
    /// file is unlinked immediately, so it disappears with the process.
    pub fn new() -> Result<Self> {
        let file = tempfile::tempfile().wrap_err("failed to create swap file")?;

        Ok(Self {
            file,
            mmap: None,
            len: 0,
            page_size: system_page_size(),
        })
    }

    #[inline]
    fn advise(&self, pos: u64, len: usize, advice: libc::c_int) {
        let Some(mmap) = &self.mmap else { return };

        #[cfg(unix)]
        // SAFETY: madvise is a paging hint and cannot corrupt memory. The
        // region is in bounds because every caller checks pos + len against
        // self.len, which equals the mapped length.
        unsafe {
            libc::madvise(
                mmap.as_ptr().add(pos as usize) as *mut libc::c_void,
                len,
                advice,
            );
        }
        #[cfg(not(unix))]
        let _ = (pos, len, advice);
    }
}

impl SwapStore for MmapSwapFile {
    fn len(&self) -> u64 {
        self.len
    }

    fn page_size(&self) -> u64 {
        self.page_size
    }

    fn grow(&mut self, new_len: u64) -> Result<()> {
        if new_len <= self.len {
            return Ok(());
        }

        if let Some(mmap) = &self.mmap {
            mmap.flush()
                .wrap_err("failed to flush swap file before grow")?;
        }

        self.file
            .set_len(new_len)
            .wrap_err_with(|| format!("failed to extend swap file to {} bytes", new_len))?;

        // SAFETY: MmapMut::map_mut is unsafe because the mapping aliases the
        // file contents. This is safe because:
        // 1. The file is anonymous (unlinked) and owned exclusively by this
        //    process, so no external writer exists
        // 2. grow() takes &mut self, so no slice into the old map can be
        //    live when it is dropped and replaced
        // 3. The file length was set to new_len before mapping
        self.mmap = Some(unsafe {
            MmapMut::map_mut(&self.file).wrap_err("failed to remap swap file after grow")?
        });
        self.len = new_len;

        Ok(())
    }

    fn write(&mut self, pos: u64, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }

        let end = pos + data.len() as u64;
        ensure!(
            end <= self.len,
            "swap write at {}..{} out of bounds (len={})",
            pos,
            end,
            self.len
        );

        self.advise(pos, data.len(), libc::MADV_WILLNEED);

        let Some(mmap) = self.mmap.as_mut() else {
            bail!("swap file is not mapped");
        };
        mmap[pos as usize..end as usize].copy_from_slice(data);

        self.advise(pos, data.len(), libc::MADV_DONTNEED);

        Ok(())
    }

    fn read(&self, pos: u64, buf: &mut [u8]) -> Result<()> {
        if buf.is_empty() {
            return Ok(());
        }

        let end = pos + buf.len() as u64;
        ensure!(
            end <= self.len,
            "swap read at {}..{} out of bounds (len={})",
            pos,
            end,
            self.len
        );

        self.advise(pos, buf.len(), libc::MADV_WILLNEED);

        let Some(mmap) = self.mmap.as_ref() else {
            bail!("swap file is not mapped");
        };
        buf.copy_from_slice(&mmap[pos as usize..end as usize]);

        self.advise(pos, buf.len(), libc::MADV_DONTNEED);

        Ok(())
    }
}

fn system_page_size() -> u64 {
    #[cfg(unix)]
    // SAFETY: sysconf with _SC_PAGESIZE has no preconditions.
    unsafe {
        let sz = libc::sysconf(libc::_SC_PAGESIZE);
        if sz > 0 {
            return sz as u64;
        }
    }
    4096
}

/// Heap-backed arena with `MmapSwapFile` semantics, for tests and as a
/// fallback store.
#[derive(Debug, Default)]
pub struct MemSwapStore {
    data: Vec<u8>,
}

impl MemSwapStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SwapStore for MemSwapStore {
    fn len(&self) -> u64 {
        self.data.len() as u64
    }

    fn page_size(&self) -> u64 {
        4096
    }

    fn grow(&mut self, new_len: u64) -> Result<()> {
        if new_len > self.data.len() as u64 {
            self.data.resize(new_len as usize, 0);
        }
        Ok(())
    }

    fn write(&mut self, pos: u64, data: &[u8]) -> Result<()> {
        let end = pos as usize + data.len();
        ensure!(
            end as u64 <= self.len(),
            "swap write at {}..{} out of bounds (len={})",
            pos,
            end,
            self.len()
        );
        self.data[pos as usize..end].copy_from_slice(data);
        Ok(())
    }

    fn read(&self, pos: u64, buf: &mut [u8]) -> Result<()> {
        let end = pos as usize + buf.len();
        ensure!(
            end as u64 <= self.len(),
            "swap read at {}..{} out of bounds (len={})",
            pos,
            end,
            self.len()
        );
        buf.copy_from_slice(&self.data[pos as usize..end]);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(store: &mut dyn SwapStore) {
        store.grow(8192).unwrap();
        assert_eq!(store.len(), 8192);

        let data: Vec<u8> = (0..=255).cycle().take(4096).collect();
        store.write(4096, &data).unwrap();

        let mut back = vec![0u8; 4096];
        store.read(4096, &mut back).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn mmap_store_round_trip() {
        let mut store = MmapSwapFile::new().unwrap();
        round_trip(&mut store);
    }

    #[test]
    fn mem_store_round_trip() {
        let mut store = MemSwapStore::new();
        round_trip(&mut store);
    }

    #[test]
    fn grow_preserves_existing_data() {
        let mut store = MmapSwapFile::new().unwrap();
        store.grow(4096).unwrap();
        store.write(0, &[0xCA, 0xFE]).unwrap();

        store.grow(65536).unwrap();

        let mut back = [0u8; 2];
        store.read(0, &mut back).unwrap();
        assert_eq!(back, [0xCA, 0xFE]);
    }

    #[test]
    fn grow_never_shrinks() {
        let mut store = MmapSwapFile::new().unwrap();
        store.grow(8192).unwrap();
        store.grow(4096).unwrap();
        assert_eq!(store.len(), 8192);
    }

    #[test]
    fn out_of_bounds_access_is_an_error() {
        let mut store = MmapSwapFile::new().unwrap();
        store.grow(4096).unwrap();

        assert!(store.write(4000, &[0u8; 200]).is_err());
        let mut buf = [0u8; 200];
        assert!(store.read(4000, &mut buf).is_err());
    }

    #[test]
    fn page_size_is_sane() {
        let store = MmapSwapFile::new().unwrap();
        assert!(store.page_size() >= 512);
        assert!(store.page_size().is_power_of_two());
    }
}
