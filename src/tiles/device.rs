//! # Tiled Paint Device
//!
//! A paint device is an unbounded pixel plane cut into 64x64 tiles. Tiles
//! exist only where something was painted; everywhere else reads come back
//! as the transparent zero pixel.
//!
//! ```text
//!        col -1      col 0       col 1
//!      +----------+----------+----------+
//! row  |          |  (0,0)   |          |    tile (col,row) covers pixels
//!  0   |          |  tile    |          |    x in [col*64, col*64+64)
//!      +----------+----------+----------+    y in [row*64, row*64+64)
//! ```
//!
//! Pixel coordinates are signed; tile indices come from euclidean division
//! so the grid is uniform across the origin.
//!
//! ## Sharing
//!
//! [`snapshot`](TiledDevice::snapshot) captures the device cheaply by
//! taking an extra reference on every tile. Tiles stay shared until a write
//! touches them; the write path runs each touched tile through the
//! manager's copy-on-write barrier first, so a snapshot never observes
//! later edits.

use std::sync::Arc;

use eyre::{ensure, Result};
use hashbrown::HashMap;

use super::manager::TileManager;
use super::tile::TileHandle;
use crate::colorspace::{ColorSpace, CompositeOp, Mask};
use crate::config::constants::{TILE_HEIGHT, TILE_WIDTH};

/// Splits a signed pixel coordinate into (tile index, offset within tile).
#[inline]
fn split(coord: i32, tile_span: usize) -> (i32, usize) {
    let span = tile_span as i32;
    (coord.div_euclid(span), coord.rem_euclid(span) as usize)
}

pub struct TiledDevice {
    manager: Arc<TileManager>,
    colorspace: Arc<dyn ColorSpace>,
    tiles: HashMap<(i32, i32), TileHandle>,
}

/// Frozen copy of a device's tile grid. Holds one reference per tile;
/// dropping the snapshot releases them.
pub struct DeviceSnapshot {
    manager: Arc<TileManager>,
    tiles: Option<HashMap<(i32, i32), TileHandle>>,
}

impl Drop for DeviceSnapshot {
    fn drop(&mut self) {
        if let Some(tiles) = self.tiles.take() {
            for handle in tiles.into_values() {
                let _ = self.manager.release(handle);
            }
        }
    }
}

impl TiledDevice {
    pub fn new(manager: Arc<TileManager>, colorspace: Arc<dyn ColorSpace>) -> Self {
        TiledDevice {
            manager,
            colorspace,
            tiles: HashMap::new(),
        }
    }

    pub fn colorspace(&self) -> &Arc<dyn ColorSpace> {
        &self.colorspace
    }

    pub fn pixel_size(&self) -> usize {
        self.colorspace.pixel_size()
    }

    /// Number of materialized tiles.
    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// Bounding rectangle of the materialized tiles in pixels, as
    /// `(x, y, width, height)`. `None` for an empty device.
    pub fn extent(&self) -> Option<(i32, i32, usize, usize)> {
        let mut keys = self.tiles.keys();
        let &(first_col, first_row) = keys.next()?;

        let (mut min_col, mut max_col) = (first_col, first_col);
        let (mut min_row, mut max_row) = (first_row, first_row);
        for &(col, row) in keys {
            min_col = min_col.min(col);
            max_col = max_col.max(col);
            min_row = min_row.min(row);
            max_row = max_row.max(row);
        }

        Some((
            min_col * TILE_WIDTH as i32,
            min_row * TILE_HEIGHT as i32,
            (max_col - min_col + 1) as usize * TILE_WIDTH,
            (max_row - min_row + 1) as usize * TILE_HEIGHT,
        ))
    }

    /// Copies a `width` x `height` rectangle into `dst` (row-major,
    /// `width * pixel_size` bytes per row). Unmaterialized regions read as
    /// zero pixels.
    pub fn read_pixels(
        &self,
        x: i32,
        y: i32,
        width: usize,
        height: usize,
        dst: &mut [u8],
    ) -> Result<()> {
        let ps = self.pixel_size();
        ensure!(
            dst.len() >= width * height * ps,
            "destination buffer holds {} bytes, rectangle needs {}",
            dst.len(),
            width * height * ps
        );

        let dst_stride = width * ps;
        self.for_each_band(x, y, width, height, |device, piece| {
            let dst_x = (piece.x - x) as usize * ps;
            let dst_y = (piece.y - y) as usize;

            match device.tiles.get(&piece.tile) {
                Some(&handle) => {
                    let pin = device.manager.pin(handle)?;
                    let data = pin.data();
                    let tile_stride = TILE_WIDTH * ps;
                    for r in 0..piece.height {
                        let src_start = (piece.in_y + r) * tile_stride + piece.in_x * ps;
                        let dst_start = (dst_y + r) * dst_stride + dst_x;
                        dst[dst_start..dst_start + piece.width * ps]
                            .copy_from_slice(&data[src_start..src_start + piece.width * ps]);
                    }
                }
                None => {
                    for r in 0..piece.height {
                        let dst_start = (dst_y + r) * dst_stride + dst_x;
                        dst[dst_start..dst_start + piece.width * ps].fill(0);
                    }
                }
            }
            Ok(())
        })
    }

    /// Writes a `width` x `height` rectangle from `src` (row-major,
    /// `width * pixel_size` bytes per row), materializing and
    /// copying-on-write tiles as needed.
    pub fn write_pixels(
        &mut self,
        x: i32,
        y: i32,
        width: usize,
        height: usize,
        src: &[u8],
    ) -> Result<()> {
        let ps = self.pixel_size();
        ensure!(
            src.len() >= width * height * ps,
            "source buffer holds {} bytes, rectangle needs {}",
            src.len(),
            width * height * ps
        );

        let src_stride = width * ps;
        self.for_each_band_mut(x, y, width, height, |manager, handle, piece| {
            let src_x = (piece.x - x) as usize * ps;
            let src_y = (piece.y - y) as usize;

            let mut pin = manager.pin_mut(handle)?;
            let data = pin.data_mut();
            let tile_stride = TILE_WIDTH * ps;
            for r in 0..piece.height {
                let dst_start = (piece.in_y + r) * tile_stride + piece.in_x * ps;
                let src_start = (src_y + r) * src_stride + src_x;
                data[dst_start..dst_start + piece.width * ps]
                    .copy_from_slice(&src[src_start..src_start + piece.width * ps]);
            }
            Ok(())
        })
    }

    /// Composites a source rectangle onto the device under `op`, scaled by
    /// `opacity` and the optional per-pixel `mask`. `src` is row-major with
    /// `src_stride` bytes between row starts.
    #[allow(clippy::too_many_arguments)]
    pub fn composite(
        &mut self,
        x: i32,
        y: i32,
        width: usize,
        height: usize,
        src: &[u8],
        src_stride: usize,
        mask: Option<Mask<'_>>,
        opacity: u8,
        op: CompositeOp,
    ) -> Result<()> {
        let ps = self.pixel_size();
        ensure!(
            height == 0 || src.len() >= (height - 1) * src_stride + width * ps,
            "source buffer too small for {}x{} rectangle with stride {}",
            width,
            height,
            src_stride
        );

        let colorspace = Arc::clone(&self.colorspace);
        self.for_each_band_mut(x, y, width, height, |manager, handle, piece| {
            let src_x = (piece.x - x) as usize * ps;
            let src_y = (piece.y - y) as usize;

            let mut pin = manager.pin_mut(handle)?;
            let data = pin.data_mut();
            let tile_stride = TILE_WIDTH * ps;
            let dst_start = piece.in_y * tile_stride + piece.in_x * ps;
            let src_start = src_y * src_stride + src_x;

            let piece_mask = mask.as_ref().map(|m| {
                let mask_x = (piece.x - x) as usize;
                Mask::new(&m.data[src_y * m.stride + mask_x..], m.stride)
            });

            colorspace.bit_blt(
                &mut data[dst_start..],
                tile_stride,
                &src[src_start..],
                src_stride,
                piece_mask,
                opacity,
                piece.height,
                piece.width,
                op,
            );
            Ok(())
        })
    }

    /// Captures the current contents. O(tiles), no pixel copies.
    pub fn snapshot(&self) -> Result<DeviceSnapshot> {
        let mut tiles = HashMap::with_capacity(self.tiles.len());
        for (&coord, &handle) in &self.tiles {
            tiles.insert(coord, self.manager.snapshot(handle)?);
        }
        Ok(DeviceSnapshot {
            manager: Arc::clone(&self.manager),
            tiles: Some(tiles),
        })
    }

    /// Replaces the device contents with a snapshot, consuming it.
    pub fn restore(&mut self, mut snapshot: DeviceSnapshot) -> Result<()> {
        ensure!(
            Arc::ptr_eq(&self.manager, &snapshot.manager),
            "snapshot belongs to a different tile manager"
        );
        let tiles = snapshot
            .tiles
            .take()
            .unwrap_or_else(|| unreachable!("snapshots hold tiles until dropped or consumed"));

        self.clear();
        self.tiles = tiles;
        Ok(())
    }

    /// Releases every tile, returning the device to the empty state.
    pub fn clear(&mut self) {
        for (_, handle) in self.tiles.drain() {
            let _ = self.manager.release(handle);
        }
    }

    /// Visits each (tile, sub-rectangle) piece of the given rectangle.
    fn for_each_band(
        &self,
        x: i32,
        y: i32,
        width: usize,
        height: usize,
        mut visit: impl FnMut(&Self, Piece) -> Result<()>,
    ) -> Result<()> {
        let right = x + width as i32;
        let bottom = y + height as i32;

        let mut py = y;
        while py < bottom {
            let (tile_row, in_y) = split(py, TILE_HEIGHT);
            let band_height = (TILE_HEIGHT - in_y).min((bottom - py) as usize);

            let mut px = x;
            while px < right {
                let (tile_col, in_x) = split(px, TILE_WIDTH);
                let band_width = (TILE_WIDTH - in_x).min((right - px) as usize);

                visit(
                    self,
                    Piece {
                        tile: (tile_col, tile_row),
                        x: px,
                        y: py,
                        in_x,
                        in_y,
                        width: band_width,
                        height: band_height,
                    },
                )?;

                px += band_width as i32;
            }
            py += band_height as i32;
        }
        Ok(())
    }

    /// Like [`for_each_band`](Self::for_each_band) but materializes each
    /// tile and runs it through the copy-on-write barrier before visiting.
    fn for_each_band_mut(
        &mut self,
        x: i32,
        y: i32,
        width: usize,
        height: usize,
        mut visit: impl FnMut(&TileManager, TileHandle, Piece) -> Result<()>,
    ) -> Result<()> {
        let ps = self.pixel_size();
        let right = x + width as i32;
        let bottom = y + height as i32;

        let mut py = y;
        while py < bottom {
            let (tile_row, in_y) = split(py, TILE_HEIGHT);
            let band_height = (TILE_HEIGHT - in_y).min((bottom - py) as usize);

            let mut px = x;
            while px < right {
                let (tile_col, in_x) = split(px, TILE_WIDTH);
                let band_width = (TILE_WIDTH - in_x).min((right - px) as usize);

                let handle = match self.tiles.get(&(tile_col, tile_row)) {
                    Some(&handle) => {
                        let writable = self.manager.prepare_for_write(handle)?;
                        if writable != handle {
                            self.tiles.insert((tile_col, tile_row), writable);
                        }
                        writable
                    }
                    None => {
                        let handle = self.manager.create_tile(ps)?;
                        self.tiles.insert((tile_col, tile_row), handle);
                        handle
                    }
                };

                visit(
                    &self.manager,
                    handle,
                    Piece {
                        tile: (tile_col, tile_row),
                        x: px,
                        y: py,
                        in_x,
                        in_y,
                        width: band_width,
                        height: band_height,
                    },
                )?;

                px += band_width as i32;
            }
            py += band_height as i32;
        }
        Ok(())
    }
}

impl Drop for TiledDevice {
    fn drop(&mut self) {
        self.clear();
    }
}

/// One tile-aligned fragment of a requested rectangle.
#[derive(Debug, Clone, Copy)]
struct Piece {
    tile: (i32, i32),
    /// Device coordinates of the fragment's top-left pixel.
    x: i32,
    y: i32,
    /// Offset of that pixel within the tile.
    in_x: usize,
    in_y: usize,
    width: usize,
    height: usize,
}
