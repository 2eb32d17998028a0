//! # Alpha Mask Color Space
//!
//! A single byte per pixel holding coverage. Selections and mask layers
//! use this space; the "color" of a mask pixel is a constant white, only
//! its alpha varies.

use super::composite;
use super::math::uint8_mult;
use super::{
    ChannelInfo, ChannelKind, Color, ColorSpace, CompositeOp, Mask, OPACITY_OPAQUE,
    OPACITY_TRANSPARENT,
};

pub const ALPHA_PIXEL_SIZE: usize = 1;

const CHANNELS: [ChannelInfo; 1] = [ChannelInfo::new("Alpha", 0, 1, ChannelKind::Alpha)];

#[derive(Debug, Default)]
pub struct AlphaU8ColorSpace;

impl AlphaU8ColorSpace {
    pub fn new() -> Self {
        AlphaU8ColorSpace
    }

    fn composite_over(
        dst: &mut [u8],
        dst_stride: usize,
        src: &[u8],
        src_stride: usize,
        mask: Option<Mask<'_>>,
        opacity: u8,
        rows: usize,
        cols: usize,
    ) {
        if opacity == OPACITY_TRANSPARENT {
            return;
        }

        for r in 0..rows {
            let d = &mut dst[r * dst_stride..][..cols];
            let s = &src[r * src_stride..][..cols];
            let mask_row = mask.as_ref().map(|m| m.row(r));

            for (col, (dp, &sp)) in d.iter_mut().zip(s).enumerate() {
                let mut src_alpha = sp;
                if let Some(m) = mask_row {
                    src_alpha = uint8_mult(src_alpha, m[col]);
                }
                if src_alpha == OPACITY_TRANSPARENT {
                    continue;
                }
                if opacity != OPACITY_OPAQUE {
                    src_alpha = uint8_mult(src_alpha, opacity);
                }
                *dp += uint8_mult(OPACITY_OPAQUE - *dp, src_alpha);
            }
        }
    }

    fn composite_erase(
        dst: &mut [u8],
        dst_stride: usize,
        src: &[u8],
        src_stride: usize,
        mask: Option<Mask<'_>>,
        rows: usize,
        cols: usize,
    ) {
        for r in 0..rows {
            let d = &mut dst[r * dst_stride..][..cols];
            let s = &src[r * src_stride..][..cols];
            let mask_row = mask.as_ref().map(|m| m.row(r));

            for (col, (dp, &sp)) in d.iter_mut().zip(s).enumerate() {
                let mut src_alpha = sp;
                if let Some(m) = mask_row {
                    src_alpha = uint8_mult(src_alpha, m[col]);
                }
                if *dp < src_alpha {
                    *dp = src_alpha;
                }
            }
        }
    }
}

impl ColorSpace for AlphaU8ColorSpace {
    fn id(&self) -> &'static str {
        "ALPHA"
    }

    fn name(&self) -> &'static str {
        "Alpha mask"
    }

    fn channels(&self) -> &[ChannelInfo] {
        &CHANNELS
    }

    fn pixel_size(&self) -> usize {
        ALPHA_PIXEL_SIZE
    }

    fn has_alpha(&self) -> bool {
        true
    }

    fn alpha_pos(&self) -> Option<usize> {
        Some(0)
    }

    fn from_color(&self, _c: Color, opacity: u8, dst: &mut [u8]) {
        dst[0] = opacity;
    }

    fn to_color(&self, src: &[u8]) -> (Color, u8) {
        // Mask pixels render as white at the stored coverage.
        (Color { red: 255, green: 255, blue: 255 }, src[0])
    }

    fn difference(&self, a: &[u8], b: &[u8]) -> u8 {
        (a[0] as i16 - b[0] as i16).unsigned_abs() as u8
    }

    fn mix_colors(&self, pixels: &[&[u8]], weights: &[u8], dst: &mut [u8]) {
        let mut new_alpha: u32 = 0;
        for (p, &w) in pixels.iter().zip(weights) {
            new_alpha += uint8_mult(p[0], w) as u32;
        }
        debug_assert!(new_alpha <= 255);
        dst[0] = new_alpha as u8;
    }

    fn bit_blt(
        &self,
        dst: &mut [u8],
        dst_stride: usize,
        src: &[u8],
        src_stride: usize,
        mask: Option<Mask<'_>>,
        opacity: u8,
        rows: usize,
        cols: usize,
        op: CompositeOp,
    ) {
        match op {
            CompositeOp::Over => {
                Self::composite_over(dst, dst_stride, src, src_stride, mask, opacity, rows, cols)
            }
            CompositeOp::Erase => {
                Self::composite_erase(dst, dst_stride, src, src_stride, mask, rows, cols)
            }
            CompositeOp::Copy => composite::composite_copy(
                dst,
                dst_stride,
                src,
                src_stride,
                rows,
                cols,
                ALPHA_PIXEL_SIZE,
            ),
            CompositeOp::Clear => {
                composite::composite_clear(dst, dst_stride, rows, cols, ALPHA_PIXEL_SIZE)
            }
            _ => {}
        }
    }
}
