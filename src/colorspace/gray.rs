//! # 8-bit Grayscale Color Space
//!
//! Two bytes per pixel: gray value then alpha. Only the painting operators
//! (OVER, ERASE, COPY, CLEAR) are implemented; the generic table assumes
//! four channels and does not apply here.

use super::composite;
use super::math::{uint8_blend, uint8_divide, uint8_mult};
use super::{
    ChannelInfo, ChannelKind, Color, ColorSpace, CompositeOp, Mask, OPACITY_OPAQUE,
    OPACITY_TRANSPARENT,
};

pub const PIXEL_GRAY: usize = 0;
pub const PIXEL_GRAY_ALPHA: usize = 1;
pub const GRAYA_PIXEL_SIZE: usize = 2;

const CHANNELS: [ChannelInfo; 2] = [
    ChannelInfo::new("Gray", PIXEL_GRAY, 1, ChannelKind::Color),
    ChannelInfo::new("Alpha", PIXEL_GRAY_ALPHA, 1, ChannelKind::Alpha),
];

#[derive(Debug, Default)]
pub struct GrayU8ColorSpace;

impl GrayU8ColorSpace {
    pub fn new() -> Self {
        GrayU8ColorSpace
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

        let row_bytes = cols * GRAYA_PIXEL_SIZE;
        for r in 0..rows {
            let d = &mut dst[r * dst_stride..][..row_bytes];
            let s = &src[r * src_stride..][..row_bytes];
            let mask_row = mask.as_ref().map(|m| m.row(r));

            for (col, (dp, sp)) in d
                .chunks_exact_mut(GRAYA_PIXEL_SIZE)
                .zip(s.chunks_exact(GRAYA_PIXEL_SIZE))
                .enumerate()
            {
                let mut src_alpha = sp[PIXEL_GRAY_ALPHA];
                if let Some(m) = mask_row {
                    src_alpha = uint8_mult(src_alpha, m[col]);
                }
                if src_alpha == OPACITY_TRANSPARENT {
                    continue;
                }
                if opacity != OPACITY_OPAQUE {
                    src_alpha = uint8_mult(src_alpha, opacity);
                }

                if src_alpha == OPACITY_OPAQUE {
                    dp.copy_from_slice(sp);
                    continue;
                }

                let dst_alpha = dp[PIXEL_GRAY_ALPHA];
                let src_blend = if dst_alpha == OPACITY_OPAQUE {
                    src_alpha
                } else {
                    let new_alpha =
                        dst_alpha + uint8_mult(OPACITY_OPAQUE - dst_alpha, src_alpha);
                    dp[PIXEL_GRAY_ALPHA] = new_alpha;
                    if new_alpha != 0 {
                        uint8_divide(src_alpha as u32, new_alpha) as u8
                    } else {
                        src_alpha
                    }
                };

                if src_blend == OPACITY_OPAQUE {
                    dp[PIXEL_GRAY] = sp[PIXEL_GRAY];
                } else {
                    dp[PIXEL_GRAY] = uint8_blend(sp[PIXEL_GRAY], dp[PIXEL_GRAY], src_blend);
                }
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
        let row_bytes = cols * GRAYA_PIXEL_SIZE;
        for r in 0..rows {
            let d = &mut dst[r * dst_stride..][..row_bytes];
            let s = &src[r * src_stride..][..row_bytes];
            let mask_row = mask.as_ref().map(|m| m.row(r));

            for (col, (dp, sp)) in d
                .chunks_exact_mut(GRAYA_PIXEL_SIZE)
                .zip(s.chunks_exact(GRAYA_PIXEL_SIZE))
                .enumerate()
            {
                let mut src_alpha = sp[PIXEL_GRAY_ALPHA];
                if let Some(m) = mask_row {
                    src_alpha = uint8_mult(src_alpha, m[col]);
                }
                if dp[PIXEL_GRAY_ALPHA] < src_alpha {
                    dp[PIXEL_GRAY_ALPHA] = src_alpha;
                }
            }
        }
    }
}

impl ColorSpace for GrayU8ColorSpace {
    fn id(&self) -> &'static str {
        "GRAYA"
    }

    fn name(&self) -> &'static str {
        "Grayscale (8-bit integer/channel)"
    }

    fn channels(&self) -> &[ChannelInfo] {
        &CHANNELS
    }

    fn pixel_size(&self) -> usize {
        GRAYA_PIXEL_SIZE
    }

    fn has_alpha(&self) -> bool {
        true
    }

    fn alpha_pos(&self) -> Option<usize> {
        Some(PIXEL_GRAY_ALPHA)
    }

    fn from_color(&self, c: Color, opacity: u8, dst: &mut [u8]) {
        // Integer luma, 306/601/117 over 1024.
        let gray = (c.red as u32 * 306 + c.green as u32 * 601 + c.blue as u32 * 117) >> 10;
        dst[PIXEL_GRAY] = gray as u8;
        dst[PIXEL_GRAY_ALPHA] = opacity;
    }

    fn to_color(&self, src: &[u8]) -> (Color, u8) {
        let g = src[PIXEL_GRAY];
        (
            Color { red: g, green: g, blue: g },
            src[PIXEL_GRAY_ALPHA],
        )
    }

    fn difference(&self, a: &[u8], b: &[u8]) -> u8 {
        (a[PIXEL_GRAY] as i16 - b[PIXEL_GRAY] as i16).unsigned_abs() as u8
    }

    fn mix_colors(&self, pixels: &[&[u8]], weights: &[u8], dst: &mut [u8]) {
        let mut total_gray: u32 = 0;
        let mut new_alpha: u32 = 0;

        for (p, &w) in pixels.iter().zip(weights) {
            let alpha_times_weight = uint8_mult(p[PIXEL_GRAY_ALPHA], w) as u32;
            total_gray += p[PIXEL_GRAY] as u32 * alpha_times_weight;
            new_alpha += alpha_times_weight;
        }

        debug_assert!(new_alpha <= 255);
        dst[PIXEL_GRAY_ALPHA] = new_alpha as u8;

        if new_alpha > 0 {
            total_gray = uint8_divide(total_gray, new_alpha as u8);
        }

        // Fixed-point divide by 255 with rounding.
        let total_gray = total_gray + 0x80;
        dst[PIXEL_GRAY] = (((total_gray >> 8) + total_gray) >> 8) as u8;
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
                GRAYA_PIXEL_SIZE,
            ),
            CompositeOp::Clear => {
                composite::composite_clear(dst, dst_stride, rows, cols, GRAYA_PIXEL_SIZE)
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_color_uses_integer_luma() {
        let cs = GrayU8ColorSpace::new();
        let mut buf = [0u8; 2];
        cs.from_color(Color { red: 255, green: 255, blue: 255 }, 200, &mut buf);
        assert_eq!(buf, [255, 200]);

        cs.from_color(Color { red: 255, green: 0, blue: 0 }, 255, &mut buf);
        // 255 * 306 / 1024 = 76
        assert_eq!(buf[PIXEL_GRAY], 76);
    }

    #[test]
    fn over_blends_gray_values() {
        let cs = GrayU8ColorSpace::new();
        let src = [255u8, 128];
        let mut dst = [0u8, 255];
        cs.bit_blt(&mut dst, 2, &src, 2, None, OPACITY_OPAQUE, 1, 1, CompositeOp::Over);
        assert_eq!(dst[PIXEL_GRAY_ALPHA], 255);
        assert!((dst[PIXEL_GRAY] as i16 - 128).abs() <= 1, "gray {}", dst[PIXEL_GRAY]);
    }

    #[test]
    fn erase_keeps_more_transparent_destination() {
        let cs = GrayU8ColorSpace::new();
        let src = [0u8, 0];
        let mut dst = [99u8, 255];
        cs.bit_blt(&mut dst, 2, &src, 2, None, OPACITY_OPAQUE, 1, 1, CompositeOp::Erase);
        assert_eq!(dst, [99, 255]);
    }

    #[test]
    fn copy_and_clear() {
        let cs = GrayU8ColorSpace::new();
        let src = [7u8, 8];
        let mut dst = [1u8, 2];
        cs.bit_blt(&mut dst, 2, &src, 2, None, 0, 1, 1, CompositeOp::Copy);
        assert_eq!(dst, [7, 8]);
        cs.bit_blt(&mut dst, 2, &src, 2, None, 0, 1, 1, CompositeOp::Clear);
        assert_eq!(dst, [0, 0]);
    }

    #[test]
    fn mix_colors_weights_by_alpha() {
        let cs = GrayU8ColorSpace::new();
        let a = [200u8, 255];
        let b = [0u8, 0];
        let mut out = [0u8; 2];
        cs.mix_colors(&[&a, &b], &[128, 127], &mut out);
        assert_eq!(out[PIXEL_GRAY], 200);
    }
}
