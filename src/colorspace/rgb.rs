//! # 8-bit RGBA Color Space
//!
//! Four bytes per pixel, straight (non-premultiplied) alpha:
//!
//! ```text
//! +--------+--------+--------+--------+
//! | red  0 | green 1| blue  2| alpha 3|
//! +--------+--------+--------+--------+
//! ```
//!
//! This is the richest space in the registry: it dispatches the entire
//! generic operator table in addition to the integer fast-path OVER.

use super::composite;
use super::math::{uint8_blend, uint8_divide, uint8_mult};
use super::{
    ChannelInfo, ChannelKind, Color, ColorSpace, CompositeOp, Mask, OPACITY_OPAQUE,
    OPACITY_TRANSPARENT,
};

pub const PIXEL_RED: usize = 0;
pub const PIXEL_GREEN: usize = 1;
pub const PIXEL_BLUE: usize = 2;
pub const PIXEL_ALPHA: usize = 3;
pub const RGBA_PIXEL_SIZE: usize = 4;

const CHANNELS: [ChannelInfo; 4] = [
    ChannelInfo::new("Red", PIXEL_RED, 1, ChannelKind::Color),
    ChannelInfo::new("Green", PIXEL_GREEN, 1, ChannelKind::Color),
    ChannelInfo::new("Blue", PIXEL_BLUE, 1, ChannelKind::Color),
    ChannelInfo::new("Alpha", PIXEL_ALPHA, 1, ChannelKind::Alpha),
];

#[derive(Debug, Default)]
pub struct RgbU8ColorSpace;

impl RgbU8ColorSpace {
    pub fn new() -> Self {
        RgbU8ColorSpace
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

        let row_bytes = cols * RGBA_PIXEL_SIZE;
        for r in 0..rows {
            let d = &mut dst[r * dst_stride..][..row_bytes];
            let s = &src[r * src_stride..][..row_bytes];
            let mask_row = mask.as_ref().map(|m| m.row(r));

            for (col, (dp, sp)) in d
                .chunks_exact_mut(RGBA_PIXEL_SIZE)
                .zip(s.chunks_exact(RGBA_PIXEL_SIZE))
                .enumerate()
            {
                let mut src_alpha = sp[PIXEL_ALPHA];
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

                let dst_alpha = dp[PIXEL_ALPHA];
                let src_blend = if dst_alpha == OPACITY_OPAQUE {
                    src_alpha
                } else {
                    let new_alpha =
                        dst_alpha + uint8_mult(OPACITY_OPAQUE - dst_alpha, src_alpha);
                    dp[PIXEL_ALPHA] = new_alpha;
                    if new_alpha != 0 {
                        uint8_divide(src_alpha as u32, new_alpha) as u8
                    } else {
                        src_alpha
                    }
                };

                if src_blend == OPACITY_OPAQUE {
                    dp[..PIXEL_ALPHA].copy_from_slice(&sp[..PIXEL_ALPHA]);
                } else {
                    for c in [PIXEL_RED, PIXEL_GREEN, PIXEL_BLUE] {
                        dp[c] = uint8_blend(sp[c], dp[c], src_blend);
                    }
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
        let row_bytes = cols * RGBA_PIXEL_SIZE;
        for r in 0..rows {
            let d = &mut dst[r * dst_stride..][..row_bytes];
            let s = &src[r * src_stride..][..row_bytes];
            let mask_row = mask.as_ref().map(|m| m.row(r));

            for (col, (dp, sp)) in d
                .chunks_exact_mut(RGBA_PIXEL_SIZE)
                .zip(s.chunks_exact(RGBA_PIXEL_SIZE))
                .enumerate()
            {
                let mut src_alpha = sp[PIXEL_ALPHA];
                if let Some(m) = mask_row {
                    src_alpha = uint8_mult(src_alpha, m[col]);
                }
                // The eraser only lowers presence: an already more
                // transparent destination is left alone.
                if dp[PIXEL_ALPHA] < src_alpha {
                    dp[PIXEL_ALPHA] = src_alpha;
                }
            }
        }
    }
}

impl ColorSpace for RgbU8ColorSpace {
    fn id(&self) -> &'static str {
        "RGBA"
    }

    fn name(&self) -> &'static str {
        "RGB (8-bit integer/channel)"
    }

    fn channels(&self) -> &[ChannelInfo] {
        &CHANNELS
    }

    fn pixel_size(&self) -> usize {
        RGBA_PIXEL_SIZE
    }

    fn has_alpha(&self) -> bool {
        true
    }

    fn alpha_pos(&self) -> Option<usize> {
        Some(PIXEL_ALPHA)
    }

    fn from_color(&self, c: Color, opacity: u8, dst: &mut [u8]) {
        dst[PIXEL_RED] = c.red;
        dst[PIXEL_GREEN] = c.green;
        dst[PIXEL_BLUE] = c.blue;
        dst[PIXEL_ALPHA] = opacity;
    }

    fn to_color(&self, src: &[u8]) -> (Color, u8) {
        (
            Color {
                red: src[PIXEL_RED],
                green: src[PIXEL_GREEN],
                blue: src[PIXEL_BLUE],
            },
            src[PIXEL_ALPHA],
        )
    }

    fn difference(&self, a: &[u8], b: &[u8]) -> u8 {
        [PIXEL_RED, PIXEL_GREEN, PIXEL_BLUE]
            .into_iter()
            .map(|c| (a[c] as i16 - b[c] as i16).unsigned_abs() as u8)
            .max()
            .unwrap_or(0)
    }

    fn mix_colors(&self, pixels: &[&[u8]], weights: &[u8], dst: &mut [u8]) {
        let mut total_red: u32 = 0;
        let mut total_green: u32 = 0;
        let mut total_blue: u32 = 0;
        let mut new_alpha: u32 = 0;

        for (p, &w) in pixels.iter().zip(weights) {
            let alpha_times_weight = uint8_mult(p[PIXEL_ALPHA], w);

            total_red += uint8_mult(p[PIXEL_RED], alpha_times_weight) as u32;
            total_green += uint8_mult(p[PIXEL_GREEN], alpha_times_weight) as u32;
            total_blue += uint8_mult(p[PIXEL_BLUE], alpha_times_weight) as u32;
            new_alpha += alpha_times_weight as u32;
        }

        debug_assert!(new_alpha <= 255);
        dst[PIXEL_ALPHA] = new_alpha as u8;

        if new_alpha > 0 {
            total_red = uint8_divide(total_red, new_alpha as u8);
            total_green = uint8_divide(total_green, new_alpha as u8);
            total_blue = uint8_divide(total_blue, new_alpha as u8);
        }

        dst[PIXEL_RED] = total_red as u8;
        dst[PIXEL_GREEN] = total_green as u8;
        dst[PIXEL_BLUE] = total_blue as u8;
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
            CompositeOp::In => {
                composite::composite_in(dst, dst_stride, src, src_stride, opacity, rows, cols)
            }
            CompositeOp::Out => {
                composite::composite_out(dst, dst_stride, src, src_stride, opacity, rows, cols)
            }
            CompositeOp::Atop => {
                composite::composite_atop(dst, dst_stride, src, src_stride, opacity, rows, cols)
            }
            CompositeOp::Xor => {
                composite::composite_xor(dst, dst_stride, src, src_stride, opacity, rows, cols)
            }
            CompositeOp::Plus => {
                composite::composite_plus(dst, dst_stride, src, src_stride, opacity, rows, cols)
            }
            CompositeOp::Minus => {
                composite::composite_minus(dst, dst_stride, src, src_stride, opacity, rows, cols)
            }
            CompositeOp::Add => {
                composite::composite_add(dst, dst_stride, src, src_stride, opacity, rows, cols)
            }
            CompositeOp::Subtract => {
                composite::composite_subtract(dst, dst_stride, src, src_stride, opacity, rows, cols)
            }
            CompositeOp::Diff => {
                composite::composite_diff(dst, dst_stride, src, src_stride, opacity, rows, cols)
            }
            CompositeOp::Bumpmap => {
                composite::composite_bumpmap(dst, dst_stride, src, src_stride, opacity, rows, cols)
            }
            CompositeOp::Dissolve => {
                composite::composite_dissolve(dst, dst_stride, src, src_stride, opacity, rows, cols)
            }
            CompositeOp::Copy => composite::composite_copy(
                dst,
                dst_stride,
                src,
                src_stride,
                rows,
                cols,
                RGBA_PIXEL_SIZE,
            ),
            CompositeOp::CopyRed => composite::composite_copy_channel(
                PIXEL_RED, dst, dst_stride, src, src_stride, rows, cols,
            ),
            CompositeOp::CopyGreen => composite::composite_copy_channel(
                PIXEL_GREEN,
                dst,
                dst_stride,
                src,
                src_stride,
                rows,
                cols,
            ),
            CompositeOp::CopyBlue => composite::composite_copy_channel(
                PIXEL_BLUE, dst, dst_stride, src, src_stride, rows, cols,
            ),
            CompositeOp::CopyOpacity => composite::composite_copy_channel(
                PIXEL_ALPHA,
                dst,
                dst_stride,
                src,
                src_stride,
                rows,
                cols,
            ),
            CompositeOp::Clear => {
                composite::composite_clear(dst, dst_stride, rows, cols, RGBA_PIXEL_SIZE)
            }
            CompositeOp::Erase => {
                Self::composite_erase(dst, dst_stride, src, src_stride, mask, rows, cols)
            }
            CompositeOp::Undef => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn px(r: u8, g: u8, b: u8, a: u8) -> [u8; 4] {
        [r, g, b, a]
    }

    fn blt_one(space: &RgbU8ColorSpace, dst: &mut [u8; 4], src: &[u8; 4], opacity: u8, op: CompositeOp) {
        space.bit_blt(dst, 4, src, 4, None, opacity, 1, 1, op);
    }

    #[test]
    fn over_opaque_source_replaces_destination() {
        let cs = RgbU8ColorSpace::new();
        let src = px(10, 20, 30, 255);
        let mut dst = px(200, 200, 200, 255);
        blt_one(&cs, &mut dst, &src, OPACITY_OPAQUE, CompositeOp::Over);
        assert_eq!(dst, src);
    }

    #[test]
    fn over_transparent_source_is_noop() {
        let cs = RgbU8ColorSpace::new();
        let src = px(10, 20, 30, 0);
        let mut dst = px(200, 100, 50, 255);
        blt_one(&cs, &mut dst, &src, OPACITY_OPAQUE, CompositeOp::Over);
        assert_eq!(dst, px(200, 100, 50, 255));
    }

    #[test]
    fn over_half_alpha_on_opaque_blends_halfway() {
        let cs = RgbU8ColorSpace::new();
        let src = px(255, 0, 0, 128);
        let mut dst = px(0, 0, 255, 255);
        blt_one(&cs, &mut dst, &src, OPACITY_OPAQUE, CompositeOp::Over);
        assert_eq!(dst[PIXEL_ALPHA], 255);
        // About half of the red channel should arrive.
        assert!((dst[PIXEL_RED] as i16 - 128).abs() <= 1, "red {}", dst[PIXEL_RED]);
        assert!((dst[PIXEL_BLUE] as i16 - 127).abs() <= 1, "blue {}", dst[PIXEL_BLUE]);
    }

    #[test]
    fn over_onto_transparent_keeps_source_color() {
        let cs = RgbU8ColorSpace::new();
        let src = px(40, 80, 120, 128);
        let mut dst = px(0, 0, 0, 0);
        blt_one(&cs, &mut dst, &src, OPACITY_OPAQUE, CompositeOp::Over);
        assert_eq!(dst[PIXEL_ALPHA], 128);
        assert_eq!(&dst[..3], &[40, 80, 120]);
    }

    #[test]
    fn over_opacity_scales_coverage() {
        let cs = RgbU8ColorSpace::new();
        let src = px(255, 255, 255, 255);
        let mut dst = px(0, 0, 0, 255);
        blt_one(&cs, &mut dst, &src, 128, CompositeOp::Over);
        assert!((dst[PIXEL_RED] as i16 - 128).abs() <= 1);
    }

    #[test]
    fn over_respects_mask() {
        let cs = RgbU8ColorSpace::new();
        let src = [255u8, 255, 255, 255, 255, 255, 255, 255];
        let mut dst = [0u8, 0, 0, 255, 0, 0, 0, 255];
        let mask_data = [0u8, 255];
        let mask = Mask { data: &mask_data, stride: 2 };
        cs.bit_blt(&mut dst, 8, &src, 8, Some(mask), OPACITY_OPAQUE, 1, 2, CompositeOp::Over);
        assert_eq!(&dst[..4], &[0, 0, 0, 255]);
        assert_eq!(&dst[4..], &[255, 255, 255, 255]);
    }

    #[test]
    fn erase_only_lowers_presence() {
        let cs = RgbU8ColorSpace::new();

        // Transparent eraser pixel leaves an opaque destination alone.
        let src = px(0, 0, 0, 0);
        let mut dst = px(10, 20, 30, 255);
        blt_one(&cs, &mut dst, &src, OPACITY_OPAQUE, CompositeOp::Erase);
        assert_eq!(dst, px(10, 20, 30, 255));

        // A more opaque eraser alpha is written over a lower one.
        let src = px(0, 0, 0, 200);
        let mut dst = px(10, 20, 30, 100);
        blt_one(&cs, &mut dst, &src, OPACITY_OPAQUE, CompositeOp::Erase);
        assert_eq!(dst, px(10, 20, 30, 200));
    }

    #[test]
    fn difference_is_max_channel_delta() {
        let cs = RgbU8ColorSpace::new();
        let a = px(10, 250, 30, 255);
        let b = px(20, 200, 30, 0);
        assert_eq!(cs.difference(&a, &b), 50);
    }

    #[test]
    fn color_round_trip() {
        let cs = RgbU8ColorSpace::new();
        let mut buf = [0u8; 4];
        cs.from_color(Color { red: 1, green: 2, blue: 3 }, 77, &mut buf);
        let (c, a) = cs.to_color(&buf);
        assert_eq!((c.red, c.green, c.blue, a), (1, 2, 3, 77));
    }

    #[test]
    fn mix_colors_equal_weights() {
        let cs = RgbU8ColorSpace::new();
        let a = px(0, 0, 0, 255);
        let b = px(255, 255, 255, 255);
        let mut out = [0u8; 4];
        cs.mix_colors(&[&a, &b], &[128, 127], &mut out);
        assert_eq!(out[PIXEL_ALPHA], 255);
        assert!((out[PIXEL_RED] as i16 - 127).abs() <= 1, "red {}", out[PIXEL_RED]);
    }

    #[test]
    fn mix_colors_ignores_transparent_pixels_for_color() {
        let cs = RgbU8ColorSpace::new();
        let a = px(255, 0, 0, 255);
        let b = px(0, 255, 0, 0);
        let mut out = [0u8; 4];
        cs.mix_colors(&[&a, &b], &[128, 127], &mut out);
        // Transparent green pixel contributes no color.
        assert!(out[PIXEL_RED] > 200);
        assert_eq!(out[PIXEL_GREEN], 0);
    }
}
