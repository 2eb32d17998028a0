//! # 8-bit YCbCr Color Space
//!
//! Four bytes per pixel: luma, blue-difference chroma, red-difference
//! chroma, alpha. RGB conversion uses the full-range BT.601 matrix with
//! chroma centered on 128.
//!
//! Only OVER, ERASE, COPY and CLEAR are supported; the painting engine
//! treats this space as a storage format more than a blending target.

use super::composite;
use super::math::{uint8_blend, uint8_divide, uint8_mult};
use super::{
    ChannelInfo, ChannelKind, Color, ColorSpace, CompositeOp, Mask, OPACITY_OPAQUE,
    OPACITY_TRANSPARENT,
};

pub const PIXEL_Y: usize = 0;
pub const PIXEL_CB: usize = 1;
pub const PIXEL_CR: usize = 2;
pub const PIXEL_ALPHA: usize = 3;
pub const YCBCRA_PIXEL_SIZE: usize = 4;

const CHANNELS: [ChannelInfo; 4] = [
    ChannelInfo::new("Y", PIXEL_Y, 1, ChannelKind::Color),
    ChannelInfo::new("Cb", PIXEL_CB, 1, ChannelKind::Color),
    ChannelInfo::new("Cr", PIXEL_CR, 1, ChannelKind::Color),
    ChannelInfo::new("Alpha", PIXEL_ALPHA, 1, ChannelKind::Alpha),
];

fn clamp_u8(v: f64) -> u8 {
    if v < 0.0 {
        0
    } else if v > 255.0 {
        255
    } else {
        (v + 0.5) as u8
    }
}

fn compute_y(r: u8, g: u8, b: u8) -> u8 {
    clamp_u8(0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64)
}

fn compute_cb(r: u8, g: u8, b: u8) -> u8 {
    clamp_u8(128.0 - 0.168_736 * r as f64 - 0.331_264 * g as f64 + 0.5 * b as f64)
}

fn compute_cr(r: u8, g: u8, b: u8) -> u8 {
    clamp_u8(128.0 + 0.5 * r as f64 - 0.418_688 * g as f64 - 0.081_312 * b as f64)
}

fn compute_red(y: u8, _cb: u8, cr: u8) -> u8 {
    clamp_u8(y as f64 + 1.402 * (cr as f64 - 128.0))
}

fn compute_green(y: u8, cb: u8, cr: u8) -> u8 {
    clamp_u8(y as f64 - 0.344_136 * (cb as f64 - 128.0) - 0.714_136 * (cr as f64 - 128.0))
}

fn compute_blue(y: u8, cb: u8, _cr: u8) -> u8 {
    clamp_u8(y as f64 + 1.772 * (cb as f64 - 128.0))
}

#[derive(Debug, Default)]
pub struct YCbCrU8ColorSpace;

impl YCbCrU8ColorSpace {
    pub fn new() -> Self {
        YCbCrU8ColorSpace
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

        let row_bytes = cols * YCBCRA_PIXEL_SIZE;
        for r in 0..rows {
            let d = &mut dst[r * dst_stride..][..row_bytes];
            let s = &src[r * src_stride..][..row_bytes];
            let mask_row = mask.as_ref().map(|m| m.row(r));

            for (col, (dp, sp)) in d
                .chunks_exact_mut(YCBCRA_PIXEL_SIZE)
                .zip(s.chunks_exact(YCBCRA_PIXEL_SIZE))
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
                    for c in [PIXEL_Y, PIXEL_CB, PIXEL_CR] {
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
        let row_bytes = cols * YCBCRA_PIXEL_SIZE;
        for r in 0..rows {
            let d = &mut dst[r * dst_stride..][..row_bytes];
            let s = &src[r * src_stride..][..row_bytes];
            let mask_row = mask.as_ref().map(|m| m.row(r));

            for (col, (dp, sp)) in d
                .chunks_exact_mut(YCBCRA_PIXEL_SIZE)
                .zip(s.chunks_exact(YCBCRA_PIXEL_SIZE))
                .enumerate()
            {
                let mut src_alpha = sp[PIXEL_ALPHA];
                if let Some(m) = mask_row {
                    src_alpha = uint8_mult(src_alpha, m[col]);
                }
                if dp[PIXEL_ALPHA] < src_alpha {
                    dp[PIXEL_ALPHA] = src_alpha;
                }
            }
        }
    }
}

impl ColorSpace for YCbCrU8ColorSpace {
    fn id(&self) -> &'static str {
        "YCbCrAU8"
    }

    fn name(&self) -> &'static str {
        "YCbCr (8-bit integer/channel)"
    }

    fn channels(&self) -> &[ChannelInfo] {
        &CHANNELS
    }

    fn pixel_size(&self) -> usize {
        YCBCRA_PIXEL_SIZE
    }

    fn has_alpha(&self) -> bool {
        true
    }

    fn alpha_pos(&self) -> Option<usize> {
        Some(PIXEL_ALPHA)
    }

    fn from_color(&self, c: Color, opacity: u8, dst: &mut [u8]) {
        dst[PIXEL_Y] = compute_y(c.red, c.green, c.blue);
        dst[PIXEL_CB] = compute_cb(c.red, c.green, c.blue);
        dst[PIXEL_CR] = compute_cr(c.red, c.green, c.blue);
        dst[PIXEL_ALPHA] = opacity;
    }

    fn to_color(&self, src: &[u8]) -> (Color, u8) {
        let (y, cb, cr) = (src[PIXEL_Y], src[PIXEL_CB], src[PIXEL_CR]);
        (
            Color {
                red: compute_red(y, cb, cr),
                green: compute_green(y, cb, cr),
                blue: compute_blue(y, cb, cr),
            },
            src[PIXEL_ALPHA],
        )
    }

    fn difference(&self, a: &[u8], b: &[u8]) -> u8 {
        [PIXEL_Y, PIXEL_CB, PIXEL_CR]
            .into_iter()
            .map(|c| (a[c] as i16 - b[c] as i16).unsigned_abs() as u8)
            .max()
            .unwrap_or(0)
    }

    fn mix_colors(&self, pixels: &[&[u8]], weights: &[u8], dst: &mut [u8]) {
        let mut total_y: u32 = 0;
        let mut total_cb: u32 = 0;
        let mut total_cr: u32 = 0;
        let mut new_alpha: u32 = 0;

        for (p, &w) in pixels.iter().zip(weights) {
            let alpha_times_weight = uint8_mult(p[PIXEL_ALPHA], w);

            total_y += uint8_mult(p[PIXEL_Y], alpha_times_weight) as u32;
            total_cb += uint8_mult(p[PIXEL_CB], alpha_times_weight) as u32;
            total_cr += uint8_mult(p[PIXEL_CR], alpha_times_weight) as u32;
            new_alpha += alpha_times_weight as u32;
        }

        debug_assert!(new_alpha <= 255);
        dst[PIXEL_ALPHA] = new_alpha as u8;

        if new_alpha > 0 {
            total_y = uint8_divide(total_y, new_alpha as u8);
            total_cb = uint8_divide(total_cb, new_alpha as u8);
            total_cr = uint8_divide(total_cr, new_alpha as u8);
        }

        dst[PIXEL_Y] = total_y as u8;
        dst[PIXEL_CB] = total_cb as u8;
        dst[PIXEL_CR] = total_cr as u8;
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
                YCBCRA_PIXEL_SIZE,
            ),
            CompositeOp::Clear => {
                composite::composite_clear(dst, dst_stride, rows, cols, YCBCRA_PIXEL_SIZE)
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primaries_convert_to_expected_luma() {
        let cs = YCbCrU8ColorSpace::new();
        let mut buf = [0u8; 4];

        cs.from_color(Color { red: 255, green: 255, blue: 255 }, 255, &mut buf);
        assert_eq!(&buf, &[255, 128, 128, 255]);

        cs.from_color(Color { red: 0, green: 0, blue: 0 }, 255, &mut buf);
        assert_eq!(&buf, &[0, 128, 128, 255]);

        cs.from_color(Color { red: 255, green: 0, blue: 0 }, 255, &mut buf);
        assert_eq!(buf[PIXEL_Y], 76);
        assert_eq!(buf[PIXEL_CR], 255);
    }

    #[test]
    fn round_trip_is_close() {
        let cs = YCbCrU8ColorSpace::new();
        let mut buf = [0u8; 4];
        let orig = Color { red: 180, green: 90, blue: 40 };
        cs.from_color(orig, 200, &mut buf);
        let (c, a) = cs.to_color(&buf);
        assert_eq!(a, 200);
        assert!((c.red as i16 - orig.red as i16).abs() <= 2);
        assert!((c.green as i16 - orig.green as i16).abs() <= 2);
        assert!((c.blue as i16 - orig.blue as i16).abs() <= 2);
    }

    #[test]
    fn over_opaque_source_replaces_pixel() {
        let cs = YCbCrU8ColorSpace::new();
        let src = [76u8, 85, 255, 255];
        let mut dst = [255u8, 128, 128, 255];
        cs.bit_blt(&mut dst, 4, &src, 4, None, OPACITY_OPAQUE, 1, 1, CompositeOp::Over);
        assert_eq!(dst, src);
    }

    #[test]
    fn difference_is_max_component_delta() {
        let cs = YCbCrU8ColorSpace::new();
        let a = [100u8, 128, 140, 255];
        let b = [90u8, 100, 141, 0];
        assert_eq!(cs.difference(&a, &b), 28);
    }
}
