//! # Generic RGB Compositing Table
//!
//! The Porter-Duff and GraphicsMagick-derived operators for the 4-byte RGBA
//! pixel layout. Arithmetic follows the reference formulas in double
//! precision with [`round_signed_to_quantum`] clamping each channel back
//! into `[0, 255]`.
//!
//! The formulas are written in terms of GraphicsMagick's *transparency*
//! convention (`trans = 255 - alpha`, 0 meaning opaque), mirroring the
//! reference implementation; straight alpha therefore appears as
//! `255 - s_trans` throughout.
//!
//! Except for OVER (which lives with the color space itself), none of these
//! operators uses the opacity parameter beyond a fully-transparent early
//! out, and none of them consults the mask.

use super::math::round_signed_to_quantum;
use super::rgb::{PIXEL_ALPHA, PIXEL_BLUE, PIXEL_GREEN, PIXEL_RED, RGBA_PIXEL_SIZE};
use super::OPACITY_TRANSPARENT;

/// Luma coefficients over 1024, approximating 0.299/0.587/0.114.
const INTENSITY_RED: f64 = 306.0;
const INTENSITY_GREEN: f64 = 601.0;
const INTENSITY_BLUE: f64 = 117.0;

#[inline]
fn pixel_intensity(p: &[u8]) -> f64 {
    (INTENSITY_RED * p[PIXEL_RED] as f64
        + INTENSITY_GREEN * p[PIXEL_GREEN] as f64
        + INTENSITY_BLUE * p[PIXEL_BLUE] as f64)
        / 1024.0
}

/// Applies `f(dst_pixel, src_pixel)` over the rectangle.
#[inline]
fn for_each_pixel<F>(
    dst: &mut [u8],
    dst_stride: usize,
    src: &[u8],
    src_stride: usize,
    rows: usize,
    cols: usize,
    mut f: F,
) where
    F: FnMut(&mut [u8], &[u8]),
{
    let row_bytes = cols * RGBA_PIXEL_SIZE;
    for r in 0..rows {
        let d = &mut dst[r * dst_stride..][..row_bytes];
        let s = &src[r * src_stride..][..row_bytes];
        for (dp, sp) in d
            .chunks_exact_mut(RGBA_PIXEL_SIZE)
            .zip(s.chunks_exact(RGBA_PIXEL_SIZE))
        {
            f(dp, sp);
        }
    }
}

pub fn composite_in(
    dst: &mut [u8],
    dst_stride: usize,
    src: &[u8],
    src_stride: usize,
    opacity: u8,
    rows: usize,
    cols: usize,
) {
    if opacity == OPACITY_TRANSPARENT {
        return;
    }

    for_each_pixel(dst, dst_stride, src, src_stride, rows, cols, |dp, sp| {
        if sp[PIXEL_ALPHA] == OPACITY_TRANSPARENT {
            dp.copy_from_slice(sp);
            return;
        }
        if dp[PIXEL_ALPHA] == OPACITY_TRANSPARENT {
            return;
        }

        let s_trans = 255.0 - sp[PIXEL_ALPHA] as f64;
        let d_trans = 255.0 - dp[PIXEL_ALPHA] as f64;
        let alpha = (255.0 - s_trans) * (255.0 - d_trans) / 255.0;

        for c in [PIXEL_RED, PIXEL_GREEN, PIXEL_BLUE] {
            dp[c] = round_signed_to_quantum(
                (255.0 - s_trans) * (255.0 - d_trans) * sp[c] as f64 / 255.0 / alpha,
            );
        }
        dp[PIXEL_ALPHA] =
            round_signed_to_quantum(dp[PIXEL_ALPHA] as f64 * (255.0 - alpha) / 255.0);
    });
}

pub fn composite_out(
    dst: &mut [u8],
    dst_stride: usize,
    src: &[u8],
    src_stride: usize,
    opacity: u8,
    rows: usize,
    cols: usize,
) {
    if opacity == OPACITY_TRANSPARENT {
        return;
    }

    for_each_pixel(dst, dst_stride, src, src_stride, rows, cols, |dp, sp| {
        if sp[PIXEL_ALPHA] == OPACITY_TRANSPARENT {
            dp.copy_from_slice(sp);
            return;
        }
        if dp[PIXEL_ALPHA] == 255 {
            dp[PIXEL_ALPHA] = OPACITY_TRANSPARENT;
            return;
        }

        let s_trans = 255.0 - sp[PIXEL_ALPHA] as f64;
        let d_trans = 255.0 - dp[PIXEL_ALPHA] as f64;
        let alpha = (255.0 - s_trans) * dp[PIXEL_ALPHA] as f64 / 255.0;

        for c in [PIXEL_RED, PIXEL_GREEN, PIXEL_BLUE] {
            dp[c] =
                round_signed_to_quantum((255.0 - s_trans) * d_trans * sp[c] as f64 / 255.0 / alpha);
        }
        dp[PIXEL_ALPHA] =
            round_signed_to_quantum(dp[PIXEL_ALPHA] as f64 * (255.0 - alpha) / 255.0);
    });
}

pub fn composite_atop(
    dst: &mut [u8],
    dst_stride: usize,
    src: &[u8],
    src_stride: usize,
    opacity: u8,
    rows: usize,
    cols: usize,
) {
    if opacity == OPACITY_TRANSPARENT {
        return;
    }

    for_each_pixel(dst, dst_stride, src, src_stride, rows, cols, |dp, sp| {
        let s_trans = 255.0 - sp[PIXEL_ALPHA] as f64;
        let d_trans = 255.0 - dp[PIXEL_ALPHA] as f64;

        let alpha = ((255.0 - s_trans) * (255.0 - d_trans) + s_trans * (255.0 - d_trans)) / 255.0;

        for c in [PIXEL_RED, PIXEL_GREEN, PIXEL_BLUE] {
            let v = ((255.0 - s_trans) * (255.0 - d_trans) * sp[c] as f64 / 255.0
                + s_trans * (255.0 - d_trans) * dp[c] as f64 / 255.0)
                / alpha;
            dp[c] = round_signed_to_quantum(v);
        }
        dp[PIXEL_ALPHA] = round_signed_to_quantum(255.0 - alpha.min(255.0));
    });
}

pub fn composite_xor(
    dst: &mut [u8],
    dst_stride: usize,
    src: &[u8],
    src_stride: usize,
    opacity: u8,
    rows: usize,
    cols: usize,
) {
    if opacity == OPACITY_TRANSPARENT {
        return;
    }

    for_each_pixel(dst, dst_stride, src, src_stride, rows, cols, |dp, sp| {
        let s_trans = 255.0 - sp[PIXEL_ALPHA] as f64;
        let d_trans = 255.0 - dp[PIXEL_ALPHA] as f64;

        let alpha = ((255.0 - s_trans) * d_trans + (255.0 - d_trans) * s_trans) / 255.0;

        for c in [PIXEL_RED, PIXEL_GREEN, PIXEL_BLUE] {
            let v = ((255.0 - s_trans) * d_trans * sp[c] as f64 / 255.0
                + (255.0 - d_trans) * s_trans * dp[c] as f64 / 255.0)
                / alpha;
            dp[c] = round_signed_to_quantum(v);
        }
        dp[PIXEL_ALPHA] = 255 - round_signed_to_quantum(alpha);
    });
}

pub fn composite_plus(
    dst: &mut [u8],
    dst_stride: usize,
    src: &[u8],
    src_stride: usize,
    opacity: u8,
    rows: usize,
    cols: usize,
) {
    if opacity == OPACITY_TRANSPARENT {
        return;
    }

    for_each_pixel(dst, dst_stride, src, src_stride, rows, cols, |dp, sp| {
        let s_trans = 255.0 - sp[PIXEL_ALPHA] as f64;
        let d_trans = 255.0 - dp[PIXEL_ALPHA] as f64;

        for c in [PIXEL_RED, PIXEL_GREEN, PIXEL_BLUE] {
            let v = ((255.0 - s_trans) * sp[c] as f64 + (255.0 - d_trans) * dp[c] as f64) / 255.0;
            dp[c] = round_signed_to_quantum(v);
        }
        let alpha = ((255.0 - s_trans) + (255.0 - d_trans)) / 255.0;
        dp[PIXEL_ALPHA] = 255 - round_signed_to_quantum(alpha);
    });
}

pub fn composite_minus(
    dst: &mut [u8],
    dst_stride: usize,
    src: &[u8],
    src_stride: usize,
    opacity: u8,
    rows: usize,
    cols: usize,
) {
    if opacity == OPACITY_TRANSPARENT {
        return;
    }

    for_each_pixel(dst, dst_stride, src, src_stride, rows, cols, |dp, sp| {
        let s_trans = 255.0 - sp[PIXEL_ALPHA] as f64;
        let d_trans = 255.0 - dp[PIXEL_ALPHA] as f64;

        for c in [PIXEL_RED, PIXEL_GREEN, PIXEL_BLUE] {
            let v = ((255.0 - d_trans) * dp[c] as f64 - (255.0 - s_trans) * sp[c] as f64) / 255.0;
            dp[c] = round_signed_to_quantum(v);
        }
        let alpha = ((255.0 - d_trans) - (255.0 - s_trans)) / 255.0;
        dp[PIXEL_ALPHA] = 255 - round_signed_to_quantum(alpha);
    });
}

/// ADD wraps around instead of clamping: a channel sum above 255 has 255
/// subtracted from it.
pub fn composite_add(
    dst: &mut [u8],
    dst_stride: usize,
    src: &[u8],
    src_stride: usize,
    opacity: u8,
    rows: usize,
    cols: usize,
) {
    if opacity == OPACITY_TRANSPARENT {
        return;
    }

    for_each_pixel(dst, dst_stride, src, src_stride, rows, cols, |dp, sp| {
        for c in [PIXEL_RED, PIXEL_GREEN, PIXEL_BLUE] {
            let v = sp[c] as f64 + dp[c] as f64;
            dp[c] = if v > 255.0 {
                (v - 255.0) as u8
            } else {
                (v + 0.5) as u8
            };
        }
        dp[PIXEL_ALPHA] = 255;
    });
}

/// SUBTRACT wraps around instead of clamping: a negative channel difference
/// has 255 added to it.
pub fn composite_subtract(
    dst: &mut [u8],
    dst_stride: usize,
    src: &[u8],
    src_stride: usize,
    opacity: u8,
    rows: usize,
    cols: usize,
) {
    if opacity == OPACITY_TRANSPARENT {
        return;
    }

    for_each_pixel(dst, dst_stride, src, src_stride, rows, cols, |dp, sp| {
        for c in [PIXEL_RED, PIXEL_GREEN, PIXEL_BLUE] {
            let v = sp[c] as f64 - dp[c] as f64;
            dp[c] = if v < 0.0 {
                (v + 255.0) as u8
            } else {
                (v + 0.5) as u8
            };
        }
        dp[PIXEL_ALPHA] = 255;
    });
}

pub fn composite_diff(
    dst: &mut [u8],
    dst_stride: usize,
    src: &[u8],
    src_stride: usize,
    opacity: u8,
    rows: usize,
    cols: usize,
) {
    if opacity == OPACITY_TRANSPARENT {
        return;
    }

    for_each_pixel(dst, dst_stride, src, src_stride, rows, cols, |dp, sp| {
        let s_trans = 255.0 - sp[PIXEL_ALPHA] as f64;
        let d_trans = 255.0 - dp[PIXEL_ALPHA] as f64;

        for c in [PIXEL_RED, PIXEL_GREEN, PIXEL_BLUE] {
            dp[c] = (sp[c] as f64 - dp[c] as f64).abs() as u8;
        }
        dp[PIXEL_ALPHA] = 255 - (s_trans - d_trans).abs() as u8;
    });
}

/// Multiplies destination channels (alpha included) by the source's luma
/// intensity, 306/601/117 over 1024.
pub fn composite_bumpmap(
    dst: &mut [u8],
    dst_stride: usize,
    src: &[u8],
    src_stride: usize,
    opacity: u8,
    rows: usize,
    cols: usize,
) {
    if opacity == OPACITY_TRANSPARENT {
        return;
    }

    for_each_pixel(dst, dst_stride, src, src_stride, rows, cols, |dp, sp| {
        if sp[PIXEL_ALPHA] == OPACITY_TRANSPARENT {
            return;
        }

        let intensity = pixel_intensity(sp);
        for c in [PIXEL_RED, PIXEL_GREEN, PIXEL_BLUE, PIXEL_ALPHA] {
            dp[c] = round_signed_to_quantum(intensity * dp[c] as f64 / 255.0);
        }
    });
}

pub fn composite_dissolve(
    dst: &mut [u8],
    dst_stride: usize,
    src: &[u8],
    src_stride: usize,
    opacity: u8,
    rows: usize,
    cols: usize,
) {
    if opacity == OPACITY_TRANSPARENT {
        return;
    }

    for_each_pixel(dst, dst_stride, src, src_stride, rows, cols, |dp, sp| {
        if sp[PIXEL_ALPHA] == OPACITY_TRANSPARENT {
            return;
        }

        let s_trans = 255.0 - sp[PIXEL_ALPHA] as f64;
        for c in [PIXEL_RED, PIXEL_GREEN, PIXEL_BLUE] {
            let v = (s_trans * sp[c] as f64 + (255.0 - s_trans) * dp[c] as f64) / 255.0;
            dp[c] = round_signed_to_quantum(v);
        }
        dp[PIXEL_ALPHA] = 255;
    });
}

/// Copies a single channel, leaving the others untouched.
pub fn composite_copy_channel(
    channel: usize,
    dst: &mut [u8],
    dst_stride: usize,
    src: &[u8],
    src_stride: usize,
    rows: usize,
    cols: usize,
) {
    for_each_pixel(dst, dst_stride, src, src_stride, rows, cols, |dp, sp| {
        dp[channel] = sp[channel];
    });
}

/// Row-wise copy; opacity and mask are ignored.
pub fn composite_copy(
    dst: &mut [u8],
    dst_stride: usize,
    src: &[u8],
    src_stride: usize,
    rows: usize,
    cols: usize,
    pixel_size: usize,
) {
    let row_bytes = cols * pixel_size;
    for r in 0..rows {
        dst[r * dst_stride..][..row_bytes].copy_from_slice(&src[r * src_stride..][..row_bytes]);
    }
}

/// Zeroes the destination rectangle.
pub fn composite_clear(dst: &mut [u8], dst_stride: usize, rows: usize, cols: usize, pixel_size: usize) {
    let row_bytes = cols * pixel_size;
    for r in 0..rows {
        dst[r * dst_stride..][..row_bytes].fill(0);
    }
}
