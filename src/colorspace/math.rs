//! # 8-bit Fixed-Point Pixel Arithmetic
//!
//! Channel values and opacities live in `[0, 255]`. These helpers implement
//! the classic byte-precision approximations of multiply, divide and lerp
//! used by every integer compositing operator in the crate: a product is
//! divided by 255 with the `(t + 0x80; ((t >> 8) + t) >> 8)` trick, which is
//! exact for all byte inputs.

/// Fully transparent opacity / alpha value.
pub const OPACITY_TRANSPARENT: u8 = 0;

/// Fully opaque opacity / alpha value.
pub const OPACITY_OPAQUE: u8 = u8::MAX;

/// `a * b / 255`, rounded.
#[inline]
pub fn uint8_mult(a: u8, b: u8) -> u8 {
    let t = a as u32 * b as u32 + 0x80;
    (((t >> 8) + t) >> 8) as u8
}

/// `a * 255 / b`, rounded. `b` must be non-zero.
#[inline]
pub fn uint8_divide(a: u32, b: u8) -> u32 {
    (a * 255 + b as u32 / 2) / b as u32
}

/// Linear blend `a * alpha + b * (1 - alpha)`, refactored to
/// `(a - b) * alpha + b` so only one multiplication is needed. Signed
/// arithmetic because `a - b` may be negative.
#[inline]
pub fn uint8_blend(a: u8, b: u8, alpha: u8) -> u8 {
    let t = (a as i32 - b as i32) * alpha as i32 + 0x80;
    let t = ((t >> 8) + t) >> 8;
    (t + b as i32) as u8
}

/// Clamp a double-precision channel value into `[0, 255]` and round to the
/// nearest integer.
#[inline]
pub fn round_signed_to_quantum(value: f64) -> u8 {
    if value < 0.0 {
        0
    } else if value > 255.0 {
        255
    } else {
        (value + 0.5) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mult_endpoints_are_exact() {
        assert_eq!(uint8_mult(255, 255), 255);
        assert_eq!(uint8_mult(255, 0), 0);
        assert_eq!(uint8_mult(0, 128), 0);
        assert_eq!(uint8_mult(255, 128), 128);
    }

    #[test]
    fn mult_rounds_to_nearest() {
        // 127 * 128 / 255 = 63.74...
        assert_eq!(uint8_mult(127, 128), 64);
    }

    #[test]
    fn divide_inverts_mult() {
        // Each direction rounds independently, so the round trip can be
        // off by one quantum per step: mult(100, 50) = 20 but
        // divide(20, 50) = 102.
        for a in [10u8, 100, 200] {
            for b in [50u8, 128, 255] {
                let prod = uint8_mult(a, b);
                let back = uint8_divide(prod as u32, b);
                assert!((back as i32 - a as i32).abs() <= 2, "a={a} b={b}");
            }
        }
    }

    #[test]
    fn blend_endpoints() {
        assert_eq!(uint8_blend(200, 10, 255), 200);
        assert_eq!(uint8_blend(200, 10, 0), 10);
    }

    #[test]
    fn blend_midpoint() {
        let mid = uint8_blend(200, 100, 128);
        assert!((mid as i32 - 150).abs() <= 1);
    }

    #[test]
    fn round_clamps_and_rounds() {
        assert_eq!(round_signed_to_quantum(-4.0), 0);
        assert_eq!(round_signed_to_quantum(300.0), 255);
        assert_eq!(round_signed_to_quantum(127.6), 128);
        assert_eq!(round_signed_to_quantum(f64::INFINITY), 255);
        assert_eq!(round_signed_to_quantum(f64::NAN), 0);
    }
}
