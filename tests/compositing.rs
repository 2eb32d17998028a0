//! Compositing semantics across the built-in color spaces.

use rastile::colorspace::{ColorSpaceRegistry, Mask};
use rastile::{Color, CompositeOp};

#[test]
fn over_builds_up_paint_like_a_brush() {
    let registry = ColorSpaceRegistry::new();
    let cs = registry.get("RGBA").unwrap();

    // Repeatedly dab 25%-alpha red onto an empty canvas; coverage should
    // approach opaque monotonically without overshooting.
    let dab = [255u8, 0, 0, 64];
    let mut canvas = [0u8; 4];
    let mut last_alpha = 0u8;

    for _ in 0..20 {
        cs.bit_blt(&mut canvas, 4, &dab, 4, None, 255, 1, 1, CompositeOp::Over);
        assert!(canvas[3] >= last_alpha);
        last_alpha = canvas[3];
    }

    assert!(last_alpha > 240, "alpha only reached {}", last_alpha);
    assert_eq!(canvas[0], 255);
    assert_eq!(canvas[1], 0);
}

#[test]
fn over_with_mask_and_opacity_combines_both() {
    let registry = ColorSpaceRegistry::new();
    let cs = registry.get("RGBA").unwrap();

    let src = [255u8, 255, 255, 255, 255, 255, 255, 255];
    let mut dst = [0u8, 0, 0, 255, 0, 0, 0, 255];
    let mask_data = [255u8, 128];
    let mask = Mask::new(&mask_data, 2);

    cs.bit_blt(&mut dst, 8, &src, 8, Some(mask), 128, 1, 2, CompositeOp::Over);

    // First pixel: mask 255, opacity 128 -> about half coverage.
    assert!((dst[0] as i16 - 128).abs() <= 1, "got {}", dst[0]);
    // Second pixel: mask 128 and opacity 128 stack -> about a quarter.
    assert!((dst[4] as i16 - 64).abs() <= 2, "got {}", dst[4]);
}

#[test]
fn erase_is_consistent_across_spaces() {
    let registry = ColorSpaceRegistry::new();

    for id in ["RGBA", "GRAYA", "YCbCrAU8", "ALPHA"] {
        let cs = registry.get(id).unwrap();
        let ps = cs.pixel_size();

        // An opaque destination pixel.
        let mut dst = vec![0u8; ps];
        cs.from_color(Color::new(200, 150, 100), 255, &mut dst);

        // A fully transparent eraser pixel leaves it untouched.
        let src = vec![0u8; ps];
        let before = dst.clone();
        cs.bit_blt(&mut dst, ps, &src, ps, None, 255, 1, 1, CompositeOp::Erase);
        assert_eq!(dst, before, "space {}", id);
    }
}

#[test]
fn copy_and_clear_are_consistent_across_spaces() {
    let registry = ColorSpaceRegistry::new();

    for id in ["RGBA", "GRAYA", "YCbCrAU8", "ALPHA"] {
        let cs = registry.get(id).unwrap();
        let ps = cs.pixel_size();

        let mut src = vec![0u8; ps];
        cs.from_color(Color::new(10, 200, 30), 99, &mut src);

        let mut dst = vec![0xFFu8; ps];
        cs.bit_blt(&mut dst, ps, &src, ps, None, 0, 1, 1, CompositeOp::Copy);
        assert_eq!(dst, src, "space {}", id);

        cs.bit_blt(&mut dst, ps, &src, ps, None, 0, 1, 1, CompositeOp::Clear);
        assert!(dst.iter().all(|&b| b == 0), "space {}", id);
    }
}

#[test]
fn difference_is_symmetric_and_zero_on_self() {
    let registry = ColorSpaceRegistry::new();

    for id in ["RGBA", "GRAYA", "YCbCrAU8", "ALPHA"] {
        let cs = registry.get(id).unwrap();
        let ps = cs.pixel_size();

        let mut a = vec![0u8; ps];
        let mut b = vec![0u8; ps];
        cs.from_color(Color::new(12, 180, 99), 255, &mut a);
        cs.from_color(Color::new(200, 40, 99), 255, &mut b);

        assert_eq!(cs.difference(&a, &a), 0, "space {}", id);
        assert_eq!(cs.difference(&a, &b), cs.difference(&b, &a), "space {}", id);
    }
}

#[test]
fn gray_and_rgb_agree_on_luma() {
    let registry = ColorSpaceRegistry::new();
    let gray = registry.get("GRAYA").unwrap();

    // A pure gray color converts losslessly.
    let mut px = [0u8; 2];
    gray.from_color(Color::new(77, 77, 77), 255, &mut px);
    let (c, a) = gray.to_color(&px);
    assert_eq!((c.red, c.green, c.blue, a), (77, 77, 77, 255));
}

#[test]
fn arithmetic_operators_on_rgb() {
    let registry = ColorSpaceRegistry::new();
    let cs = registry.get("RGBA").unwrap();

    // DIFF highlights changed channels.
    let src = [100u8, 0, 0, 255];
    let mut dst = [100u8, 50, 0, 255];
    cs.bit_blt(&mut dst, 4, &src, 4, None, 255, 1, 1, CompositeOp::Diff);
    assert_eq!(&dst[..3], &[0, 50, 0]);

    // ADD wraps, PLUS saturates through the clamp.
    let src = [200u8, 0, 0, 255];
    let mut dst = [100u8, 0, 0, 255];
    cs.bit_blt(&mut dst, 4, &src, 4, None, 255, 1, 1, CompositeOp::Add);
    assert_eq!(dst[0], 45);

    let src = [200u8, 0, 0, 255];
    let mut dst = [100u8, 0, 0, 255];
    cs.bit_blt(&mut dst, 4, &src, 4, None, 255, 1, 1, CompositeOp::Plus);
    assert_eq!(dst[0], 255);
}

#[test]
fn channel_copies_leave_other_channels_alone() {
    let registry = ColorSpaceRegistry::new();
    let cs = registry.get("RGBA").unwrap();

    let src = [1u8, 2, 3, 4];
    let mut dst = [9u8, 9, 9, 9];

    cs.bit_blt(&mut dst, 4, &src, 4, None, 255, 1, 1, CompositeOp::CopyRed);
    assert_eq!(dst, [1, 9, 9, 9]);
    cs.bit_blt(&mut dst, 4, &src, 4, None, 255, 1, 1, CompositeOp::CopyOpacity);
    assert_eq!(dst, [1, 9, 9, 4]);
}

#[test]
fn mix_colors_matches_brush_antialiasing_use() {
    let registry = ColorSpaceRegistry::new();
    let cs = registry.get("RGBA").unwrap();

    // Four samples with equal weight, one transparent: the transparent one
    // contributes no color but pulls the result alpha down.
    let a = [255u8, 0, 0, 255];
    let b = [255u8, 0, 0, 255];
    let c = [255u8, 0, 0, 255];
    let d = [0u8, 255, 0, 0];
    let mut out = [0u8; 4];

    cs.mix_colors(&[&a, &b, &c, &d], &[64, 64, 64, 63], &mut out);
    assert!(out[3] < 255 && out[3] > 180, "alpha {}", out[3]);
    assert!(out[0] > 250, "red {}", out[0]);
    assert_eq!(out[1], 0);
}

#[test]
fn undef_is_a_no_op_everywhere() {
    let registry = ColorSpaceRegistry::new();

    for id in ["RGBA", "GRAYA", "YCbCrAU8", "ALPHA"] {
        let cs = registry.get(id).unwrap();
        let ps = cs.pixel_size();

        let src = vec![0x55u8; ps];
        let mut dst = vec![0xAAu8; ps];
        let before = dst.clone();
        cs.bit_blt(&mut dst, ps, &src, ps, None, 255, 1, 1, CompositeOp::Undef);
        assert_eq!(dst, before, "space {}", id);
    }
}
