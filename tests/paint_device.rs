//! Paint-device scenarios: strokes across tile boundaries, undo snapshots,
//! all on the real memory-mapped swap file.

use std::sync::Arc;

use rastile::colorspace::ColorSpaceRegistry;
use rastile::{CompositeOp, EngineConfig, TileManager, TiledDevice};

fn rgba_device(max_tiles: usize) -> TiledDevice {
    let manager = Arc::new(TileManager::new(EngineConfig::new(max_tiles, 100)).unwrap());
    let colorspace = ColorSpaceRegistry::new().get("RGBA").unwrap();
    TiledDevice::new(manager, colorspace)
}

#[test]
fn large_stroke_across_many_tiles_with_tiny_budget() {
    let mut device = rgba_device(2);

    // A 300x300 fill anchored off the tile grid at (-100, -100) touches
    // columns -2..=3 and rows -2..=3, a 6x6 block; with a 2-tile budget
    // most of it lives in swap the whole time.
    let pixels: Vec<u8> = (0..300 * 300 * 4).map(|i| (i % 249) as u8).collect();
    device.write_pixels(-100, -100, 300, 300, &pixels).unwrap();
    assert_eq!(device.tile_count(), 36);

    let mut out = vec![0u8; 300 * 300 * 4];
    device.read_pixels(-100, -100, 300, 300, &mut out).unwrap();
    assert_eq!(out, pixels);
}

#[test]
fn compositing_a_dab_across_a_tile_corner() {
    let mut device = rgba_device(100);

    // Opaque blue everywhere the dab will land.
    let blue = vec![0u8, 0, 255, 255].repeat(16 * 16);
    device.write_pixels(56, 56, 16, 16, &blue).unwrap();

    // A half-transparent red dab centered on the corner shared by four
    // tiles (64, 64).
    let dab = vec![255u8, 0, 0, 128].repeat(16 * 16);
    device
        .composite(56, 56, 16, 16, &dab, 16 * 4, None, 255, CompositeOp::Over)
        .unwrap();

    let mut out = vec![0u8; 16 * 16 * 4];
    device.read_pixels(56, 56, 16, 16, &mut out).unwrap();

    // Every pixel blended identically; tile boundaries must not show.
    let first = &out[..4];
    for px in out.chunks_exact(4) {
        assert_eq!(px, first);
    }
    assert!((first[0] as i16 - 128).abs() <= 1);
    assert_eq!(first[3], 255);
}

#[test]
fn undo_stack_built_from_snapshots() {
    let mut device = rgba_device(4);

    let mut undo = Vec::new();
    for step in 0..5u8 {
        undo.push(device.snapshot().unwrap());
        let px = [step, step, step, 255];
        device.write_pixels(step as i32 * 40, 0, 1, 1, &px).unwrap();
    }

    // Roll all the way back; each restore reinstates the older contents.
    for snapshot in undo.into_iter().rev() {
        device.restore(snapshot).unwrap();
    }
    let mut out = [0u8; 4];
    device.read_pixels(0, 0, 1, 1, &mut out).unwrap();
    assert_eq!(out, [0, 0, 0, 0]);
    assert_eq!(device.tile_count(), 0);
}

#[test]
fn dropping_a_snapshot_releases_its_tiles() {
    let mut device = rgba_device(100);
    device.write_pixels(0, 0, 1, 1, &[1, 2, 3, 255]).unwrap();

    let snapshot = device.snapshot().unwrap();
    drop(snapshot);

    // The device still owns its tile and keeps working.
    device.write_pixels(0, 0, 1, 1, &[4, 5, 6, 255]).unwrap();
    let mut out = [0u8; 4];
    device.read_pixels(0, 0, 1, 1, &mut out).unwrap();
    assert_eq!(out, [4, 5, 6, 255]);
}

#[test]
fn erase_strokes_on_a_device() {
    let mut device = rgba_device(100);

    let paint = vec![10u8, 20, 30, 255].repeat(8 * 8);
    device.write_pixels(0, 0, 8, 8, &paint).unwrap();

    // Eraser dab: alpha-only source, color irrelevant.
    let eraser = vec![0u8, 0, 0, 0].repeat(8 * 8);
    device
        .composite(0, 0, 8, 8, &eraser, 8 * 4, None, 255, CompositeOp::Erase)
        .unwrap();

    let mut out = vec![0u8; 8 * 8 * 4];
    device.read_pixels(0, 0, 8, 8, &mut out).unwrap();
    // A transparent eraser source leaves the opaque paint alone.
    assert_eq!(out, paint);
}

#[test]
fn two_devices_share_one_manager() {
    let manager = Arc::new(TileManager::new(EngineConfig::new(4, 100)).unwrap());
    let registry = ColorSpaceRegistry::new();

    let mut rgba = TiledDevice::new(Arc::clone(&manager), registry.get("RGBA").unwrap());
    let mut gray = TiledDevice::new(Arc::clone(&manager), registry.get("GRAYA").unwrap());

    let color: Vec<u8> = vec![1, 2, 3, 255].repeat(70 * 70);
    rgba.write_pixels(0, 0, 70, 70, &color).unwrap();

    let gray_px: Vec<u8> = vec![200, 255].repeat(70 * 70);
    gray.write_pixels(0, 0, 70, 70, &gray_px).unwrap();

    let stats = manager.stats();
    assert_eq!(stats.total, 8);
    assert!(stats.resident <= 4);

    let mut out = vec![0u8; 70 * 70 * 4];
    rgba.read_pixels(0, 0, 70, 70, &mut out).unwrap();
    assert_eq!(out, color);

    let mut out = vec![0u8; 70 * 70 * 2];
    gray.read_pixels(0, 0, 70, 70, &mut out).unwrap();
    assert_eq!(out, gray_px);
}
