//! Tests for PNG encoding of rendered frames.
//!
//! Covers the choice between indexed and RGBA output and that files written
//! to disk decode back to the same pixels.

use image::{Rgba, RgbaImage};
use renderer::png::{create_png, create_png_indexed, encode_png, write_png};
use test_utils::temp_test_dir;

const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

/// Colour type byte of the IHDR chunk.
fn color_type(png: &[u8]) -> u8 {
    png[25]
}

/// A frame-like image: flat bands from a short palette.
fn banded_frame(width: u32, height: u32, bands: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, _| {
        let band = (x * bands / width) as u8;
        Rgba([band.wrapping_mul(7), 255 - band, band / 2, 255])
    })
}

/// Every pixel distinct enough to overflow a palette.
fn noisy_frame(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8, 255])
    })
}

#[test]
fn test_flat_frame_is_indexed() {
    let png = encode_png(&banded_frame(64, 32, 12)).unwrap();
    assert_eq!(&png[0..8], &PNG_SIGNATURE);
    assert_eq!(color_type(&png), 3);
}

#[test]
fn test_many_colours_fall_back_to_rgba() {
    let png = encode_png(&noisy_frame(300, 20)).unwrap();
    assert_eq!(color_type(&png), 6);
}

#[test]
fn test_indexed_roundtrip_preserves_pixels() {
    let frame = banded_frame(50, 10, 5);
    let png = encode_png(&frame).unwrap();
    let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
    assert_eq!(decoded, frame);
}

#[test]
fn test_transparency_survives_palette() {
    let mut frame = banded_frame(16, 16, 2);
    frame.put_pixel(3, 3, Rgba([0, 0, 0, 0]));
    let png = encode_png(&frame).unwrap();
    assert!(png.windows(4).any(|w| w == b"tRNS"));

    let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
    assert_eq!(decoded.get_pixel(3, 3)[3], 0);
}

#[test]
fn test_indexed_encoder_directly() {
    let palette = [[255, 0, 0, 255], [0, 0, 255, 255]];
    let indices = [0u8, 1, 1, 0];
    let png = create_png_indexed(2, 2, &palette, &indices).unwrap();
    let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
    assert_eq!(decoded.get_pixel(1, 0).0, [0, 0, 255, 255]);
}

#[test]
fn test_rgba_length_mismatch() {
    assert!(create_png(&[0u8; 10], 2, 2).is_err());
}

#[test]
fn test_large_frame_rgba_roundtrip() {
    let frame = noisy_frame(512, 300);
    let png = create_png(frame.as_raw(), 512, 300).unwrap();
    let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
    assert_eq!(decoded, frame);
}

#[test]
fn test_write_png_creates_directories() {
    let dir = temp_test_dir();
    let path = dir.path().join("a").join("b").join("frame0000.png");
    write_png(&path, &banded_frame(8, 8, 2)).unwrap();
    assert_eq!(image::open(&path).unwrap().width(), 8);
}
