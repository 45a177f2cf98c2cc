//! Fonts and boxed text labels.

use std::path::{Path, PathBuf};

use grid_common::Color;
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use rusttype::{Font, Scale};
use tracing::debug;

use crate::error::{RenderError, RenderResult};

/// Edge colour of label boxes.
pub const BOX_EDGE: Color = Color::rgb(0x2a, 0x2a, 0x2a);

/// Font used when none is configured.
const EMBEDDED_FONT: &[u8] = include_bytes!("../assets/DejaVuSansMono.ttf");

/// Load the configured font, or the embedded DejaVu Sans Mono.
pub fn load_font(configured: Option<&Path>) -> RenderResult<Font<'static>> {
    let Some(path) = configured else {
        return Font::try_from_bytes(EMBEDDED_FONT).ok_or_else(|| RenderError::Font {
            path: PathBuf::from("<embedded>"),
            message: "embedded font is not valid TrueType".to_string(),
        });
    };

    let bytes = std::fs::read(path).map_err(|e| RenderError::Font {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let font = Font::try_from_vec(bytes).ok_or_else(|| RenderError::Font {
        path: path.to_path_buf(),
        message: "not a usable TrueType font".to_string(),
    })?;
    debug!(path = %path.display(), "Loaded font");
    Ok(font)
}

/// Convert a size in points to pixels at `dpi`.
pub fn points_to_pixels(points: f32, dpi: u32) -> f32 {
    points * dpi as f32 / 72.0
}

/// Horizontal placement of a label relative to its anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

/// Style of one boxed label.
#[derive(Debug, Clone, Copy)]
pub struct LabelStyle {
    pub size_px: f32,
    pub text_color: Color,
    pub box_color: Color,
    pub align: Align,
}

/// Drawing surface for text in one font.
pub struct TextPainter<'a> {
    font: &'a Font<'static>,
}

impl<'a> TextPainter<'a> {
    pub fn new(font: &'a Font<'static>) -> Self {
        Self { font }
    }

    /// Pixel size of `text`.
    pub fn measure(&self, text: &str, size_px: f32) -> (i32, i32) {
        text_size(Scale::uniform(size_px), self.font, text)
    }

    /// Draw plain text with its top-left corner at `(x, y)`.
    pub fn draw_text(&self, img: &mut RgbaImage, text: &str, x: i32, y: i32, size_px: f32, color: Color) {
        draw_text_mut(img, rgba(color), x, y, Scale::uniform(size_px), self.font, text);
    }

    /// Draw `text` in a filled, outlined box vertically centred on `anchor_y`.
    ///
    /// Returns the box rectangle.
    pub fn draw_label(
        &self,
        img: &mut RgbaImage,
        text: &str,
        anchor_x: i32,
        anchor_y: i32,
        style: LabelStyle,
    ) -> Rect {
        let (tw, th) = self.measure(text, style.size_px);
        let pad = (style.size_px * 0.35).ceil() as i32;
        let box_w = (tw + 2 * pad).max(1);
        let box_h = (th + 2 * pad).max(1);

        let left = match style.align {
            Align::Left => anchor_x,
            Align::Center => anchor_x - box_w / 2,
            Align::Right => anchor_x - box_w,
        };
        let top = anchor_y - box_h / 2;

        let rect = Rect::at(left, top).of_size(box_w as u32, box_h as u32);
        draw_filled_rect_mut(img, rect, rgba(style.box_color));
        draw_hollow_rect_mut(img, rect, rgba(BOX_EDGE));
        self.draw_text(img, text, left + pad, top + pad, style.size_px, style.text_color);
        rect
    }
}

pub(crate) fn rgba(color: Color) -> Rgba<u8> {
    Rgba(color.to_rgba())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_points_to_pixels() {
        assert_eq!(points_to_pixels(72.0, 200), 200.0);
        assert!((points_to_pixels(8.0, 200) - 22.22).abs() < 0.01);
    }

    #[test]
    fn test_missing_configured_font_is_an_error() {
        let result = load_font(Some(Path::new("/nonexistent/font.ttf")));
        assert!(matches!(result, Err(RenderError::Font { .. })));
    }

    #[test]
    fn test_non_font_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.ttf");
        std::fs::write(&path, b"not a font").unwrap();
        assert!(matches!(load_font(Some(&path)), Err(RenderError::Font { .. })));
    }

    #[test]
    fn test_embedded_font_measures_text() {
        let font = load_font(None).unwrap();
        let painter = TextPainter::new(&font);
        let (short, h) = painter.measure("ab", 20.0);
        let (long, _) = painter.measure("abcd", 20.0);
        assert!(h > 0);
        assert!(long > short);
    }

    #[test]
    fn test_label_box_drawn_around_text() {
        let font = load_font(None).unwrap();
        let painter = TextPainter::new(&font);
        let mut img = RgbaImage::from_pixel(200, 100, Rgba([0, 0, 0, 0]));
        let style = LabelStyle {
            size_px: 20.0,
            text_color: Color::BLACK,
            box_color: Color::rgb(0xb9, 0xdc, 0x0c),
            align: Align::Center,
        };
        let rect = painter.draw_label(&mut img, "London", 100, 50, style);

        assert!(rect.left() < 100 && rect.right() > 100);
        let inside = (rect.left() + 1) as u32;
        assert_eq!(img.get_pixel(inside, (rect.top() + 1) as u32), &Rgba([0xb9, 0xdc, 0x0c, 255]));
        assert_eq!(img.get_pixel(rect.left() as u32, 50), &rgba(BOX_EDGE));
        let (x0, y0) = (rect.left() + 1, rect.top() + 1);
        let (x1, y1) = (rect.left() + rect.width() as i32 - 1, rect.top() + rect.height() as i32 - 1);
        let glyph_pixels = (y0..y1)
            .flat_map(|y| (x0..x1).map(move |x| (x as u32, y as u32)))
            .filter(|&(x, y)| img.get_pixel(x, y)[1] < 0x80)
            .count();
        assert!(glyph_pixels > 20, "no glyphs drawn");
    }

    #[test]
    fn test_right_alignment_ends_at_anchor() {
        let font = load_font(None).unwrap();
        let painter = TextPainter::new(&font);
        let mut img = RgbaImage::new(200, 100);
        let style = LabelStyle {
            size_px: 10.0,
            text_color: Color::BLACK,
            box_color: Color::WHITE,
            align: Align::Right,
        };
        let rect = painter.draw_label(&mut img, "abc", 150, 50, style);
        assert_eq!(rect.left() + rect.width() as i32, 150);
    }
}
