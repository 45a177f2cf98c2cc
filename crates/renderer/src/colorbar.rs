//! Horizontal colorbar with ticks and a boxed legend.

use grid_common::Color;
use image::RgbaImage;
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;
use projection::PixelRect;

use crate::colormap::Colormap;
use crate::error::{RenderError, RenderResult};
use crate::norm::{format_tick, Normalizer};
use crate::text::{rgba, Align, LabelStyle, TextPainter, BOX_EDGE};

/// Tick positions with their labels.
#[derive(Debug, Clone, PartialEq)]
pub struct Ticks {
    pub positions: Vec<f64>,
    pub labels: Vec<String>,
}

impl Ticks {
    /// Resolve configured ticks and labels, filling in what is missing.
    pub fn resolve(positions: &[f64], labels: &[String], norm: &Normalizer) -> RenderResult<Self> {
        let positions = if positions.is_empty() {
            norm.auto_ticks()
        } else {
            positions.to_vec()
        };
        let labels = if labels.is_empty() {
            positions.iter().map(|&p| format_tick(p)).collect()
        } else if labels.len() == positions.len() {
            labels.to_vec()
        } else {
            return Err(RenderError::TickLabelMismatch {
                ticks: positions.len(),
                labels: labels.len(),
            });
        };
        Ok(Self { positions, labels })
    }
}

pub struct Colorbar<'a> {
    pub rect: PixelRect,
    pub colormap: &'a Colormap,
    pub norm: &'a Normalizer,
    pub ticks: &'a Ticks,
    pub label: Option<&'a str>,
    pub text_size_px: f32,
    pub text_color: Color,
    pub box_color: Color,
}

impl Colorbar<'_> {
    /// Pixel height the bar needs below its rectangle for ticks and legend.
    pub fn footprint_below(text_size_px: f32) -> u32 {
        (text_size_px * 3.6).ceil() as u32
    }

    pub fn draw(&self, canvas: &mut RgbaImage, painter: &TextPainter) {
        let r = self.rect;
        if r.width == 0 || r.height == 0 {
            return;
        }

        for dx in 0..r.width {
            let t = (dx as f32 + 0.5) / r.width as f32;
            let color = rgba(self.colormap.sample(t));
            for y in r.y..(r.y + r.height).min(canvas.height()) {
                let x = r.x + dx;
                if x < canvas.width() {
                    canvas.put_pixel(x, y, color);
                }
            }
        }
        let outline = Rect::at(r.x as i32, r.y as i32).of_size(r.width, r.height);
        draw_hollow_rect_mut(canvas, outline, rgba(BOX_EDGE));

        let bottom = (r.y + r.height) as f32;
        let tick_len = (self.text_size_px * 0.35).max(2.0);
        for (value, label) in self.ticks.positions.iter().zip(&self.ticks.labels) {
            if *value < self.norm.min() || *value > self.norm.max() {
                continue;
            }
            let Some(t) = self.norm.normalize(*value as f32) else {
                continue;
            };
            let x = r.x as f32 + t * r.width as f32;
            draw_line_segment_mut(canvas, (x, bottom), (x, bottom + tick_len), rgba(BOX_EDGE));

            let (tw, _) = painter.measure(label, self.text_size_px);
            painter.draw_text(
                canvas,
                label,
                x as i32 - tw / 2,
                (bottom + tick_len * 1.5) as i32,
                self.text_size_px,
                self.text_color,
            );
        }

        if let Some(label) = self.label {
            let y = bottom + tick_len * 1.5 + self.text_size_px * 2.0;
            painter.draw_label(
                canvas,
                label,
                (r.x + r.width / 2) as i32,
                y as i32,
                LabelStyle {
                    size_px: self.text_size_px,
                    text_color: self.text_color,
                    box_color: self.box_color,
                    align: Align::Center,
                },
            );
        }
    }
}

/// Fill a rectangle with `fill` and outline it.
pub(crate) fn draw_box(canvas: &mut RgbaImage, rect: PixelRect, fill: Color) {
    if rect.width == 0 || rect.height == 0 {
        return;
    }
    let r = Rect::at(rect.x as i32, rect.y as i32).of_size(rect.width, rect.height);
    draw_filled_rect_mut(canvas, r, rgba(fill));
    draw_hollow_rect_mut(canvas, r, rgba(BOX_EDGE));
}
