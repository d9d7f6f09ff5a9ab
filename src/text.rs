use rusttype::{point, Font, Scale};
use thiserror::Error;

use crate::text_layout::TextBitmap;
use crate::utils::Size;

#[derive(Debug, Error)]
pub enum FontError {
    #[error("failed to read font file: {0}")]
    Io(#[from] std::io::Error),
    #[error("font data could not be parsed")]
    InvalidFontData,
}

/// Boundary to the font/shaping service: the layout resolver only ever
/// needs a measured box back, plus an optional glyph pass into a
/// prepared bitmap.
pub trait TextMeasurer {
    /// Measures `text`, word-wrapped to `max_width` when given. An empty
    /// string still occupies one line of height.
    fn measure(&self, text: &str, max_width: Option<f32>) -> Size;

    fn line_height(&self) -> f32;

    /// Draws the glyphs into `bitmap` starting at `origin`, clearing the
    /// buffer first. Metrics-only measurers may leave the bitmap
    /// untouched.
    fn rasterize(&self, text: &str, max_width: Option<f32>, origin: (f32, f32), bitmap: &mut TextBitmap) {
        let _ = (text, max_width, origin, bitmap);
    }
}

/// rusttype-backed measurer bound to one font face at one size.
pub struct FontMetrics {
    font: Font<'static>,
    font_size: f32,
}

impl FontMetrics {
    pub fn from_bytes(data: Vec<u8>, font_size: f32) -> Result<Self, FontError> {
        let font = Font::try_from_vec(data).ok_or(FontError::InvalidFontData)?;
        Ok(Self { font, font_size })
    }

    pub fn from_file(path: &str, font_size: f32) -> Result<Self, FontError> {
        Self::from_bytes(std::fs::read(path)?, font_size)
    }

    pub fn font_size(&self) -> f32 {
        self.font_size
    }

    fn scale(&self) -> Scale {
        Scale::uniform(self.font_size)
    }

    fn advance(&self, c: char) -> f32 {
        self.font
            .glyph(c)
            .scaled(self.scale())
            .h_metrics()
            .advance_width
    }

    fn text_advance(&self, text: &str) -> f32 {
        text.chars().map(|c| self.advance(c)).sum()
    }

    /// Splits text into rendered lines: explicit newlines always break,
    /// and when `max_width` is given words wrap greedily. A word wider
    /// than the limit gets a line of its own rather than being split.
    fn layout_lines(&self, text: &str, max_width: Option<f32>) -> Vec<String> {
        let mut lines = Vec::new();
        for raw in text.split('\n') {
            let Some(limit) = max_width else {
                lines.push(raw.to_string());
                continue;
            };
            let space = self.advance(' ');
            let mut current = String::new();
            let mut width = 0.0;
            for word in raw.split(' ') {
                let word_width = self.text_advance(word);
                if !current.is_empty() && width + space + word_width > limit {
                    lines.push(std::mem::take(&mut current));
                    width = 0.0;
                }
                if !current.is_empty() {
                    current.push(' ');
                    width += space;
                }
                current.push_str(word);
                width += word_width;
            }
            lines.push(current);
        }
        lines
    }
}

impl TextMeasurer for FontMetrics {
    fn measure(&self, text: &str, max_width: Option<f32>) -> Size {
        let lines = self.layout_lines(text, max_width);
        let width = lines
            .iter()
            .map(|line| self.text_advance(line))
            .fold(0.0f32, f32::max);
        Size::new(width, lines.len() as f32 * self.line_height())
    }

    fn line_height(&self) -> f32 {
        self.font_size * 1.2
    }

    fn rasterize(&self, text: &str, max_width: Option<f32>, origin: (f32, f32), bitmap: &mut TextBitmap) {
        bitmap.data.fill(0);
        let scale = self.scale();
        let v_metrics = self.font.v_metrics(scale);
        let mut baseline = origin.1 + v_metrics.ascent;
        for line in self.layout_lines(text, max_width) {
            let mut caret = origin.0;
            for c in line.chars() {
                let scaled = self.font.glyph(c).scaled(scale);
                let advance = scaled.h_metrics().advance_width;
                let glyph = scaled.positioned(point(caret, baseline));
                if let Some(bb) = glyph.pixel_bounding_box() {
                    glyph.draw(|x, y, v| {
                        let px = bb.min.x + x as i32;
                        let py = bb.min.y + y as i32;
                        if px >= 0
                            && py >= 0
                            && (px as u32) < bitmap.width
                            && (py as u32) < bitmap.height
                        {
                            let index = ((py as u32 * bitmap.width + px as u32) * 4) as usize;
                            let alpha = (v * 255.0) as u8;
                            bitmap.data[index] = 255;
                            bitmap.data[index + 1] = 255;
                            bitmap.data[index + 2] = 255;
                            bitmap.data[index + 3] = bitmap.data[index + 3].max(alpha);
                        }
                    });
                }
                caret += advance;
            }
            baseline += self.line_height();
        }
    }
}
