use serde::{Deserialize, Serialize};

use crate::text::TextMeasurer;
use crate::utils::{Position, Size};

/// How a label's container box and its glyph box are sized against each
/// other. Unknown policy names in authored configuration fail loudly at
/// parse time; the enum keeps runtime values closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AutoFit {
    /// Container keeps the base size; text measures unconstrained.
    None,
    /// Text wraps to the container width; height is left alone and may
    /// overflow or underflow.
    WrapText,
    /// Text wraps to the container width and the container adopts the
    /// wrapped height.
    WrapTextGrowLabel,
    /// Text measures unconstrained, then rescales linearly (no wrap) to
    /// fit inside the container.
    ScaleTextToLabel,
    /// Container adopts the unconstrained text measurement; the base
    /// size is ignored.
    SizeLabelToText,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum HorizontalAlignment {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum VerticalAlignment {
    Top,
    Middle,
    Bottom,
}

/// Authored text configuration. The label renderer derives its measurer
/// from `font_size`; padding, outline and shadow inflate the backing
/// bitmap beyond the raw glyph measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    pub font_size: f32,
    pub padding: f32,
    pub outline_width: f32,
    pub shadow_offset: (f32, f32),
    pub h_align: HorizontalAlignment,
    pub v_align: VerticalAlignment,
    pub auto_fit: AutoFit,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_size: 16.0,
            padding: 5.0,
            outline_width: 0.0,
            shadow_offset: (0.0, 0.0),
            h_align: HorizontalAlignment::Left,
            v_align: VerticalAlignment::Top,
            auto_fit: AutoFit::None,
        }
    }
}

impl TextStyle {
    /// Loads a style from authored JSON. An unsupported auto-fit or
    /// alignment name surfaces here as a parse error instead of being
    /// silently defaulted.
    pub fn from_json(data: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(data)?)
    }
}

/// RGBA8 pixel buffer with power-of-two dimensions.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextBitmap {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl TextBitmap {
    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.data.clear();
        self.data.resize((width * height * 4) as usize, 0);
    }
}

#[derive(Debug, Clone, Default)]
pub struct TextLayoutResult {
    /// The visible container, e.g. for a background fill or border.
    pub label_box: Size,
    /// The area the glyphs occupy.
    pub text_box: Size,
    pub bitmap: TextBitmap,
    /// Bumps on every re-rasterization; backends compare it to decide
    /// whether a texture re-upload is due.
    pub revision: u64,
}

/// Cached layout resolver holding a single slot: the most recently
/// resolved (text, style, base size, max width) tuple and its result.
/// Re-rasterization only happens when one of those inputs actually
/// changed, which is what keeps labels affordable at 60 ticks per
/// second.
///
/// The slot is not keyed by viewport. Resolving the same label against
/// viewports that disagree on these inputs within one frame overwrites
/// the earlier result (last viewport wins); keep per-viewport labels on
/// separate renderers if that matters.
pub struct TextLayout {
    text: String,
    style: TextStyle,
    base_size: Size,
    max_width: Option<f32>,
    result: TextLayoutResult,
    dirty: bool,
}

impl Default for TextLayout {
    fn default() -> Self {
        Self::new()
    }
}

impl TextLayout {
    pub fn new() -> Self {
        Self {
            text: String::new(),
            style: TextStyle::default(),
            base_size: Size::new(0.0, 0.0),
            max_width: None,
            result: TextLayoutResult::default(),
            dirty: true,
        }
    }

    pub fn result(&self) -> &TextLayoutResult {
        &self.result
    }

    /// Forces the next resolve to recompute even with identical inputs.
    pub fn invalidate(&mut self) {
        self.dirty = true;
    }

    pub fn resolve(
        &mut self,
        text: &str,
        style: &TextStyle,
        base_size: Size,
        max_width: Option<f32>,
        measurer: &dyn TextMeasurer,
    ) -> &TextLayoutResult {
        let unchanged = !self.dirty
            && self.text == text
            && self.style == *style
            && self.base_size == base_size
            && self.max_width == max_width;
        if unchanged {
            return &self.result;
        }

        self.text.clear();
        self.text.push_str(text);
        self.style = style.clone();
        self.base_size = base_size;
        self.max_width = max_width;

        let (label_box, text_box) = fit_boxes(text, style, base_size, max_width, measurer);

        let inflate = 2.0 * (style.padding + style.outline_width);
        let required_w = text_box.width + inflate + style.shadow_offset.0.abs();
        let required_h = text_box.height + inflate + style.shadow_offset.1.abs();
        let width = next_power_of_two(required_w);
        let height = next_power_of_two(required_h);
        if self.result.bitmap.width != width || self.result.bitmap.height != height {
            self.result.bitmap.resize(width, height);
        }

        let origin = (
            style.padding + style.outline_width,
            style.padding + style.outline_width,
        );
        measurer.rasterize(text, wrap_width(style, base_size, max_width), origin, &mut self.result.bitmap);

        self.result.label_box = label_box;
        self.result.text_box = text_box;
        self.result.revision += 1;
        self.dirty = false;
        &self.result
    }
}

/// GPU-texture-friendly dimension: the next power of two at or above the
/// required pixel count, never below 1.
fn next_power_of_two(required: f32) -> u32 {
    (required.ceil().max(1.0) as u32).next_power_of_two()
}

/// Wrapping policies wrap to the container width, further clamped by an
/// explicit max width; the others measure unconstrained.
fn wrap_width(style: &TextStyle, base_size: Size, max_width: Option<f32>) -> Option<f32> {
    match style.auto_fit {
        AutoFit::WrapText | AutoFit::WrapTextGrowLabel => Some(match max_width {
            Some(m) => base_size.width.min(m),
            None => base_size.width,
        }),
        AutoFit::None | AutoFit::ScaleTextToLabel | AutoFit::SizeLabelToText => None,
    }
}

fn fit_boxes(
    text: &str,
    style: &TextStyle,
    base_size: Size,
    max_width: Option<f32>,
    measurer: &dyn TextMeasurer,
) -> (Size, Size) {
    match style.auto_fit {
        AutoFit::None => (base_size, measurer.measure(text, None)),
        AutoFit::WrapText => {
            let wrap = wrap_width(style, base_size, max_width);
            (base_size, measurer.measure(text, wrap))
        }
        AutoFit::WrapTextGrowLabel => {
            let wrap = wrap_width(style, base_size, max_width);
            let wrapped = measurer.measure(text, wrap);
            (Size::new(base_size.width, wrapped.height), wrapped)
        }
        AutoFit::ScaleTextToLabel => {
            let measured = measurer.measure(text, None);
            let scale = if measured.width > 0.0 && measured.height > 0.0 {
                (base_size.width / measured.width).min(base_size.height / measured.height)
            } else {
                1.0
            };
            (base_size, measured * scale)
        }
        AutoFit::SizeLabelToText => {
            let measured = measurer.measure(text, None);
            (measured, measured)
        }
    }
}

/// Offset of the glyph box inside the label box per the configured
/// alignment, with padding carving out the content area.
pub fn text_offset(style: &TextStyle, label_box: Size, text_box: Size) -> Position {
    let content_w = (label_box.width - 2.0 * style.padding).max(0.0);
    let content_h = (label_box.height - 2.0 * style.padding).max(0.0);
    let x = match style.h_align {
        HorizontalAlignment::Left => 0.0,
        HorizontalAlignment::Center => (content_w - text_box.width) / 2.0,
        HorizontalAlignment::Right => content_w - text_box.width,
    };
    let y = match style.v_align {
        VerticalAlignment::Top => 0.0,
        VerticalAlignment::Middle => (content_h - text_box.height) / 2.0,
        VerticalAlignment::Bottom => content_h - text_box.height,
    };
    Position::new(style.padding + x, style.padding + y)
}
