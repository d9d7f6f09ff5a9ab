use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use uuid::Uuid;

use crate::bounds::{resolve_bounds_offset, BoundingBox};
use crate::pipeline::{InstructionLease, InstructionPool, PipelineError, PooledInstruction};
use crate::pool::Pool;
use crate::scene::{NodeId, SceneGraph};
use crate::text::TextMeasurer;
use crate::text_layout::{text_offset, TextLayout, TextStyle};
use crate::traits::{DrawBackend, EntityRenderer, RenderInstruction};
use crate::viewport::Viewport;

#[derive(Default)]
pub struct LabelInstruction {
    texture: Uuid,
    quad: BoundingBox,
    tint: [f32; 4],
    layout: Option<Rc<RefCell<TextLayout>>>,
}

impl RenderInstruction for LabelInstruction {
    fn render(&mut self, backend: &mut dyn DrawBackend) {
        // Texture upload stays inside render(): the only place GPU
        // resources may be touched.
        if let Some(layout) = &self.layout {
            let layout = layout.borrow();
            let result = layout.result();
            backend.upload_text_texture(self.texture, &result.bitmap, result.revision);
        }
        backend.draw_textured_quad(self.texture, &self.quad, self.tint);
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Text label renderer: resolves its cached layout against the node's
/// base size, places the glyph quad inside the label box per the
/// configured alignment, and draws the cached text bitmap.
///
/// The layout cache is a single slot keyed on logical inputs (text,
/// style, base size, max width), not on viewport identity. Background
/// fills and borders for the same label register as separate renderers
/// on the same entity with higher priorities.
pub struct LabelRenderer {
    entity: NodeId,
    texture: Uuid,
    text: String,
    style: TextStyle,
    max_width: Option<f32>,
    tint: [f32; 4],
    measurer: Rc<dyn TextMeasurer>,
    layout: Rc<RefCell<TextLayout>>,
    pool: InstructionPool,
}

impl LabelRenderer {
    pub fn new(
        entity: NodeId,
        measurer: Rc<dyn TextMeasurer>,
        style: TextStyle,
        pool_capacity: usize,
    ) -> Self {
        let pool = Rc::new(RefCell::new(Pool::new(pool_capacity, || {
            Box::new(LabelInstruction::default()) as PooledInstruction
        })));
        Self {
            entity,
            texture: Uuid::new_v4(),
            text: String::new(),
            style,
            max_width: None,
            tint: [1.0, 1.0, 1.0, 1.0],
            measurer,
            layout: Rc::new(RefCell::new(TextLayout::new())),
            pool,
        }
    }

    pub fn entity(&self) -> NodeId {
        self.entity
    }

    /// Stable id of the cached text texture on the backend.
    pub fn texture(&self) -> Uuid {
        self.texture
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: &str) {
        self.text.clear();
        self.text.push_str(text);
    }

    pub fn style(&self) -> &TextStyle {
        &self.style
    }

    /// Callers changing `font_size` are expected to hand the renderer a
    /// measurer built at the new size as well.
    pub fn set_style(&mut self, style: TextStyle) {
        self.style = style;
    }

    pub fn set_measurer(&mut self, measurer: Rc<dyn TextMeasurer>) {
        self.measurer = measurer;
        self.layout.borrow_mut().invalidate();
    }

    pub fn set_max_width(&mut self, max_width: Option<f32>) {
        self.max_width = max_width;
    }

    pub fn set_tint(&mut self, tint: [f32; 4]) {
        self.tint = tint;
    }

    pub fn layout(&self) -> &Rc<RefCell<TextLayout>> {
        &self.layout
    }

    pub fn pool(&self) -> &InstructionPool {
        &self.pool
    }
}

impl EntityRenderer for LabelRenderer {
    fn next_instruction(
        &mut self,
        scene: &SceneGraph,
        viewport: &Viewport,
    ) -> Result<Option<InstructionLease>, PipelineError> {
        let node = scene.node(self.entity);
        if !node.visible {
            return Ok(None);
        }

        let (text_box, offset) = {
            let mut layout = self.layout.borrow_mut();
            let result = layout.resolve(
                &self.text,
                &self.style,
                node.base_size,
                self.max_width,
                self.measurer.as_ref(),
            );
            (
                result.text_box,
                text_offset(&self.style, result.label_box, result.text_box),
            )
        };

        let bounds = resolve_bounds_offset(scene, self.entity, text_box, offset, viewport);
        if !bounds.is_valid() {
            return Ok(None);
        }
        let Some(mut lease) = InstructionLease::acquire(&self.pool) else {
            return Ok(None);
        };
        let instruction = lease
            .instruction_mut()
            .as_any_mut()
            .downcast_mut::<LabelInstruction>()
            .expect("label pool only holds label instructions");
        instruction.texture = self.texture;
        instruction.quad = bounds;
        instruction.tint = self.tint;
        instruction.layout = Some(Rc::clone(&self.layout));
        Ok(Some(lease))
    }
}
