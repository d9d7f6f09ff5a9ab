use std::any::Any;

use uuid::Uuid;

use crate::bounds::BoundingBox;
use crate::pipeline::{InstructionLease, PipelineError};
use crate::scene::SceneGraph;
use crate::text_layout::TextBitmap;
use crate::viewport::Viewport;

/// One pooled, single-frame unit of draw work. Instructions live inside
/// their owning pool as `Box<dyn RenderInstruction>` and are reused
/// frame after frame; `as_any_mut` lets the owning renderer reconfigure
/// the concrete type behind the box.
pub trait RenderInstruction: Any {
    fn render(&mut self, backend: &mut dyn DrawBackend);

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// GPU boundary. Texture creation/upload and quad submission live
/// behind this trait and are only ever reached from inside a
/// [`RenderInstruction::render`] implementation, never from the
/// pipeline itself.
pub trait DrawBackend {
    /// Creates or refreshes the texture backing a cached text bitmap.
    /// Implementations skip the upload when they already hold
    /// `revision`.
    fn upload_text_texture(&mut self, id: Uuid, bitmap: &TextBitmap, revision: u64);

    fn draw_textured_quad(&mut self, texture: Uuid, quad: &BoundingBox, tint: [f32; 4]);
}

/// Per-frame instruction source registered with the pipeline. `Ok(None)`
/// means "nothing to draw this frame" (invisible, degenerate box, or an
/// exhausted pool) and is not an error; `Err` indicates a defective
/// renderer and aborts the frame's display-list build.
pub trait EntityRenderer {
    fn next_instruction(
        &mut self,
        scene: &SceneGraph,
        viewport: &Viewport,
    ) -> Result<Option<InstructionLease>, PipelineError>;
}
