use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use uuid::Uuid;

use crate::bounds::{resolve_bounds, BoundingBox};
use crate::pipeline::{InstructionLease, InstructionPool, PipelineError, PooledInstruction};
use crate::pool::Pool;
use crate::scene::{NodeId, SceneGraph};
use crate::traits::{DrawBackend, EntityRenderer, RenderInstruction};
use crate::viewport::Viewport;

#[derive(Default)]
pub struct SpriteInstruction {
    texture: Uuid,
    quad: BoundingBox,
    tint: [f32; 4],
}

impl RenderInstruction for SpriteInstruction {
    fn render(&mut self, backend: &mut dyn DrawBackend) {
        backend.draw_textured_quad(self.texture, &self.quad, self.tint);
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Draws one textured quad for its entity each frame. Owns a
/// fixed-capacity instruction pool; when the pool runs dry the sprite
/// simply skips that frame.
pub struct SpriteRenderer {
    entity: NodeId,
    texture: Uuid,
    tint: [f32; 4],
    pool: InstructionPool,
}

impl SpriteRenderer {
    pub fn new(entity: NodeId, texture: Uuid, pool_capacity: usize) -> Self {
        let pool = Rc::new(RefCell::new(Pool::new(pool_capacity, || {
            Box::new(SpriteInstruction::default()) as PooledInstruction
        })));
        Self {
            entity,
            texture,
            tint: [1.0, 1.0, 1.0, 1.0],
            pool,
        }
    }

    pub fn entity(&self) -> NodeId {
        self.entity
    }

    pub fn set_tint(&mut self, tint: [f32; 4]) {
        self.tint = tint;
    }

    pub fn pool(&self) -> &InstructionPool {
        &self.pool
    }
}

impl EntityRenderer for SpriteRenderer {
    fn next_instruction(
        &mut self,
        scene: &SceneGraph,
        viewport: &Viewport,
    ) -> Result<Option<InstructionLease>, PipelineError> {
        let node = scene.node(self.entity);
        if !node.visible {
            return Ok(None);
        }
        let bounds = resolve_bounds(scene, self.entity, node.base_size, viewport);
        if !bounds.is_valid() {
            return Ok(None);
        }
        let Some(mut lease) = InstructionLease::acquire(&self.pool) else {
            return Ok(None);
        };
        let instruction = lease
            .instruction_mut()
            .as_any_mut()
            .downcast_mut::<SpriteInstruction>()
            .expect("sprite pool only holds sprite instructions");
        instruction.texture = self.texture;
        instruction.quad = bounds;
        instruction.tint = self.tint;
        Ok(Some(lease))
    }
}
