use std::cell::RefCell;
use std::rc::Rc;

use log::trace;
use thiserror::Error;

use crate::order::RenderOrder;
use crate::pool::Pool;
use crate::scene::{NodeId, SceneGraph};
use crate::traits::{DrawBackend, EntityRenderer, RenderInstruction};
use crate::viewport::Viewport;

pub type PooledInstruction = Box<dyn RenderInstruction>;

/// Shared handle to a renderer component's instruction pool. Each pool
/// belongs to exactly one renderer and is only touched from the render
/// thread; the `Rc` exists so leases can find their way home.
pub type InstructionPool = Rc<RefCell<Pool<PooledInstruction>>>;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// A renderer callback failed while producing its instruction. This
    /// is a programming defect, not a transient condition: the frame's
    /// display-list build aborts rather than continuing with a
    /// partially built, unsorted list.
    #[error("renderer for entity {entity:?} failed: {source}")]
    Renderer {
        entity: NodeId,
        #[source]
        source: anyhow::Error,
    },
}

/// A pooled instruction checked out for exactly one frame. Dropping the
/// lease returns the instruction to its owning pool, so instructions
/// that were culled, never rendered, or abandoned by an aborted build
/// are reclaimed the same way rendered ones are. The move into the pool
/// on drop is also what makes use-after-release unrepresentable.
pub struct InstructionLease {
    instruction: Option<PooledInstruction>,
    pool: InstructionPool,
}

impl InstructionLease {
    /// `None` when the pool is exhausted; callers skip the draw for
    /// this frame.
    pub fn acquire(pool: &InstructionPool) -> Option<InstructionLease> {
        let instruction = pool.borrow_mut().acquire()?;
        Some(Self {
            instruction: Some(instruction),
            pool: Rc::clone(pool),
        })
    }

    pub fn instruction_mut(&mut self) -> &mut dyn RenderInstruction {
        self.instruction
            .as_mut()
            .expect("lease holds its instruction until dropped")
            .as_mut()
    }
}

impl Drop for InstructionLease {
    fn drop(&mut self) {
        if let Some(instruction) = self.instruction.take() {
            self.pool.borrow_mut().release(instruction);
        }
    }
}

struct Subscription {
    entity: NodeId,
    renderer: Rc<RefCell<dyn EntityRenderer>>,
    priority: i32,
}

struct DisplayEntry {
    entity: NodeId,
    priority: i32,
    lease: InstructionLease,
}

/// The fully sorted per-frame sequence of instructions about to be
/// drawn. Dropping the list (or calling [`DisplayList::release`])
/// returns every lease to its pool, rendered or not.
pub struct DisplayList {
    entries: Vec<DisplayEntry>,
}

impl DisplayList {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entities in final draw order, one entry per instruction.
    pub fn entities(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.entries.iter().map(|e| e.entity)
    }

    pub fn render(&mut self, backend: &mut dyn DrawBackend) {
        for entry in &mut self.entries {
            entry.lease.instruction_mut().render(backend);
        }
    }

    /// Explicit name for the end-of-frame release; equivalent to
    /// dropping the list.
    pub fn release(self) {}
}

/// Orchestrates a frame: collects one instruction per subscribed
/// (entity, renderer) pair per viewport, sorts them, and hands the
/// ordered sequence to the draw loop.
///
/// Single-threaded by design; a build runs to completion before any
/// instruction renders and before the next update tick begins.
pub struct RenderPipeline {
    subscriptions: Vec<Subscription>,
    order: RenderOrder,
}

impl Default for RenderPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderPipeline {
    pub fn new() -> Self {
        Self {
            subscriptions: Vec::new(),
            order: RenderOrder::new(),
        }
    }

    /// Registers a renderer for an entity. One entity may carry several
    /// renderers; within the entity, larger `priority` values draw
    /// earlier (a back fill at 100 lands under a front outline at
    /// -100), matching the smaller-z-in-front convention.
    pub fn subscribe(
        &mut self,
        entity: NodeId,
        renderer: Rc<RefCell<dyn EntityRenderer>>,
        priority: i32,
    ) {
        self.subscriptions.push(Subscription {
            entity,
            renderer,
            priority,
        });
    }

    pub fn unsubscribe(&mut self, entity: NodeId, renderer: &Rc<RefCell<dyn EntityRenderer>>) {
        self.subscriptions
            .retain(|s| !(s.entity == entity && Rc::ptr_eq(&s.renderer, renderer)));
    }

    /// Builds the frame's ordered instruction sequence. Every viewport's
    /// slice sorts independently and viewports concatenate in call
    /// order, so split-screen halves never interleave. A renderer error
    /// aborts the build; leases acquired before the abort release on
    /// drop.
    pub fn build_display_list(
        &self,
        scene: &SceneGraph,
        viewports: &[Viewport],
    ) -> Result<DisplayList, PipelineError> {
        let mut entries: Vec<DisplayEntry> = Vec::new();
        for viewport in viewports {
            let start = entries.len();
            for sub in &self.subscriptions {
                if let Some(lease) = sub.renderer.borrow_mut().next_instruction(scene, viewport)? {
                    entries.push(DisplayEntry {
                        entity: sub.entity,
                        priority: sub.priority,
                        lease,
                    });
                }
            }
            let slice = &mut entries[start..];
            slice.sort_by(|a, b| {
                if a.entity == b.entity {
                    b.priority.cmp(&a.priority)
                } else {
                    // Fully tied entities still keep their instruction
                    // groups contiguous.
                    self.order
                        .compare(scene, a.entity, b.entity)
                        .then_with(|| a.entity.0.cmp(&b.entity.0))
                }
            });
        }
        trace!("display list built with {} instructions", entries.len());
        Ok(DisplayList { entries })
    }

    /// Convenience frame entry point: build, render, release. Returns
    /// the number of instructions issued.
    pub fn run_frame(
        &self,
        scene: &SceneGraph,
        viewports: &[Viewport],
        backend: &mut dyn DrawBackend,
    ) -> Result<usize, PipelineError> {
        let mut list = self.build_display_list(scene, viewports)?;
        let drawn = list.len();
        list.render(backend);
        list.release();
        Ok(drawn)
    }
}
