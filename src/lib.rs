pub mod bounds;
#[cfg(feature = "backend-wgpu")]
pub mod gpu;
pub mod layer;
pub mod order;
pub mod pipeline;
pub mod pool;
pub mod scene;
pub mod scene_objects {
    pub mod label;
    pub mod sprite;
}
pub mod text;
pub mod text_layout;
pub mod traits;
pub mod utils;
pub mod viewport;

pub use bounds::{resolve_bounds, resolve_bounds_offset, BoundingBox};
pub use layer::RenderLayer;
pub use order::RenderOrder;
pub use pipeline::{DisplayList, InstructionLease, PipelineError, RenderPipeline};
pub use pool::Pool;
pub use scene::{NodeId, SceneGraph, SceneNode, Transform2D};
pub use text::{FontError, FontMetrics, TextMeasurer};
pub use text_layout::{AutoFit, TextLayout, TextLayoutResult, TextStyle};
pub use traits::{DrawBackend, EntityRenderer, RenderInstruction};
pub use utils::{Position, Rectangle, Size};
pub use viewport::Viewport;
