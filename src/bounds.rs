use crate::scene::{NodeId, SceneGraph};
use crate::utils::{Position, Size};
use crate::viewport::Viewport;

/// A resolved quad in viewport space. Corners keep the local winding
/// top-left, top-right, bottom-right, bottom-left; under rotation they
/// stop being axis-aligned but the extent test still works off the
/// min/max envelope.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub corners: [Position; 4],
}

impl BoundingBox {
    pub const INVALID: BoundingBox = BoundingBox {
        corners: [Position { x: 0.0, y: 0.0 }; 4],
    };

    pub fn is_valid(&self) -> bool {
        self.width() > 0.0 && self.height() > 0.0
    }

    pub fn min(&self) -> Position {
        self.corners.iter().fold(self.corners[0], |acc, c| {
            Position::new(acc.x.min(c.x), acc.y.min(c.y))
        })
    }

    pub fn max(&self) -> Position {
        self.corners.iter().fold(self.corners[0], |acc, c| {
            Position::new(acc.x.max(c.x), acc.y.max(c.y))
        })
    }

    pub fn width(&self) -> f32 {
        self.max().x - self.min().x
    }

    pub fn height(&self) -> f32 {
        self.max().y - self.min().y
    }

    /// Envelope test used by front-to-back hit testing.
    pub fn contains(&self, p: Position) -> bool {
        let min = self.min();
        let max = self.max();
        p.x >= min.x && p.x <= max.x && p.y >= min.y && p.y <= max.y
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::INVALID
    }
}

/// Resolves a node's quad in viewport space: anchor-relative local
/// corners, the node's own transform, every ancestor transform up to
/// the root, then the viewport projection (camera translation scaled by
/// the effective layer's parallax, plus the layer's independent
/// resolution remap when one is declared).
///
/// Pure function of its inputs; calling it once per (node, viewport)
/// pair per frame is safe for any number of simultaneous viewports.
pub fn resolve_bounds(
    scene: &SceneGraph,
    node: NodeId,
    base_size: Size,
    viewport: &Viewport,
) -> BoundingBox {
    resolve_bounds_offset(scene, node, base_size, Position::default(), viewport)
}

/// Like [`resolve_bounds`] but with the local rectangle shifted by
/// `offset` before any transform applies. Label renderers use this to
/// place the glyph quad inside the label box.
pub fn resolve_bounds_offset(
    scene: &SceneGraph,
    node: NodeId,
    size: Size,
    offset: Position,
    viewport: &Viewport,
) -> BoundingBox {
    if size.is_degenerate() {
        return BoundingBox::INVALID;
    }

    let n = scene.node(node);
    let anchor = n.transform.anchor;
    let left = offset.x - anchor.x * size.width;
    let top = offset.y - anchor.y * size.height;
    let local = [
        Position::new(left, top),
        Position::new(left + size.width, top),
        Position::new(left + size.width, top + size.height),
        Position::new(left, top + size.height),
    ];

    let world = scene.world_affine(node);
    let (parallax, layer_resolution) = match scene.effective_layer(node) {
        Some(layer) => (layer.parallax, layer.resolution),
        None => (Position::new(1.0, 1.0), None),
    };

    let mut corners = [Position::default(); 4];
    for (dst, src) in corners.iter_mut().zip(local) {
        *dst = viewport.project(world.apply(src), parallax, layer_resolution);
    }
    BoundingBox { corners }
}
