use std::rc::Rc;

use crate::utils::{Position, Rectangle, Size};

/// One projection target: a rectangle in window (or parent-viewport)
/// coordinates, a logical resolution, and a camera transform. Viewports
/// nest for split-screen; a child's projected coordinates land inside
/// its parent's rectangle.
#[derive(Debug, Clone)]
pub struct Viewport {
    bounds: Rectangle,
    resolution: Size,
    position: Position,
    zoom: f32,
    rotation: f32,
    boundary: Option<Rectangle>,
    parent: Option<Rc<Viewport>>,
}

impl Viewport {
    pub fn new(bounds: Rectangle) -> Self {
        let resolution = bounds.size();
        Self {
            bounds,
            resolution,
            position: Position::default(),
            zoom: 1.0,
            rotation: 0.0,
            boundary: None,
            parent: None,
        }
    }

    pub fn with_resolution(mut self, resolution: Size) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_parent(mut self, parent: Rc<Viewport>) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn bounds(&self) -> Rectangle {
        self.bounds
    }

    pub fn resolution(&self) -> Size {
        self.resolution
    }

    pub fn position(&self) -> Position {
        self.position
    }

    /// Moves the camera, clamped into the authored boundary when one is
    /// set.
    pub fn set_position(&mut self, position: Position) {
        self.position = match &self.boundary {
            Some(b) => Position::new(
                position.x.clamp(b.x, b.x + b.width),
                position.y.clamp(b.y, b.y + b.height),
            ),
            None => position,
        };
    }

    pub fn set_boundary(&mut self, boundary: Rectangle) {
        self.boundary = Some(boundary);
    }

    pub fn clear_boundary(&mut self) {
        self.boundary = None;
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn set_zoom(&mut self, zoom: f32) {
        self.zoom = zoom;
    }

    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    pub fn set_rotation(&mut self, rotation: f32) {
        self.rotation = rotation;
    }

    /// Projects a world-space point into this viewport's resolution
    /// space. `parallax` scales the camera translation per axis;
    /// `layer_resolution` remaps a layer's independent coordinate space
    /// into this viewport's. Nested viewports carry the result up the
    /// parent chain so split-screen children land inside their parent's
    /// rectangle.
    pub fn project(
        &self,
        world: Position,
        parallax: Position,
        layer_resolution: Option<Size>,
    ) -> Position {
        let mut p = Position::new(
            world.x - self.position.x * parallax.x,
            world.y - self.position.y * parallax.y,
        );
        if self.rotation != 0.0 {
            let (s, c) = self.rotation.sin_cos();
            p = Position::new(p.x * c + p.y * s, p.y * c - p.x * s);
        }
        p = p * self.zoom;
        if let Some(res) = layer_resolution {
            p.x *= self.resolution.width / res.width;
            p.y *= self.resolution.height / res.height;
        }
        match &self.parent {
            Some(parent) => parent.embed(Position::new(self.bounds.x + p.x, self.bounds.y + p.y)),
            None => p,
        }
    }

    fn embed(&self, p: Position) -> Position {
        match &self.parent {
            Some(parent) => parent.embed(Position::new(self.bounds.x + p.x, self.bounds.y + p.y)),
            None => p,
        }
    }
}
