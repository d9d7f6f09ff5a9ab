use crate::utils::{Position, Size};

/// A named Z-bucket shared by reference between scene nodes. Layers are
/// authored once at scene setup and never mutated afterwards; nodes
/// without a layer of their own inherit the nearest ancestor's.
///
/// `z` carries the layer's draw precedence (smaller draws in front, same
/// convention as node z). `parallax` scales the camera translation per
/// axis, and `resolution` optionally declares an independent coordinate
/// space that gets remapped into the active viewport's resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderLayer {
    pub name: String,
    pub z: i32,
    pub parallax: Position,
    pub resolution: Option<Size>,
}

impl RenderLayer {
    pub fn new(name: &str, z: i32) -> Self {
        Self {
            name: name.to_string(),
            z,
            parallax: Position::new(1.0, 1.0),
            resolution: None,
        }
    }

    pub fn with_parallax(mut self, parallax: Position) -> Self {
        self.parallax = parallax;
        self
    }

    pub fn with_resolution(mut self, resolution: Size) -> Self {
        self.resolution = Some(resolution);
        self
    }
}
