use std::rc::Rc;

use uuid::Uuid;

use crate::layer::RenderLayer;
use crate::utils::{Affine2, Position, Size};

/// Index into the scene arena. Nodes reference their parent through one
/// of these instead of an owning pointer, so the arena stays the single
/// owner of every node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform2D {
    pub position: Position,
    /// Normalized pivot in [0,1]^2; (0,0) is the top-left corner.
    pub anchor: Position,
    pub scale: (f32, f32),
    pub rotation: f32,
}

impl Default for Transform2D {
    fn default() -> Self {
        Self {
            position: Position::default(),
            anchor: Position::default(),
            scale: (1.0, 1.0),
            rotation: 0.0,
        }
    }
}

impl Transform2D {
    pub fn to_affine(&self) -> Affine2 {
        Affine2::from_srt(self.scale, self.rotation, self.position)
    }
}

#[derive(Debug, Clone)]
pub struct SceneNode {
    pub id: Uuid,
    pub parent: Option<NodeId>,
    pub transform: Transform2D,
    pub base_size: Size,
    pub z: f32,
    /// Depth of the current animation frame, supplied each tick by the
    /// animation system.
    pub sprite_z: f32,
    pub layer: Option<Rc<RenderLayer>>,
    pub visible: bool,
}

impl SceneNode {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            parent: None,
            transform: Transform2D::default(),
            base_size: Size::new(0.0, 0.0),
            z: 0.0,
            sprite_z: 0.0,
            layer: None,
            visible: true,
        }
    }
}

/// Arena of scene nodes. The surrounding entity system owns node
/// lifecycle; the render pipeline only ever holds `NodeId` indices for
/// the duration of a frame.
#[derive(Default)]
pub struct SceneGraph {
    nodes: Vec<SceneNode>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(SceneNode::new());
        id
    }

    pub fn spawn_child(&mut self, parent: NodeId) -> NodeId {
        let id = self.spawn();
        self.node_mut(id).parent = Some(parent);
        id
    }

    pub fn node(&self, id: NodeId) -> &SceneNode {
        &self.nodes[id.0 as usize]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut SceneNode {
        &mut self.nodes[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(move |(_, n)| n.parent == Some(id))
            .map(|(i, _)| NodeId(i as u32))
    }

    /// Number of ancestors above this node; a root has depth 0.
    pub fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut current = id;
        while let Some(parent) = self.node(current).parent {
            depth += 1;
            current = parent;
        }
        depth
    }

    /// The node sitting at `level_from_root` on this node's root path,
    /// where level 0 is the root itself.
    pub fn ancestor_at(&self, id: NodeId, level_from_root: usize) -> NodeId {
        let depth = self.depth(id);
        debug_assert!(level_from_root <= depth);
        let mut current = id;
        for _ in 0..depth - level_from_root {
            current = self.node(current).parent.expect("walk is depth-bounded");
        }
        current
    }

    /// The layer actually in effect: the node's own, else the nearest
    /// ancestor's walking toward the root.
    pub fn effective_layer(&self, id: NodeId) -> Option<&Rc<RenderLayer>> {
        let mut current = id;
        loop {
            let node = self.node(current);
            if node.layer.is_some() {
                return node.layer.as_ref();
            }
            current = node.parent?;
        }
    }

    /// Local-to-world transform, composed root-down over the ancestor
    /// chain.
    pub fn world_affine(&self, id: NodeId) -> Affine2 {
        let node = self.node(id);
        let local = node.transform.to_affine();
        match node.parent {
            Some(parent) => local.then(&self.world_affine(parent)),
            None => local,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_layer_walks_to_nearest_ancestor() {
        let mut scene = SceneGraph::new();
        let root = scene.spawn();
        let mid = scene.spawn_child(root);
        let leaf = scene.spawn_child(mid);

        assert!(scene.effective_layer(leaf).is_none());

        let background = Rc::new(RenderLayer::new("background", 5));
        scene.node_mut(root).layer = Some(Rc::clone(&background));
        assert_eq!(scene.effective_layer(leaf).unwrap().z, 5);

        let overlay = Rc::new(RenderLayer::new("overlay", -1));
        scene.node_mut(mid).layer = Some(overlay);
        assert_eq!(scene.effective_layer(leaf).unwrap().z, -1);
    }

    #[test]
    fn ancestor_at_addresses_levels_from_root() {
        let mut scene = SceneGraph::new();
        let root = scene.spawn();
        let mid = scene.spawn_child(root);
        let leaf = scene.spawn_child(mid);

        assert_eq!(scene.depth(leaf), 2);
        assert_eq!(scene.ancestor_at(leaf, 0), root);
        assert_eq!(scene.ancestor_at(leaf, 1), mid);
        assert_eq!(scene.ancestor_at(leaf, 2), leaf);
    }

    #[test]
    fn children_enumerates_direct_descendants_only() {
        let mut scene = SceneGraph::new();
        let root = scene.spawn();
        let a = scene.spawn_child(root);
        let b = scene.spawn_child(root);
        let grandchild = scene.spawn_child(a);

        let kids: Vec<NodeId> = scene.children(root).collect();
        assert_eq!(kids, vec![a, b]);
        assert!(!kids.contains(&grandchild));
    }

    #[test]
    fn world_affine_composes_parent_translation() {
        let mut scene = SceneGraph::new();
        let root = scene.spawn();
        scene.node_mut(root).transform.position = Position::new(100.0, 50.0);
        let child = scene.spawn_child(root);
        scene.node_mut(child).transform.position = Position::new(10.0, 5.0);

        let p = scene.world_affine(child).apply(Position::default());
        assert!((p.x - 110.0).abs() < 1e-5);
        assert!((p.y - 55.0).abs() < 1e-5);
    }
}
