use std::cmp::Ordering;

use crate::scene::{NodeId, SceneGraph, SceneNode};

/// Draw order over scene nodes. Convention: numerically smaller z sorts
/// later in the frame, i.e. draws more in front; `Ordering::Greater`
/// means the left node draws after the right one. Sorting a display
/// list ascending with this comparator therefore yields back-to-front
/// painter's order.
///
/// Three lexicographic tiers, each walked root-first over the two
/// ancestor chains so that the coarsest level at which the tier's value
/// differs decides the outcome:
///
/// 1. effective render-layer z (inherited down the chain),
/// 2. position z,
/// 3. sprite z (current animation frame depth).
///
/// The `backwards` flag reverses the result for front-to-back passes
/// such as hit testing. Antisymmetry holds for every pair; transitivity
/// across three or more nodes with mixed ancestor structures is not
/// promised beyond that.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOrder {
    pub backwards: bool,
}

impl RenderOrder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inverted order for hit testing: frontmost first.
    pub fn front_to_back() -> Self {
        Self { backwards: true }
    }

    pub fn compare(&self, scene: &SceneGraph, a: NodeId, b: NodeId) -> Ordering {
        let ord = layer_tier(scene, a, b)
            .then_with(|| value_tier(scene, a, b, |n| n.z))
            .then_with(|| value_tier(scene, a, b, |n| n.sprite_z));
        if self.backwards {
            ord.reverse()
        } else {
            ord
        }
    }
}

/// Smaller value draws later. Floats that refuse to compare (NaN) fall
/// back to a tie rather than poisoning the sort.
fn depth_cmp(a: f32, b: f32) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

/// Root-first walk of both chains comparing `value` level by level.
/// Levels past the shorter chain's end are neutral, so a tie over the
/// common prefix falls through to the next tier.
fn value_tier(
    scene: &SceneGraph,
    a: NodeId,
    b: NodeId,
    value: impl Fn(&SceneNode) -> f32,
) -> Ordering {
    let common = scene.depth(a).min(scene.depth(b));
    for level in 0..=common {
        let va = value(scene.node(scene.ancestor_at(a, level)));
        let vb = value(scene.node(scene.ancestor_at(b, level)));
        let ord = depth_cmp(va, vb);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// Same root-first walk for the layer tier, with the effective layer
/// flowing down each chain (a node without its own layer keeps the one
/// inherited so far). The walk continues past the shorter chain's end
/// because a deeper node may still pick up its own layer assignment.
/// When neither chain ever carries a layer the tier is neutral; a chain
/// facing a layered one compares as layer z = 0.
fn layer_tier(scene: &SceneGraph, a: NodeId, b: NodeId) -> Ordering {
    let depth_a = scene.depth(a);
    let depth_b = scene.depth(b);
    let mut layer_a: Option<i32> = None;
    let mut layer_b: Option<i32> = None;
    for level in 0..=depth_a.max(depth_b) {
        if level <= depth_a {
            if let Some(layer) = &scene.node(scene.ancestor_at(a, level)).layer {
                layer_a = Some(layer.z);
            }
        }
        if level <= depth_b {
            if let Some(layer) = &scene.node(scene.ancestor_at(b, level)).layer {
                layer_b = Some(layer.z);
            }
        }
        if layer_a.is_none() && layer_b.is_none() {
            continue;
        }
        let ord = layer_b.unwrap_or(0).cmp(&layer_a.unwrap_or(0));
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}
