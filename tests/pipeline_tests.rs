use std::cell::RefCell;
use std::rc::Rc;

use anyhow::anyhow;
use uuid::Uuid;

use strata_engine::bounds::BoundingBox;
use strata_engine::pipeline::{InstructionLease, PipelineError, RenderPipeline};
use strata_engine::scene::{NodeId, SceneGraph};
use strata_engine::scene_objects::label::LabelRenderer;
use strata_engine::scene_objects::sprite::SpriteRenderer;
use strata_engine::text::TextMeasurer;
use strata_engine::text_layout::TextStyle;
use strata_engine::traits::{DrawBackend, EntityRenderer};
use strata_engine::utils::{Position, Rectangle, Size};
use strata_engine::viewport::Viewport;
use strata_engine::RenderLayer;

#[derive(Default)]
struct RecordingBackend {
    draws: Vec<Uuid>,
    uploads: Vec<(Uuid, u64)>,
}

impl DrawBackend for RecordingBackend {
    fn upload_text_texture(
        &mut self,
        id: Uuid,
        _bitmap: &strata_engine::text_layout::TextBitmap,
        revision: u64,
    ) {
        self.uploads.push((id, revision));
    }

    fn draw_textured_quad(&mut self, texture: Uuid, _quad: &BoundingBox, _tint: [f32; 4]) {
        self.draws.push(texture);
    }
}

/// Renderer that always fails, standing in for a defective
/// implementation.
struct FailingRenderer {
    entity: NodeId,
}

impl EntityRenderer for FailingRenderer {
    fn next_instruction(
        &mut self,
        _scene: &SceneGraph,
        _viewport: &Viewport,
    ) -> Result<Option<InstructionLease>, PipelineError> {
        Err(PipelineError::Renderer {
            entity: self.entity,
            source: anyhow!("renderer defect"),
        })
    }
}

/// Fixed-advance metrics so label tests need no font asset.
struct FixedMeasurer;

impl TextMeasurer for FixedMeasurer {
    fn measure(&self, text: &str, _max_width: Option<f32>) -> Size {
        Size::new(text.chars().count() as f32 * 10.0, 20.0)
    }

    fn line_height(&self) -> f32 {
        20.0
    }
}

fn viewport() -> Viewport {
    Viewport::new(Rectangle::new(0.0, 0.0, 800.0, 600.0))
}

fn sprite_node(scene: &mut SceneGraph, size: Size, z: f32) -> NodeId {
    let node = scene.spawn();
    scene.node_mut(node).base_size = size;
    scene.node_mut(node).z = z;
    node
}

#[test]
fn zero_size_entity_never_enters_the_display_list() {
    let mut scene = SceneGraph::new();
    let empty = sprite_node(&mut scene, Size::new(0.0, 0.0), 0.0);
    let solid = sprite_node(&mut scene, Size::new(16.0, 16.0), 0.0);

    let mut pipeline = RenderPipeline::new();
    let empty_renderer = Rc::new(RefCell::new(SpriteRenderer::new(empty, Uuid::new_v4(), 4)));
    let solid_texture = Uuid::new_v4();
    let solid_renderer = Rc::new(RefCell::new(SpriteRenderer::new(solid, solid_texture, 4)));
    pipeline.subscribe(empty, empty_renderer, 0);
    pipeline.subscribe(solid, solid_renderer, 0);

    let viewports = [viewport(), viewport()];
    let list = pipeline.build_display_list(&scene, &viewports).unwrap();
    assert_eq!(list.len(), 2); // the solid sprite once per viewport
    assert!(list.entities().all(|e| e == solid));
}

#[test]
fn invisible_entity_is_skipped() {
    let mut scene = SceneGraph::new();
    let node = sprite_node(&mut scene, Size::new(8.0, 8.0), 0.0);
    scene.node_mut(node).visible = false;

    let mut pipeline = RenderPipeline::new();
    let renderer = Rc::new(RefCell::new(SpriteRenderer::new(node, Uuid::new_v4(), 4)));
    pipeline.subscribe(node, renderer, 0);

    let list = pipeline.build_display_list(&scene, &[viewport()]).unwrap();
    assert!(list.is_empty());
}

#[test]
fn priority_orders_renderers_within_an_entity() {
    let mut scene = SceneGraph::new();
    let node = sprite_node(&mut scene, Size::new(32.0, 32.0), 0.0);

    let back_fill = Uuid::new_v4();
    let front_outline = Uuid::new_v4();
    let mut pipeline = RenderPipeline::new();
    // Registration order deliberately reversed: priority must decide.
    pipeline.subscribe(
        node,
        Rc::new(RefCell::new(SpriteRenderer::new(node, front_outline, 4))),
        -100,
    );
    pipeline.subscribe(
        node,
        Rc::new(RefCell::new(SpriteRenderer::new(node, back_fill, 4))),
        100,
    );

    let mut backend = RecordingBackend::default();
    pipeline.run_frame(&scene, &[viewport()], &mut backend).unwrap();
    assert_eq!(backend.draws, vec![back_fill, front_outline]);
}

#[test]
fn comparator_orders_entities_back_to_front() {
    let mut scene = SceneGraph::new();
    // Smaller z draws in front, i.e. later.
    let far = sprite_node(&mut scene, Size::new(8.0, 8.0), 10.0);
    let mid = sprite_node(&mut scene, Size::new(8.0, 8.0), 5.0);
    let near = sprite_node(&mut scene, Size::new(8.0, 8.0), 1.0);

    let far_tex = Uuid::new_v4();
    let mid_tex = Uuid::new_v4();
    let near_tex = Uuid::new_v4();

    let mut pipeline = RenderPipeline::new();
    // Subscribe front-first so the sort has to work for it.
    pipeline.subscribe(near, Rc::new(RefCell::new(SpriteRenderer::new(near, near_tex, 4))), 0);
    pipeline.subscribe(mid, Rc::new(RefCell::new(SpriteRenderer::new(mid, mid_tex, 4))), 0);
    pipeline.subscribe(far, Rc::new(RefCell::new(SpriteRenderer::new(far, far_tex, 4))), 0);

    let mut backend = RecordingBackend::default();
    pipeline.run_frame(&scene, &[viewport()], &mut backend).unwrap();
    assert_eq!(backend.draws, vec![far_tex, mid_tex, near_tex]);
}

#[test]
fn layer_dominates_position_z_across_entities() {
    let mut scene = SceneGraph::new();
    let hud = sprite_node(&mut scene, Size::new(8.0, 8.0), 10.0);
    scene.node_mut(hud).layer = Some(Rc::new(RenderLayer::new("hud", 0)));
    let world = sprite_node(&mut scene, Size::new(8.0, 8.0), 0.0);
    scene.node_mut(world).layer = Some(Rc::new(RenderLayer::new("world", 1)));

    let hud_tex = Uuid::new_v4();
    let world_tex = Uuid::new_v4();
    let mut pipeline = RenderPipeline::new();
    pipeline.subscribe(hud, Rc::new(RefCell::new(SpriteRenderer::new(hud, hud_tex, 4))), 0);
    pipeline.subscribe(world, Rc::new(RefCell::new(SpriteRenderer::new(world, world_tex, 4))), 0);

    let mut backend = RecordingBackend::default();
    pipeline.run_frame(&scene, &[viewport()], &mut backend).unwrap();
    // The hud layer (z 0) draws after the world layer (z 1) despite its
    // larger position z.
    assert_eq!(backend.draws, vec![world_tex, hud_tex]);
}

#[test]
fn viewports_render_as_separate_contiguous_groups() {
    let mut scene = SceneGraph::new();
    let back = sprite_node(&mut scene, Size::new(8.0, 8.0), 2.0);
    let front = sprite_node(&mut scene, Size::new(8.0, 8.0), 1.0);

    let back_tex = Uuid::new_v4();
    let front_tex = Uuid::new_v4();
    let mut pipeline = RenderPipeline::new();
    pipeline.subscribe(front, Rc::new(RefCell::new(SpriteRenderer::new(front, front_tex, 4))), 0);
    pipeline.subscribe(back, Rc::new(RefCell::new(SpriteRenderer::new(back, back_tex, 4))), 0);

    let left = Viewport::new(Rectangle::new(0.0, 0.0, 400.0, 600.0));
    let right = Viewport::new(Rectangle::new(400.0, 0.0, 400.0, 600.0));

    let mut backend = RecordingBackend::default();
    pipeline.run_frame(&scene, &[left, right], &mut backend).unwrap();
    assert_eq!(backend.draws, vec![back_tex, front_tex, back_tex, front_tex]);
}

#[test]
fn exhausted_pool_degrades_for_one_frame_and_recovers() {
    let mut scene = SceneGraph::new();
    let node = sprite_node(&mut scene, Size::new(8.0, 8.0), 0.0);

    // One pooled instruction shared by two subscriptions of the same
    // renderer: the second acquire each frame comes up dry.
    let renderer: Rc<RefCell<SpriteRenderer>> =
        Rc::new(RefCell::new(SpriteRenderer::new(node, Uuid::new_v4(), 1)));
    let mut pipeline = RenderPipeline::new();
    pipeline.subscribe(node, renderer.clone(), 0);
    pipeline.subscribe(node, renderer.clone(), 1);

    let mut backend = RecordingBackend::default();
    let drawn = pipeline.run_frame(&scene, &[viewport()], &mut backend).unwrap();
    assert_eq!(drawn, 1);
    assert_eq!(renderer.borrow().pool().borrow().in_use(), 0);

    // Instructions released at end of frame, so the next frame draws
    // again instead of staying starved.
    let drawn = pipeline.run_frame(&scene, &[viewport()], &mut backend).unwrap();
    assert_eq!(drawn, 1);
}

#[test]
fn renderer_error_aborts_the_build_and_releases_leases() {
    let mut scene = SceneGraph::new();
    let good = sprite_node(&mut scene, Size::new(8.0, 8.0), 0.0);
    let bad = sprite_node(&mut scene, Size::new(8.0, 8.0), 0.0);

    let good_renderer = Rc::new(RefCell::new(SpriteRenderer::new(good, Uuid::new_v4(), 4)));
    let pool = good_renderer.borrow().pool().clone();
    let mut pipeline = RenderPipeline::new();
    pipeline.subscribe(good, good_renderer, 0);
    pipeline.subscribe(bad, Rc::new(RefCell::new(FailingRenderer { entity: bad })), 0);

    let err = pipeline.build_display_list(&scene, &[viewport()]);
    assert!(matches!(err, Err(PipelineError::Renderer { entity, .. }) if entity == bad));
    // The lease the good renderer handed out before the abort went back
    // to its pool when the partial list dropped.
    assert_eq!(pool.borrow().in_use(), 0);
}

#[test]
fn unsubscribe_removes_only_the_matching_registration() {
    let mut scene = SceneGraph::new();
    let node = sprite_node(&mut scene, Size::new(8.0, 8.0), 0.0);

    let keep: Rc<RefCell<SpriteRenderer>> =
        Rc::new(RefCell::new(SpriteRenderer::new(node, Uuid::new_v4(), 4)));
    let drop_me: Rc<RefCell<SpriteRenderer>> =
        Rc::new(RefCell::new(SpriteRenderer::new(node, Uuid::new_v4(), 4)));

    let mut pipeline = RenderPipeline::new();
    let keep_dyn: Rc<RefCell<dyn EntityRenderer>> = keep.clone();
    let drop_dyn: Rc<RefCell<dyn EntityRenderer>> = drop_me.clone();
    pipeline.subscribe(node, keep_dyn, 0);
    pipeline.subscribe(node, drop_dyn.clone(), 0);

    let list = pipeline.build_display_list(&scene, &[viewport()]).unwrap();
    assert_eq!(list.len(), 2);
    list.release();

    pipeline.unsubscribe(node, &drop_dyn);
    let list = pipeline.build_display_list(&scene, &[viewport()]).unwrap();
    assert_eq!(list.len(), 1);
}

#[test]
fn label_uploads_once_per_text_revision() {
    let mut scene = SceneGraph::new();
    let node = scene.spawn();
    scene.node_mut(node).base_size = Size::new(100.0, 40.0);

    let renderer = Rc::new(RefCell::new(LabelRenderer::new(
        node,
        Rc::new(FixedMeasurer),
        TextStyle::default(),
        2,
    )));
    let texture = renderer.borrow().texture();
    renderer.borrow_mut().set_text("score: 0");

    let mut pipeline = RenderPipeline::new();
    pipeline.subscribe(node, renderer.clone(), 0);

    let mut backend = RecordingBackend::default();
    pipeline.run_frame(&scene, &[viewport()], &mut backend).unwrap();
    pipeline.run_frame(&scene, &[viewport()], &mut backend).unwrap();

    // Both frames hand the backend the same revision: nothing was
    // re-rasterized for identical inputs.
    assert_eq!(backend.uploads.len(), 2);
    assert_eq!(backend.uploads[0], (texture, 1));
    assert_eq!(backend.uploads[1], (texture, 1));
    assert_eq!(backend.draws, vec![texture, texture]);

    // A text change bumps the revision exactly once.
    renderer.borrow_mut().set_text("score: 1");
    pipeline.run_frame(&scene, &[viewport()], &mut backend).unwrap();
    assert_eq!(backend.uploads[2], (texture, 2));
}

#[test]
fn front_to_back_order_serves_hit_testing() {
    use strata_engine::RenderOrder;

    let mut scene = SceneGraph::new();
    let far = sprite_node(&mut scene, Size::new(8.0, 8.0), 10.0);
    let near = sprite_node(&mut scene, Size::new(8.0, 8.0), 1.0);

    let mut candidates = vec![far, near];
    let order = RenderOrder::front_to_back();
    candidates.sort_by(|a, b| order.compare(&scene, *a, *b));
    // Frontmost (smallest z) first, the order a picker probes in.
    assert_eq!(candidates, vec![near, far]);
}

#[test]
fn parented_sprites_follow_ancestor_order() {
    let mut scene = SceneGraph::new();
    let panel_back = sprite_node(&mut scene, Size::new(64.0, 64.0), 2.0);
    let panel_front = sprite_node(&mut scene, Size::new(64.0, 64.0), 1.0);

    // Children own z says the opposite of their parents; parents win.
    let child_of_back = scene.spawn_child(panel_back);
    scene.node_mut(child_of_back).base_size = Size::new(8.0, 8.0);
    scene.node_mut(child_of_back).z = -5.0;
    let child_of_front = scene.spawn_child(panel_front);
    scene.node_mut(child_of_front).base_size = Size::new(8.0, 8.0);
    scene.node_mut(child_of_front).z = 5.0;

    let back_tex = Uuid::new_v4();
    let front_tex = Uuid::new_v4();
    let mut pipeline = RenderPipeline::new();
    pipeline.subscribe(
        child_of_back,
        Rc::new(RefCell::new(SpriteRenderer::new(child_of_back, back_tex, 4))),
        0,
    );
    pipeline.subscribe(
        child_of_front,
        Rc::new(RefCell::new(SpriteRenderer::new(child_of_front, front_tex, 4))),
        0,
    );

    let mut backend = RecordingBackend::default();
    pipeline.run_frame(&scene, &[viewport()], &mut backend).unwrap();
    assert_eq!(backend.draws, vec![back_tex, front_tex]);
}

#[test]
fn hit_position_maps_through_resolved_bounds() {
    use strata_engine::resolve_bounds;

    let mut scene = SceneGraph::new();
    let node = sprite_node(&mut scene, Size::new(20.0, 20.0), 0.0);
    scene.node_mut(node).transform.position = Position::new(100.0, 100.0);

    let bb = resolve_bounds(&scene, node, Size::new(20.0, 20.0), &viewport());
    assert!(bb.contains(Position::new(110.0, 110.0)));
    assert!(!bb.contains(Position::new(90.0, 110.0)));
}
