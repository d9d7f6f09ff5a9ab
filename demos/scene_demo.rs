use std::cell::RefCell;
use std::rc::Rc;

use uuid::Uuid;

use strata_engine::bounds::BoundingBox;
use strata_engine::scene_objects::label::LabelRenderer;
use strata_engine::scene_objects::sprite::SpriteRenderer;
use strata_engine::text::TextMeasurer;
use strata_engine::text_layout::{TextBitmap, TextStyle};
use strata_engine::traits::DrawBackend;
use strata_engine::utils::{Position, Rectangle, Size};
use strata_engine::{RenderLayer, RenderPipeline, SceneGraph, Viewport};

/// Prints each draw instead of touching a GPU, so the demo runs
/// anywhere.
struct ConsoleBackend;

impl DrawBackend for ConsoleBackend {
    fn upload_text_texture(&mut self, id: Uuid, bitmap: &TextBitmap, revision: u64) {
        println!(
            "upload text texture {id} ({}x{}, revision {revision})",
            bitmap.width, bitmap.height
        );
    }

    fn draw_textured_quad(&mut self, texture: Uuid, quad: &BoundingBox, _tint: [f32; 4]) {
        let min = quad.min();
        println!(
            "draw {texture} at ({:.0},{:.0}) {:.0}x{:.0}",
            min.x,
            min.y,
            quad.width(),
            quad.height()
        );
    }
}

/// Stand-in metrics so the demo ships without a font file.
struct DemoMeasurer;

impl TextMeasurer for DemoMeasurer {
    fn measure(&self, text: &str, _max_width: Option<f32>) -> Size {
        Size::new(text.chars().count() as f32 * 9.0, 18.0)
    }

    fn line_height(&self) -> f32 {
        18.0
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut scene = SceneGraph::new();

    let background_layer = Rc::new(
        RenderLayer::new("background", 10).with_parallax(Position::new(0.5, 0.5)),
    );
    let hud_layer = Rc::new(RenderLayer::new("hud", -10));

    let background = scene.spawn();
    scene.node_mut(background).base_size = Size::new(1600.0, 1200.0);
    scene.node_mut(background).layer = Some(background_layer);

    let player = scene.spawn();
    scene.node_mut(player).base_size = Size::new(48.0, 48.0);
    scene.node_mut(player).transform.position = Position::new(400.0, 300.0);
    scene.node_mut(player).transform.anchor = Position::new(0.5, 0.5);
    scene.node_mut(player).z = 1.0;

    let shadow = scene.spawn_child(player);
    scene.node_mut(shadow).base_size = Size::new(48.0, 12.0);
    scene.node_mut(shadow).transform.position = Position::new(0.0, 24.0);
    scene.node_mut(shadow).z = 2.0;

    let score = scene.spawn();
    scene.node_mut(score).base_size = Size::new(200.0, 30.0);
    scene.node_mut(score).transform.position = Position::new(10.0, 10.0);
    scene.node_mut(score).layer = Some(hud_layer);

    let mut pipeline = RenderPipeline::new();
    pipeline.subscribe(
        background,
        Rc::new(RefCell::new(SpriteRenderer::new(background, Uuid::new_v4(), 2))),
        0,
    );
    pipeline.subscribe(
        player,
        Rc::new(RefCell::new(SpriteRenderer::new(player, Uuid::new_v4(), 2))),
        0,
    );
    let mut shadow_sprite = SpriteRenderer::new(shadow, Uuid::new_v4(), 2);
    shadow_sprite.set_tint([0.0, 0.0, 0.0, 0.4]);
    pipeline.subscribe(shadow, Rc::new(RefCell::new(shadow_sprite)), 0);

    let label = Rc::new(RefCell::new(LabelRenderer::new(
        score,
        Rc::new(DemoMeasurer),
        TextStyle::default(),
        2,
    )));
    label.borrow_mut().set_text("score: 1200");
    pipeline.subscribe(score, label, 0);

    let mut viewport = Viewport::new(Rectangle::new(0.0, 0.0, 800.0, 600.0));
    viewport.set_position(Position::new(120.0, 40.0));

    let mut backend = ConsoleBackend;
    let drawn = pipeline.run_frame(&scene, &[viewport], &mut backend)?;
    println!("frame complete: {drawn} instructions");
    Ok(())
}
