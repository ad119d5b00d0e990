//! End-to-end editing behaviour through the editor controller.

use collage_core::imaging::{DataUrlResolver, encode_png};
use collage_core::{
    Editor, EditorConfig, Layer, MAX_HISTORY, MemoryStore, Modifiers, PointerEvent, SnapGuide,
    Tool,
};
use image::{Rgba, RgbaImage};
use kurbo::{Point, Rect, Vec2};
use pollster::block_on;
use std::sync::Arc;

type TestEditor = Editor<MemoryStore, DataUrlResolver>;

fn editor() -> TestEditor {
    Editor::new(
        Arc::new(MemoryStore::new()),
        Arc::new(DataUrlResolver),
        EditorConfig::default(),
    )
}

fn checker(w: u32, h: u32) -> RgbaImage {
    RgbaImage::from_fn(w, h, |x, y| {
        if (x + y) % 2 == 0 {
            Rgba([255, 255, 255, 255])
        } else {
            Rgba([x as u8, y as u8, 40, 255])
        }
    })
}

fn png(image: &RgbaImage) -> Vec<u8> {
    encode_png(image).unwrap()
}

fn drag(editor: &mut TestEditor, from: (f64, f64), to: (f64, f64)) {
    editor.handle_pointer(PointerEvent::down(from.0, from.1));
    editor.handle_pointer(PointerEvent::moved(to.0, to.1));
    editor.handle_pointer(PointerEvent::up(to.0, to.1));
}

#[test]
fn test_snap_commits_exact_grid_value() {
    let mut editor = editor();
    let ids = editor.import_images(vec![png(&checker(100, 100))]);

    // Candidate x = 47 is 3 units from 50; y = 120 is 20 from every line
    drag(&mut editor, (10.0, 10.0), (57.0, 130.0));
    let layer = editor.canvas().layers().get(&ids[0]).unwrap();
    assert_eq!(layer.position(), Point::new(50.0, 120.0));
}

#[test]
fn test_snap_threshold_scales_with_zoom() {
    let mut editor = editor();
    let ids = editor.import_images(vec![png(&checker(100, 100))]);
    editor.zoom_in();
    editor.zoom_in();
    editor.zoom_in(); // 1.728x, threshold ~5.8 units

    let scale = editor.canvas().viewport().scale;
    let grab = Point::new(10.0 * scale, 10.0 * scale);
    // Candidate x = 43: 7 units from 50, beyond the zoomed threshold
    let target = editor.canvas().viewport().canvas_to_screen(Point::new(53.0, 130.0));
    editor.handle_pointer(PointerEvent::down(grab.x, grab.y));
    editor.handle_pointer(PointerEvent::moved(target.x, target.y));

    assert!(editor.overlay().guides.iter().all(|g| !matches!(g, SnapGuide::Vertical(_))));
    editor.handle_pointer(PointerEvent::up(target.x, target.y));
    let x = editor.canvas().layers().get(&ids[0]).unwrap().position().x;
    assert!((x - 43.0).abs() < 1e-9);
}

#[test]
fn test_crop_excise_atomic_and_undoable() {
    let mut editor = editor();
    let source = checker(40, 30);
    let ids = editor.import_images(vec![png(&source)]);
    let id = ids[0].clone();
    let history_before = editor.history_len();

    editor.set_tool(Tool::Crop);
    drag(&mut editor, (5.0, 4.0), (25.0, 20.0));

    let layers = editor.canvas().layers();
    assert_eq!(layers.len(), 2);
    assert_eq!(editor.history_len(), history_before + 1);

    let excised = layers.selected().unwrap();
    assert_ne!(excised.id(), &id);
    assert_eq!(excised.bounds(), Rect::new(5.0, 4.0, 25.0, 20.0));
    for y in 0..16 {
        for x in 0..20 {
            assert_eq!(excised.pixels().get_pixel(x, y), source.get_pixel(x + 5, y + 4));
        }
    }

    let punched = layers.get(&id).unwrap();
    for y in 4..20 {
        for x in 5..25 {
            assert_eq!(punched.pixels().get_pixel(x, y)[3], 0);
        }
    }
    assert_eq!(punched.pixels().get_pixel(0, 0), source.get_pixel(0, 0));

    assert!(editor.undo());
    let layers = editor.canvas().layers();
    assert_eq!(layers.len(), 1);
    let restored = layers.get(&id).unwrap();
    assert_eq!(restored.pixels().as_ref(), &source);
    assert!(!restored.name().ends_with("(Cropped)"));
}

#[test]
fn test_history_keeps_last_twenty() {
    let mut editor = editor();
    editor.import_images(vec![png(&checker(10, 10))]);
    // 1 import + 24 duplicates = 25 snapshot-triggering operations
    for _ in 0..24 {
        editor.duplicate_selected();
    }
    assert_eq!(editor.canvas().layers().len(), 25);
    assert_eq!(editor.history_len(), MAX_HISTORY);

    let mut undone = 0;
    while editor.undo() {
        undone += 1;
    }
    assert_eq!(undone, 20);
    // The five oldest states (0..=4 layers) are gone
    assert_eq!(editor.canvas().layers().len(), 5);
}

#[test]
fn test_drag_then_undo_restores_pre_drag_position() {
    let mut editor = editor();
    let ids = editor.import_images(vec![png(&checker(30, 30))]);
    editor.handle_pointer(PointerEvent::down(5.0, 5.0));
    for step in 1..=10 {
        let d = step as f64 * 17.0;
        editor.handle_pointer(PointerEvent::moved(5.0 + d, 5.0 + d));
    }
    editor.handle_pointer(PointerEvent::up(175.0, 175.0));
    assert_ne!(editor.canvas().layers().get(&ids[0]).unwrap().position(), Point::ZERO);

    editor.undo();
    assert_eq!(editor.canvas().layers().get(&ids[0]).unwrap().position(), Point::ZERO);
}

#[test]
fn test_pan_moves_viewport_without_history() {
    let mut editor = editor();
    drag(&mut editor, (300.0, 300.0), (340.0, 250.0));
    assert_eq!(editor.canvas().viewport().offset, Vec2::new(40.0, -50.0));
    assert!(!editor.can_undo());
}

#[test]
fn test_zoom_anchoring() {
    let mut editor = editor();
    editor.handle_pointer(PointerEvent::Scroll {
        position: Point::new(10.0, 10.0),
        delta: Vec2::new(0.0, 3.0),
    });
    let anchor = Point::new(321.0, 123.0);
    for factor_sign in [-1.0, -1.0, 1.0, -1.0] {
        let before = editor.canvas().viewport().screen_to_canvas(anchor);
        editor.handle_pointer(PointerEvent::Scroll {
            position: anchor,
            delta: Vec2::new(0.0, factor_sign),
        });
        let after = editor.canvas().viewport().screen_to_canvas(anchor);
        assert!((before - after).hypot() < 1e-9);
    }
}

#[test]
fn test_erase_then_draw() {
    let mut editor = editor();
    editor.import_images(vec![png(&checker(40, 40)), png(&checker(40, 40))]);

    editor.set_tool(Tool::Erase);
    // Second layer sits at (50, 50)
    drag(&mut editor, (60.0, 60.0), (70.0, 70.0));
    assert_eq!(editor.canvas().layers().len(), 1);

    editor.set_tool(Tool::Draw);
    editor.handle_pointer(PointerEvent::down(200.0, 200.0));
    for i in 0..5 {
        editor.handle_pointer(PointerEvent::moved(200.0 + i as f64 * 10.0, 200.0));
    }
    editor.handle_pointer(PointerEvent::up(240.0, 200.0));

    let layers: Vec<&Layer> = editor.canvas().layers().iter().collect();
    assert_eq!(layers.len(), 2);
    assert_eq!(layers[1].name(), "Marker");
    assert_eq!(layers[1].position(), Point::new(198.0, 198.0));
}

#[test]
fn test_additive_press_leaves_selection() {
    let mut editor = editor();
    let ids = editor.import_images(vec![png(&checker(40, 40)), png(&checker(40, 40))]);
    assert_eq!(editor.canvas().layers().selection(), Some(&ids[1]));

    editor.handle_pointer(PointerEvent::Down {
        position: Point::new(10.0, 10.0),
        modifiers: Modifiers::SHIFT,
    });
    editor.handle_pointer(PointerEvent::up(10.0, 10.0));
    assert_eq!(editor.canvas().layers().selection(), Some(&ids[1]));
}

#[test]
fn test_json_round_trip() {
    let mut editor = editor();
    let ids = editor.import_images(vec![png(&checker(12, 8)), png(&checker(6, 6))]);
    editor.toggle_visible(&ids[0]);
    editor.rename(&ids[1], "Detail");
    let json = editor.export_json().unwrap();

    let mut other = self::editor();
    block_on(other.load_json(&json)).unwrap();

    let a: Vec<&Layer> = editor.canvas().layers().iter().collect();
    let b: Vec<&Layer> = other.canvas().layers().iter().collect();
    assert_eq!(a.len(), b.len());
    for (a, b) in a.iter().zip(&b) {
        assert_eq!(a.position(), b.position());
        assert_eq!(a.name(), b.name());
        assert_eq!(a.visible(), b.visible());
        assert_eq!(a.size(), b.size());
    }
}
