use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use image::{Rgba, RgbaImage};
use pixlens::capture::{ImageSource, LoadedImage};
use pixlens::config::ViewerConfig;
use pixlens::domain::{
    CursorHint, InteractionState, Point, Rect, SelectionMode, SelectionState, Size,
};
use pixlens::session::{
    EventStatus, FRAME_INTERVAL, ImageViewport, InputEvent, Modifiers, PointerButton,
    SelectionOutput, drive_animation,
};

const EPS: f64 = 1e-6;

type Selections = Rc<RefCell<Vec<SelectionOutput>>>;

fn solid_image(w: u32, h: u32) -> LoadedImage {
    LoadedImage::new(RgbaImage::from_pixel(w, h, Rgba([90, 120, 150, 255]))).unwrap()
}

fn viewport(config: ViewerConfig, canvas: Size, image: (u32, u32)) -> (ImageViewport, Selections) {
    let mut vp = ImageViewport::new(config, canvas);
    let selections: Selections = Rc::default();
    let sink = Rc::clone(&selections);
    vp.on_select(move |out| sink.borrow_mut().push(out));

    let ticket = vp.set_image_source(ImageSource::Path("test.png".into()));
    assert!(vp.image_loaded(ticket, solid_image(image.0, image.1)));
    (vp, selections)
}

fn drag(vp: &mut ImageViewport, from: Point, to: Point) {
    vp.handle_event(InputEvent::press(from.x, from.y));
    vp.handle_event(InputEvent::move_to(to.x, to.y));
    vp.handle_event(InputEvent::PointerUp);
}

fn assert_rect_near(actual: Rect, expected: Rect) {
    assert!(
        (actual.x - expected.x).abs() < EPS
            && (actual.y - expected.y).abs() < EPS
            && (actual.w - expected.w).abs() < EPS
            && (actual.h - expected.h).abs() < EPS,
        "{actual:?} != {expected:?}"
    );
}

#[test]
fn fit_places_wide_image_centered() {
    let (vp, _) = viewport(ViewerConfig::default(), Size::new(800.0, 800.0), (1000, 500));
    let base = vp.view().base;
    assert!((base.display_width - 800.0).abs() < EPS);
    assert!((base.display_height - 400.0).abs() < EPS);
    assert!((base.offset_x - 0.0).abs() < EPS);
    assert!((base.offset_y - 200.0).abs() < EPS);
}

#[test]
fn zoom_in_keeps_canvas_center_fixed() {
    let (mut vp, _) = viewport(ViewerConfig::default(), Size::new(800.0, 800.0), (1000, 500));
    let pivot = Point::new(400.0, 400.0);
    let before = vp.view().to_image(pivot);

    vp.zoom_in();

    assert!((vp.state().zoom() - 1.2).abs() < EPS);
    let after = vp.view().to_image(pivot);
    assert!(before.distance(after) < 1.0);

    vp.zoom_out();
    assert!((vp.state().zoom() - 1.0).abs() < EPS);
}

#[test]
fn zoom_never_leaves_bounds() {
    let (mut vp, _) = viewport(ViewerConfig::default(), Size::new(800.0, 600.0), (640, 480));
    for _ in 0..40 {
        vp.zoom_in();
    }
    assert!((vp.state().zoom() - 15.0).abs() < EPS);
    for _ in 0..80 {
        vp.handle_event(InputEvent::wheel(10.0, 10.0, 120.0));
    }
    assert!((vp.state().zoom() - 1.0).abs() < EPS);
    assert_eq!(vp.state().offset(), Point::ORIGIN);
}

#[test]
fn wheel_zooms_around_cursor() {
    let (mut vp, _) = viewport(ViewerConfig::default(), Size::new(800.0, 800.0), (1000, 1000));
    let cursor = Point::new(600.0, 300.0);
    let before = vp.view().to_image(cursor);

    assert_eq!(vp.handle_event(InputEvent::wheel(cursor.x, cursor.y, -1.0)), EventStatus::Captured);

    assert!((vp.state().zoom() - 1.1).abs() < EPS);
    assert!(before.distance(vp.view().to_image(cursor)) < 1.0);

    // a purely horizontal wheel event counts as zoom out
    vp.handle_event(InputEvent::wheel(cursor.x, cursor.y, 0.0));
    assert!((vp.state().zoom() - 1.0).abs() < EPS);

    vp.handle_event(InputEvent::wheel(cursor.x, cursor.y, f64::NAN));
    assert!((vp.state().zoom() - 1.0).abs() < EPS);
}

#[test]
fn reset_zoom_returns_to_fit() {
    let (mut vp, _) = viewport(ViewerConfig::default(), Size::new(800.0, 800.0), (1000, 1000));
    vp.zoom_in();
    vp.zoom_in();
    vp.reset_zoom();
    assert_eq!(vp.state().zoom(), 1.0);
    assert_eq!(vp.state().offset(), Point::ORIGIN);
}

#[test]
fn pan_stays_within_overscan() {
    let (mut vp, _) = viewport(ViewerConfig::default(), Size::new(800.0, 800.0), (1000, 1000));
    vp.zoom_in();
    vp.zoom_in();

    let status = vp.handle_event(InputEvent::PointerDown {
        position: Point::new(400.0, 400.0),
        button: PointerButton::Middle,
        modifiers: Modifiers::NONE,
    });
    assert_eq!(status, EventStatus::Captured);
    assert_eq!(vp.interaction(), InteractionState::Panning);

    vp.handle_event(InputEvent::move_to(-10_000.0, 10_000.0));
    let view = vp.view();
    let max_pan = 1000.0 * view.base.scale * vp.state().zoom() - view.base.display_width;
    let offset = vp.state().offset();
    assert!((offset.x + max_pan).abs() < EPS, "x pinned to the far edge");
    assert_eq!(offset.y, 0.0);

    vp.handle_event(InputEvent::PointerUp);
    assert_eq!(vp.interaction(), InteractionState::Idle);
    assert_eq!(vp.selection(), SelectionState::None);
}

#[test]
fn free_drag_emits_once_after_pulse() {
    let (mut vp, selections) =
        viewport(ViewerConfig::default(), Size::new(800.0, 800.0), (1000, 500));

    drag(&mut vp, Point::new(240.0, 320.0), Point::new(80.0, 240.0));

    assert!(vp.is_animating());
    assert_eq!(vp.selection(), SelectionState::Confirmed(Rect::new(80.0, 240.0, 160.0, 80.0)));
    assert_eq!(vp.interaction(), InteractionState::Disabled);
    assert_eq!(vp.cursor(), CursorHint::Wait);
    assert!(selections.borrow().is_empty());

    // input is ignored while the pulse runs
    assert_eq!(vp.handle_event(InputEvent::press(10.0, 10.0)), EventStatus::Ignored);

    let t0 = Instant::now();
    assert!(vp.tick(t0));
    assert!(vp.tick(t0 + Duration::from_millis(200)));
    assert!(selections.borrow().is_empty());
    assert!(!vp.tick(t0 + Duration::from_millis(400)));

    let selections = selections.borrow();
    assert_eq!(selections.len(), 1);
    let out = &selections[0];
    assert_rect_near(out.screen_rect, Rect::new(80.0, 240.0, 160.0, 80.0));
    assert_rect_near(out.original_rect, Rect::new(100.0, 50.0, 200.0, 100.0));
    assert!(out.snapshot.starts_with("data:image/png;base64,"));

    assert!(!vp.is_animating());
    assert_eq!(vp.selection(), SelectionState::None);
    assert_eq!(vp.cursor(), CursorHint::Crosshair);
    assert!(!vp.tick(t0 + Duration::from_secs(1)));
}

#[test]
fn tiny_drags_are_discarded() {
    let (mut vp, selections) =
        viewport(ViewerConfig::default(), Size::new(800.0, 800.0), (1000, 500));

    drag(&mut vp, Point::new(300.0, 300.0), Point::new(309.0, 400.0));
    drag(&mut vp, Point::new(300.0, 300.0), Point::new(400.0, 305.0));
    // a plain click
    vp.handle_event(InputEvent::press(300.0, 300.0));
    vp.handle_event(InputEvent::PointerLeave);

    assert!(!vp.is_animating());
    assert!(!vp.tick(Instant::now()));
    assert!(selections.borrow().is_empty());
    assert_eq!(vp.selection(), SelectionState::None);
}

#[test]
fn fixed_box_emits_immediately_and_stays_inside() {
    let config = ViewerConfig {
        use_fixed_selection_box: true,
        fixed_selection_size_percentage: 0.2,
        ..ViewerConfig::default()
    };
    let (mut vp, selections) = viewport(config, Size::new(800.0, 800.0), (1000, 1000));
    assert_eq!(vp.cursor(), CursorHint::ZoomIn);

    // screen (8, 8) is image (10, 10) at scale 0.8
    assert_eq!(vp.handle_event(InputEvent::press(8.0, 8.0)), EventStatus::Captured);
    assert!(!vp.is_animating());

    let selections = selections.borrow();
    assert_eq!(selections.len(), 1);
    assert_rect_near(selections[0].original_rect, Rect::new(0.0, 0.0, 200.0, 200.0));
    assert_rect_near(selections[0].screen_rect, Rect::new(0.0, 0.0, 160.0, 160.0));
    assert!(!selections[0].snapshot.is_empty());
    drop(selections);

    // pointer-up after a fixed box does nothing
    assert_eq!(vp.handle_event(InputEvent::PointerUp), EventStatus::Ignored);
}

#[test]
fn fixed_box_outside_image_is_ignored() {
    let config = ViewerConfig {
        use_fixed_selection_box: true,
        ..ViewerConfig::default()
    };
    // image covers y in [200, 600]
    let (mut vp, selections) = viewport(config, Size::new(800.0, 800.0), (1000, 500));

    assert_eq!(vp.handle_event(InputEvent::press(400.0, 100.0)), EventStatus::Ignored);
    assert!(selections.borrow().is_empty());

    vp.handle_event(InputEvent::press(799.0, 599.0));
    let selections = selections.borrow();
    assert_eq!(selections.len(), 1);
    let r = selections[0].original_rect;
    assert!(r.right() <= 1000.0 + EPS && r.bottom() <= 500.0 + EPS);
    assert!((r.w - 200.0).abs() < EPS && (r.h - 100.0).abs() < EPS);
}

#[test]
fn enhancing_disables_input() {
    let (mut vp, selections) =
        viewport(ViewerConfig::default(), Size::new(800.0, 800.0), (1000, 500));
    vp.set_enhancing(true);

    assert_eq!(vp.cursor(), CursorHint::Wait);
    assert_eq!(vp.handle_event(InputEvent::press(100.0, 300.0)), EventStatus::Ignored);
    assert_eq!(vp.handle_event(InputEvent::move_to(300.0, 400.0)), EventStatus::Ignored);
    assert_eq!(vp.handle_event(InputEvent::wheel(400.0, 400.0, -1.0)), EventStatus::Captured);
    assert_eq!(vp.state().zoom(), 1.0);

    vp.set_enhancing(false);
    drag(&mut vp, Point::new(100.0, 300.0), Point::new(300.0, 400.0));
    assert!(vp.is_animating());
    assert!(selections.borrow().is_empty());
}

#[test]
fn enhancing_cancels_drag_in_progress() {
    let (mut vp, _) = viewport(ViewerConfig::default(), Size::new(800.0, 800.0), (1000, 500));
    vp.handle_event(InputEvent::press(100.0, 300.0));
    vp.handle_event(InputEvent::move_to(300.0, 400.0));
    vp.set_enhancing(true);
    assert_eq!(vp.selection(), SelectionState::None);
}

#[test]
fn teardown_cancels_pending_confirmation() {
    let (mut vp, selections) =
        viewport(ViewerConfig::default(), Size::new(800.0, 800.0), (1000, 500));
    drag(&mut vp, Point::new(100.0, 300.0), Point::new(300.0, 400.0));
    let t0 = Instant::now();
    vp.tick(t0);

    vp.teardown();

    assert!(!vp.is_animating());
    assert!(!vp.tick(t0 + Duration::from_secs(1)));
    assert!(selections.borrow().is_empty());
}

#[test]
fn new_image_cancels_pending_confirmation() {
    let (mut vp, selections) =
        viewport(ViewerConfig::default(), Size::new(800.0, 800.0), (1000, 500));
    vp.zoom_in();
    drag(&mut vp, Point::new(100.0, 300.0), Point::new(300.0, 400.0));
    assert!(vp.is_animating());

    let ticket = vp.set_image_source(ImageSource::Path("other.png".into()));
    assert!(!vp.is_animating());
    assert!(vp.image().is_none());

    assert!(vp.image_loaded(ticket, solid_image(200, 200)));
    assert_eq!(vp.state().zoom(), 1.0);
    assert!(!vp.tick(Instant::now() + Duration::from_secs(1)));
    assert!(selections.borrow().is_empty());
}

#[test]
fn stale_image_load_is_dropped() {
    let mut vp = ImageViewport::new(ViewerConfig::default(), Size::new(100.0, 100.0));
    let first = vp.set_image_source(ImageSource::Path("first.png".into()));
    let second = vp.set_image_source(ImageSource::Path("second.png".into()));
    assert_eq!(second.source(), &ImageSource::Path("second.png".into()));

    assert!(!vp.image_loaded(first, solid_image(10, 10)));
    assert!(vp.image().is_none());
    assert!(vp.image_loaded(second, solid_image(20, 10)));
    assert_eq!(vp.image().unwrap().width(), 20);
}

#[test]
fn nothing_happens_before_image_loads() {
    let mut vp = ImageViewport::new(ViewerConfig::default(), Size::new(800.0, 600.0));
    vp.resize(Size::new(800.0, 600.0));
    vp.resize(Size::new(0.0, 0.0));
    vp.resize(Size::new(400.0, 300.0));
    vp.zoom_in();
    assert_eq!(vp.handle_event(InputEvent::press(10.0, 10.0)), EventStatus::Ignored);
    assert_eq!(vp.handle_event(InputEvent::wheel(10.0, 10.0, -1.0)), EventStatus::Captured);
    assert_eq!(vp.state().zoom(), 1.0);
    assert!(vp.view().base.is_neutral());
}

#[test]
fn backing_store_follows_pixel_ratio() {
    let config = ViewerConfig {
        device_pixel_ratio: 2.0,
        ..ViewerConfig::default()
    };
    let (mut vp, _) = viewport(config, Size::new(300.0, 200.0), (30, 20));
    let pixmap = vp.pixmap().unwrap();
    assert_eq!((pixmap.width(), pixmap.height()), (600, 400));

    // transform math stays in logical pixels
    assert!((vp.view().base.display_width - 300.0).abs() < EPS);

    vp.set_device_pixel_ratio(1.0);
    assert_eq!(vp.pixmap().unwrap().width(), 300);
}

#[test]
fn historical_selection_is_drawn_when_idle() {
    let config = ViewerConfig {
        history_color: pixlens::config::OverlayColor::rgba(1.0, 0.0, 0.0, 1.0),
        ..ViewerConfig::default()
    };
    let (mut vp, _) = viewport(config, Size::new(100.0, 100.0), (100, 100));
    vp.set_historical_selection(Some(Rect::new(20.0, 40.0, 60.0, 40.0)));
    assert_eq!(vp.historical_selection(), Some(Rect::new(20.0, 40.0, 60.0, 40.0)));

    // bottom edge of the ghost outline
    let px = vp.pixmap().unwrap().pixel(50, 80).unwrap();
    assert!(px.red() > 200 && px.green() < 100, "{px:?}");
}

#[test]
fn switching_mode_updates_cursor() {
    let (mut vp, _) = viewport(ViewerConfig::default(), Size::new(100.0, 100.0), (100, 100));
    vp.set_selection_mode(SelectionMode::FixedBox { percentage: 3.0 });
    assert_eq!(vp.selection_mode(), SelectionMode::FixedBox { percentage: 1.0 });
    assert_eq!(vp.cursor(), CursorHint::ZoomIn);
    vp.set_selection_mode(SelectionMode::FreeDrag);
    assert_eq!(vp.cursor(), CursorHint::Crosshair);
}

#[tokio::test]
async fn driver_finalizes_selection() {
    let config = ViewerConfig {
        confirm_duration_ms: 40,
        ..ViewerConfig::default()
    };
    let (mut vp, selections) = viewport(config, Size::new(800.0, 800.0), (1000, 500));
    drag(&mut vp, Point::new(100.0, 300.0), Point::new(300.0, 400.0));

    drive_animation(&mut vp, FRAME_INTERVAL).await;

    assert!(!vp.is_animating());
    assert_eq!(selections.borrow().len(), 1);
}

#[tokio::test]
async fn loads_encoded_bytes() {
    let mut png = Vec::new();
    RgbaImage::from_pixel(4, 3, Rgba([1, 2, 3, 255]))
        .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
        .unwrap();

    let mut vp = ImageViewport::new(ViewerConfig::default(), Size::new(40.0, 30.0));
    assert!(vp.load_image(ImageSource::Bytes(png.into())).await.unwrap());
    assert_eq!(vp.image().unwrap().size(), Size::new(4.0, 3.0));
}

#[test]
fn default_config_draws_label_text() {
    let mut vp = ImageViewport::new(ViewerConfig::default(), Size::new(400.0, 400.0));
    let ticket = vp.set_image_source(ImageSource::Path("black.png".into()));
    let black = LoadedImage::new(RgbaImage::from_pixel(400, 400, Rgba([0, 0, 0, 255]))).unwrap();
    assert!(vp.image_loaded(ticket, black));

    drag(&mut vp, Point::new(100.0, 100.0), Point::new(300.0, 300.0));
    assert!(matches!(vp.selection(), SelectionState::Confirmed(_)));

    // label box spans y 86..98 above the rect; everything under it is black
    let pixmap = vp.pixmap().unwrap();
    let lit = (86..98)
        .flat_map(|y| (100..220).map(move |x| (x, y)))
        .filter_map(|(x, y)| pixmap.pixel(x, y))
        .filter(|p| p.red() > 40 && p.green() > 40 && p.blue() > 40)
        .count();
    assert!(lit > 0, "label text left no light pixels");
}

#[test]
fn zoomed_and_panned_selection_maps_back_to_image() {
    // 1000px image fitted into 800px: base scale 0.8, no letterboxing
    let (mut vp, selections) =
        viewport(ViewerConfig::default(), Size::new(800.0, 800.0), (1000, 1000));

    // 0.8 * 1.2 * 1.2 = 1.152; the canvas center (image 500) stays put: 400 - 576 = -176
    vp.zoom_in();
    vp.zoom_in();
    assert!((vp.state().zoom() - 1.44).abs() < EPS);
    assert!(vp.state().offset().distance(Point::new(-176.0, -176.0)) < EPS);

    vp.handle_event(InputEvent::PointerDown {
        position: Point::new(400.0, 400.0),
        button: PointerButton::Middle,
        modifiers: Modifiers::NONE,
    });
    vp.handle_event(InputEvent::move_to(450.0, 380.0));
    vp.handle_event(InputEvent::PointerUp);
    assert!(vp.state().offset().distance(Point::new(-126.0, -196.0)) < EPS);

    drag(&mut vp, Point::new(200.0, 250.0), Point::new(600.0, 500.0));
    let t0 = Instant::now();
    vp.tick(t0);
    assert!(!vp.tick(t0 + Duration::from_millis(400)));

    let selections = selections.borrow();
    assert_eq!(selections.len(), 1);
    let out = &selections[0];
    assert_rect_near(out.screen_rect, Rect::new(200.0, 250.0, 400.0, 250.0));
    // image = (screen - pan) / 1.152
    assert_rect_near(
        out.original_rect,
        Rect::new(326.0 / 1.152, 446.0 / 1.152, 400.0 / 1.152, 250.0 / 1.152),
    );
    assert!(out.snapshot.starts_with("data:image/png;base64,"));
}
