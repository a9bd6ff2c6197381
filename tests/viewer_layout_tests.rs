use stereo_plate::coords::{FullUv, pointer_to_full_uv};
use stereo_plate::crop::CropRect;
use stereo_plate::processing::layout::{PixelRect, ViewportCompositor, compose_viewport, fit_content};

fn rect_eq(a: PixelRect, b: (u32, u32, u32, u32)) {
    assert_eq!(
        (a.x, a.y, a.width, a.height),
        b,
        "rect mismatch: {:?} vs {:?}",
        a,
        b
    );
}

#[test]
fn full_bleed_when_aspect_matches() {
    // 2:1 content on 800x400
    let g = compose_viewport(800, 400, 2.0, None);
    rect_eq(g.clear, (0, 0, 800, 400));
    rect_eq(g.content, (0, 0, 800, 400));
    assert_eq!(g.visible, g.content);
}

#[test]
fn square_content_is_pillarboxed() {
    // 1:1 content on 800x400: 400x400 at x = (800-400)/2 = 200
    let g = compose_viewport(800, 400, 1.0, None);
    rect_eq(g.content, (200, 0, 400, 400));
}

#[test]
fn wide_content_is_letterboxed_with_floor() {
    // 3:1 content on 1000x1000: h = floor(1000/3) = 333, y = floor(667/2) = 333
    let rect = fit_content(1000, 1000, 3.0);
    rect_eq(rect, (0, 333, 1000, 333));
}

#[test]
fn crop_intersects_content() {
    // content 400x400 at x=200; crop covers the left half of the surface
    let crop = CropRect::new(0.0, 0.0, 0.5, 1.0);
    let g = compose_viewport(800, 400, 1.0, Some(&crop));
    rect_eq(g.visible, (200, 0, 200, 400));
}

#[test]
fn disjoint_crop_is_zero_sized() {
    // crop lies entirely inside the left pillarbox margin
    let crop = CropRect::new(0.0, 0.0, 0.2, 1.0);
    let g = compose_viewport(800, 400, 1.0, Some(&crop));
    assert!(g.visible.width == 0 || g.visible.height == 0);
    assert!(g.is_blank());
}

#[test]
fn compositor_recomputes_idempotently() {
    let mut c = ViewportCompositor::new(2.0, None);
    let a = c.geometry(1920, 1080);
    let b = c.geometry(1920, 1080);
    assert_eq!(a, b);
    c.set_crop(Some(CropRect::new(0.85, 0.85, 0.15, 0.15)));
    assert_eq!(c.crop(), Some(&CropRect::new(0.15, 0.15, 0.85, 0.85)));
    let g = c.geometry(1920, 1080);
    assert!(g.visible.width <= g.content.width);
    assert!(g.visible.height <= g.content.height);
}

#[test]
fn pointer_maps_through_content_rect() {
    let content = fit_content(800, 400, 1.0);
    assert_eq!(pointer_to_full_uv(200.0, 400.0, content), Some(FullUv::new(0.0, 0.0)));
    assert_eq!(pointer_to_full_uv(600.0, 0.0, content), Some(FullUv::new(1.0, 1.0)));
    assert_eq!(pointer_to_full_uv(100.0, 200.0, content), None);
}

#[test]
fn degenerate_surface_yields_empty_geometry() {
    let g = compose_viewport(0, 0, 2.0, None);
    assert!(g.content.is_empty());
    assert!(g.is_blank());
}
