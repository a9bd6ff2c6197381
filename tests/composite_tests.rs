use image::{Rgba, RgbaImage};

use stereo_plate::config::PlateSource;
use stereo_plate::crop::CropRect;
use stereo_plate::picks::PickOrder;
use stereo_plate::render::composite::{ModeKind, WiggleParams, compose_frame};
use stereo_plate::render::loader::load_plate;
use stereo_plate::render::plate::Plate;
use stereo_plate::StereoSession;

/// 8x4 plate: white left half, black right half.
fn white_black() -> Plate {
    let img = RgbaImage::from_fn(8, 4, |x, _| {
        if x < 4 {
            Rgba([255, 255, 255, 255])
        } else {
            Rgba([0, 0, 0, 255])
        }
    });
    Plate::from_rgba(img).unwrap()
}

fn session(mode: ModeKind, crop: Option<CropRect>) -> StereoSession {
    let mut s = StereoSession::new(PickOrder::directional(), mode, WiggleParams::default(), crop);
    s.plate_loaded("synthetic", 8, 4);
    // square half on 100x50: content is 50x50 at x=25
    s.on_resize(100, 50);
    s
}

fn render(s: &StereoSession, plate: &Plate, time: f32) -> RgbaImage {
    compose_frame(&s.mode(), &s.frame_params(), time, &s.geometry(), plate)
}

#[test]
fn anaglyph_puts_left_luma_in_red() {
    let plate = white_black();
    let s = session(ModeKind::Anaglyph, None);
    let frame = render(&s, &plate, 0.0);
    assert_eq!(frame.dimensions(), (100, 50));
    assert_eq!(frame.get_pixel(50, 25).0, [255, 0, 0, 255]);
    // letterbox margins stay black
    assert_eq!(frame.get_pixel(10, 25).0, [0, 0, 0, 255]);
    assert_eq!(frame.get_pixel(90, 25).0, [0, 0, 0, 255]);
}

#[test]
fn crop_blacks_out_pixels_outside_visible_rect() {
    let plate = white_black();
    // left half of the surface: visible x in 25..50
    let s = session(ModeKind::Anaglyph, Some(CropRect::new(0.0, 0.0, 0.5, 1.0)));
    let frame = render(&s, &plate, 0.0);
    assert_eq!(frame.get_pixel(30, 25).0, [255, 0, 0, 255]);
    assert_eq!(frame.get_pixel(60, 25).0, [0, 0, 0, 255]);
}

#[test]
fn disjoint_crop_renders_all_black() {
    let plate = white_black();
    let s = session(ModeKind::Anaglyph, Some(CropRect::new(0.0, 0.0, 0.1, 1.0)));
    let frame = render(&s, &plate, 0.0);
    assert!(frame.pixels().all(|p| p.0 == [0, 0, 0, 255]));
}

#[test]
fn wiggle_alternates_between_halves() {
    let plate = white_black();
    let s = session(ModeKind::Wiggle, None);
    // 3 Hz: t=0 is phase 0 (left), t=0.2 is phase 0.6 (right)
    let left = render(&s, &plate, 0.0);
    let right = render(&s, &plate, 0.2);
    assert_eq!(left.get_pixel(50, 25).0, [255, 255, 255, 255]);
    assert_eq!(right.get_pixel(50, 25).0, [0, 0, 0, 255]);
}

#[test]
fn load_plate_decodes_and_downscales_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plate.png");
    RgbaImage::from_pixel(20, 10, Rgba([10, 20, 30, 255]))
        .save(&path)
        .unwrap();

    let mut stages = Vec::new();
    let plate = load_plate(&PlateSource::Path(path), 8, |s| stages.push(s)).unwrap();
    assert_eq!((plate.width(), plate.height()), (8, 4));
    assert_eq!(stages, ["Loading image..."]);
}

#[test]
fn load_plate_reports_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let source = PlateSource::Path(dir.path().join("missing.png"));
    assert!(load_plate(&source, 4096, |_| {}).is_err());
}
