use std::f32::consts::FRAC_PI_2;

use stereo_plate::coords::{FullUv, Side};
use stereo_plate::crop::CropRect;
use stereo_plate::picks::{PickOrder, PickOutcome};
use stereo_plate::render::composite::{CompositeMode, ModeKind, WiggleParams};
use stereo_plate::session::LoadState;
use stereo_plate::StereoSession;

fn session(mode: ModeKind) -> StereoSession {
    let mut s = StereoSession::new(
        PickOrder::directional(),
        mode,
        WiggleParams::default(),
        Some(CropRect::default()),
    );
    s.plate_loaded("plate.jpg", 2000, 1000);
    s.on_resize(800, 600);
    s
}

/// Drain every frame that is due without letting the loop reschedule.
fn drain(s: &mut StereoSession) -> usize {
    let mut drawn = 0;
    while s.next_frame().is_some() {
        drawn += 1;
    }
    drawn
}

#[test]
fn picks_are_ignored_before_load() {
    let mut s = StereoSession::new(PickOrder::directional(), ModeKind::Anaglyph, WiggleParams::default(), None);
    assert_eq!(s.load_state(), &LoadState::Loading);
    assert!(s.submit_pick(FullUv::new(0.25, 0.5)).is_none());
    assert_eq!(s.next_pending_label(), "L_inf");
}

#[test]
fn wrong_half_leaves_every_landmark_unset() {
    let mut s = session(ModeKind::Anaglyph);
    let outcome = s.submit_pick(FullUv::new(0.75, 0.5)).unwrap();
    assert!(matches!(
        outcome,
        PickOutcome::WrongHalf {
            expected: Side::Left,
            ..
        }
    ));
    assert_eq!(s.status(), "Pick L_inf on LEFT half.");
    for name in ["L_inf", "R_inf", "L_fg", "R_fg"] {
        assert!(s.picks().get(name).is_none(), "{name} should be unset");
    }
}

#[test]
fn full_pick_sequence_solves_rotation() {
    let mut s = session(ModeKind::Anaglyph);
    assert_eq!(s.status(), "Loaded plate.jpg. Pick: L_inf");

    // left: inf (0.2,0.5) -> fg (0.6,0.5), heading 0
    // right: inf (0.2,0.5) -> fg (0.2,0.9), heading pi/2
    let picks = [
        FullUv::new(0.1, 0.5),
        FullUv::new(0.6, 0.5),
        FullUv::new(0.3, 0.5),
        FullUv::new(0.6, 0.9),
    ];
    let expected_next = ["R_inf", "L_fg", "R_fg"];
    for (i, uv) in picks.iter().enumerate() {
        let outcome = s.submit_pick(*uv).unwrap();
        assert!(outcome.is_stored());
        if let Some(next) = expected_next.get(i) {
            assert_eq!(s.next_pending_label(), *next);
        }
    }
    assert!(s.is_complete());
    assert_eq!(s.status(), "All points set.");
    assert_eq!(s.submit_pick(FullUv::new(0.1, 0.1)), Some(PickOutcome::Complete));

    let params = s.frame_params();
    assert!((params.theta + FRAC_PI_2).abs() < 1e-5);
    assert!((params.anchor_left[0] - 0.2).abs() < 1e-5);
    assert!((params.anchor_right[0] - 0.2).abs() < 1e-5);
    assert!((params.anchor_right[1] - 0.5).abs() < 1e-5);
}

#[test]
fn reset_then_reload_starts_over() {
    let mut s = session(ModeKind::Anaglyph);
    s.submit_pick(FullUv::new(0.1, 0.5));
    s.reset_picks();
    assert_eq!(s.status(), "Reset. Next: L_inf");
    s.submit_pick(FullUv::new(0.1, 0.5));
    s.plate_loaded("other.jpg", 1200, 600);
    assert!(s.picks().get("L_inf").is_none());
    assert_eq!(s.frame_params().theta, 0.0);
}

#[test]
fn stationary_anchors_follow_picks() {
    let mut s = StereoSession::new(PickOrder::stationary(), ModeKind::Wiggle, WiggleParams::default(), None);
    s.plate_loaded("plate.jpg", 2000, 1000);
    s.submit_pick(FullUv::new(0.2, 0.4));
    s.submit_pick(FullUv::new(0.7, 0.6));
    assert!(s.is_complete());
    let params = s.frame_params();
    assert!((params.anchor_left[0] - 0.4).abs() < 1e-5);
    assert!((params.anchor_right[0] - 0.4).abs() < 1e-5);
    assert!((params.anchor_right[1] - 0.6).abs() < 1e-5);
    assert_eq!(params.theta, 0.0);
}

#[test]
fn leaving_wiggle_cancels_loop_and_renders_once() {
    let mut s = session(ModeKind::Anaglyph);
    drain(&mut s);

    s.set_mode(ModeKind::Wiggle);
    assert!(s.scheduler().is_animating());
    for _ in 0..3 {
        let ticket = s.next_frame().unwrap();
        assert!(s.frame_done(&ticket));
    }

    // a frame is in flight when the mode flips back
    let in_flight = s.next_frame().unwrap();
    s.set_mode(ModeKind::Anaglyph);
    assert!(!s.frame_done(&in_flight));
    assert_eq!(s.scheduler().pending_renders(), 1);
    assert_eq!(s.scheduler().scheduled_callbacks(), 0);

    assert_eq!(drain(&mut s), 1);
    assert!(!s.wants_frame());
}

#[test]
fn unpresented_wiggle_frame_keeps_loop_alive() {
    let mut s = session(ModeKind::Wiggle);
    let failed = s.next_frame().unwrap();
    // surface error: the frame is handed back instead of completed
    s.render();
    assert!(!s.wants_frame());
    s.frame_failed(&failed);
    assert!(s.wants_frame());
    assert_eq!(s.scheduler().scheduled_callbacks(), 1);

    let ticket = s.next_frame().unwrap();
    assert!(s.frame_done(&ticket));
    assert!(s.wants_frame());
}

#[test]
fn unpresented_still_frame_is_redrawn_once() {
    let mut s = session(ModeKind::Anaglyph);
    let failed = s.next_frame().unwrap();
    s.frame_failed(&failed);
    assert_eq!(s.scheduler().pending_renders(), 1);
    assert_eq!(drain(&mut s), 1);
}

#[test]
fn renders_coalesce_while_idle() {
    let mut s = session(ModeKind::Anaglyph);
    s.set_crop_rect(Some(CropRect::new(0.1, 0.1, 0.9, 0.9)));
    s.on_resize(1024, 768);
    s.render();
    assert_eq!(s.scheduler().pending_renders(), 1);
    assert_eq!(drain(&mut s), 1);
}

#[test]
fn wiggle_parameters_are_clamped() {
    let mut s = session(ModeKind::Wiggle);
    s.set_wiggle_params(WiggleParams { hz: 100.0, blend: 3.0 });
    assert_eq!(s.mode(), CompositeMode::Wiggle { hz: 32.0, blend: 1.0 });
    s.set_wiggle_params(WiggleParams { hz: -1.0, blend: 0.0 });
    assert_eq!(s.wiggle_params().hz, 32.0);
    s.scale_wiggle_hz(0.5);
    assert_eq!(s.wiggle_params().hz, 16.0);
    s.toggle_blend();
    assert_eq!(s.wiggle_params().blend, 0.0);
    assert_eq!(s.status(), "Crossfade off");
}

#[test]
fn stereo_geometry_uses_half_aspect() {
    let mut s = session(ModeKind::Anaglyph);
    s.set_crop_rect(None);
    // half of 2000x1000 is square: 600x600 centered on 800x600
    let g = s.geometry();
    assert_eq!((g.content.x, g.content.y, g.content.width, g.content.height), (100, 0, 600, 600));
    // overview keeps the whole 2:1 plate: 800x400 at y=100
    let o = s.overview_rect();
    assert_eq!((o.x, o.y, o.width, o.height), (0, 100, 800, 400));
}

#[test]
fn failed_load_reports_reason() {
    let mut s = StereoSession::new(PickOrder::directional(), ModeKind::Anaglyph, WiggleParams::default(), None);
    s.loading("Resolving IIIF for 42...");
    assert_eq!(s.status(), "Resolving IIIF for 42...");
    s.load_failed("HTTP 404");
    assert_eq!(s.status(), "Failed: HTTP 404");
    assert!(!s.is_loaded());
}

#[test]
fn plate_size_is_known_only_once_loaded() {
    let mut s = StereoSession::new(PickOrder::directional(), ModeKind::Anaglyph, WiggleParams::default(), None);
    assert_eq!(s.plate_size(), None);
    s.plate_loaded("plate.jpg", 2000, 1000);
    assert_eq!(s.plate_size(), Some((2000, 1000)));
    s.load_failed("gone");
    assert_eq!(s.plate_size(), None);
}
