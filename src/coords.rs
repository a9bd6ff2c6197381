//! Coordinate mapping between plate space, per-half space and surface pixels.
//!
//! Three frames are in play:
//! - *full UV*: `[0,1]²` across the whole plate, `v` pointing up;
//! - *half UV*: `[0,1]²` inside one half of the plate, `v` pointing up;
//! - *surface pixels*: physical pixels of the drawing surface, top-left origin.

use serde::{Deserialize, Serialize};

use crate::processing::layout::PixelRect;

/// Which half of the plate a point belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn is_left(self) -> bool {
        matches!(self, Side::Left)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Left => "LEFT",
            Side::Right => "RIGHT",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coordinates across the whole plate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FullUv {
    pub u: f32,
    pub v: f32,
}

impl FullUv {
    pub const fn new(u: f32, v: f32) -> Self {
        Self { u, v }
    }
}

/// Coordinates local to one half of the plate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HalfUv {
    pub side: Side,
    pub u: f32,
    pub v: f32,
}

impl HalfUv {
    pub const fn new(side: Side, u: f32, v: f32) -> Self {
        Self { side, u, v }
    }

    /// Center of a half; the anchor used before any landmark is picked.
    pub const fn center(side: Side) -> Self {
        Self::new(side, 0.5, 0.5)
    }

    pub fn is_left(&self) -> bool {
        self.side.is_left()
    }

    pub fn to_full(self) -> FullUv {
        half_to_full(self.side, self.u, self.v)
    }
}

/// Map a full-plate coordinate into the half that contains it.
pub fn full_to_half(u_full: f32, v_full: f32) -> HalfUv {
    if u_full < 0.5 {
        HalfUv::new(Side::Left, u_full / 0.5, v_full)
    } else {
        HalfUv::new(Side::Right, (u_full - 0.5) / 0.5, v_full)
    }
}

/// Inverse of [`full_to_half`].
pub fn half_to_full(side: Side, u_half: f32, v_half: f32) -> FullUv {
    let u = match side {
        Side::Left => u_half * 0.5,
        Side::Right => 0.5 + u_half * 0.5,
    };
    FullUv::new(u, v_half)
}

/// Map a pointer position (surface pixels, top-left origin) onto the plate.
///
/// `content` is the rectangle the plate is currently drawn into. Positions
/// outside it yield `None`.
pub fn pointer_to_full_uv(x: f32, y: f32, content: PixelRect) -> Option<FullUv> {
    if content.is_empty() {
        return None;
    }
    let ox = content.x as f32;
    let oy = content.y as f32;
    let w = content.width as f32;
    let h = content.height as f32;
    if x < ox || y < oy || x > ox + w || y > oy + h {
        return None;
    }
    let u = (x - ox) / w;
    let v = 1.0 - (y - oy) / h;
    Some(FullUv::new(u, v))
}

/// Inverse of [`pointer_to_full_uv`]: where a plate coordinate lands on the surface.
pub fn full_uv_to_surface(uv: FullUv, content: PixelRect) -> (f32, f32) {
    let x = content.x as f32 + uv.u * content.width as f32;
    let y = content.y as f32 + (1.0 - uv.v) * content.height as f32;
    (x, y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_to_half_picks_side_and_rescales() {
        let left = full_to_half(0.3, 0.25);
        assert_eq!(left.side, Side::Left);
        assert!((left.u - 0.6).abs() < 1e-6);
        assert_eq!(left.v, 0.25);

        let right = full_to_half(0.75, 0.9);
        assert_eq!(right.side, Side::Right);
        assert!((right.u - 0.5).abs() < 1e-6);
        assert_eq!(right.v, 0.9);
    }

    #[test]
    fn midline_belongs_to_right_half() {
        let mid = full_to_half(0.5, 0.5);
        assert_eq!(mid.side, Side::Right);
        assert_eq!(mid.u, 0.0);
    }

    #[test]
    fn round_trip_reconstructs_both_halves() {
        for i in 0..=64 {
            for j in [0.0_f32, 0.33, 1.0] {
                let u = i as f32 / 64.0;
                let half = full_to_half(u, j);
                let back = half.to_full();
                assert_eq!(back.u, u);
                assert_eq!(back.v, j);
            }
        }
    }

    #[test]
    fn pointer_outside_content_is_no_pick() {
        let content = PixelRect::new(100, 50, 200, 100);
        assert!(pointer_to_full_uv(99.0, 60.0, content).is_none());
        assert!(pointer_to_full_uv(150.0, 151.0, content).is_none());
        let uv = pointer_to_full_uv(200.0, 100.0, content).unwrap();
        assert!((uv.u - 0.5).abs() < 1e-6);
        assert!((uv.v - 0.5).abs() < 1e-6);
    }

    #[test]
    fn pointer_maps_top_left_to_v_one() {
        let content = PixelRect::new(0, 0, 400, 200);
        let uv = pointer_to_full_uv(0.0, 0.0, content).unwrap();
        assert_eq!((uv.u, uv.v), (0.0, 1.0));
        let (x, y) = full_uv_to_surface(uv, content);
        assert_eq!((x, y), (0.0, 0.0));
    }

    #[test]
    fn empty_content_never_maps() {
        let content = PixelRect::new(10, 10, 0, 0);
        assert!(pointer_to_full_uv(10.0, 10.0, content).is_none());
    }
}
