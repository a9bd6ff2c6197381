//! Pixel-accurate magnifier for the plate overview.
//!
//! While the loupe key is held, a square inset in the top-right corner of the
//! surface shows the plate texels around the cursor at 1:1, with a crosshair
//! on the source pixel under the cursor. The inset window is shifted to stay
//! inside the plate near its edges, so the crosshair moves off-center there.

use tracing::trace;

use crate::coords::FullUv;
use crate::processing::layout::PixelRect;

/// Inset side, logical pixels.
pub const LOUPE_SIZE: f32 = 220.0;
pub const LOUPE_BORDER: f32 = 2.0;
/// Gap between the inset and the surface edges, logical pixels.
pub const LOUPE_PAD: f32 = 12.0;
pub const CROSSHAIR_ARM: f32 = 10.0;

/// Whether the loupe is held and which plate point it follows.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Loupe {
    held: bool,
    target: Option<FullUv>,
}

impl Loupe {
    /// Returns `true` if the visible inset changed.
    pub fn set_held(&mut self, held: bool) -> bool {
        if self.held == held {
            return false;
        }
        self.held = held;
        trace!(held, "loupe");
        self.target.is_some()
    }

    /// Track the point under the cursor; `None` when it is off the plate.
    /// Returns `true` if the visible inset changed.
    pub fn set_target(&mut self, target: Option<FullUv>) -> bool {
        if self.target == target {
            return false;
        }
        self.target = target;
        self.held
    }

    pub fn is_held(&self) -> bool {
        self.held
    }

    /// The point to magnify, only while held and over the plate.
    pub fn visible_target(&self) -> Option<FullUv> {
        if self.held { self.target } else { None }
    }
}

/// Plate pixel (top-left origin) under a full-plate coordinate, rounded and
/// clamped to the plate.
pub fn source_pixel(uv: FullUv, plate_w: u32, plate_h: u32) -> (u32, u32) {
    let snap = |n: f32, extent: u32| {
        let max = extent.saturating_sub(1) as f32;
        let n = if n.is_finite() { n } else { 0.0 };
        (n * extent as f32).round().clamp(0.0, max) as u32
    };
    (snap(uv.u, plate_w), snap(1.0 - uv.v, plate_h))
}

/// Start of a `size`-texel window centered on `center`, kept inside
/// `[0, extent)` where it fits and pinned to 0 where it does not.
pub fn window_origin(center: u32, size: u32, extent: u32) -> u32 {
    let start = (2 * i64::from(center) - i64::from(size)).div_euclid(2);
    start.min(i64::from(extent) - i64::from(size)).max(0) as u32
}

/// Uniform block for `fs_loupe`. Layout must match `Loupe` in `stereo.wgsl`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LoupeUniforms {
    /// Plate texel shown at the inset's top-left corner.
    pub origin: [f32; 2], // offset 0
    /// Crosshair center in inset pixels, top-left origin.
    pub cross: [f32; 2], // offset 8
    pub size_px: f32,   // offset 16
    pub border_px: f32, // offset 20
    pub arm_px: f32,    // offset 24
    pub line_px: f32,   // offset 28 -> total 32
}

/// Where the inset goes and what it shows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoupeLayout {
    /// Inset rectangle on the surface.
    pub rect: PixelRect,
    /// Plate pixel under the cursor.
    pub source: (u32, u32),
    /// Plate pixel at the inset's top-left corner.
    pub origin: (u32, u32),
    pub uniforms: LoupeUniforms,
}

impl LoupeLayout {
    /// `None` for an empty plate or an inset that does not fit the surface.
    pub fn new(
        target: FullUv,
        plate: (u32, u32),
        surface: (u32, u32),
        scale_factor: f32,
    ) -> Option<Self> {
        let (plate_w, plate_h) = plate;
        if plate_w == 0 || plate_h == 0 {
            return None;
        }
        let size = (LOUPE_SIZE * scale_factor).floor() as u32;
        let pad = (LOUPE_PAD * scale_factor).floor() as u32;
        if size == 0 || size + pad > surface.0 || size + pad > surface.1 {
            return None;
        }
        let rect = PixelRect::new(surface.0 - size - pad, pad, size, size);

        let source = source_pixel(target, plate_w, plate_h);
        let origin = (
            window_origin(source.0, size, plate_w),
            window_origin(source.1, size, plate_h),
        );
        let uniforms = LoupeUniforms {
            origin: [origin.0 as f32, origin.1 as f32],
            cross: [
                (source.0 - origin.0) as f32 + 0.5,
                (source.1 - origin.1) as f32 + 0.5,
            ],
            size_px: size as f32,
            border_px: (LOUPE_BORDER * scale_factor).floor().max(1.0),
            arm_px: CROSSHAIR_ARM * scale_factor,
            line_px: scale_factor.max(1.0),
        };
        Some(Self {
            rect,
            source,
            origin,
            uniforms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_pixel_rounds_and_clamps_to_plate() {
        assert_eq!(source_pixel(FullUv::new(0.5, 0.5), 100, 50), (50, 25));
        assert_eq!(source_pixel(FullUv::new(0.0, 1.0), 100, 50), (0, 0));
        // u = 1 and v = 0 would land one past the last pixel
        assert_eq!(source_pixel(FullUv::new(1.0, 0.0), 100, 50), (99, 49));
        assert_eq!(source_pixel(FullUv::new(0.123, 0.9), 100, 50), (12, 5));
    }

    #[test]
    fn window_stays_inside_plate() {
        assert_eq!(window_origin(500, 220, 1000), 390);
        assert_eq!(window_origin(5, 220, 1000), 0);
        assert_eq!(window_origin(990, 220, 1000), 780);
        // odd sizes floor the half-width
        assert_eq!(window_origin(500, 221, 1000), 389);
        // plate narrower than the inset
        assert_eq!(window_origin(50, 220, 100), 0);
    }

    #[test]
    fn layout_sits_in_top_right_corner() {
        let l = LoupeLayout::new(FullUv::new(0.5, 0.5), (2000, 1000), (1000, 800), 1.0).unwrap();
        assert_eq!(l.rect, PixelRect::new(768, 12, 220, 220));
        assert_eq!(l.source, (1000, 500));
        assert_eq!(l.origin, (890, 390));
        assert_eq!(l.uniforms.cross, [110.5, 110.5]);
    }

    #[test]
    fn layout_scales_with_density() {
        let l = LoupeLayout::new(FullUv::new(0.5, 0.5), (2000, 1000), (2000, 1600), 2.0).unwrap();
        assert_eq!(l.rect, PixelRect::new(1536, 24, 440, 440));
        assert_eq!(l.uniforms.border_px, 4.0);
    }

    #[test]
    fn crosshair_follows_cursor_at_plate_edge() {
        let l = LoupeLayout::new(FullUv::new(0.0, 0.0), (2000, 1000), (1000, 800), 1.0).unwrap();
        assert_eq!(l.source, (0, 999));
        assert_eq!(l.origin, (0, 780));
        assert_eq!(l.uniforms.cross, [0.5, 219.5]);
    }

    #[test]
    fn no_layout_when_inset_does_not_fit() {
        assert!(LoupeLayout::new(FullUv::new(0.5, 0.5), (100, 100), (200, 200), 1.0).is_none());
        assert!(LoupeLayout::new(FullUv::new(0.5, 0.5), (0, 100), (1000, 800), 1.0).is_none());
    }

    #[test]
    fn inset_shows_only_while_held_over_plate() {
        let mut loupe = Loupe::default();
        assert!(!loupe.set_target(Some(FullUv::new(0.2, 0.2))));
        assert!(loupe.visible_target().is_none());
        assert!(loupe.set_held(true));
        assert_eq!(loupe.visible_target(), Some(FullUv::new(0.2, 0.2)));
        assert!(!loupe.set_held(true));
        assert!(loupe.set_target(None));
        assert!(loupe.visible_target().is_none());
        assert!(!loupe.set_held(false));
        assert!(!loupe.is_held());
    }
}
