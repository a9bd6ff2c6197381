//! Letterboxed viewport geometry.
//!
//! All rectangles are in physical surface pixels with a top-left origin,
//! which is the frame wgpu uses for both viewports and scissor rectangles.

use crate::crop::CropRect;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub const fn right(&self) -> u32 {
        self.x + self.width
    }

    pub const fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x as f32
            && y >= self.y as f32
            && x <= self.right() as f32
            && y <= self.bottom() as f32
    }

    /// Overlap of two rectangles; disjoint inputs give a zero-sized rectangle.
    pub fn intersect(&self, other: &PixelRect) -> PixelRect {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        PixelRect::new(x0, y0, x1.saturating_sub(x0), y1.saturating_sub(y0))
    }
}

pub fn center_offset(inner_w: u32, inner_h: u32, outer_w: u32, outer_h: u32) -> (u32, u32) {
    let ox = outer_w.saturating_sub(inner_w) / 2;
    let oy = outer_h.saturating_sub(inner_h) / 2;
    (ox, oy)
}

/// Largest centered rectangle of aspect `content_aspect` inside the surface.
///
/// Width is tried first; if the resulting height overflows, height is pinned
/// to the surface and width follows. Sizes are floored to whole pixels.
pub fn fit_content(surface_w: u32, surface_h: u32, content_aspect: f64) -> PixelRect {
    if surface_w == 0 || surface_h == 0 || !content_aspect.is_finite() || content_aspect <= 0.0 {
        return PixelRect::default();
    }
    let mut vp_w = surface_w;
    let mut vp_h = (f64::from(vp_w) / content_aspect).floor() as u64;
    if vp_h > u64::from(surface_h) {
        vp_h = u64::from(surface_h);
        vp_w = ((vp_h as f64) * content_aspect).floor().min(f64::from(surface_w)) as u32;
    }
    let vp_h = vp_h as u32;
    let (x, y) = center_offset(vp_w, vp_h, surface_w, surface_h);
    PixelRect::new(x, y, vp_w, vp_h)
}

/// Everything needed to draw one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewportGeometry {
    /// Whole surface, cleared to black.
    pub clear: PixelRect,
    /// Where the plate content is drawn (the viewport).
    pub content: PixelRect,
    /// What may receive pixels (the scissor).
    pub visible: PixelRect,
}

impl ViewportGeometry {
    pub fn is_blank(&self) -> bool {
        self.visible.is_empty()
    }
}

/// Crop bounds in surface pixels; `crop` is normalized against the surface.
pub fn crop_to_pixels(crop: &CropRect, surface_w: u32, surface_h: u32) -> PixelRect {
    let c = crop.normalized();
    let w = f64::from(surface_w);
    let h = f64::from(surface_h);
    let to_px = |n: f32, extent: f64| ((f64::from(n) * extent).round().clamp(0.0, extent)) as u32;
    let x0 = to_px(c.x0, w);
    let y0 = to_px(c.y0, h);
    let x1 = to_px(c.x1, w);
    let y1 = to_px(c.y1, h);
    PixelRect::new(x0, y0, x1 - x0, y1 - y0)
}

pub fn compose_viewport(
    surface_w: u32,
    surface_h: u32,
    content_aspect: f64,
    crop: Option<&CropRect>,
) -> ViewportGeometry {
    let clear = PixelRect::new(0, 0, surface_w, surface_h);
    let content = fit_content(surface_w, surface_h, content_aspect);
    let visible = match crop {
        None => content,
        Some(crop) => crop_to_pixels(crop, surface_w, surface_h).intersect(&content),
    };
    ViewportGeometry {
        clear,
        content,
        visible,
    }
}

/// Holds the last-known content aspect and crop; geometry is recomputed on demand.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewportCompositor {
    content_aspect: f64,
    crop: Option<CropRect>,
}

impl ViewportCompositor {
    pub fn new(content_aspect: f64, crop: Option<CropRect>) -> Self {
        Self {
            content_aspect,
            crop,
        }
    }

    pub fn content_aspect(&self) -> f64 {
        self.content_aspect
    }

    pub fn set_content_aspect(&mut self, aspect: f64) {
        self.content_aspect = aspect;
    }

    pub fn crop(&self) -> Option<&CropRect> {
        self.crop.as_ref()
    }

    pub fn set_crop(&mut self, crop: Option<CropRect>) {
        self.crop = crop.map(|c| c.normalized());
    }

    pub fn geometry(&self, surface_w: u32, surface_h: u32) -> ViewportGeometry {
        compose_viewport(surface_w, surface_h, self.content_aspect, self.crop.as_ref())
    }
}

impl Default for ViewportCompositor {
    fn default() -> Self {
        Self::new(1.0, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_offset_saturates() {
        assert_eq!(center_offset(100, 50, 300, 150), (100, 50));
        assert_eq!(center_offset(400, 50, 300, 150), (0, 50));
    }

    #[test]
    fn odd_margins_floor() {
        let r = fit_content(801, 400, 1.0);
        assert_eq!(r, PixelRect::new(200, 0, 400, 400));
    }

    #[test]
    fn degenerate_aspect_is_empty() {
        assert!(fit_content(800, 400, 0.0).is_empty());
        assert!(fit_content(800, 400, f64::NAN).is_empty());
        assert!(fit_content(0, 400, 1.0).is_empty());
    }

    #[test]
    fn intersect_disjoint_is_zero_sized() {
        let a = PixelRect::new(0, 0, 10, 10);
        let b = PixelRect::new(20, 0, 10, 10);
        let i = a.intersect(&b);
        assert_eq!(i.width, 0);
        assert!(i.is_empty());
    }

    #[test]
    fn compositor_normalizes_inverted_crop() {
        let mut c = ViewportCompositor::new(1.0, None);
        c.set_crop(Some(CropRect::new(0.9, 0.9, 0.1, 0.1)));
        let crop = c.crop().unwrap();
        assert!(crop.x0 <= crop.x1 && crop.y0 <= crop.y1);
    }
}
