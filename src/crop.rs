//! Crop rectangle of the visible output frame and its drag-to-edit model.

use serde::{Deserialize, Serialize};
use tracing::trace;

/// Normalized crop of the output frame, top-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropRect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl CropRect {
    pub const fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Ordered corners clamped into `[0,1]²`; non-finite bounds collapse to 0.
    pub fn normalized(&self) -> Self {
        let c = |v: f32| if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 };
        let (x0, x1) = (c(self.x0), c(self.x1));
        let (y0, y1) = (c(self.y0), c(self.y1));
        Self::new(x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1))
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }
}

impl Default for CropRect {
    fn default() -> Self {
        Self::new(0.15, 0.15, 0.85, 0.85)
    }
}

/// Which part of the crop box a drag grabbed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragHandle {
    Move,
    NorthWest,
    NorthEast,
    SouthWest,
    SouthEast,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct PxRect {
    x0: f32,
    y0: f32,
    x1: f32,
    y1: f32,
}

impl PxRect {
    fn ordered(self) -> Self {
        Self {
            x0: self.x0.min(self.x1),
            y0: self.y0.min(self.y1),
            x1: self.x0.max(self.x1),
            y1: self.y0.max(self.y1),
        }
    }

    fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x0 && x <= self.x1 && y >= self.y0 && y <= self.y1
    }
}

#[derive(Debug, Clone, Copy)]
struct Drag {
    handle: DragHandle,
    start_x: f32,
    start_y: f32,
    base: PxRect,
}

/// Pixel-space crop box driven by pointer drags.
///
/// Every change is reported back as a normalized [`CropRect`] against the
/// current surface size.
#[derive(Debug, Clone)]
pub struct CropBox {
    rect: Option<PxRect>,
    surface_w: f32,
    surface_h: f32,
    min_px: f32,
    drag: Option<Drag>,
}

impl CropBox {
    pub fn new(initial: Option<CropRect>, surface_w: u32, surface_h: u32, min_px: f32) -> Self {
        let mut b = Self {
            rect: None,
            surface_w: surface_w as f32,
            surface_h: surface_h as f32,
            min_px: min_px.max(0.0),
            drag: None,
        };
        b.set_normalized(initial);
        b
    }

    pub fn normalized(&self) -> Option<CropRect> {
        let r = self.rect?;
        if self.surface_w <= 0.0 || self.surface_h <= 0.0 {
            return None;
        }
        Some(CropRect::new(
            r.x0 / self.surface_w,
            r.y0 / self.surface_h,
            r.x1 / self.surface_w,
            r.y1 / self.surface_h,
        ))
    }

    /// Replace the rectangle; `None` removes the crop entirely.
    pub fn set_normalized(&mut self, crop: Option<CropRect>) -> Option<CropRect> {
        self.drag = None;
        match crop {
            None => {
                self.rect = None;
                None
            }
            Some(n) => {
                let n = n.normalized();
                self.apply(PxRect {
                    x0: n.x0 * self.surface_w,
                    y0: n.y0 * self.surface_h,
                    x1: n.x1 * self.surface_w,
                    y1: n.y1 * self.surface_h,
                })
            }
        }
    }

    pub fn set_min_px(&mut self, min_px: f32) {
        self.min_px = min_px.max(0.0);
    }

    /// Rebuild the pixel rectangle for a new surface size from its normalized form.
    pub fn resize(&mut self, surface_w: u32, surface_h: u32) -> Option<CropRect> {
        let n = self.normalized();
        self.surface_w = surface_w as f32;
        self.surface_h = surface_h as f32;
        self.set_normalized(n)
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Start a drag if the pointer grabbed a corner or the inside of the box.
    pub fn pointer_down(&mut self, x: f32, y: f32) -> bool {
        let Some(rect) = self.rect else {
            return false;
        };
        let Some(handle) = self.hit_test(rect, x, y) else {
            return false;
        };
        trace!(?handle, x, y, "crop drag started");
        self.drag = Some(Drag {
            handle,
            start_x: x,
            start_y: y,
            base: rect,
        });
        true
    }

    pub fn pointer_move(&mut self, x: f32, y: f32) -> Option<CropRect> {
        let drag = self.drag?;
        let dx = x - drag.start_x;
        let dy = y - drag.start_y;
        let base = drag.base;
        let mut next = base;
        match drag.handle {
            DragHandle::Move => {
                next.x0 = base.x0 + dx;
                next.y0 = base.y0 + dy;
                next.x1 = next.x0 + (base.x1 - base.x0);
                next.y1 = next.y0 + (base.y1 - base.y0);
            }
            DragHandle::NorthWest => {
                next.x0 = base.x0 + dx;
                next.y0 = base.y0 + dy;
            }
            DragHandle::NorthEast => {
                next.x1 = base.x1 + dx;
                next.y0 = base.y0 + dy;
            }
            DragHandle::SouthWest => {
                next.x0 = base.x0 + dx;
                next.y1 = base.y1 + dy;
            }
            DragHandle::SouthEast => {
                next.x1 = base.x1 + dx;
                next.y1 = base.y1 + dy;
            }
        }
        self.apply(next)
    }

    pub fn pointer_up(&mut self) -> bool {
        self.drag.take().is_some()
    }

    fn hit_test(&self, rect: PxRect, x: f32, y: f32) -> Option<DragHandle> {
        let reach = (self.min_px * 0.5).max(1.0);
        let near = |cx: f32, cy: f32| (x - cx).abs() <= reach && (y - cy).abs() <= reach;
        if near(rect.x0, rect.y0) {
            Some(DragHandle::NorthWest)
        } else if near(rect.x1, rect.y0) {
            Some(DragHandle::NorthEast)
        } else if near(rect.x0, rect.y1) {
            Some(DragHandle::SouthWest)
        } else if near(rect.x1, rect.y1) {
            Some(DragHandle::SouthEast)
        } else if rect.contains(x, y) {
            Some(DragHandle::Move)
        } else {
            None
        }
    }

    // Grow undersized sides around their center, then clamp to the surface.
    fn apply(&mut self, p: PxRect) -> Option<CropRect> {
        let mut r = p.ordered();
        if r.x1 - r.x0 < self.min_px {
            let cx = (r.x0 + r.x1) * 0.5;
            r.x0 = cx - self.min_px * 0.5;
            r.x1 = cx + self.min_px * 0.5;
        }
        if r.y1 - r.y0 < self.min_px {
            let cy = (r.y0 + r.y1) * 0.5;
            r.y0 = cy - self.min_px * 0.5;
            r.y1 = cy + self.min_px * 0.5;
        }
        let cx = |v: f32| v.clamp(0.0, self.surface_w.max(0.0));
        let cy = |v: f32| v.clamp(0.0, self.surface_h.max(0.0));
        self.rect = Some(
            PxRect {
                x0: cx(r.x0),
                y0: cy(r.y0),
                x1: cx(r.x1),
                y1: cy(r.y1),
            }
            .ordered(),
        );
        self.normalized()
    }
}
