//! Stereo compositing rules shared by the GPU shader and the CPU renderer.
//!
//! Both modes sample the same plate texture once per half, each around its
//! own anchor point. Output coordinates are normalized to the content
//! rectangle with `v` pointing up, exactly as the WGSL vertex stage emits them.

use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::coords::{HalfUv, Side};
use crate::picks::PickSession;
use crate::processing::layout::{PixelRect, ViewportGeometry};
use crate::render::plate::{PlateSampler, linear_to_srgb};

/// Rec. 709 luma weights.
pub const LUMA_WEIGHTS: [f32; 3] = [0.2126, 0.7152, 0.0722];
/// Half width of the crossfade window around phase 0.5.
pub const CROSSFADE_HALF_WIDTH: f32 = 0.08;
pub const MAX_MARKERS: usize = 8;

/// How the two halves are combined into one output frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CompositeMode {
    /// Left luma in red, right luma in green and blue.
    Anaglyph,
    /// Left and right alternate `hz` times a cycle per second; a `blend`
    /// above zero crossfades around the switch instead of cutting.
    Wiggle { hz: f32, blend: f32 },
}

/// Mode selector without parameters, as named in configuration and on the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ModeKind {
    #[default]
    Anaglyph,
    Wiggle,
}

impl ModeKind {
    pub fn toggled(self) -> Self {
        match self {
            ModeKind::Anaglyph => ModeKind::Wiggle,
            ModeKind::Wiggle => ModeKind::Anaglyph,
        }
    }
}

/// Wiggle parameters kept across mode switches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct WiggleParams {
    pub hz: f32,
    pub blend: f32,
}

impl Default for WiggleParams {
    fn default() -> Self {
        Self { hz: 3.0, blend: 0.0 }
    }
}

impl CompositeMode {
    pub fn from_kind(kind: ModeKind, wiggle: WiggleParams) -> Self {
        match kind {
            ModeKind::Anaglyph => CompositeMode::Anaglyph,
            ModeKind::Wiggle => CompositeMode::Wiggle {
                hz: wiggle.hz,
                blend: wiggle.blend,
            },
        }
    }

    pub fn kind(&self) -> ModeKind {
        match self {
            CompositeMode::Anaglyph => ModeKind::Anaglyph,
            CompositeMode::Wiggle { .. } => ModeKind::Wiggle,
        }
    }

    pub fn is_animated(&self) -> bool {
        matches!(self, CompositeMode::Wiggle { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            CompositeMode::Anaglyph => "anaglyph",
            CompositeMode::Wiggle { .. } => "wiggle",
        }
    }
}

/// Alignment inputs for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameParams {
    /// Half-UV sampled at the output center on the left half.
    pub anchor_left: [f32; 2],
    /// Half-UV sampled at the output center on the right half.
    pub anchor_right: [f32; 2],
    /// Rotation (radians) applied to right-half sampling in anaglyph mode.
    pub theta: f32,
}

impl FrameParams {
    pub fn from_anchors(left: HalfUv, right: HalfUv, theta: f32) -> Self {
        Self {
            anchor_left: [left.u, left.v],
            anchor_right: [right.u, right.v],
            theta,
        }
    }
}

impl Default for FrameParams {
    fn default() -> Self {
        Self {
            anchor_left: [0.5, 0.5],
            anchor_right: [0.5, 0.5],
            theta: 0.0,
        }
    }
}

/// Uniform block for the stereo fragment stages.
/// Layout must match `Stereo` in `stereo.wgsl` (vec2 is 8-byte aligned).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct StereoUniforms {
    pub anchor_left: [f32; 2],  // offset 0
    pub anchor_right: [f32; 2], // offset 8
    pub theta: f32,             // offset 16
    pub time: f32,              // offset 20
    pub wiggle_hz: f32,         // offset 24
    pub wiggle_blend: f32,      // offset 28 -> total 32
}

impl StereoUniforms {
    pub fn new(mode: &CompositeMode, params: &FrameParams, time: f32) -> Self {
        let (wiggle_hz, wiggle_blend) = match *mode {
            CompositeMode::Anaglyph => (0.0, 0.0),
            CompositeMode::Wiggle { hz, blend } => (hz, blend),
        };
        Self {
            anchor_left: params.anchor_left,
            anchor_right: params.anchor_right,
            theta: params.theta,
            time,
            wiggle_hz,
            wiggle_blend,
        }
    }
}

/// Uniform block for the plate overview: picked landmarks and the midline.
/// Layout must match `Overlay` in `stereo.wgsl`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct OverlayUniforms {
    /// Per marker: full-plate `u`, `v`, side (0 left, 1 right), unused.
    pub markers: [[f32; 4]; MAX_MARKERS], // offset 0
    pub content_size: [f32; 2],           // offset 128
    pub marker_count: u32,                // offset 136
    pub radius_px: f32,                   // offset 140
    pub midline_px: f32,                  // offset 144
    pub _pad: [f32; 3],                   // offset 148 -> total 160
}

impl OverlayUniforms {
    pub fn from_picks(picks: &PickSession, content: PixelRect, scale_factor: f32) -> Self {
        let mut markers = [[0.0; 4]; MAX_MARKERS];
        let mut count = 0;
        for ((_, value), slot) in picks.picked().zip(markers.iter_mut()) {
            let full = value.to_full();
            let side = if value.is_left() { 0.0 } else { 1.0 };
            *slot = [full.u, full.v, side, 0.0];
            count += 1;
        }
        Self {
            markers,
            content_size: [content.width as f32, content.height as f32],
            marker_count: count,
            radius_px: 6.0 * scale_factor,
            midline_px: 2.0 * scale_factor,
            _pad: [0.0; 3],
        }
    }
}

pub fn half_to_plate_uv(side: Side, uv: [f32; 2]) -> [f32; 2] {
    match side {
        Side::Left => [uv[0] * 0.5, uv[1]],
        Side::Right => [0.5 + uv[0] * 0.5, uv[1]],
    }
}

pub fn luma(c: [f32; 3]) -> f32 {
    c[0] * LUMA_WEIGHTS[0] + c[1] * LUMA_WEIGHTS[1] + c[2] * LUMA_WEIGHTS[2]
}

pub fn fract(x: f32) -> f32 {
    x - x.floor()
}

pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

pub fn rotate(p: [f32; 2], angle: f32) -> [f32; 2] {
    let (s, c) = angle.sin_cos();
    [c * p[0] - s * p[1], s * p[0] + c * p[1]]
}

fn clamp01(uv: [f32; 2]) -> [f32; 2] {
    [uv[0].clamp(0.0, 1.0), uv[1].clamp(0.0, 1.0)]
}

fn mix(a: [f32; 3], b: [f32; 3], t: f32) -> [f32; 3] {
    [
        a[0] + (b[0] - a[0]) * t,
        a[1] + (b[1] - a[1]) * t,
        a[2] + (b[2] - a[2]) * t,
    ]
}

/// Half-UVs sampled for an output position in anaglyph mode.
///
/// The right sample is rotated by `-theta` about the output center.
pub fn anaglyph_sample_coords(params: &FrameParams, out_uv: [f32; 2]) -> ([f32; 2], [f32; 2]) {
    let p = [out_uv[0] - 0.5, out_uv[1] - 0.5];
    let left = [p[0] + params.anchor_left[0], p[1] + params.anchor_left[1]];
    let pr = rotate(p, -params.theta);
    let right = [pr[0] + params.anchor_right[0], pr[1] + params.anchor_right[1]];
    (clamp01(left), clamp01(right))
}

/// Half-UVs sampled in wiggle mode: plain anchor offsets, no rotation term.
pub fn wiggle_sample_coords(params: &FrameParams, out_uv: [f32; 2]) -> ([f32; 2], [f32; 2]) {
    let p = [out_uv[0] - 0.5, out_uv[1] - 0.5];
    let left = [p[0] + params.anchor_left[0], p[1] + params.anchor_left[1]];
    let right = [p[0] + params.anchor_right[0], p[1] + params.anchor_right[1]];
    (clamp01(left), clamp01(right))
}

/// Weight of the right half at a given time; 0 shows left, 1 shows right.
pub fn wiggle_weight(time: f32, hz: f32, blend: f32) -> f32 {
    let phase = fract(time * hz);
    if blend > 0.0 {
        smoothstep(0.5 - CROSSFADE_HALF_WIDTH, 0.5 + CROSSFADE_HALF_WIDTH, phase)
    } else if phase < 0.5 {
        0.0
    } else {
        1.0
    }
}

pub fn compose_anaglyph<S: PlateSampler + ?Sized>(
    params: &FrameParams,
    out_uv: [f32; 2],
    sampler: &S,
) -> [f32; 3] {
    let (l, r) = anaglyph_sample_coords(params, out_uv);
    let gl = luma(sampler.sample(half_to_plate_uv(Side::Left, l))).clamp(0.0, 1.0);
    let gr = luma(sampler.sample(half_to_plate_uv(Side::Right, r))).clamp(0.0, 1.0);
    [gl, gr, gr]
}

pub fn compose_wiggle<S: PlateSampler + ?Sized>(
    params: &FrameParams,
    hz: f32,
    blend: f32,
    time: f32,
    out_uv: [f32; 2],
    sampler: &S,
) -> [f32; 3] {
    let (l, r) = wiggle_sample_coords(params, out_uv);
    let col_l = sampler.sample(half_to_plate_uv(Side::Left, l));
    let col_r = sampler.sample(half_to_plate_uv(Side::Right, r));
    mix(col_l, col_r, wiggle_weight(time, hz, blend))
}

pub fn compose_pixel<S: PlateSampler + ?Sized>(
    mode: &CompositeMode,
    params: &FrameParams,
    time: f32,
    out_uv: [f32; 2],
    sampler: &S,
) -> [f32; 3] {
    match *mode {
        CompositeMode::Anaglyph => compose_anaglyph(params, out_uv, sampler),
        CompositeMode::Wiggle { hz, blend } => {
            compose_wiggle(params, hz, blend, time, out_uv, sampler)
        }
    }
}

/// Render one frame on the CPU.
///
/// The image covers the whole surface; pixels outside the visible rectangle
/// stay black, which also covers zero-area crops.
pub fn compose_frame<S: PlateSampler + ?Sized>(
    mode: &CompositeMode,
    params: &FrameParams,
    time: f32,
    geometry: &ViewportGeometry,
    sampler: &S,
) -> RgbaImage {
    let mut out = RgbaImage::from_pixel(
        geometry.clear.width,
        geometry.clear.height,
        Rgba([0, 0, 0, 255]),
    );
    if geometry.is_blank() || geometry.content.is_empty() {
        return out;
    }
    let content = geometry.content;
    let cw = content.width as f32;
    let ch = content.height as f32;
    let vis = geometry.visible;
    for y in vis.y..vis.bottom().min(out.height()) {
        for x in vis.x..vis.right().min(out.width()) {
            let u = (x as f32 + 0.5 - content.x as f32) / cw;
            let v = 1.0 - (y as f32 + 0.5 - content.y as f32) / ch;
            let c = compose_pixel(mode, params, time, [u, v], sampler);
            let to8 = |c: f32| (linear_to_srgb(c) * 255.0).round() as u8;
            out.put_pixel(x, y, Rgba([to8(c[0]), to8(c[1]), to8(c[2]), 255]));
        }
    }
    out
}
