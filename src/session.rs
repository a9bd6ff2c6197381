//! Host-facing state of one viewing session.
//!
//! [`StereoSession`] ties the pick sequence, compositing mode, crop and
//! surface geometry together and decides when a frame must be drawn. It is
//! owned by the UI thread and never blocks; the plate itself lives with the
//! renderer, the session only tracks its load state and dimensions.

use tracing::{debug, info, warn};

use crate::align::theta_from_picks;
use crate::coords::{FullUv, Side};
use crate::crop::CropRect;
use crate::picks::{PickOrder, PickOutcome, PickSession};
use crate::processing::layout::{PixelRect, ViewportCompositor, ViewportGeometry, fit_content};
use crate::render::composite::{CompositeMode, FrameParams, ModeKind, StereoUniforms, WiggleParams};
use crate::schedule::{FrameScheduler, FrameTicket};

const MIN_WIGGLE_HZ: f32 = 0.125;
const MAX_WIGGLE_HZ: f32 = 32.0;

#[derive(Debug, Clone, PartialEq)]
pub enum LoadState {
    Loading,
    Ready { width: u32, height: u32 },
    Failed(String),
}

#[derive(Debug)]
pub struct StereoSession {
    picks: PickSession,
    mode: CompositeMode,
    wiggle: WiggleParams,
    compositor: ViewportCompositor,
    surface: (u32, u32),
    scheduler: FrameScheduler,
    load: LoadState,
    status: String,
}

impl StereoSession {
    pub fn new(order: PickOrder, mode: ModeKind, wiggle: WiggleParams, crop: Option<CropRect>) -> Self {
        let mut session = Self {
            picks: PickSession::new(order),
            mode: CompositeMode::Anaglyph,
            wiggle,
            compositor: ViewportCompositor::new(1.0, crop),
            surface: (0, 0),
            scheduler: FrameScheduler::new(),
            load: LoadState::Loading,
            status: "Loading image...".to_owned(),
        };
        session.set_mode(mode);
        session
    }

    // ----- load boundary -------------------------------------------------

    pub fn load_state(&self) -> &LoadState {
        &self.load
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.load, LoadState::Ready { .. })
    }

    /// Enter (or stay in) the loading state with a progress message.
    pub fn loading(&mut self, progress: impl Into<String>) {
        self.load = LoadState::Loading;
        self.set_status(progress.into());
    }

    /// A new plate replaces the previous one; picks belong to the old plate.
    pub fn plate_loaded(&mut self, name: &str, width: u32, height: u32) {
        if width == 0 || height == 0 {
            self.load_failed(&format!("plate {name} has no pixels"));
            return;
        }
        self.load = LoadState::Ready { width, height };
        self.picks.reset();
        self.compositor
            .set_content_aspect(f64::from(width / 2) / f64::from(height));
        info!(name, width, height, "plate ready");
        let next = self.picks.next_pending_label().to_owned();
        self.set_status(format!("Loaded {name}. Pick: {next}"));
        self.scheduler.request_render();
    }

    pub fn load_failed(&mut self, reason: &str) {
        warn!(reason, "plate load failed");
        self.load = LoadState::Failed(reason.to_owned());
        self.set_status(format!("Failed: {reason}"));
        self.scheduler.request_render();
    }

    // ----- picks -------------------------------------------------------

    /// Submit a candidate point; ignored (`None`) until a plate is loaded.
    pub fn submit_pick(&mut self, candidate: FullUv) -> Option<PickOutcome> {
        if !self.is_loaded() {
            debug!("pick ignored: no plate loaded");
            return None;
        }
        let outcome = self.picks.submit(candidate);
        self.set_status(outcome.hint());
        if outcome.is_stored() {
            self.scheduler.request_render();
        }
        Some(outcome)
    }

    pub fn reset_picks(&mut self) {
        self.picks.reset();
        let next = self.picks.next_pending_label().to_owned();
        self.set_status(format!("Reset. Next: {next}"));
        self.scheduler.request_render();
    }

    pub fn is_complete(&self) -> bool {
        self.picks.is_complete()
    }

    pub fn next_pending_label(&self) -> &str {
        self.picks.next_pending_label()
    }

    pub fn picks(&self) -> &PickSession {
        &self.picks
    }

    // ----- crop and geometry -------------------------------------------

    pub fn set_crop_rect(&mut self, crop: Option<CropRect>) {
        self.compositor.set_crop(crop);
        self.scheduler.request_render();
    }

    pub fn crop_rect(&self) -> Option<&CropRect> {
        self.compositor.crop()
    }

    pub fn on_resize(&mut self, width: u32, height: u32) {
        if self.surface == (width, height) {
            return;
        }
        debug!(width, height, "surface resized");
        self.surface = (width, height);
        self.scheduler.request_render();
    }

    /// Dimensions of the loaded plate, as uploaded.
    pub fn plate_size(&self) -> Option<(u32, u32)> {
        match self.load {
            LoadState::Ready { width, height } => Some((width, height)),
            _ => None,
        }
    }

    pub fn surface_size(&self) -> (u32, u32) {
        self.surface
    }

    /// Stereo frame geometry for the current surface, crop and plate.
    pub fn geometry(&self) -> ViewportGeometry {
        self.compositor.geometry(self.surface.0, self.surface.1)
    }

    /// Rectangle of the whole-plate overview; it uses the full plate aspect.
    pub fn overview_rect(&self) -> PixelRect {
        match self.load {
            LoadState::Ready { width, height } => fit_content(
                self.surface.0,
                self.surface.1,
                f64::from(width) / f64::from(height),
            ),
            _ => PixelRect::default(),
        }
    }

    // ----- mode --------------------------------------------------------

    pub fn mode(&self) -> CompositeMode {
        self.mode
    }

    pub fn wiggle_params(&self) -> WiggleParams {
        self.wiggle
    }

    /// Switch modes. Entering wiggle starts the animation loop; leaving it
    /// cancels the loop and leaves exactly one render pending.
    pub fn set_mode(&mut self, kind: ModeKind) {
        let next = CompositeMode::from_kind(kind, self.wiggle);
        let was = self.mode.kind();
        self.mode = next;
        match kind {
            ModeKind::Wiggle => {
                self.scheduler.start_animation();
            }
            ModeKind::Anaglyph if was == ModeKind::Wiggle => self.scheduler.stop_animation(),
            ModeKind::Anaglyph => self.scheduler.request_render(),
        }
        if was != kind {
            info!(mode = next.label(), "mode switched");
        }
    }

    pub fn toggle_mode(&mut self) {
        self.set_mode(self.mode.kind().toggled());
    }

    /// Non-finite or non-positive frequencies are ignored; blend is clamped.
    pub fn set_wiggle_params(&mut self, params: WiggleParams) {
        if !params.hz.is_finite() || params.hz <= 0.0 {
            warn!(hz = params.hz, "ignoring invalid wiggle frequency");
            return;
        }
        self.wiggle = WiggleParams {
            hz: params.hz.clamp(MIN_WIGGLE_HZ, MAX_WIGGLE_HZ),
            blend: if params.blend.is_finite() {
                params.blend.clamp(0.0, 1.0)
            } else {
                0.0
            },
        };
        if self.mode.is_animated() {
            self.mode = CompositeMode::from_kind(ModeKind::Wiggle, self.wiggle);
        }
        debug!(hz = self.wiggle.hz, blend = self.wiggle.blend, "wiggle parameters");
        self.scheduler.request_render();
    }

    pub fn scale_wiggle_hz(&mut self, factor: f32) {
        let params = WiggleParams {
            hz: self.wiggle.hz * factor,
            ..self.wiggle
        };
        self.set_wiggle_params(params);
        self.set_status(format!("Wiggle {:.3} Hz", self.wiggle.hz));
    }

    pub fn toggle_blend(&mut self) {
        let blend = if self.wiggle.blend > 0.0 { 0.0 } else { 1.0 };
        self.set_wiggle_params(WiggleParams {
            blend,
            ..self.wiggle
        });
        let state = if blend > 0.0 { "on" } else { "off" };
        self.set_status(format!("Crossfade {state}"));
    }

    // ----- frame parameters --------------------------------------------

    pub fn frame_params(&self) -> FrameParams {
        FrameParams::from_anchors(
            self.picks.anchor(Side::Left),
            self.picks.anchor(Side::Right),
            theta_from_picks(&self.picks),
        )
    }

    pub fn stereo_uniforms(&self, time: f32) -> StereoUniforms {
        StereoUniforms::new(&self.mode, &self.frame_params(), time)
    }

    // ----- scheduling --------------------------------------------------

    /// Queue a single redraw.
    pub fn render(&mut self) {
        self.scheduler.request_render();
    }

    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }

    pub fn wants_frame(&self) -> bool {
        self.scheduler.wants_frame()
    }

    pub fn next_frame(&mut self) -> Option<FrameTicket> {
        self.scheduler.next_frame()
    }

    pub fn frame_done(&mut self, ticket: &FrameTicket) -> bool {
        self.scheduler.frame_done(ticket)
    }

    /// The frame for `ticket` was never presented; draw it again.
    pub fn frame_failed(&mut self, ticket: &FrameTicket) {
        self.scheduler.retry(ticket);
    }

    // ----- status ------------------------------------------------------

    pub fn status(&self) -> &str {
        &self.status
    }

    fn set_status(&mut self, status: String) {
        if status != self.status {
            info!(status = %status, "status");
            self.status = status;
        }
    }
}
