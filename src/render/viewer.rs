use std::{sync::Arc, time::Instant};

use anyhow::{Context, Result};
use crossbeam_channel as xchan;
use tracing::{debug, error, info, warn};
use wgpu::SurfaceError;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Window, WindowAttributes, WindowId},
};

use crate::config::{Configuration, PlateSource};
use crate::events::LoadEvent;
use crate::input::{InputAdapter, InputEvent, UiAction, View};
use crate::loupe::LoupeLayout;
use crate::render::composite::OverlayUniforms;
use crate::render::gpu::{DrawPass, Gpu};
use crate::render::loader::{LoaderMsg, spawn_loader};
use crate::schedule::FrameTicket;
use crate::session::StereoSession;

enum ViewerEvent {
    Load(LoadEvent),
}

struct ViewerApp {
    cfg: Configuration,
    source: PlateSource,
    session: StereoSession,
    input: Option<InputAdapter>,
    view: View,
    started: Instant,
    title: String,

    window: Option<Arc<Window>>,
    gpu: Option<Gpu>,
    load_requested: bool,

    tx_req: xchan::Sender<LoaderMsg>,
}

impl ViewerApp {
    fn new(cfg: Configuration, source: PlateSource, tx_req: xchan::Sender<LoaderMsg>) -> Self {
        let session = StereoSession::new(cfg.pick_order.clone(), cfg.mode, cfg.wiggle, cfg.crop);
        Self {
            cfg,
            source,
            session,
            input: None,
            view: View::default(),
            started: Instant::now(),
            title: String::new(),
            window: None,
            gpu: None,
            load_requested: false,
            tx_req,
        }
    }

    fn ensure_window(&mut self, event_loop: &ActiveEventLoop) -> Option<Arc<Window>> {
        if let Some(window) = self.window.as_ref() {
            return Some(window.clone());
        }

        let attrs = WindowAttributes::default().with_title(self.cfg.window_title.clone());
        match event_loop.create_window(attrs) {
            Ok(window) => {
                let window = Arc::new(window);
                self.window = Some(window.clone());
                Some(window)
            }
            Err(err) => {
                error!(error = %err, "failed to create viewer window");
                None
            }
        }
    }

    fn init_gpu(&mut self, window: Arc<Window>) -> Result<()> {
        let gpu = pollster::block_on(Gpu::new(window.clone()))?;
        let (width, height) = gpu.size();
        self.input = Some(InputAdapter::new(
            self.cfg.crop,
            width,
            height,
            self.cfg.crop_min_px,
            window.scale_factor(),
        ));
        self.session.on_resize(width, height);
        self.gpu = Some(gpu);
        Ok(())
    }

    fn request_load(&mut self) {
        if self.load_requested {
            return;
        }
        let gpu_max = self.gpu.as_ref().map_or(u32::MAX, Gpu::max_texture_dim);
        let max_dim = self.cfg.max_texture_dim.min(gpu_max);
        info!(source = %self.source, max_dim, "requesting plate");
        self.session.loading("Loading image...");
        if self
            .tx_req
            .send(LoaderMsg::Load {
                source: self.source.clone(),
                max_dim,
            })
            .is_err()
        {
            self.session.load_failed("loader thread is not running");
        }
        self.load_requested = true;
    }

    fn handle_resize(&mut self, new_size: PhysicalSize<u32>) {
        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };
        gpu.resize(new_size.width, new_size.height);
        let (width, height) = gpu.size();
        self.session.on_resize(width, height);
        let scale = self.window.as_ref().map_or(1.0, |w| w.scale_factor());
        if let Some(input) = self.input.as_mut() {
            let crop = input.resize(width, height, scale);
            self.session.set_crop_rect(crop);
        }
        self.request_redraw();
    }

    fn apply(&mut self, action: UiAction, event_loop: &ActiveEventLoop) {
        debug!(?action, "ui action");
        match action {
            UiAction::Pick(uv) => {
                self.session.submit_pick(uv);
            }
            UiAction::CropChanged(crop) => self.session.set_crop_rect(crop),
            UiAction::ResetPicks => self.session.reset_picks(),
            UiAction::ToggleMode => self.session.toggle_mode(),
            UiAction::ScaleWiggleHz(factor) => self.session.scale_wiggle_hz(factor),
            UiAction::ToggleBlend => self.session.toggle_blend(),
            UiAction::LoupeChanged => self.session.render(),
            UiAction::ToggleView => {
                self.view = self.view.toggled();
                info!(view = ?self.view, "view switched");
                self.session.render();
            }
            UiAction::Quit => {
                info!("quit requested");
                event_loop.exit();
            }
        }
    }

    fn draw_pass(&self) -> DrawPass {
        if !self.session.is_loaded() {
            return DrawPass::Blank;
        }
        match self.view {
            View::Overview => {
                let rect = self.session.overview_rect();
                let scale = self.window.as_ref().map_or(1.0, |w| w.scale_factor()) as f32;
                let loupe = self
                    .input
                    .as_ref()
                    .and_then(InputAdapter::loupe_target)
                    .zip(self.session.plate_size())
                    .and_then(|(target, plate)| {
                        LoupeLayout::new(target, plate, self.session.surface_size(), scale)
                    });
                DrawPass::Overview {
                    overlay: OverlayUniforms::from_picks(self.session.picks(), rect, scale),
                    rect,
                    loupe,
                }
            }
            View::Stereo => {
                let geometry = self.session.geometry();
                DrawPass::Stereo {
                    mode: self.session.mode().kind(),
                    uniforms: self
                        .session
                        .stereo_uniforms(self.started.elapsed().as_secs_f32()),
                    content: geometry.content,
                    visible: geometry.visible,
                }
            }
        }
    }

    fn draw(&mut self, event_loop: &ActiveEventLoop) {
        let ticket = self.session.next_frame();
        let pass = self.draw_pass();
        let Some(gpu) = self.gpu.as_ref() else {
            return;
        };

        match gpu.render(&pass) {
            Ok(()) => {
                if let Some(ticket) = ticket {
                    self.session.frame_done(&ticket);
                }
            }
            Err(SurfaceError::Outdated) | Err(SurfaceError::Lost) => {
                info!("viewer surface lost; reconfiguring");
                if let Some(window) = self.window.as_ref() {
                    let size = window.inner_size();
                    self.handle_resize(size);
                }
                self.retry_frame(ticket);
            }
            Err(SurfaceError::OutOfMemory) => {
                error!("viewer surface out of memory; exiting event loop");
                event_loop.exit();
            }
            Err(SurfaceError::Timeout) => {
                warn!("viewer surface acquisition timed out");
                self.retry_frame(ticket);
            }
            Err(SurfaceError::Other) => {
                warn!("viewer surface reported an unknown error; retrying");
                self.retry_frame(ticket);
            }
        }
    }

    /// Put an unpresented frame back so the scheduler (and a running wiggle loop) redraws it.
    fn retry_frame(&mut self, ticket: Option<FrameTicket>) {
        match ticket {
            Some(ticket) => self.session.frame_failed(&ticket),
            None => self.session.render(),
        }
    }

    fn sync_title(&mut self) {
        let title = format!("{} | {}", self.cfg.window_title, self.session.status());
        if title != self.title {
            if let Some(window) = self.window.as_ref() {
                window.set_title(&title);
            }
            self.title = title;
        }
    }

    fn request_redraw(&mut self) {
        self.session.render();
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }
}

impl ApplicationHandler<ViewerEvent> for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let Some(window) = self.ensure_window(event_loop) else {
            event_loop.exit();
            return;
        };

        if self.gpu.is_none() {
            if let Err(err) = self.init_gpu(window) {
                error!(error = ?err, "failed to initialize GPU state");
                event_loop.exit();
                return;
            }
        }

        self.request_load();
        self.sync_title();
        self.request_redraw();
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(window) = self.window.as_ref() else {
            return;
        };
        if window.id() != window_id {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                info!("viewer window close requested");
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                self.handle_resize(new_size);
            }
            WindowEvent::ScaleFactorChanged {
                mut inner_size_writer,
                ..
            } => {
                let size = window.inner_size();
                let _ = inner_size_writer.request_inner_size(size);
                self.handle_resize(size);
            }
            WindowEvent::RedrawRequested => {
                self.draw(event_loop);
            }
            other => {
                let Some(input_event) = InputEvent::from_window_event(&other) else {
                    return;
                };
                let rect = self.session.overview_rect();
                let action = self
                    .input
                    .as_mut()
                    .and_then(|input| input.handle(input_event, self.view, rect));
                if let Some(action) = action {
                    self.apply(action, event_loop);
                }
            }
        }
        self.sync_title();
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if self.session.wants_frame() {
            if let Some(window) = self.window.as_ref() {
                window.request_redraw();
            }
        }
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: ViewerEvent) {
        match event {
            ViewerEvent::Load(LoadEvent::Progress(stage)) => self.session.loading(stage),
            ViewerEvent::Load(LoadEvent::Loaded(loaded)) => {
                if let Some(gpu) = self.gpu.as_mut() {
                    gpu.upload_plate(&loaded.plate);
                }
                let (width, height) = (loaded.plate.width(), loaded.plate.height());
                self.session.plate_loaded(&loaded.name, width, height);
            }
            ViewerEvent::Load(LoadEvent::Failed(failed)) => {
                debug!(plate = %failed.name, "load failure reported to viewer");
                self.session.load_failed(&failed.reason);
            }
        }
        self.sync_title();
        self.request_redraw();
    }
}

/// Open a window on `source` and run until the user quits.
///
/// # Errors
/// Returns an error if the event loop cannot be created or fails while running.
pub fn run_viewer(cfg: Configuration, source: PlateSource) -> Result<()> {
    let event_loop = EventLoop::<ViewerEvent>::with_user_event()
        .build()
        .context("failed to build viewer event loop")?;
    let proxy = event_loop.create_proxy();

    let (tx_req, rx_req) = xchan::unbounded::<LoaderMsg>();
    let _loader = spawn_loader(rx_req, move |event| {
        let _ = proxy.send_event(ViewerEvent::Load(event));
    });

    let mut app = ViewerApp::new(cfg, source, tx_req.clone());
    let run_result = event_loop.run_app(&mut app);
    let _ = tx_req.send(LoaderMsg::Quit);

    run_result.context("viewer event loop failed")
}
