//! Redraw scheduling for the viewer.
//!
//! Most frames are on-demand: a state change queues exactly one render. The
//! wiggle mode instead runs a clock-driven loop. Starting the loop hands out a
//! [`CancellationToken`]; stopping cancels it, and a frame only schedules its
//! successor while the token it was drawn under is still live.

use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Permission to draw one frame, issued by [`FrameScheduler::next_frame`].
#[derive(Debug, Clone)]
pub struct FrameTicket {
    token: Option<CancellationToken>,
}

impl FrameTicket {
    pub fn is_animated(&self) -> bool {
        self.token.as_ref().is_some_and(|t| !t.is_cancelled())
    }
}

#[derive(Debug, Default)]
pub struct FrameScheduler {
    animation: Option<CancellationToken>,
    render_pending: bool,
    loop_scheduled: bool,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_animating(&self) -> bool {
        self.animation.as_ref().is_some_and(|t| !t.is_cancelled())
    }

    /// Start the continuous loop, or return the token of the running one.
    pub fn start_animation(&mut self) -> CancellationToken {
        if let Some(token) = self.animation.as_ref().filter(|t| !t.is_cancelled()) {
            return token.clone();
        }
        let token = CancellationToken::new();
        self.animation = Some(token.clone());
        self.loop_scheduled = true;
        debug!("animation loop started");
        token
    }

    /// Cancel the loop; exactly one more frame is rendered afterwards.
    pub fn stop_animation(&mut self) {
        if let Some(token) = self.animation.take() {
            token.cancel();
            self.loop_scheduled = false;
            self.render_pending = true;
            debug!("animation loop stopped");
        }
    }

    /// Ask for a single redraw. While the loop runs the next tick covers it.
    pub fn request_render(&mut self) {
        if !self.is_animating() {
            self.render_pending = true;
        }
    }

    /// Whether the host should ask the platform for a redraw.
    pub fn wants_frame(&self) -> bool {
        self.render_pending || self.loop_scheduled
    }

    /// Claim the next frame, if any is due.
    pub fn next_frame(&mut self) -> Option<FrameTicket> {
        if !self.wants_frame() {
            return None;
        }
        self.render_pending = false;
        self.loop_scheduled = false;
        Some(FrameTicket {
            token: self.animation.clone(),
        })
    }

    /// Report a drawn frame; returns `true` if the loop scheduled another one.
    pub fn frame_done(&mut self, ticket: &FrameTicket) -> bool {
        if ticket.is_animated() {
            self.loop_scheduled = true;
            true
        } else {
            false
        }
    }

    /// Hand back a frame that could not be presented so it is drawn again.
    ///
    /// A loop frame keeps the loop alive while its token is live; any other
    /// frame turns into a single pending render.
    pub fn retry(&mut self, ticket: &FrameTicket) {
        if ticket.is_animated() {
            self.loop_scheduled = true;
        } else {
            self.render_pending = true;
        }
        debug!(animated = ticket.is_animated(), "frame retry scheduled");
    }

    /// Renders queued outside of the loop (0 or 1).
    pub fn pending_renders(&self) -> usize {
        usize::from(self.render_pending)
    }

    /// Loop callbacks currently scheduled (0 or 1).
    pub fn scheduled_callbacks(&self) -> usize {
        usize::from(self.loop_scheduled && self.is_animating())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_scheduler_has_nothing_to_draw() {
        let mut s = FrameScheduler::new();
        assert!(!s.wants_frame());
        assert!(s.next_frame().is_none());
    }

    #[test]
    fn on_demand_requests_coalesce() {
        let mut s = FrameScheduler::new();
        s.request_render();
        s.request_render();
        assert_eq!(s.pending_renders(), 1);
        let t = s.next_frame().unwrap();
        assert!(!s.frame_done(&t));
        assert!(s.next_frame().is_none());
    }

    #[test]
    fn loop_reschedules_until_stopped() {
        let mut s = FrameScheduler::new();
        let token = s.start_animation();
        for _ in 0..3 {
            let t = s.next_frame().unwrap();
            assert!(s.frame_done(&t));
            assert_eq!(s.scheduled_callbacks(), 1);
        }
        s.stop_animation();
        assert!(token.is_cancelled());
        assert_eq!(s.scheduled_callbacks(), 0);
        assert_eq!(s.pending_renders(), 1);
        let t = s.next_frame().unwrap();
        assert!(!s.frame_done(&t));
        assert!(s.next_frame().is_none());
    }

    #[test]
    fn frame_in_flight_when_stopped_does_not_reschedule() {
        let mut s = FrameScheduler::new();
        s.start_animation();
        let in_flight = s.next_frame().unwrap();
        s.stop_animation();
        assert!(!s.frame_done(&in_flight));
        assert_eq!(s.scheduled_callbacks(), 0);
        assert_eq!(s.pending_renders(), 1);
    }

    #[test]
    fn failed_loop_frame_keeps_loop_running() {
        let mut s = FrameScheduler::new();
        s.start_animation();
        let failed = s.next_frame().unwrap();
        assert!(!s.wants_frame());
        s.retry(&failed);
        assert!(s.wants_frame());
        assert_eq!(s.scheduled_callbacks(), 1);
        let next = s.next_frame().unwrap();
        assert!(s.frame_done(&next));
        assert!(s.wants_frame());
    }

    #[test]
    fn failed_frame_after_stop_renders_once_more() {
        let mut s = FrameScheduler::new();
        s.start_animation();
        let failed = s.next_frame().unwrap();
        s.stop_animation();
        assert!(s.next_frame().is_some());
        s.retry(&failed);
        assert_eq!(s.pending_renders(), 1);
        assert_eq!(s.scheduled_callbacks(), 0);
    }

    #[test]
    fn restarting_reuses_live_token() {
        let mut s = FrameScheduler::new();
        let a = s.start_animation();
        let b = s.start_animation();
        a.cancel();
        assert!(b.is_cancelled());
    }

    #[test]
    fn render_requests_during_loop_are_absorbed() {
        let mut s = FrameScheduler::new();
        s.start_animation();
        s.request_render();
        assert_eq!(s.pending_renders(), 0);
    }
}
