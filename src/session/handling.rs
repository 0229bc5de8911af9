use super::highlight::Highlight;
use super::{CaptureCoordinator, ScanOutcome, SessionMessage, SessionState};
use crate::canvas::Canvas;
use crate::config::ScanMode;
use crate::decode::DecodeOutcome;
use crate::events::ScanEvent;
use crate::geometry::Rect;
use tracing::{debug, info, trace, warn};

impl CaptureCoordinator {
    /// A decode attempt completed on the worker. The outcome is held until a
    /// dispatch context exists, superseding any older undelivered one.
    pub fn on_decode_outcome(&mut self, outcome: DecodeOutcome) {
        if self.state.is_terminal() {
            debug!("Session {} finished, dropping decode outcome", self.id);
            return;
        }
        self.results.store(Some(outcome), self.dispatch.as_deref());
    }

    /// Handle a message delivered by the dispatch context
    pub fn handle_message(&mut self, message: SessionMessage, canvas: &mut dyn Canvas) {
        trace!("Session {} handling '{}'", self.id, message.kind());
        match message {
            SessionMessage::DecodeSucceeded(outcome) => self.handle_decode(outcome),
            SessionMessage::RestartPreview => self.restart_preview(),
            SessionMessage::Redraw { dirty } => self.redraw(canvas, dirty),
        }
    }

    /// Raw sensor rotation in degrees. A 90/270 flip ends this session so
    /// the host can relaunch an identical one.
    pub fn on_orientation(&mut self, degrees: i32) {
        let flipped = match self.orientation.as_mut() {
            Some(monitor) => monitor.on_orientation(degrees),
            None => false,
        };
        if !flipped || self.state.is_terminal() {
            return;
        }

        if let Some(pending) = self.results.take() {
            warn!(
                "Session {} relaunching with undelivered result '{}'",
                self.id, pending.text
            );
            self.event_bus
                .publish(ScanEvent::PendingResultDiscarded { text: pending.text });
        }

        info!("Session {} relaunching after rotation flip", self.id);
        self.event_bus.publish(ScanEvent::RelaunchRequested);
        self.set_state(SessionState::Relaunching);
    }

    fn handle_decode(&mut self, mut outcome: DecodeOutcome) {
        if self.state.is_terminal() || matches!(self.state, SessionState::FatalError { .. }) {
            debug!("Session {} no longer scanning, outcome ignored", self.id);
            return;
        }
        self.idle.on_activity();

        if outcome.is_success() {
            debug!("Session {} decoded '{}'", self.id, outcome.text);
        }

        let live_scan = outcome.is_live_scan();
        if live_scan {
            self.feedback.play_feedback();
            self.event_bus.publish(ScanEvent::FeedbackPlayed);
            self.draw_highlight(&mut outcome);
        }

        // Continuous scanning only reacts to frames captured live
        if !live_scan && self.config.mode == ScanMode::Continuous {
            debug!("Outcome carries no live frame, nothing to do");
            return;
        }

        if outcome.is_success() {
            self.finish(ScanOutcome::Success { text: outcome.text });
        } else {
            self.restart_preview_after_delay();
        }
    }

    fn draw_highlight(&mut self, outcome: &mut DecodeOutcome) {
        let Some(mut raster) = outcome.raster.take() else {
            return;
        };

        let highlight = Highlight::plan(&outcome.points, outcome.format, outcome.scale_factor);
        if highlight != Highlight::None {
            highlight.render(&mut raster, self.highlight_color);
            let (lines, dots) = highlight.counts();
            self.event_bus.publish(ScanEvent::HighlightDrawn { lines, dots });
        }
        self.last_capture = Some(raster);
    }

    pub(super) fn restart_preview_after_delay(&mut self) {
        let delay = self.config.restart_delay();
        match &self.dispatch {
            Some(dispatch) => {
                dispatch.post_delayed(SessionMessage::RestartPreview, delay);
                self.event_bus.publish(ScanEvent::RestartScheduled {
                    delay_ms: self.config.restart_delay_ms,
                });
                self.set_state(SessionState::Restarting);
            }
            None => debug!("No dispatch context, preview restart not scheduled"),
        }
        self.renderer.reset_prompt();
    }

    fn restart_preview(&mut self) {
        if self.state != SessionState::Restarting {
            debug!("Restart ignored while {}", self.state);
            return;
        }

        self.set_state(SessionState::Previewing);
        self.renderer.reset_prompt();
        self.event_bus.publish(ScanEvent::PreviewRestarted);
        self.decoder.request_decode();
    }

    fn redraw(&mut self, canvas: &mut dyn Canvas, dirty: Option<Rect>) {
        if !self.state.is_foreground() {
            trace!("Session {} not visible, redraw skipped", self.id);
            return;
        }

        let geometry = self.frame_geometry();
        canvas.set_clip(dirty);
        canvas.clear(dirty);
        let request = self.renderer.draw(canvas, geometry);
        canvas.set_clip(None);

        if let (Some(request), Some(dispatch)) = (request, &self.dispatch) {
            dispatch.post_delayed(
                SessionMessage::Redraw {
                    dirty: Some(request.dirty),
                },
                request.delay,
            );
        }
    }
}
