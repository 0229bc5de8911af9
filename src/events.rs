use crate::error::EventBusError;
use crate::session::ScanOutcome;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Observable events emitted by a capture session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ScanEvent {
    /// The coordinator moved to a new lifecycle state
    StateChanged { state: String },
    /// The camera driver opened against a display surface
    CameraOpened,
    /// Opening the camera failed; the session is over
    CameraOpenFailed { error: String },
    /// Blocking notice the user must dismiss
    FatalNotice { message: String },
    /// Audible/haptic feedback for a live scan
    FeedbackPlayed,
    /// Result points were drawn onto the decoded frame
    HighlightDrawn { lines: usize, dots: usize },
    /// A preview restart was queued
    RestartScheduled { delay_ms: u64 },
    /// The preview resumed decoding
    PreviewRestarted,
    /// An undelivered decode result was dropped
    PendingResultDiscarded { text: String },
    /// Rotation flip requires tearing down and relaunching the session
    RelaunchRequested,
    /// Terminal outcome delivered to the caller
    SessionFinished { outcome: ScanOutcome },
}

impl ScanEvent {
    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            ScanEvent::StateChanged { state } => format!("Session state: {}", state),
            ScanEvent::CameraOpened => "Camera opened".to_string(),
            ScanEvent::CameraOpenFailed { error } => format!("Camera open failed: {}", error),
            ScanEvent::FatalNotice { message } => format!("Fatal notice: {}", message),
            ScanEvent::FeedbackPlayed => "Feedback played".to_string(),
            ScanEvent::HighlightDrawn { lines, dots } => {
                format!("Highlight drawn ({} lines, {} dots)", lines, dots)
            }
            ScanEvent::RestartScheduled { delay_ms } => {
                format!("Preview restart in {} ms", delay_ms)
            }
            ScanEvent::PreviewRestarted => "Preview restarted".to_string(),
            ScanEvent::PendingResultDiscarded { text } => {
                format!("Pending result discarded: '{}'", text)
            }
            ScanEvent::RelaunchRequested => "Session relaunch requested".to_string(),
            ScanEvent::SessionFinished { outcome } => format!("Session finished: {:?}", outcome),
        }
    }

    /// Get the event type as a string for filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            ScanEvent::StateChanged { .. } => "state_changed",
            ScanEvent::CameraOpened => "camera_opened",
            ScanEvent::CameraOpenFailed { .. } => "camera_open_failed",
            ScanEvent::FatalNotice { .. } => "fatal_notice",
            ScanEvent::FeedbackPlayed => "feedback_played",
            ScanEvent::HighlightDrawn { .. } => "highlight_drawn",
            ScanEvent::RestartScheduled { .. } => "restart_scheduled",
            ScanEvent::PreviewRestarted => "preview_restarted",
            ScanEvent::PendingResultDiscarded { .. } => "pending_result_discarded",
            ScanEvent::RelaunchRequested => "relaunch_requested",
            ScanEvent::SessionFinished { .. } => "session_finished",
        }
    }
}

/// Broadcast event bus for session observers
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ScanEvent>,
    debug_logging: bool,
}

impl EventBus {
    /// Create a new event bus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            debug_logging: false,
        }
    }

    /// Create a new event bus with debug logging enabled
    pub fn with_debug_logging(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            debug_logging: true,
        }
    }

    /// Subscribe to events and get a receiver
    pub fn subscribe(&self) -> broadcast::Receiver<ScanEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all subscribers, returning how many received it.
    /// Publishing with nobody listening is not an error.
    pub fn publish(&self, event: ScanEvent) -> usize {
        match &event {
            ScanEvent::CameraOpenFailed { error: err } => {
                error!("Camera open failed: {}", err);
            }
            ScanEvent::PendingResultDiscarded { text } => {
                warn!("Discarding undelivered decode result '{}'", text);
            }
            ScanEvent::SessionFinished { outcome } => {
                info!("Session finished: {:?}", outcome);
            }
            _ => {
                if self.debug_logging {
                    debug!("Event: {}", event.description());
                }
            }
        }

        self.sender.send(event).unwrap_or(0)
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}

/// Event filter for selective event handling
#[derive(Debug, Clone)]
pub enum EventFilter {
    /// Accept all events
    All,
    /// Accept only specific event types
    EventTypes(Vec<&'static str>),
}

impl EventFilter {
    /// Check if an event passes this filter
    pub fn matches(&self, event: &ScanEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::EventTypes(types) => types.contains(&event.event_type()),
        }
    }
}

/// Event receiver with filtering
pub struct EventReceiver {
    receiver: broadcast::Receiver<ScanEvent>,
    filter: EventFilter,
    name: String,
}

impl EventReceiver {
    pub fn new(receiver: broadcast::Receiver<ScanEvent>, filter: EventFilter, name: String) -> Self {
        Self {
            receiver,
            filter,
            name,
        }
    }

    /// Receive the next filtered event
    pub async fn recv(&mut self) -> Result<ScanEvent, EventBusError> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if self.filter.matches(&event) {
                        debug!(
                            "Receiver '{}' received event: {}",
                            self.name,
                            event.description()
                        );
                        return Ok(event);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Receiver '{}' lagged behind by {} events", self.name, n);
                    return Err(EventBusError::Lagged { skipped: n });
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Event bus closed for receiver '{}'", self.name);
                    return Err(EventBusError::ChannelClosed);
                }
            }
        }
    }

    /// Drain every buffered event that passes the filter
    pub fn drain(&mut self) -> Vec<ScanEvent> {
        let mut events = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.filter.matches(&event) {
                        events.push(event);
                    }
                }
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    warn!("Receiver '{}' lagged behind by {} events", self.name, n);
                }
                Err(_) => return events,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{timeout, Duration};

    #[tokio::test]
    async fn test_event_bus_basic_operations() {
        let event_bus = EventBus::new(10);
        let mut receiver = event_bus.subscribe();

        let delivered = event_bus.publish(ScanEvent::RestartScheduled { delay_ms: 500 });
        assert_eq!(delivered, 1);

        let received = receiver.recv().await.unwrap();
        assert_eq!(received, ScanEvent::RestartScheduled { delay_ms: 500 });
    }

    #[test]
    fn test_publish_without_subscribers() {
        let event_bus = EventBus::new(10);
        assert_eq!(event_bus.publish(ScanEvent::CameraOpened), 0);
        assert_eq!(event_bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_filtered_receiver() {
        let event_bus = EventBus::new(10);
        let filter = EventFilter::EventTypes(vec!["highlight_drawn"]);
        let mut receiver = EventReceiver::new(event_bus.subscribe(), filter, "test".to_string());

        event_bus.publish(ScanEvent::FeedbackPlayed);
        event_bus.publish(ScanEvent::HighlightDrawn { lines: 1, dots: 0 });

        let received = timeout(Duration::from_millis(100), receiver.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received, ScanEvent::HighlightDrawn { lines: 1, dots: 0 });
    }

    #[test]
    fn test_drain_applies_filter() {
        let event_bus = EventBus::new(10);
        let filter = EventFilter::EventTypes(vec!["feedback_played"]);
        let mut receiver = EventReceiver::new(event_bus.subscribe(), filter, "test".to_string());

        event_bus.publish(ScanEvent::FeedbackPlayed);
        event_bus.publish(ScanEvent::CameraOpened);
        event_bus.publish(ScanEvent::FeedbackPlayed);

        assert_eq!(receiver.drain().len(), 2);
    }

    #[test]
    fn test_event_properties() {
        let event = ScanEvent::HighlightDrawn { lines: 2, dots: 0 };
        assert_eq!(event.event_type(), "highlight_drawn");
        assert!(event.description().contains("2 lines"));
    }
}
