use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Audible/haptic feedback played on a live scan
pub trait FeedbackSink: Send {
    fn set_enabled(&mut self, enabled: bool);
    fn play_feedback(&mut self);
    fn release(&mut self);
}

/// Ends the session after a period without decode activity
pub trait IdleTimer: Send {
    fn on_resume(&mut self);
    fn on_pause(&mut self);
    fn on_activity(&mut self);
    fn shutdown(&mut self);
}

/// The external worker that decodes preview frames
pub trait DecodeWorker: Send {
    /// Ask for the next preview frame to be decoded
    fn request_decode(&mut self);

    /// Abandon any decode in flight
    fn cancel(&mut self);
}

/// Feedback sink that only logs, for hosts without audio or vibration
#[derive(Debug, Default)]
pub struct LoggingFeedback {
    enabled: bool,
    played: u64,
}

impl LoggingFeedback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn played(&self) -> u64 {
        self.played
    }
}

impl FeedbackSink for LoggingFeedback {
    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn play_feedback(&mut self) {
        if self.enabled {
            self.played += 1;
            info!("*beep*");
        }
    }

    fn release(&mut self) {
        debug!("Feedback released after {} plays", self.played);
    }
}

/// Tokio-backed inactivity timer that invokes a callback on expiry
pub struct InactivityTimer {
    timeout: Duration,
    on_timeout: Arc<dyn Fn() + Send + Sync>,
    task: Option<JoinHandle<()>>,
    paused: bool,
    shut_down: bool,
}

impl InactivityTimer {
    pub fn new<F>(timeout: Duration, on_timeout: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            timeout,
            on_timeout: Arc::new(on_timeout),
            task: None,
            paused: true,
            shut_down: false,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    fn arm(&mut self) {
        self.disarm();
        if self.shut_down || self.paused {
            return;
        }

        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!("No async runtime available, inactivity timer not armed");
                return;
            }
        };

        let timeout = self.timeout;
        let on_timeout = Arc::clone(&self.on_timeout);
        self.task = Some(handle.spawn(async move {
            tokio::time::sleep(timeout).await;
            info!("Finishing session after {:?} of inactivity", timeout);
            on_timeout();
        }));
    }

    fn disarm(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl IdleTimer for InactivityTimer {
    fn on_resume(&mut self) {
        self.paused = false;
        self.arm();
    }

    fn on_pause(&mut self) {
        self.paused = true;
        self.disarm();
    }

    fn on_activity(&mut self) {
        self.arm();
    }

    fn shutdown(&mut self) {
        self.shut_down = true;
        self.disarm();
    }
}

impl Drop for InactivityTimer {
    fn drop(&mut self) {
        self.disarm();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_logging_feedback_respects_enabled() {
        let mut feedback = LoggingFeedback::new();
        feedback.play_feedback();
        assert_eq!(feedback.played(), 0);

        feedback.set_enabled(true);
        feedback.play_feedback();
        assert_eq!(feedback.played(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_inactivity_timer_fires_after_timeout() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let mut timer = InactivityTimer::new(Duration::from_secs(10), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        timer.on_resume();
        assert!(timer.is_armed());

        tokio::time::sleep(Duration::from_secs(11)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_activity_postpones_timeout() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let mut timer = InactivityTimer::new(Duration::from_secs(10), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        timer.on_resume();
        tokio::time::sleep(Duration::from_secs(6)).await;
        timer.on_activity();
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_and_shutdown_disarm() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let mut timer = InactivityTimer::new(Duration::from_secs(1), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        timer.on_resume();
        timer.on_pause();
        timer.on_activity();
        assert!(!timer.is_armed());

        timer.on_resume();
        timer.shutdown();
        timer.on_resume();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
