use super::SessionMessage;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Message queue into the session loop for one foreground cycle
pub trait Dispatcher: Send + Sync {
    fn post(&self, message: SessionMessage);

    fn post_delayed(&self, message: SessionMessage, delay: Duration);

    /// Cancel everything posted through this dispatcher, including
    /// messages already queued. Nothing posted before the call is delivered
    /// afterwards.
    fn quit_synchronously(&self);
}

/// Creates a fresh dispatcher each time the session returns to the foreground
pub trait DispatchFactory: Send {
    fn create(&mut self) -> Box<dyn Dispatcher>;
}

/// A message tagged with the dispatcher generation that posted it
#[derive(Debug)]
pub struct Envelope {
    generation: CancellationToken,
    message: SessionMessage,
}

impl Envelope {
    /// The message, unless its dispatcher has since quit
    pub fn into_live(self) -> Option<SessionMessage> {
        if self.generation.is_cancelled() {
            trace!("Dropping stale '{}' message", self.message.kind());
            None
        } else {
            Some(self.message)
        }
    }
}

/// Dispatcher backed by a tokio channel; delayed posts are sleeping tasks
pub struct TokioDispatcher {
    sender: mpsc::UnboundedSender<Envelope>,
    generation: CancellationToken,
    delayed: Mutex<Vec<JoinHandle<()>>>,
}

impl TokioDispatcher {
    pub fn new(sender: mpsc::UnboundedSender<Envelope>) -> Self {
        Self {
            sender,
            generation: CancellationToken::new(),
            delayed: Mutex::new(Vec::new()),
        }
    }

    pub fn pending_delayed(&self) -> usize {
        self.delayed
            .lock()
            .iter()
            .filter(|task| !task.is_finished())
            .count()
    }

    fn envelope(&self, message: SessionMessage) -> Envelope {
        Envelope {
            generation: self.generation.clone(),
            message,
        }
    }
}

impl Dispatcher for TokioDispatcher {
    fn post(&self, message: SessionMessage) {
        if self.generation.is_cancelled() {
            trace!("Dispatcher has quit, ignoring '{}'", message.kind());
            return;
        }
        if self.sender.send(self.envelope(message)).is_err() {
            debug!("Session loop has gone away, message dropped");
        }
    }

    fn post_delayed(&self, message: SessionMessage, delay: Duration) {
        if self.generation.is_cancelled() {
            trace!("Dispatcher has quit, ignoring delayed '{}'", message.kind());
            return;
        }

        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!(
                    "No async runtime available, delayed '{}' dropped",
                    message.kind()
                );
                return;
            }
        };

        let sender = self.sender.clone();
        let envelope = self.envelope(message);
        let generation = self.generation.clone();
        let task = handle.spawn(async move {
            tokio::select! {
                _ = generation.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    let _ = sender.send(envelope);
                }
            }
        });

        let mut delayed = self.delayed.lock();
        delayed.retain(|task| !task.is_finished());
        delayed.push(task);
    }

    fn quit_synchronously(&self) {
        self.generation.cancel();
        let tasks: Vec<JoinHandle<()>> = self.delayed.lock().drain(..).collect();
        if !tasks.is_empty() {
            debug!("Cancelling {} delayed messages", tasks.len());
        }
        for task in tasks {
            task.abort();
        }
    }
}

impl Drop for TokioDispatcher {
    fn drop(&mut self) {
        self.quit_synchronously();
    }
}

/// Hands out [`TokioDispatcher`]s that all feed the same session loop
#[derive(Clone)]
pub struct TokioDispatchFactory {
    sender: mpsc::UnboundedSender<Envelope>,
}

impl TokioDispatchFactory {
    pub fn new(sender: mpsc::UnboundedSender<Envelope>) -> Self {
        Self { sender }
    }
}

impl DispatchFactory for TokioDispatchFactory {
    fn create(&mut self) -> Box<dyn Dispatcher> {
        Box::new(TokioDispatcher::new(self.sender.clone()))
    }
}

/// A message captured by a [`RecordingDispatcher`]
#[derive(Debug)]
pub struct Posted {
    pub message: SessionMessage,
    pub delay: Option<Duration>,
}

/// Everything the recording dispatchers of one factory have seen
#[derive(Debug, Default)]
pub struct DispatchLog {
    pub posted: Vec<Posted>,
    pub created: usize,
    pub quits: usize,
}

impl DispatchLog {
    /// Messages other than overlay redraws
    pub fn non_redraw(&self) -> Vec<&Posted> {
        self.posted
            .iter()
            .filter(|posted| !matches!(posted.message, SessionMessage::Redraw { .. }))
            .collect()
    }
}

/// Dispatcher that records posts for a host or test to deliver by hand
pub struct RecordingDispatcher {
    log: Arc<Mutex<DispatchLog>>,
    quit: Mutex<bool>,
}

impl Dispatcher for RecordingDispatcher {
    fn post(&self, message: SessionMessage) {
        if *self.quit.lock() {
            return;
        }
        self.log.lock().posted.push(Posted {
            message,
            delay: None,
        });
    }

    fn post_delayed(&self, message: SessionMessage, delay: Duration) {
        if *self.quit.lock() {
            return;
        }
        self.log.lock().posted.push(Posted {
            message,
            delay: Some(delay),
        });
    }

    fn quit_synchronously(&self) {
        *self.quit.lock() = true;
        let mut log = self.log.lock();
        log.posted.clear();
        log.quits += 1;
    }
}

#[derive(Clone, Default)]
pub struct RecordingDispatchFactory {
    log: Arc<Mutex<DispatchLog>>,
}

impl RecordingDispatchFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> Arc<Mutex<DispatchLog>> {
        Arc::clone(&self.log)
    }

    /// Remove and return everything posted so far
    pub fn take_posted(&self) -> Vec<Posted> {
        std::mem::take(&mut self.log.lock().posted)
    }
}

impl DispatchFactory for RecordingDispatchFactory {
    fn create(&mut self) -> Box<dyn Dispatcher> {
        self.log.lock().created += 1;
        Box::new(RecordingDispatcher {
            log: Arc::clone(&self.log),
            quit: Mutex::new(false),
        })
    }
}
