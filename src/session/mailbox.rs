use super::dispatch::Dispatcher;
use super::SessionMessage;
use crate::decode::DecodeOutcome;
use parking_lot::Mutex;
use tracing::debug;

/// Single-slot mailbox between the decode worker and the dispatch context.
///
/// Holds at most one undelivered outcome; a newer arrival replaces an older
/// one. The slot outlives any particular dispatch context.
#[derive(Debug, Default)]
pub struct ResultDispatcher {
    slot: Mutex<Option<DecodeOutcome>>,
}

impl ResultDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put `outcome` (if any) into the slot, then deliver whatever the slot
    /// holds when a dispatch context exists. Returns true if a message was
    /// posted.
    pub fn store(
        &self,
        outcome: Option<DecodeOutcome>,
        dispatch: Option<&dyn Dispatcher>,
    ) -> bool {
        let pending = {
            let mut slot = self.slot.lock();
            if let Some(outcome) = outcome {
                if let Some(superseded) = slot.replace(outcome) {
                    debug!(
                        "Undelivered result '{}' superseded by a newer one",
                        superseded.text
                    );
                }
            }

            match dispatch {
                Some(_) => slot.take(),
                None => None,
            }
        };

        match (pending, dispatch) {
            (Some(outcome), Some(dispatch)) => {
                dispatch.post(SessionMessage::DecodeSucceeded(outcome));
                true
            }
            _ => false,
        }
    }

    /// Remove the held outcome without delivering it
    pub fn take(&self) -> Option<DecodeOutcome> {
        self.slot.lock().take()
    }

    pub fn is_empty(&self) -> bool {
        self.slot.lock().is_none()
    }
}
