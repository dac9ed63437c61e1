// UiMailbox - deferred calls from the recognition worker into the UI thread
//
// The UI owns its state and must only be touched from its own execution context.
// The worker therefore never calls the UI directly: it posts a UiAction into a
// lock-free SPSC ring, and the UI drains the ring from its own loop via pump().
//
// Architecture:
// - MailboxSender: owned by the ActionDispatcher (recognition worker)
// - MailboxReceiver: owned by the UI thread
//
// Posting never blocks. A full ring or a dropped receiver is reported as a
// DispatchError to the caller, which logs and discards it.

use rtrb::{Consumer, Producer, PushError, RingBuffer};

use crate::analysis::gesture::UiAction;
use crate::error::{log_dispatch_error, DispatchError};

/// The two effect hooks the UI exposes
///
/// Invoked only from the UI's own thread by [MailboxReceiver::pump].
pub trait UiEffects {
    fn increase(&mut self) -> Result<(), DispatchError>;
    fn decrease(&mut self) -> Result<(), DispatchError>;
}

/// Split mailbox halves
pub struct MailboxChannels {
    pub sender: MailboxSender,
    pub receiver: MailboxReceiver,
}

/// Fixed-capacity SPSC mailbox
///
/// # Example
/// ```ignore
/// let MailboxChannels { mut sender, mut receiver } = UiMailbox::new(64);
///
/// // In recognition worker:
/// sender.post(UiAction::Increase)?;
///
/// // In UI loop:
/// receiver.pump(&mut brush);
/// ```
pub struct UiMailbox;

impl UiMailbox {
    /// Create a mailbox with `capacity` slots (clamped to at least 1)
    #[allow(clippy::new_ret_no_self)]
    pub fn new(capacity: usize) -> MailboxChannels {
        let capacity = capacity.max(1);
        let (producer, consumer) = RingBuffer::new(capacity);
        MailboxChannels {
            sender: MailboxSender { producer, capacity },
            receiver: MailboxReceiver { consumer },
        }
    }
}

/// Producer half, held by the dispatcher
pub struct MailboxSender {
    producer: Producer<UiAction>,
    capacity: usize,
}

impl MailboxSender {
    /// Queue an action for the UI thread without blocking
    pub fn post(&mut self, action: UiAction) -> Result<(), DispatchError> {
        if self.producer.is_abandoned() {
            return Err(DispatchError::UiDetached);
        }
        self.producer
            .push(action)
            .map_err(|PushError::Full(_)| DispatchError::MailboxFull {
                capacity: self.capacity,
            })
    }

    /// False once the UI dropped its receiver
    pub fn is_attached(&self) -> bool {
        !self.producer.is_abandoned()
    }
}

/// Result of one pump pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PumpSummary {
    pub applied: usize,
    pub failed: usize,
}

/// Consumer half, held by the UI thread
pub struct MailboxReceiver {
    consumer: Consumer<UiAction>,
}

impl MailboxReceiver {
    /// Apply every pending action to `effects`, oldest first
    ///
    /// Effect failures are logged and counted; they never propagate.
    pub fn pump(&mut self, effects: &mut dyn UiEffects) -> PumpSummary {
        let mut summary = PumpSummary::default();
        while let Ok(action) = self.consumer.pop() {
            let result = match action {
                UiAction::Increase => effects.increase(),
                UiAction::Decrease => effects.decrease(),
            };
            match result {
                Ok(()) => summary.applied += 1,
                Err(err) => {
                    log_dispatch_error(&err, "MailboxReceiver::pump");
                    summary.failed += 1;
                }
            }
        }
        summary
    }

    /// Actions waiting to be pumped
    pub fn pending(&self) -> usize {
        self.consumer.slots()
    }
}
