// Dispatch module - cooldown-gated hand-off of gesture actions to the UI
//
// The ActionDispatcher runs on the recognition worker. For every smoothed
// gesture it:
// 1. Resolves the gesture to a UiAction (most gestures have none)
// 2. Applies the cooldown gate, a pure rate limiter with no pending queue
// 3. Posts the action into the UI mailbox
//
// Failures at step 3 are returned by the mailbox as DispatchError values,
// logged here and discarded. They never reach the recognition loop.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::analysis::gesture::Gesture;
use crate::engine::time::TimeSource;
use crate::error::log_dispatch_error;
use crate::telemetry;

pub mod brush;
pub mod mailbox;

pub use brush::BrushSize;
pub use mailbox::{
    MailboxChannels, MailboxReceiver, MailboxSender, PumpSummary, UiEffects, UiMailbox,
};

/// What happened to one gesture at the dispatch boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStatus {
    /// Gesture has no bound action
    NoAction,
    /// Dropped by the cooldown gate
    CooledDown,
    /// Posted to the UI mailbox
    Dispatched,
    /// Passed the gate but the mailbox rejected it
    Failed,
}

/// Minimum-interval gate
#[derive(Debug, Clone)]
pub struct Cooldown {
    last: Option<Instant>,
    interval: Duration,
}

impl Cooldown {
    pub fn new(interval: Duration) -> Self {
        Self {
            last: None,
            interval,
        }
    }

    /// Take the gate at `now` if the interval has elapsed since the last take
    ///
    /// The first call always passes.
    pub fn try_acquire(&mut self, now: Instant) -> bool {
        let open = match self.last {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.interval,
        };
        if open {
            self.last = Some(now);
        }
        open
    }
}

/// Debounced gesture-to-UI dispatcher
pub struct ActionDispatcher {
    cooldown: Cooldown,
    mailbox: MailboxSender,
    clock: Arc<dyn TimeSource>,
}

impl ActionDispatcher {
    pub fn new(mailbox: MailboxSender, cooldown: Duration, clock: Arc<dyn TimeSource>) -> Self {
        Self {
            cooldown: Cooldown::new(cooldown),
            mailbox,
            clock,
        }
    }

    /// Dispatch the action bound to `gesture`, if any
    pub fn dispatch(&mut self, gesture: Gesture) -> DispatchStatus {
        let Some(action) = gesture.action() else {
            return DispatchStatus::NoAction;
        };

        if !self.cooldown.try_acquire(self.clock.now()) {
            log::trace!("[Dispatcher] {} dropped by cooldown", gesture);
            telemetry::hub().record_dispatch(action, DispatchStatus::CooledDown);
            return DispatchStatus::CooledDown;
        }

        let status = match self.mailbox.post(action) {
            Ok(()) => {
                log::debug!("[Dispatcher] {} -> {:?}", gesture, action);
                DispatchStatus::Dispatched
            }
            Err(err) => {
                log_dispatch_error(&err, "ActionDispatcher::dispatch");
                DispatchStatus::Failed
            }
        };
        telemetry::hub().record_dispatch(action, status);
        status
    }
}
