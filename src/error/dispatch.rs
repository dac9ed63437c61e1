// Dispatch error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Dispatch error code constants
///
/// Error code range: 3001-3003
pub struct DispatchErrorCodes {}

impl DispatchErrorCodes {
    /// UI side dropped its mailbox
    pub const UI_DETACHED: i32 = 3001;

    /// UI mailbox has no free slots
    pub const MAILBOX_FULL: i32 = 3002;

    /// The UI effect itself failed
    pub const EFFECT_FAILED: i32 = 3003;
}

/// Log a dispatch error with structured context
///
/// Dispatch errors are never fatal: callers log them here and carry on.
pub fn log_dispatch_error(err: &DispatchError, context: &str) {
    error!(
        "Dispatch error in {}: code={}, component=ActionDispatcher, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors raised while handing an action to the UI or running it there
///
/// Error code ranges: 3001-3003
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchError {
    /// UI side dropped its mailbox (not attached yet or already torn down)
    UiDetached,

    /// UI mailbox is full; the action was dropped
    MailboxFull { capacity: usize },

    /// The UI effect reported a failure
    EffectFailed { reason: String },
}

impl ErrorCode for DispatchError {
    fn code(&self) -> i32 {
        match self {
            DispatchError::UiDetached => DispatchErrorCodes::UI_DETACHED,
            DispatchError::MailboxFull { .. } => DispatchErrorCodes::MAILBOX_FULL,
            DispatchError::EffectFailed { .. } => DispatchErrorCodes::EFFECT_FAILED,
        }
    }

    fn message(&self) -> String {
        match self {
            DispatchError::UiDetached => "UI is not attached to the dispatcher".to_string(),
            DispatchError::MailboxFull { capacity } => {
                format!("UI mailbox full ({} slots), action dropped", capacity)
            }
            DispatchError::EffectFailed { reason } => format!("UI effect failed: {}", reason),
        }
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DispatchError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for DispatchError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_error_codes() {
        assert_eq!(DispatchError::UiDetached.code(), 3001);
        assert_eq!(DispatchError::MailboxFull { capacity: 4 }.code(), 3002);
        assert_eq!(
            DispatchError::EffectFailed {
                reason: "test".to_string()
            }
            .code(),
            3003
        );
    }

    #[test]
    fn test_error_code_trait_object() {
        let err: &dyn ErrorCode = &DispatchError::MailboxFull { capacity: 64 };
        assert_eq!(err.code(), DispatchErrorCodes::MAILBOX_FULL);
        assert!(err.message().contains("64"));
    }
}
