//! Engine module housing the pipeline lifecycle.
//!
//! This module exposes the `Pipeline` orchestration layer (`core`) and the
//! clock abstraction (`time`) its cooldown gate runs on.

pub mod core;
pub mod time;

pub use core::Pipeline;
pub use time::{ManualTimeSource, SystemTimeSource, TimeSource};
