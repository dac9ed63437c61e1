//! Brush size control driven by gestures.

use serde::{Deserialize, Serialize};

use super::mailbox::UiEffects;
use crate::error::DispatchError;

/// Paint brush width, clamped to `MIN..=MAX`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrushSize {
    size: u32,
}

impl BrushSize {
    pub const MIN: u32 = 1;
    pub const MAX: u32 = 20;
    pub const DEFAULT: u32 = 3;

    pub fn new(size: u32) -> Self {
        Self {
            size: size.clamp(Self::MIN, Self::MAX),
        }
    }

    pub fn get(&self) -> u32 {
        self.size
    }
}

impl Default for BrushSize {
    fn default() -> Self {
        Self::new(Self::DEFAULT)
    }
}

impl UiEffects for BrushSize {
    fn increase(&mut self) -> Result<(), DispatchError> {
        self.size = (self.size + 1).min(Self::MAX);
        log::debug!("[BrushSize] size={}", self.size);
        Ok(())
    }

    fn decrease(&mut self) -> Result<(), DispatchError> {
        self.size = self.size.saturating_sub(1).max(Self::MIN);
        log::debug!("[BrushSize] size={}", self.size);
        Ok(())
    }
}
