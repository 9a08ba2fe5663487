//! Deletion animation: a six-frame fade-out before removal.
//!
//! Frames count down from 5 to 0, one per tick:
//!
//! | frame | effect |
//! |-------|--------|
//! | 5     | opacity set to 5/6 |
//! | 4..=1 | size and width grow 10%, opacity drops 1/6 (floored at 0) |
//! | 0     | entity is removed from the table |

use serde::{Deserialize, Serialize};

use crate::entity::{Physics, Style};

/// Growth factor applied per fading frame.
const GROWTH: f32 = 1.1;

/// Opacity lost per fading frame.
const FADE_STEP: f32 = 1.0 / 6.0;

/// What the owner of an animation must do after a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationStep {
    /// Keep the entity for another tick.
    Continue,
    /// Remove the entity now.
    Remove,
}

/// Countdown state of an entity being deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionAnimation {
    frame: u8,
}

impl Default for DeletionAnimation {
    fn default() -> Self {
        Self::new()
    }
}

impl DeletionAnimation {
    /// Frame every animation starts on.
    pub const FIRST_FRAME: u8 = 5;

    /// Starts a fresh animation at [`Self::FIRST_FRAME`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            frame: Self::FIRST_FRAME,
        }
    }

    /// Frame that the next [`advance`](Self::advance) will play.
    #[must_use]
    pub fn frame(&self) -> u8 {
        self.frame
    }

    /// Plays the current frame and moves to the next one.
    pub fn advance(&mut self, physics: &mut Physics, style: &mut Style) -> AnimationStep {
        match self.frame {
            0 => return AnimationStep::Remove,
            Self::FIRST_FRAME => style.opacity = 1.0 - FADE_STEP,
            _ => {
                physics.size *= GROWTH;
                physics.width *= GROWTH;
                style.opacity = (style.opacity - FADE_STEP).max(0.0);
            }
        }
        self.frame -= 1;
        AnimationStep::Continue
    }
}
