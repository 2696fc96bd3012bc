//! Practice mode - checkpoints, restore functionality

use super::{CHECKPOINT_RETRY_OFFSET_MS, GameSession};
use crate::models::engine::TimingProvider;
use crate::models::replay::CHECKPOINT_MIN_INTERVAL_MS;

impl<C: TimingProvider> GameSession<C> {
    /// Enables practice mode. Practice sessions may seek after they ended.
    pub fn enable_practice_mode(&mut self) {
        self.practice_mode = true;
        self.replay.is_practice_mode = true;
        log::info!("PRACTICE: Enabled");
    }

    pub fn is_practice_mode(&self) -> bool {
        self.practice_mode
    }

    /// Places a checkpoint at the current position.
    ///
    /// Respects a 15-second cooldown between checkpoints.
    /// Returns `true` if the checkpoint was successfully placed.
    pub fn set_checkpoint(&mut self) -> bool {
        if !self.practice_mode {
            return false;
        }
        let current_time = self.last_time_ms;
        if !current_time.is_finite() {
            return false;
        }

        if current_time - self.last_checkpoint_time < CHECKPOINT_MIN_INTERVAL_MS {
            log::debug!(
                "PRACTICE: Checkpoint cooldown ({:.1}s remaining)",
                (CHECKPOINT_MIN_INTERVAL_MS - (current_time - self.last_checkpoint_time)) / 1000.0
            );
            return false;
        }

        self.checkpoint_ms = Some(current_time);
        self.replay.add_checkpoint(current_time);
        self.last_checkpoint_time = current_time;

        log::info!("PRACTICE: Checkpoint set at {:.1}s", current_time / 1000.0);
        true
    }

    /// Returns to the last checkpoint (minus 1 second for preparation).
    ///
    /// Returns the retry time the caller must seek its clock to, or `None`
    /// without a checkpoint.
    pub fn goto_checkpoint(&mut self) -> Option<f64> {
        if !self.practice_mode {
            return None;
        }
        let Some(checkpoint) = self.checkpoint_ms else {
            log::debug!("PRACTICE: No checkpoint to return to");
            return None;
        };

        let retry_time = (checkpoint - CHECKPOINT_RETRY_OFFSET_MS).max(0.0);
        self.seek(retry_time);

        log::info!(
            "PRACTICE: Returned to checkpoint at {:.1}s (retry from {:.1}s)",
            checkpoint / 1000.0,
            retry_time / 1000.0
        );
        Some(retry_time)
    }

    /// Returns the timestamps of all checkpoints for UI display.
    pub fn checkpoints(&self) -> &[f64] {
        &self.replay.checkpoints
    }
}
