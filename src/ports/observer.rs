//! Observer port - abstraction for training observation and data collection
//!
//! This port defines the interface for observing training events, allowing
//! composable data collection without coupling the training loop to
//! specific output formats or metrics.

use crate::{
    Result,
    pipeline::training::{ProgressReport, TrainingResult},
    sim::{EpisodeOutcome, GridSnapshot},
};

/// Observer trait for monitoring training
///
/// Observers can be composed to collect different types of data during a
/// run: progress bars, metrics series for offline plotting, grid snapshot
/// reporting. All payloads are plain values; the core performs no
/// rendering.
///
/// # Event Sequence
///
/// 1. `on_training_start(total_episodes)` - once at the beginning
/// 2. For each episode: `on_episode_end(...)`, then `on_progress(...)` on
///    the configured reporting cadence
/// 3. `on_training_end(result)` - once at the end
pub trait Observer: Send {
    /// Called when training starts with the configured episode cap.
    fn on_training_start(&mut self, _total_episodes: usize) -> Result<()> {
        Ok(())
    }

    /// Called after every completed episode.
    ///
    /// `epsilon` is the exploration rate after the episode's decay; the
    /// outcome carries the final combined reward of each agent-step.
    fn on_episode_end(
        &mut self,
        _episode: usize,
        _outcome: &EpisodeOutcome,
        _epsilon: f64,
    ) -> Result<()> {
        Ok(())
    }

    /// Called on the periodic reporting cadence with aggregate counters
    /// and the current placement snapshot.
    fn on_progress(&mut self, _progress: &ProgressReport, _snapshot: &GridSnapshot) -> Result<()> {
        Ok(())
    }

    /// Called once when training completes, with the final result record.
    fn on_training_end(&mut self, _result: &TrainingResult) -> Result<()> {
        Ok(())
    }
}
