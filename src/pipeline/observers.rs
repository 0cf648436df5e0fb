//! Observer adapters for training runs
//!
//! Observers allow composable data collection during training without
//! coupling the loop to specific output formats.

use indicatif::{ProgressBar, ProgressStyle};

use crate::{
    Result,
    pipeline::training::{ProgressReport, TrainingResult},
    ports::Observer,
    sim::{EpisodeOutcome, GridSnapshot},
};

/// Progress bar observer - shows training progress
pub struct ProgressObserver {
    progress_bar: Option<ProgressBar>,
}

impl ProgressObserver {
    pub fn new() -> Self {
        Self { progress_bar: None }
    }
}

impl Default for ProgressObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl Observer for ProgressObserver {
    fn on_training_start(&mut self, total_episodes: usize) -> Result<()> {
        let pb = ProgressBar::new(total_episodes as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} episodes ({msg})")
                .map_err(|e| crate::Error::ProgressBarTemplate {
                    message: e.to_string(),
                })?
                .progress_chars("=>-"),
        );
        self.progress_bar = Some(pb);
        Ok(())
    }

    fn on_episode_end(
        &mut self,
        episode: usize,
        _outcome: &EpisodeOutcome,
        _epsilon: f64,
    ) -> Result<()> {
        if let Some(pb) = &self.progress_bar {
            pb.set_position(episode as u64 + 1);
        }
        Ok(())
    }

    fn on_progress(&mut self, progress: &ProgressReport, _snapshot: &GridSnapshot) -> Result<()> {
        if let Some(pb) = &self.progress_bar {
            pb.set_message(format!(
                "SR:{:.3} C:{} eps:{:.4}",
                progress.average_success_rate, progress.total_collisions, progress.epsilon
            ));
        }
        Ok(())
    }

    fn on_training_end(&mut self, result: &TrainingResult) -> Result<()> {
        if let Some(pb) = &self.progress_bar {
            pb.finish_with_message(format!(
                "SR:{:.3} C:{} ({})",
                result.average_success_rate,
                result.total_collisions,
                result.stop_reason.label()
            ));
        }
        Ok(())
    }
}

/// Metrics observer - accumulates the plotting series
///
/// Collects epsilon-per-episode and the final combined reward of every
/// agent-step, exposed as plain slices for offline plotting or export.
pub struct MetricsObserver {
    episodes: usize,
    epsilon_history: Vec<f64>,
    reward_history: Vec<f64>,
}

impl MetricsObserver {
    pub fn new() -> Self {
        Self {
            episodes: 0,
            epsilon_history: Vec::new(),
            reward_history: Vec::new(),
        }
    }

    /// Episodes observed so far
    pub fn episodes(&self) -> usize {
        self.episodes
    }

    /// Exploration rate after each completed episode
    pub fn epsilon_history(&self) -> &[f64] {
        &self.epsilon_history
    }

    /// Final combined reward of every agent-step, in execution order
    pub fn reward_history(&self) -> &[f64] {
        &self.reward_history
    }
}

impl Default for MetricsObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl Observer for MetricsObserver {
    fn on_episode_end(
        &mut self,
        _episode: usize,
        outcome: &EpisodeOutcome,
        epsilon: f64,
    ) -> Result<()> {
        self.episodes += 1;
        self.epsilon_history.push(epsilon);
        self.reward_history.extend_from_slice(&outcome.step_rewards);
        Ok(())
    }
}
