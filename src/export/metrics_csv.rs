//! CSV export of training metrics series

use std::path::Path;

use csv::Writer;

use crate::Result;

/// Exporter for the metrics series a training run produces
///
/// The core exposes the series as plain slices; this adapter writes them
/// out for offline plotting.
pub struct MetricsCsvExporter;

impl MetricsCsvExporter {
    /// Write the epsilon-per-episode series as `episode,epsilon` rows
    pub fn write_epsilon_series<P: AsRef<Path>>(path: P, series: &[f64]) -> Result<()> {
        let mut writer = Writer::from_path(path)?;
        writer.write_record(["episode", "epsilon"])?;
        for (episode, epsilon) in series.iter().enumerate() {
            writer.write_record([episode.to_string(), epsilon.to_string()])?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Write the reward-per-step series as `step,reward` rows
    pub fn write_reward_series<P: AsRef<Path>>(path: P, series: &[f64]) -> Result<()> {
        let mut writer = Writer::from_path(path)?;
        writer.write_record(["step", "reward"])?;
        for (step, reward) in series.iter().enumerate() {
            writer.write_record([step.to_string(), reward.to_string()])?;
        }
        writer.flush()?;
        Ok(())
    }
}
