//! Export functionality for offline analysis
//!
//! Writes the metrics series collected during training (epsilon per
//! episode, reward per step) to CSV for external plotting tools.

mod metrics_csv;

pub use metrics_csv::MetricsCsvExporter;
