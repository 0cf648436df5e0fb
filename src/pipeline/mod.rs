//! Training pipeline: the budget-governed loop and its observers

pub mod observers;
pub mod training;

pub use observers::{MetricsObserver, ProgressObserver};
pub use training::{
    BudgetConfig, EarlyStopConfig, ExplorationConfig, LearningConfig, ProgressReport, StopReason,
    Trainer, TrainingConfig, TrainingResult,
};
