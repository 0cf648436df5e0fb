//! Multi-agent grid navigation trained with tabular Q-learning
//!
//! This crate provides:
//! - A shared grid world with two per-episode waypoints agents shuttle
//!   between
//! - Per-agent dense Q-tables with epsilon-greedy exploration
//! - Shaped step rewards (wall, goal, anticipatory proximity) and head-on
//!   collision detection with retroactive penalties
//! - A budget-governed training loop with early stopping and composable
//!   observers for progress and metrics collection

pub mod cli;
pub mod error;
pub mod export;
pub mod grid;
pub mod pipeline;
pub mod ports;
pub mod q_learning;
pub mod roster;
pub mod sim;

pub use error::{Error, Result};
pub use grid::{Action, Cell, GridWorld, Waypoints};
pub use pipeline::{StopReason, Trainer, TrainingConfig, TrainingResult};
pub use q_learning::{EpsilonGreedy, QTable};
pub use roster::{Agent, Roster};
pub use sim::{EpisodeController, EpisodeOutcome, GridSnapshot};
