//! CLI infrastructure for the gridshuttle trainer
//!
//! This module provides the command-line interface for running and
//! reporting on training runs.

pub mod commands;
pub mod output;
