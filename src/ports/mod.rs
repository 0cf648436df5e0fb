//! Ports (trait boundaries) for external collaborators.
//!
//! The training core emits plain data through these interfaces; rendering,
//! plotting, and storage concerns live in adapters behind them.

pub mod observer;

pub use observer::Observer;
