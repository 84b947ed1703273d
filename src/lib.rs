//! Evaluation and lifecycle engine for OEM empanelment of air pollution
//! control devices, wrapped in an HTTP service shell.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
