//! Concrete adapter implementations for ports.

pub mod chart_svg;
pub mod file_artifact_adapter;
pub mod file_config_adapter;
pub mod telegram_adapter;
pub mod twse_adapter;
pub mod yahoo_adapter;
