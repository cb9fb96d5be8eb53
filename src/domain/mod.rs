//! Core domain types and screening logic.

pub mod error;
pub mod ohlcv;
pub mod instrument;
pub mod market_table;
pub mod exclusion;
pub mod universe;
pub mod indicator;
pub mod indicator_helpers;
pub mod code_data;
pub mod strength;
pub mod pacing;
pub mod screen;
pub mod config_validation;
