//! Configuration access port trait.

use crate::domain::error::StrongscanError;

/// Typed lookups over `[section] key = value` settings. Absent keys fall
/// back to `default`; present but malformed values are `ConfigInvalid`.
pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str, default: i64) -> Result<i64, StrongscanError>;
    fn get_double(&self, section: &str, key: &str, default: f64) -> Result<f64, StrongscanError>;
    /// Comma-separated list with empty items dropped; `None` when absent.
    fn get_list(&self, section: &str, key: &str) -> Option<Vec<String>>;
}
