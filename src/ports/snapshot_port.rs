//! Market snapshot provider port.

use crate::domain::error::StrongscanError;
use serde_json::Value;

/// Fetches the exchange-wide daily table as the provider's raw JSON.
pub trait SnapshotPort {
    fn fetch_snapshot(&self) -> Result<Value, StrongscanError>;
}
