//! Historical price series port.

use crate::domain::error::StrongscanError;
use crate::domain::ohlcv::PriceSeries;

pub trait HistoryPort {
    /// Daily bars covering roughly the trailing `lookback_days` calendar days.
    /// A symbol with no listing history yields an empty series, not an error.
    fn fetch_history(&self, symbol: &str, lookback_days: u32) -> Result<PriceSeries, StrongscanError>;
}
