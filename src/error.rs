//! Error taxonomy for mispricing computations.
//!
//! Single-snapshot components raise eagerly. The range and batch layers turn
//! unit-level failures into omitted rows and only surface [`MispriceError::EmptyRange`]
//! or [`MispriceError::EmptyBatch`] when nothing survived.

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MispriceError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Unsupported configuration: {0}")]
    UnsupportedConfiguration(String),

    #[error("No data: {0}")]
    NoData(String),

    #[error("No liquid quotes: {0}")]
    NoLiquidQuotes(String),

    #[error("Expiry {expiry} is not after valuation date {valuation_date}")]
    ExpiredOrInvalidHorizon {
        expiry: NaiveDate,
        valuation_date: NaiveDate,
    },

    #[error("Invalid weights: w_call={w_call}, w_put={w_put} (each in [0, 1], summing to 1)")]
    InvalidWeights { w_call: f64, w_put: f64 },

    #[error("Invalid range: end date {end} is before start date {start}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("No data returned for {symbol} between {start} and {end}")]
    EmptyRange {
        symbol: String,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("No data returned for any of {0} symbols")]
    EmptyBatch(usize),

    #[error("Worker pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Export error: {0}")]
    Export(#[from] csv::Error),
}

pub type MispriceResult<T> = Result<T, MispriceError>;

impl MispriceError {
    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::UnsupportedConfiguration(msg.into())
    }

    pub fn no_data(msg: impl Into<String>) -> Self {
        Self::NoData(msg.into())
    }

    pub fn no_liquid_quotes(msg: impl Into<String>) -> Self {
        Self::NoLiquidQuotes(msg.into())
    }

    /// True for failures caused by an unusable snapshot for one date or symbol,
    /// as opposed to caller-input errors.
    pub fn is_data_gap(&self) -> bool {
        matches!(
            self,
            Self::NoData(_)
                | Self::NoLiquidQuotes(_)
                | Self::ExpiredOrInvalidHorizon { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_gaps_are_per_snapshot_failures() {
        let day = NaiveDate::from_ymd_opt(2025, 4, 1).unwrap();
        assert!(MispriceError::no_data("AAPL").is_data_gap());
        assert!(MispriceError::no_liquid_quotes("AAPL").is_data_gap());
        assert!(MispriceError::ExpiredOrInvalidHorizon {
            expiry: day,
            valuation_date: day,
        }
        .is_data_gap());

        assert!(!MispriceError::invalid_parameter("steps").is_data_gap());
        assert!(!MispriceError::InvalidRange {
            start: day,
            end: day,
        }
        .is_data_gap());
    }
}
