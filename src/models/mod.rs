pub mod bs;
pub mod lattice;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Call or put.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionSide {
    Call,
    Put,
}

impl fmt::Display for OptionSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionSide::Call => write!(f, "call"),
            OptionSide::Put => write!(f, "put"),
        }
    }
}

/// When the holder may exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExerciseStyle {
    /// Exercise at expiry only
    #[default]
    European,
    /// Exercise at any time up to expiry
    American,
}

/// Scalar inputs for pricing a single strike.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricingContext {
    pub spot: f64,
    pub strike: f64,
    /// Time to expiry in years
    pub time_to_expiry: f64,
    pub risk_free_rate: f64,
    pub volatility: f64,
    pub dividend_yield: f64,
    pub exercise_style: ExerciseStyle,
    pub side: OptionSide,
}

/// Parameter checks shared by the pricers
pub mod utils {
    use crate::error::{MispriceError, MispriceResult};

    pub fn ensure_positive(name: &str, value: f64) -> MispriceResult<()> {
        if value.is_finite() && value > 0.0 {
            Ok(())
        } else {
            Err(MispriceError::invalid_parameter(format!(
                "{name} must be positive, got {value}"
            )))
        }
    }

    pub fn ensure_non_negative(name: &str, value: f64) -> MispriceResult<()> {
        if value.is_finite() && value >= 0.0 {
            Ok(())
        } else {
            Err(MispriceError::invalid_parameter(format!(
                "{name} must be non-negative, got {value}"
            )))
        }
    }

    pub fn ensure_finite(name: &str, value: f64) -> MispriceResult<()> {
        if value.is_finite() {
            Ok(())
        } else {
            Err(MispriceError::invalid_parameter(format!(
                "{name} must be finite, got {value}"
            )))
        }
    }
}
