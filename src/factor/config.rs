use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::composite::validate_weights;
use crate::error::{MispriceError, MispriceResult};
use crate::models::utils::{ensure_finite, ensure_non_negative, ensure_positive};
use crate::models::ExerciseStyle;

/// Which mispricing factor to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FactorKind {
    Call,
    Put,
    #[default]
    Composite,
}

impl FromStr for FactorKind {
    type Err = MispriceError;

    fn from_str(s: &str) -> MispriceResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "call" => Ok(Self::Call),
            "put" => Ok(Self::Put),
            "composite" => Ok(Self::Composite),
            other => Err(MispriceError::invalid_parameter(format!(
                "factor must be 'call', 'put', or 'composite', got '{other}'"
            ))),
        }
    }
}

impl fmt::Display for FactorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FactorKind::Call => write!(f, "call"),
            FactorKind::Put => write!(f, "put"),
            FactorKind::Composite => write!(f, "composite"),
        }
    }
}

/// Strike filter expressed as multiples of spot, e.g. `[0.9, 1.1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoneynessBand {
    pub lower: f64,
    pub upper: f64,
}

impl MoneynessBand {
    pub fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    pub fn contains(&self, strike: f64, spot: f64) -> bool {
        strike >= self.lower * spot && strike <= self.upper * spot
    }

    fn validate(&self) -> MispriceResult<()> {
        ensure_positive("moneyness band lower bound", self.lower)?;
        ensure_finite("moneyness band upper bound", self.upper)?;
        if self.upper < self.lower {
            return Err(MispriceError::invalid_parameter(format!(
                "moneyness band upper bound {} is below lower bound {}",
                self.upper, self.lower
            )));
        }
        Ok(())
    }
}

/// Pricing parameters threaded through every layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MispricingParams {
    /// Continuously compounded risk-free rate
    #[serde(default = "default_risk_free_rate")]
    pub risk_free_rate: f64,

    /// Binomial lattice steps
    #[serde(default = "default_steps")]
    pub steps: usize,

    #[serde(default)]
    pub exercise_style: ExerciseStyle,

    /// Flat volatility applied to every strike instead of market implied vols
    #[serde(default)]
    pub volatility_override: Option<f64>,

    /// Composite weight on call mispricing
    #[serde(default = "default_weight")]
    pub w_call: f64,

    /// Composite weight on put mispricing
    #[serde(default = "default_weight")]
    pub w_put: f64,

    /// Calendar days of closes used for the historical-vol fallback
    #[serde(default = "default_lookback_days")]
    pub historical_lookback_days: u32,

    #[serde(default)]
    pub moneyness_band: Option<MoneynessBand>,
}

impl Default for MispricingParams {
    fn default() -> Self {
        Self {
            risk_free_rate: default_risk_free_rate(),
            steps: default_steps(),
            exercise_style: ExerciseStyle::European,
            volatility_override: None,
            w_call: default_weight(),
            w_put: default_weight(),
            historical_lookback_days: default_lookback_days(),
            moneyness_band: None,
        }
    }
}

impl MispricingParams {
    /// Defaults with American exercise.
    pub fn american() -> Self {
        Self {
            exercise_style: ExerciseStyle::American,
            ..Self::default()
        }
    }

    pub fn with_steps(mut self, steps: usize) -> Self {
        self.steps = steps;
        self
    }

    pub fn with_risk_free_rate(mut self, r: f64) -> Self {
        self.risk_free_rate = r;
        self
    }

    pub fn with_volatility_override(mut self, sigma: f64) -> Self {
        self.volatility_override = Some(sigma);
        self
    }

    pub fn with_weights(mut self, w_call: f64, w_put: f64) -> Self {
        self.w_call = w_call;
        self.w_put = w_put;
        self
    }

    pub fn with_moneyness_band(mut self, lower: f64, upper: f64) -> Self {
        self.moneyness_band = Some(MoneynessBand::new(lower, upper));
        self
    }

    /// Check every scalar the single-side factors use against its domain.
    ///
    /// Composite weights are not checked here; see [`validate_for`](Self::validate_for).
    pub fn validate(&self) -> MispriceResult<()> {
        ensure_finite("risk-free rate", self.risk_free_rate)?;
        if self.steps == 0 {
            return Err(MispriceError::invalid_parameter(
                "lattice steps must be >= 1",
            ));
        }
        if let Some(sigma) = self.volatility_override {
            ensure_non_negative("volatility override", sigma)?;
        }
        if self.historical_lookback_days < 2 {
            return Err(MispriceError::invalid_parameter(
                "historical lookback must cover at least 2 days",
            ));
        }
        if let Some(band) = &self.moneyness_band {
            band.validate()?;
        }
        Ok(())
    }

    /// [`validate`](Self::validate) plus the weights when `kind` is composite.
    pub fn validate_for(&self, kind: FactorKind) -> MispriceResult<()> {
        self.validate()?;
        if kind == FactorKind::Composite {
            validate_weights(self.w_call, self.w_put)?;
        }
        Ok(())
    }
}

/// Multi-symbol run description, usually loaded from TOML.
///
/// ```toml
/// symbols = ["AAPL", "MSFT"]
/// expiry = "2025-05-16"
/// start_date = "2025-04-01"
/// end_date = "2025-04-04"
/// factor = "composite"
/// concurrency = 4
/// output = "mispricing.csv"
///
/// [params]
/// risk_free_rate = 0.045
/// steps = 100
/// exercise_style = "american"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    pub symbols: Vec<String>,
    pub expiry: NaiveDate,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,

    #[serde(default)]
    pub factor: FactorKind,

    /// Maximum symbols processed at once
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// CSV destination; results are only returned when unset
    #[serde(default)]
    pub output: Option<PathBuf>,

    #[serde(default)]
    pub params: MispricingParams,
}

impl BatchConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("invalid batch configuration")
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config file {}", path.display()))?;
        Self::from_toml_str(&text)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }
}

fn default_risk_free_rate() -> f64 {
    0.03
}

fn default_steps() -> usize {
    2
}

fn default_weight() -> f64 {
    0.5
}

fn default_lookback_days() -> u32 {
    60
}

fn default_concurrency() -> usize {
    4
}
