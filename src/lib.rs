//! # Option-Misprice: Option Mispricing Factors
//!
//! `option-misprice` compares listed option prices against theoretical prices from a
//! Cox-Ross-Rubinstein binomial lattice (or Black-Scholes, for European exercise) and
//! reports the relative gap per strike as a mispricing factor. It is intended as a
//! factor-generation stage for cross-sectional equity research.
//!
//! ## Core Features
//!
//! - **Lattice pricing**: Vectorized CRR lattice over a strike strip, with early exercise for puts
//! - **Volatility resolution**: Per-strike implied vols with a historical-vol fallback
//! - **Factors**: Call, put, and weighted call/put composite mispricing
//! - **Fan-out**: Date ranges per symbol and multi-symbol batches on a bounded worker pool
//! - **Export**: CSV output with fixed column sets per factor kind
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chrono::NaiveDate;
//! use option_misprice::{compute_composite_mispricing, InMemoryMarketData, MispricingParams};
//!
//! # fn load_market() -> InMemoryMarketData { InMemoryMarketData::new() }
//! let market = load_market();
//! let expiry = NaiveDate::from_ymd_opt(2025, 5, 16).unwrap();
//! let as_of = NaiveDate::from_ymd_opt(2025, 4, 1);
//!
//! let params = MispricingParams::american().with_steps(100);
//! let table = compute_composite_mispricing(&market, "AAPL", expiry, as_of, &params)?;
//!
//! for row in &table.rows {
//!     println!("K={} composite={:?}", row.strike, row.mispricing);
//! }
//! # Ok::<(), option_misprice::MispriceError>(())
//! ```
//!
//! ## Error Policy
//!
//! Single-date functions fail on the first error. Range and batch functions skip failing
//! dates and symbols and only fail when nothing succeeded; invalid caller input (dates,
//! weights, concurrency) is always rejected before any work starts.

// ================================================================================================
// MODULES
// ================================================================================================

pub mod error;
pub mod export;
pub mod factor;
pub mod market;
pub mod models;
pub mod pipeline;
pub mod volatility;

// ================================================================================================
// IMPORTS
// ================================================================================================

use chrono::{NaiveDate, Utc};
use tracing::info;

use models::OptionSide;

// ================================================================================================
// PUBLIC RE-EXPORTS
// ================================================================================================

pub use error::{MispriceError, MispriceResult};

pub use factor::{
    BatchConfig, CompositeRecord, CompositeRow, CompositeTable, FactorKind, FactorRecord,
    FactorTable, MispricingParams, MispricingTable, MoneynessBand, StrikeResult,
};

pub use market::{ChainSnapshot, InMemoryMarketData, MarketData, Quote};

pub use models::{bs::bs_price, lattice::LatticePricer, ExerciseStyle, PricingContext};

// ================================================================================================
// DEFAULT CONFIGURATIONS
// ================================================================================================

/// Pre-configured parameter sets for common use cases.
///
/// - [`quick()`](default_configs::quick): European exercise, closed-form pricing
/// - [`american()`](default_configs::american): Early-exercise puts on a 100-step lattice
/// - [`research()`](default_configs::research): Early-exercise puts on a 500-step lattice
pub mod default_configs {
    use crate::factor::MispricingParams;

    /// Library defaults: European exercise, two lattice steps, equal composite weights.
    ///
    /// European pricing takes the Black-Scholes path, so the step count is irrelevant here.
    pub fn quick() -> MispricingParams {
        MispricingParams::default()
    }

    /// American exercise with 100 lattice steps.
    ///
    /// Lattice prices are within a few cents of the converged value for typical
    /// single-name equity chains.
    ///
    /// # Example
    ///
    /// ```rust
    /// use option_misprice::default_configs;
    ///
    /// let params = default_configs::american();
    /// assert_eq!(params.steps, 100);
    /// ```
    pub fn american() -> MispricingParams {
        MispricingParams::american().with_steps(100)
    }

    /// American exercise with 500 lattice steps, for backtests where runtime matters less.
    pub fn research() -> MispricingParams {
        MispricingParams::american().with_steps(500)
    }
}

// ================================================================================================
// SINGLE-DATE FACTORS
// ================================================================================================

fn resolve_valuation_date(valuation_date: Option<NaiveDate>) -> NaiveDate {
    valuation_date.unwrap_or_else(|| Utc::now().date_naive())
}

/// Call-side mispricing for one symbol and expiry.
///
/// Fetches the chain nearest to `expiry` as of `valuation_date` (today, UTC, when `None`),
/// keeps quotes with positive bid and ask, and prices each strike at the resolved
/// volatility. Calls are always priced European.
///
/// # Errors
///
/// * `InvalidParameter` if `params` fail validation
/// * `NoData` if the provider has no chain for the symbol or date
/// * `NoLiquidQuotes` if no call has a positive bid and ask
/// * `ExpiredOrInvalidHorizon` if the chain's expiry is not after the valuation date
pub fn compute_call_mispricing<M>(
    market: &M,
    symbol: &str,
    expiry: NaiveDate,
    valuation_date: Option<NaiveDate>,
    params: &MispricingParams,
) -> MispriceResult<FactorTable>
where
    M: MarketData + ?Sized,
{
    params.validate()?;
    let valuation_date = resolve_valuation_date(valuation_date);
    factor::price_side(market, symbol, expiry, valuation_date, OptionSide::Call, params)
}

/// Put-side mispricing for one symbol and expiry.
///
/// Same flow as [`compute_call_mispricing`]; with `ExerciseStyle::American` the puts are
/// priced on the lattice with early exercise.
pub fn compute_put_mispricing<M>(
    market: &M,
    symbol: &str,
    expiry: NaiveDate,
    valuation_date: Option<NaiveDate>,
    params: &MispricingParams,
) -> MispriceResult<FactorTable>
where
    M: MarketData + ?Sized,
{
    params.validate()?;
    let valuation_date = resolve_valuation_date(valuation_date);
    factor::price_side(market, symbol, expiry, valuation_date, OptionSide::Put, params)
}

/// Weighted call/put mispricing at strikes present on both sides.
///
/// # Errors
///
/// `InvalidWeights` unless `w_call` and `w_put` are in `[0, 1]` and sum to 1, plus
/// every error of the single-side computations.
pub fn compute_composite_mispricing<M>(
    market: &M,
    symbol: &str,
    expiry: NaiveDate,
    valuation_date: Option<NaiveDate>,
    params: &MispricingParams,
) -> MispriceResult<CompositeTable>
where
    M: MarketData + ?Sized,
{
    params.validate_for(FactorKind::Composite)?;
    let valuation_date = resolve_valuation_date(valuation_date);
    factor::price_composite(market, symbol, expiry, valuation_date, params)
}

// ================================================================================================
// RANGES AND BATCHES
// ================================================================================================

/// One factor for every calendar day in `[start, end]`, rows tagged with their date.
///
/// Days without data are skipped. Fails with `EmptyRange` only when no day produced a
/// table.
pub fn compute_mispricing_range<M>(
    market: &M,
    symbol: &str,
    expiry: NaiveDate,
    start: NaiveDate,
    end: NaiveDate,
    kind: FactorKind,
    params: &MispricingParams,
) -> MispriceResult<MispricingTable>
where
    M: MarketData + ?Sized,
{
    pipeline::aggregate_range(market, symbol, expiry, start, end, kind, params)
}

/// [`compute_mispricing_range`] for many symbols, at most `concurrency` at a time.
///
/// Rows are tagged with symbol and date and grouped by symbol in input order. A symbol
/// that fails is skipped; `EmptyBatch` is returned only when all of them failed.
#[allow(clippy::too_many_arguments)]
pub fn compute_mispricing_batch<M, S>(
    market: &M,
    symbols: &[S],
    expiry: NaiveDate,
    start: NaiveDate,
    end: NaiveDate,
    kind: FactorKind,
    params: &MispricingParams,
    concurrency: usize,
) -> MispriceResult<MispricingTable>
where
    M: MarketData + ?Sized,
    S: AsRef<str> + Sync,
{
    pipeline::run_batch(
        market,
        symbols,
        expiry,
        start,
        end,
        kind,
        params,
        concurrency,
    )
}

/// Run the batch described by `config` and write it to `config.output` when set.
///
/// # Example
///
/// ```rust,no_run
/// use option_misprice::{run_batch_config, BatchConfig, InMemoryMarketData};
/// use std::path::Path;
///
/// let config = BatchConfig::from_file(Path::new("batch.toml"))?;
/// let market = InMemoryMarketData::from_csv_files(Path::new("chains.csv"), None, None)?;
/// let table = run_batch_config(&market, &config)?;
/// println!("{} rows", table.len());
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn run_batch_config<M>(market: &M, config: &BatchConfig) -> MispriceResult<MispricingTable>
where
    M: MarketData + ?Sized,
{
    info!(
        symbols = config.symbols.len(),
        factor = %config.factor,
        start = %config.start_date,
        end = %config.end_date,
        "starting batch run"
    );
    let table = compute_mispricing_batch(
        market,
        config.symbols.as_slice(),
        config.expiry,
        config.start_date,
        config.end_date,
        config.factor,
        &config.params,
        config.concurrency,
    )?;
    if let Some(path) = &config.output {
        table.to_csv_path(path)?;
    }
    Ok(table)
}
