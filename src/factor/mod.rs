//! Mispricing factors for one symbol on one valuation date.
//!
//! [`engine`] works on an already-fetched [`ChainSnapshot`](crate::market::ChainSnapshot);
//! the functions here add the market-data round trip (chain, dividend yield and,
//! when needed, trailing closes for the historical-vol fallback).

pub mod composite;
pub mod config;
pub mod engine;
pub mod types;

pub use composite::*;
pub use config::*;
pub use engine::*;
pub use types::*;

use chrono::NaiveDate;

use crate::error::MispriceResult;
use crate::market::MarketData;
use crate::models::OptionSide;
use crate::volatility::HistoricalEstimator;

/// Fetch `symbol`'s chain for `expiry` as of `valuation_date` and price one side.
pub fn price_side<M>(
    market: &M,
    symbol: &str,
    expiry: NaiveDate,
    valuation_date: NaiveDate,
    side: OptionSide,
    params: &MispricingParams,
) -> MispriceResult<FactorTable>
where
    M: MarketData + ?Sized,
{
    let snapshot = market.fetch_chain(symbol, expiry, valuation_date)?;
    let q = market.fetch_dividend_yield(symbol)?;
    let estimator = HistoricalEstimator::new(market, symbol, params.historical_lookback_days);
    compute_factor(&snapshot, side, valuation_date, q, params, || estimator.estimate())
}

/// Fetch `symbol`'s chain once and price the call/put composite.
pub fn price_composite<M>(
    market: &M,
    symbol: &str,
    expiry: NaiveDate,
    valuation_date: NaiveDate,
    params: &MispricingParams,
) -> MispriceResult<CompositeTable>
where
    M: MarketData + ?Sized,
{
    let snapshot = market.fetch_chain(symbol, expiry, valuation_date)?;
    let q = market.fetch_dividend_yield(symbol)?;
    let estimator = HistoricalEstimator::new(market, symbol, params.historical_lookback_days);
    compute_composite(&snapshot, valuation_date, q, params, || estimator.estimate())
}

/// Single-date computation for any factor kind, flattened to tagged rows.
pub fn price_factor<M>(
    market: &M,
    symbol: &str,
    expiry: NaiveDate,
    valuation_date: NaiveDate,
    kind: FactorKind,
    params: &MispricingParams,
) -> MispriceResult<MispricingTable>
where
    M: MarketData + ?Sized,
{
    Ok(match kind {
        FactorKind::Call => {
            price_side(market, symbol, expiry, valuation_date, OptionSide::Call, params)?.into()
        }
        FactorKind::Put => {
            price_side(market, symbol, expiry, valuation_date, OptionSide::Put, params)?.into()
        }
        FactorKind::Composite => {
            price_composite(market, symbol, expiry, valuation_date, params)?.into()
        }
    })
}
