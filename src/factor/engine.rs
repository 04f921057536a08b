//! Single-snapshot factor computation.
//!
//! Takes one chain snapshot and produces a [`FactorTable`] for one side:
//! filter to liquid quotes, take mid prices, resolve per-strike vols, price on
//! the lattice and compare.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::composite::combine;
use super::config::MispricingParams;
use super::types::{CompositeTable, FactorTable, StrikeResult};
use crate::error::{MispriceError, MispriceResult};
use crate::market::{ChainSnapshot, Quote};
use crate::models::lattice::LatticePricer;
use crate::models::{OptionSide, PricingContext};
use crate::volatility::resolve_volatilities;

/// Day count for time to expiry (ACT/365), applied to both sides.
pub const DAYS_PER_YEAR: f64 = 365.0;

/// Year fraction between valuation date and expiry.
///
/// Fails with `ExpiredOrInvalidHorizon` unless expiry is strictly later.
pub fn year_fraction(valuation_date: NaiveDate, expiry: NaiveDate) -> MispriceResult<f64> {
    if expiry <= valuation_date {
        return Err(MispriceError::ExpiredOrInvalidHorizon {
            expiry,
            valuation_date,
        });
    }
    Ok((expiry - valuation_date).num_days() as f64 / DAYS_PER_YEAR)
}

/// Price one side of `snapshot` as of `valuation_date`.
///
/// `historical` supplies the fallback volatility and is only called when some
/// liquid quote lacks a usable implied vol.
pub fn compute_factor<F>(
    snapshot: &ChainSnapshot,
    side: OptionSide,
    valuation_date: NaiveDate,
    dividend_yield: f64,
    params: &MispricingParams,
    historical: F,
) -> MispriceResult<FactorTable>
where
    F: FnOnce() -> MispriceResult<f64>,
{
    let liquid: Vec<&Quote> = snapshot
        .quotes(side)
        .iter()
        .filter(|q| q.is_liquid())
        .filter(|q| {
            params
                .moneyness_band
                .map_or(true, |band| band.contains(q.strike, snapshot.spot))
        })
        .collect();
    if liquid.is_empty() {
        return Err(MispriceError::no_liquid_quotes(format!(
            "no {side} quotes with positive bid and ask for {} expiring {}",
            snapshot.symbol, snapshot.expiry
        )));
    }

    let t = year_fraction(valuation_date, snapshot.expiry)?;

    let quotes: Vec<Quote> = liquid.into_iter().cloned().collect();
    let resolved = resolve_volatilities(&quotes, params.volatility_override, historical)?;
    if resolved.used_fallback() {
        warn!(
            symbol = %snapshot.symbol,
            %side,
            %valuation_date,
            strikes = ?resolved.fallback_strikes,
            fallback_vol = ?resolved.fallback_vol,
            "implied vol missing, using historical vol"
        );
    }

    let contexts = pricing_contexts(
        snapshot.spot,
        &quotes,
        &resolved.vols,
        t,
        side,
        dividend_yield,
        params,
    );
    let theoretical = price_strikes(&contexts, params.steps)?;

    let mut rows: Vec<StrikeResult> = quotes
        .iter()
        .zip(theoretical)
        .filter_map(|(q, theo)| {
            let mid = q.mid()?;
            Some(StrikeResult::new(q.strike, mid, theo))
        })
        .filter(|r| r.theoretical_price > 0.0)
        .collect();
    // Stable: equal strikes keep quote order.
    rows.sort_by(|a, b| a.strike.total_cmp(&b.strike));

    debug!(
        symbol = %snapshot.symbol,
        %side,
        %valuation_date,
        quotes = quotes.len(),
        rows = rows.len(),
        t,
        "priced chain side"
    );

    Ok(FactorTable {
        symbol: snapshot.symbol.clone(),
        valuation_date,
        side,
        expiry: snapshot.expiry,
        spot: snapshot.spot,
        dividend_yield,
        fallback_strikes: resolved.fallback_strikes,
        rows,
    })
}

/// Per-strike pricing inputs for `quotes`, in quote order.
fn pricing_contexts(
    spot: f64,
    quotes: &[Quote],
    vols: &[f64],
    t: f64,
    side: OptionSide,
    dividend_yield: f64,
    params: &MispricingParams,
) -> Vec<PricingContext> {
    quotes
        .iter()
        .zip(vols)
        .map(|(q, &volatility)| PricingContext {
            spot,
            strike: q.strike,
            time_to_expiry: t,
            risk_free_rate: params.risk_free_rate,
            volatility,
            dividend_yield,
            exercise_style: params.exercise_style,
            side,
        })
        .collect()
}

/// One lattice call per distinct volatility; prices come back in context order.
///
/// Contexts in a group differ only by strike.
fn price_strikes(contexts: &[PricingContext], steps: usize) -> MispriceResult<Vec<f64>> {
    let mut by_vol: BTreeMap<u64, Vec<usize>> = BTreeMap::new();
    for (i, ctx) in contexts.iter().enumerate() {
        by_vol.entry(ctx.volatility.to_bits()).or_default().push(i);
    }

    let pricer = LatticePricer::new(steps);
    let mut prices = vec![0.0; contexts.len()];
    for indices in by_vol.into_values() {
        let head = &contexts[indices[0]];
        let strikes: Vec<f64> = indices.iter().map(|&i| contexts[i].strike).collect();
        let group = pricer.price(
            head.spot,
            &strikes,
            head.time_to_expiry,
            head.risk_free_rate,
            head.volatility,
            head.side,
            head.exercise_style,
            head.dividend_yield,
        )?;
        for (i, price) in indices.into_iter().zip(group) {
            prices[i] = price;
        }
    }
    Ok(prices)
}

/// Price both sides of `snapshot` and blend them with the configured weights.
pub fn compute_composite<F>(
    snapshot: &ChainSnapshot,
    valuation_date: NaiveDate,
    dividend_yield: f64,
    params: &MispricingParams,
    historical: F,
) -> MispriceResult<CompositeTable>
where
    F: Fn() -> MispriceResult<f64>,
{
    let calls = compute_factor(
        snapshot,
        OptionSide::Call,
        valuation_date,
        dividend_yield,
        params,
        &historical,
    )?;
    let puts = compute_factor(
        snapshot,
        OptionSide::Put,
        valuation_date,
        dividend_yield,
        params,
        &historical,
    )?;
    let rows = combine(&calls, &puts, params.w_call, params.w_put)?;

    Ok(CompositeTable {
        symbol: snapshot.symbol.clone(),
        valuation_date,
        w_call: params.w_call,
        w_put: params.w_put,
        rows,
    })
}
