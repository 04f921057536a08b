//! Per-strike volatility resolution.
//!
//! Resolution order for each quote:
//! 1. an explicit override, applied to every strike;
//! 2. the quote's implied vol, normalized to decimal form;
//! 3. a single historical estimate shared by every strike whose implied vol
//!    is missing, zero, negative or non-finite.
//!
//! Falling back is always reported: the affected strikes are returned in
//! [`ResolvedVolatility::fallback_strikes`] and the factor engine logs them at `warn`.

use statrs::statistics::Statistics;
use std::cell::OnceCell;
use tracing::debug;

use crate::error::MispriceResult;
use crate::market::{MarketData, Quote};
use crate::models::utils::ensure_non_negative;

/// Annualization factor for daily returns.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Convert percent-style vols (e.g. `45.0`) to decimals; values <= 1.0 pass through.
pub fn normalize_iv(iv: f64) -> f64 {
    if iv > 1.0 {
        iv / 100.0
    } else {
        iv
    }
}

/// Annualized sample standard deviation of simple daily returns.
///
/// Returns 0.0 when fewer than two returns are available.
pub fn historical_volatility(closes: &[f64]) -> f64 {
    let returns: Vec<f64> = closes
        .windows(2)
        .filter(|w| w[0] > 0.0 && w[1].is_finite())
        .map(|w| w[1] / w[0] - 1.0)
        .collect();
    if returns.len() < 2 {
        return 0.0;
    }
    let sd = returns.iter().std_dev();
    if sd.is_finite() {
        sd * TRADING_DAYS_PER_YEAR.sqrt()
    } else {
        0.0
    }
}

/// Lazily fetches trailing closes for one symbol and caches the estimate, so
/// pricing both sides of a chain costs at most one history request.
pub struct HistoricalEstimator<'a, M: MarketData + ?Sized> {
    market: &'a M,
    symbol: &'a str,
    lookback_days: u32,
    cached: OnceCell<f64>,
}

impl<'a, M: MarketData + ?Sized> HistoricalEstimator<'a, M> {
    pub fn new(market: &'a M, symbol: &'a str, lookback_days: u32) -> Self {
        Self {
            market,
            symbol,
            lookback_days,
            cached: OnceCell::new(),
        }
    }

    pub fn estimate(&self) -> MispriceResult<f64> {
        if let Some(&vol) = self.cached.get() {
            return Ok(vol);
        }
        let closes: Vec<f64> = self
            .market
            .fetch_historical_closes(self.symbol, self.lookback_days)?
            .into_iter()
            .map(|(_, close)| close)
            .collect();
        let vol = historical_volatility(&closes);
        debug!(
            symbol = self.symbol,
            closes = closes.len(),
            vol,
            "estimated historical vol"
        );
        Ok(*self.cached.get_or_init(|| vol))
    }
}

/// Volatilities aligned with the input quotes.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedVolatility {
    pub vols: Vec<f64>,
    /// Strikes priced with the historical estimate
    pub fallback_strikes: Vec<f64>,
    /// The historical estimate, when it was needed
    pub fallback_vol: Option<f64>,
}

impl ResolvedVolatility {
    pub fn used_fallback(&self) -> bool {
        !self.fallback_strikes.is_empty()
    }
}

/// Resolve one volatility per quote.
///
/// `historical` is only invoked when at least one quote lacks a usable
/// implied vol and no override is given.
pub fn resolve_volatilities<F>(
    quotes: &[Quote],
    explicit_override: Option<f64>,
    historical: F,
) -> MispriceResult<ResolvedVolatility>
where
    F: FnOnce() -> MispriceResult<f64>,
{
    if let Some(sigma) = explicit_override {
        ensure_non_negative("volatility override", sigma)?;
        return Ok(ResolvedVolatility {
            vols: vec![sigma; quotes.len()],
            fallback_strikes: Vec::new(),
            fallback_vol: None,
        });
    }

    let mut vols: Vec<Option<f64>> = quotes
        .iter()
        .map(|q| {
            q.implied_vol
                .map(normalize_iv)
                .filter(|iv| iv.is_finite() && *iv > 0.0)
        })
        .collect();

    let fallback_strikes: Vec<f64> = quotes
        .iter()
        .zip(&vols)
        .filter(|(_, iv)| iv.is_none())
        .map(|(q, _)| q.strike)
        .collect();

    if fallback_strikes.is_empty() {
        return Ok(ResolvedVolatility {
            vols: vols.into_iter().flatten().collect(),
            fallback_strikes,
            fallback_vol: None,
        });
    }

    let hist_vol = historical()?;
    debug!(
        strikes = fallback_strikes.len(),
        hist_vol,
        "filled missing implied vols"
    );
    for iv in vols.iter_mut().filter(|iv| iv.is_none()) {
        *iv = Some(hist_vol);
    }

    Ok(ResolvedVolatility {
        vols: vols.into_iter().flatten().collect(),
        fallback_strikes,
        fallback_vol: Some(hist_vol),
    })
}
