//! Market-data collaborator.
//!
//! The pricing pipeline never talks to a vendor directly. It consumes the
//! [`MarketData`] trait: a chain snapshot per (symbol, expiry, date), a dividend
//! yield and a trailing close series. [`InMemoryMarketData`] is the reference
//! implementation, filled programmatically or from CSV (see [`super::loader`]).

use chrono::{Duration, NaiveDate};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use super::types::ChainSnapshot;
use crate::error::{MispriceError, MispriceResult};

/// Source of option chains and underlying history.
///
/// Implementations must be shareable across worker threads; the batch layer
/// calls into one provider from every symbol task concurrently.
pub trait MarketData: Send + Sync {
    /// Chain snapshot for `symbol` observed on `as_of`.
    ///
    /// When `expiry` is not listed the nearest listed expiry is substituted;
    /// the returned snapshot carries the expiry actually used. Fails with
    /// `NoData` when the symbol has no history or no listed expiries on that date.
    fn fetch_chain(
        &self,
        symbol: &str,
        expiry: NaiveDate,
        as_of: NaiveDate,
    ) -> MispriceResult<ChainSnapshot>;

    /// Continuous dividend yield as a decimal (>= 0).
    fn fetch_dividend_yield(&self, symbol: &str) -> MispriceResult<f64>;

    /// Daily closes, oldest first, covering the last `lookback_days` calendar days.
    fn fetch_historical_closes(
        &self,
        symbol: &str,
        lookback_days: u32,
    ) -> MispriceResult<Vec<(NaiveDate, f64)>>;
}

#[derive(Debug, Clone, Default)]
struct SymbolData {
    /// as_of -> expiry -> snapshot
    chains: BTreeMap<NaiveDate, BTreeMap<NaiveDate, ChainSnapshot>>,
    closes: BTreeMap<NaiveDate, f64>,
    dividends: BTreeMap<NaiveDate, f64>,
    dividend_yield: Option<f64>,
}

/// Map-backed [`MarketData`] implementation.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMarketData {
    symbols: HashMap<String, SymbolData>,
}

impl InMemoryMarketData {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&mut self, symbol: &str) -> &mut SymbolData {
        self.symbols.entry(symbol.to_string()).or_default()
    }

    /// Register a snapshot; a later snapshot for the same (as_of, expiry) replaces it.
    pub fn insert_chain(&mut self, snapshot: ChainSnapshot) {
        let symbol = snapshot.symbol.clone();
        self.entry(&symbol)
            .chains
            .entry(snapshot.as_of)
            .or_default()
            .insert(snapshot.expiry, snapshot);
    }

    pub fn insert_close(&mut self, symbol: &str, date: NaiveDate, close: f64) {
        self.entry(symbol).closes.insert(date, close);
    }

    pub fn insert_closes<I>(&mut self, symbol: &str, closes: I)
    where
        I: IntoIterator<Item = (NaiveDate, f64)>,
    {
        self.entry(symbol).closes.extend(closes);
    }

    /// Record a cash dividend; several payments on one date accumulate.
    pub fn insert_dividend(&mut self, symbol: &str, date: NaiveDate, amount: f64) {
        *self.entry(symbol).dividends.entry(date).or_insert(0.0) += amount;
    }

    /// Explicit yield, taking precedence over the trailing-dividend estimate.
    pub fn set_dividend_yield(&mut self, symbol: &str, q: f64) {
        self.entry(symbol).dividend_yield = Some(q);
    }

    fn symbol(&self, symbol: &str) -> MispriceResult<&SymbolData> {
        self.symbols
            .get(symbol)
            .ok_or_else(|| MispriceError::no_data(format!("unknown symbol '{symbol}'")))
    }
}

impl MarketData for InMemoryMarketData {
    fn fetch_chain(
        &self,
        symbol: &str,
        expiry: NaiveDate,
        as_of: NaiveDate,
    ) -> MispriceResult<ChainSnapshot> {
        let data = self.symbol(symbol)?;
        let listed = data
            .chains
            .get(&as_of)
            .filter(|by_expiry| !by_expiry.is_empty())
            .ok_or_else(|| {
                MispriceError::no_data(format!("no option expirations for {symbol} on {as_of}"))
            })?;

        if let Some(snapshot) = listed.get(&expiry) {
            return Ok(snapshot.clone());
        }

        // Ascending iteration makes ties resolve to the earlier expiry.
        let nearest = listed
            .values()
            .min_by_key(|s| (s.expiry - expiry).num_days().abs())
            .ok_or_else(|| MispriceError::no_data(format!("no expirations for {symbol}")))?;
        debug!(
            symbol,
            requested = %expiry,
            substituted = %nearest.expiry,
            "expiry not listed, using nearest"
        );
        Ok(nearest.clone())
    }

    fn fetch_dividend_yield(&self, symbol: &str) -> MispriceResult<f64> {
        let data = self.symbol(symbol)?;
        if let Some(q) = data.dividend_yield {
            return Ok(q.max(0.0));
        }

        let Some((&last_date, &last_close)) = data.closes.iter().next_back() else {
            return Ok(0.0);
        };
        if last_close <= 0.0 {
            return Ok(0.0);
        }
        let window_start = last_date - Duration::days(365);
        let trailing: f64 = data
            .dividends
            .range(window_start..=last_date)
            .filter(|(date, _)| **date > window_start)
            .map(|(_, &amount)| amount)
            .sum();
        Ok((trailing / last_close).max(0.0))
    }

    fn fetch_historical_closes(
        &self,
        symbol: &str,
        lookback_days: u32,
    ) -> MispriceResult<Vec<(NaiveDate, f64)>> {
        let data = self.symbol(symbol)?;
        let Some(&last_date) = data.closes.keys().next_back() else {
            return Ok(Vec::new());
        };
        let window_start = last_date - Duration::days(i64::from(lookback_days));
        Ok(data
            .closes
            .range(window_start..=last_date)
            .filter(|(date, _)| **date > window_start)
            .map(|(&date, &close)| (date, close))
            .collect())
    }
}
