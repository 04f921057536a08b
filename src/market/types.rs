use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::OptionSide;

/// One listed contract in an option chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Strike price
    pub strike: f64,
    pub bid: f64,
    pub ask: f64,
    /// Last traded price
    pub last_price: f64,
    /// Implied volatility as quoted by the provider (decimal or percent)
    pub implied_vol: Option<f64>,
}

impl Quote {
    pub fn new(strike: f64, bid: f64, ask: f64) -> Self {
        Self {
            strike,
            bid,
            ask,
            last_price: 0.0,
            implied_vol: None,
        }
    }

    pub fn with_implied_vol(mut self, iv: f64) -> Self {
        self.implied_vol = Some(iv);
        self
    }

    pub fn with_last_price(mut self, last: f64) -> Self {
        self.last_price = last;
        self
    }

    /// A quote is liquid when both sides of the book are strictly positive.
    pub fn is_liquid(&self) -> bool {
        self.bid > 0.0 && self.ask > 0.0
    }

    /// Mid price, or `None` for illiquid quotes.
    pub fn mid(&self) -> Option<f64> {
        self.is_liquid().then(|| (self.bid + self.ask) / 2.0)
    }
}

/// Option chain for one underlying and expiry, as observed on `as_of`.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainSnapshot {
    pub symbol: String,
    pub as_of: NaiveDate,
    /// Listed expiry the quotes belong to
    pub expiry: NaiveDate,
    /// Contemporaneous underlying price
    pub spot: f64,
    pub calls: Vec<Quote>,
    pub puts: Vec<Quote>,
}

impl ChainSnapshot {
    pub fn quotes(&self, side: OptionSide) -> &[Quote] {
        match side {
            OptionSide::Call => &self.calls,
            OptionSide::Put => &self.puts,
        }
    }
}
