use chrono::NaiveDate;
use serde::Serialize;

use super::config::FactorKind;
use crate::error::{MispriceError, MispriceResult};
use crate::models::OptionSide;

/// Market versus theoretical price at one strike.
#[derive(Debug, Clone, PartialEq)]
pub struct StrikeResult {
    pub strike: f64,
    /// Mid of bid and ask
    pub market_price: f64,
    pub theoretical_price: f64,
    /// `(market - theoretical) / theoretical`; `None` when theoretical <= 0
    pub mispricing: Option<f64>,
}

impl StrikeResult {
    pub fn new(strike: f64, market_price: f64, theoretical_price: f64) -> Self {
        let mispricing = (theoretical_price > 0.0)
            .then(|| (market_price - theoretical_price) / theoretical_price);
        Self {
            strike,
            market_price,
            theoretical_price,
            mispricing,
        }
    }
}

/// One side of a chain priced on one valuation date.
///
/// Rows are sorted by strike and every row has `theoretical_price > 0`.
#[derive(Debug, Clone, PartialEq)]
pub struct FactorTable {
    pub symbol: String,
    pub valuation_date: NaiveDate,
    pub side: OptionSide,
    /// Listed expiry the chain belonged to
    pub expiry: NaiveDate,
    pub spot: f64,
    pub dividend_yield: f64,
    /// Strikes priced with the historical-vol fallback
    pub fallback_strikes: Vec<f64>,
    pub rows: Vec<StrikeResult>,
}

impl FactorTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn strikes(&self) -> impl Iterator<Item = f64> + '_ {
        self.rows.iter().map(|r| r.strike)
    }

    pub fn get(&self, strike: f64) -> Option<&StrikeResult> {
        self.rows.iter().find(|r| r.strike == strike)
    }

    pub fn into_records(self) -> Vec<FactorRecord> {
        let FactorTable {
            symbol,
            valuation_date,
            side,
            rows,
            ..
        } = self;
        rows.into_iter()
            .map(|r| FactorRecord {
                symbol: symbol.clone(),
                valuation_date,
                side,
                strike: r.strike,
                market_price: r.market_price,
                theoretical_price: r.theoretical_price,
                mispricing: r.mispricing,
            })
            .collect()
    }
}

/// Call and put legs at a shared strike, blended into one score.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeRow {
    pub strike: f64,
    pub market_call: f64,
    pub theo_call: f64,
    pub mispr_call: Option<f64>,
    pub market_put: f64,
    pub theo_put: f64,
    pub mispr_put: Option<f64>,
    /// `w_call * mispr_call + w_put * mispr_put`
    pub mispricing: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompositeTable {
    pub symbol: String,
    pub valuation_date: NaiveDate,
    pub w_call: f64,
    pub w_put: f64,
    pub rows: Vec<CompositeRow>,
}

impl CompositeTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn into_records(self) -> Vec<CompositeRecord> {
        let CompositeTable {
            symbol,
            valuation_date,
            rows,
            ..
        } = self;
        rows.into_iter()
            .map(|r| CompositeRecord {
                symbol: symbol.clone(),
                valuation_date,
                strike: r.strike,
                market_call: r.market_call,
                theo_call: r.theo_call,
                mispr_call: r.mispr_call,
                market_put: r.market_put,
                theo_put: r.theo_put,
                mispr_put: r.mispr_put,
                mispricing: r.mispricing,
            })
            .collect()
    }
}

/// Flat export row for a call or put factor.
///
/// Columns: `symbol, valuation_date, side, strike, market_price,
/// theoretical_price, mispricing`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactorRecord {
    pub symbol: String,
    pub valuation_date: NaiveDate,
    pub side: OptionSide,
    pub strike: f64,
    pub market_price: f64,
    pub theoretical_price: f64,
    pub mispricing: Option<f64>,
}

/// Flat export row for the composite factor.
///
/// Columns: `symbol, valuation_date, strike, market_call, theo_call,
/// mispr_call, market_put, theo_put, mispr_put, mispricing`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompositeRecord {
    pub symbol: String,
    pub valuation_date: NaiveDate,
    pub strike: f64,
    pub market_call: f64,
    pub theo_call: f64,
    pub mispr_call: Option<f64>,
    pub market_put: f64,
    pub theo_put: f64,
    pub mispr_put: Option<f64>,
    pub mispricing: Option<f64>,
}

/// Tagged rows from any number of (symbol, valuation date) units.
#[derive(Debug, Clone, PartialEq)]
pub enum MispricingTable {
    Factor(Vec<FactorRecord>),
    Composite(Vec<CompositeRecord>),
}

impl MispricingTable {
    /// Empty table of the shape produced for `kind`.
    pub fn empty(kind: FactorKind) -> Self {
        match kind {
            FactorKind::Call | FactorKind::Put => Self::Factor(Vec::new()),
            FactorKind::Composite => Self::Composite(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Factor(rows) => rows.len(),
            Self::Composite(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Move every row of `other` onto the end of `self`.
    pub fn append(&mut self, other: MispricingTable) -> MispriceResult<()> {
        match (self, other) {
            (Self::Factor(rows), Self::Factor(mut more)) => rows.append(&mut more),
            (Self::Composite(rows), Self::Composite(mut more)) => rows.append(&mut more),
            _ => {
                return Err(MispriceError::invalid_parameter(
                    "cannot concatenate factor and composite tables",
                ))
            }
        }
        Ok(())
    }

    /// `(symbol, valuation_date)` tag of every row, in row order.
    pub fn tags(&self) -> Vec<(&str, NaiveDate)> {
        match self {
            Self::Factor(rows) => rows
                .iter()
                .map(|r| (r.symbol.as_str(), r.valuation_date))
                .collect(),
            Self::Composite(rows) => rows
                .iter()
                .map(|r| (r.symbol.as_str(), r.valuation_date))
                .collect(),
        }
    }

    pub fn as_factor(&self) -> Option<&[FactorRecord]> {
        match self {
            Self::Factor(rows) => Some(rows),
            Self::Composite(_) => None,
        }
    }

    pub fn as_composite(&self) -> Option<&[CompositeRecord]> {
        match self {
            Self::Composite(rows) => Some(rows),
            Self::Factor(_) => None,
        }
    }
}

impl From<FactorTable> for MispricingTable {
    fn from(table: FactorTable) -> Self {
        Self::Factor(table.into_records())
    }
}

impl From<CompositeTable> for MispricingTable {
    fn from(table: CompositeTable) -> Self {
        Self::Composite(table.into_records())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strike_result_mispricing() {
        let r = StrikeResult::new(100.0, 5.5, 5.0);
        assert!((r.mispricing.unwrap() - 0.1).abs() < 1e-12);
        assert_eq!(StrikeResult::new(100.0, 5.5, 0.0).mispricing, None);
        assert_eq!(StrikeResult::new(100.0, 5.5, -1.0).mispricing, None);
    }

    #[test]
    fn test_append_requires_matching_shapes() {
        let mut table = MispricingTable::empty(FactorKind::Call);
        assert!(table.append(MispricingTable::empty(FactorKind::Put)).is_ok());
        assert!(table
            .append(MispricingTable::empty(FactorKind::Composite))
            .is_err());
    }
}
