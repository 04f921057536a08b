//! CSV loaders for [`InMemoryMarketData`].
//!
//! Three flat files are understood, all with headers:
//!
//! ```text
//! chains:    symbol,as_of,expiry,side,strike,bid,ask,last_price,implied_vol,spot
//! closes:    symbol,date,close
//! dividends: symbol,date,amount
//! ```
//!
//! Dates are ISO `YYYY-MM-DD`, `side` is `call` or `put`, and `implied_vol`
//! may be left empty.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use super::provider::InMemoryMarketData;
use super::types::{ChainSnapshot, Quote};
use crate::models::OptionSide;

#[derive(Debug, Deserialize)]
struct ChainCsvRow {
    symbol: String,
    as_of: NaiveDate,
    expiry: NaiveDate,
    side: OptionSide,
    strike: f64,
    bid: f64,
    ask: f64,
    #[serde(default)]
    last_price: f64,
    #[serde(default)]
    implied_vol: Option<f64>,
    spot: f64,
}

#[derive(Debug, Deserialize)]
struct CloseCsvRow {
    symbol: String,
    date: NaiveDate,
    close: f64,
}

#[derive(Debug, Deserialize)]
struct DividendCsvRow {
    symbol: String,
    date: NaiveDate,
    amount: f64,
}

/// Read chain rows and register one snapshot per (symbol, as_of, expiry).
///
/// Quote order within a snapshot follows file order. Returns the number of
/// snapshots registered.
pub fn load_chains<R: Read>(market: &mut InMemoryMarketData, reader: R) -> Result<usize> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut snapshots: BTreeMap<(String, NaiveDate, NaiveDate), ChainSnapshot> = BTreeMap::new();

    for (line, result) in rdr.deserialize::<ChainCsvRow>().enumerate() {
        let row = result.with_context(|| format!("malformed chain row {}", line + 1))?;
        let key = (row.symbol.clone(), row.as_of, row.expiry);
        let snapshot = snapshots.entry(key).or_insert_with(|| ChainSnapshot {
            symbol: row.symbol.clone(),
            as_of: row.as_of,
            expiry: row.expiry,
            spot: row.spot,
            calls: Vec::new(),
            puts: Vec::new(),
        });

        let quote = Quote {
            strike: row.strike,
            bid: row.bid,
            ask: row.ask,
            last_price: row.last_price,
            implied_vol: row.implied_vol,
        };
        match row.side {
            OptionSide::Call => snapshot.calls.push(quote),
            OptionSide::Put => snapshot.puts.push(quote),
        }
    }

    let count = snapshots.len();
    for snapshot in snapshots.into_values() {
        market.insert_chain(snapshot);
    }
    Ok(count)
}

/// Read daily closes. Returns the number of rows read.
pub fn load_closes<R: Read>(market: &mut InMemoryMarketData, reader: R) -> Result<usize> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut count = 0;
    for (line, result) in rdr.deserialize::<CloseCsvRow>().enumerate() {
        let row = result.with_context(|| format!("malformed close row {}", line + 1))?;
        market.insert_close(&row.symbol, row.date, row.close);
        count += 1;
    }
    Ok(count)
}

/// Read cash dividends. Returns the number of rows read.
pub fn load_dividends<R: Read>(market: &mut InMemoryMarketData, reader: R) -> Result<usize> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut count = 0;
    for (line, result) in rdr.deserialize::<DividendCsvRow>().enumerate() {
        let row = result.with_context(|| format!("malformed dividend row {}", line + 1))?;
        market.insert_dividend(&row.symbol, row.date, row.amount);
        count += 1;
    }
    Ok(count)
}

impl InMemoryMarketData {
    /// Build a provider from CSV files on disk.
    pub fn from_csv_files(
        chains: &Path,
        closes: Option<&Path>,
        dividends: Option<&Path>,
    ) -> Result<Self> {
        let mut market = Self::new();

        let file = std::fs::File::open(chains)
            .with_context(|| format!("cannot open chain file {}", chains.display()))?;
        load_chains(&mut market, file)
            .with_context(|| format!("failed to load chains from {}", chains.display()))?;

        if let Some(path) = closes {
            let file = std::fs::File::open(path)
                .with_context(|| format!("cannot open close file {}", path.display()))?;
            load_closes(&mut market, file)
                .with_context(|| format!("failed to load closes from {}", path.display()))?;
        }

        if let Some(path) = dividends {
            let file = std::fs::File::open(path)
                .with_context(|| format!("cannot open dividend file {}", path.display()))?;
            load_dividends(&mut market, file)
                .with_context(|| format!("failed to load dividends from {}", path.display()))?;
        }

        Ok(market)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::provider::MarketData;

    const CHAINS: &str = "\
symbol,as_of,expiry,side,strike,bid,ask,last_price,implied_vol,spot
AAPL,2025-04-01,2025-05-16,call,95,7.9,8.1,8.0,0.31,100
AAPL,2025-04-01,2025-05-16,call,100,4.9,5.1,5.0,,100
AAPL,2025-04-01,2025-05-16,put,100,3.9,4.1,4.0,31.5,100
MSFT,2025-04-01,2025-05-16,put,380,9.5,9.9,9.7,0.28,390
";

    #[test]
    fn test_load_chains_groups_by_snapshot() {
        let mut market = InMemoryMarketData::new();
        let count = load_chains(&mut market, CHAINS.as_bytes()).unwrap();
        assert_eq!(count, 2);

        let d = |s: &str| s.parse::<NaiveDate>().unwrap();
        let aapl = market.fetch_chain("AAPL", d("2025-05-16"), d("2025-04-01")).unwrap();
        assert_eq!(aapl.calls.len(), 2);
        assert_eq!(aapl.puts.len(), 1);
        assert_eq!(aapl.calls[0].strike, 95.0);
        assert_eq!(aapl.calls[1].implied_vol, None);
        assert_eq!(aapl.puts[0].implied_vol, Some(31.5));
        assert_eq!(aapl.spot, 100.0);
    }

    #[test]
    fn test_load_closes_and_dividends() {
        let mut market = InMemoryMarketData::new();
        let closes = "symbol,date,close\nKO,2025-03-28,60.0\nKO,2025-03-31,62.0\n";
        let dividends = "symbol,date,amount\nKO,2024-06-14,0.485\nKO,2024-09-13,0.485\n";
        assert_eq!(load_closes(&mut market, closes.as_bytes()).unwrap(), 2);
        assert_eq!(load_dividends(&mut market, dividends.as_bytes()).unwrap(), 2);

        let q = market.fetch_dividend_yield("KO").unwrap();
        assert!((q - 0.97 / 62.0).abs() < 1e-12);
    }

    #[test]
    fn test_malformed_row_reports_context() {
        let mut market = InMemoryMarketData::new();
        let bad = "symbol,date,close\nKO,not-a-date,60.0\n";
        let err = load_closes(&mut market, bad.as_bytes()).unwrap_err();
        assert!(format!("{err:#}").contains("malformed close row 1"));
    }
}
