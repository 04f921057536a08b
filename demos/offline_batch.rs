use chrono::{Duration, NaiveDate};
use option_misprice::models::OptionSide;
use option_misprice::{
    bs_price, compute_mispricing_batch, default_configs, ChainSnapshot, FactorKind,
    InMemoryMarketData, MispricingTable, Quote,
};
use tracing_subscriber::EnvFilter;

/// Build a small offline market: two symbols, a week of chains, skewed quotes.
fn build_market(expiry: NaiveDate, start: NaiveDate) -> Result<InMemoryMarketData, Box<dyn std::error::Error>> {
    let mut market = InMemoryMarketData::new();
    let r = 0.03;

    for (symbol, spot, skew) in [("AAPL", 190.0, 0.04), ("MSFT", 410.0, -0.02)] {
        for offset in 0..5 {
            let as_of = start + Duration::days(offset);
            let t = (expiry - as_of).num_days() as f64 / 365.0;
            let strikes: Vec<f64> = (-4..=4).map(|i| spot * (1.0 + 0.025 * i as f64)).collect();

            let mut calls = Vec::new();
            let mut puts = Vec::new();
            for &k in &strikes {
                // Market vol tilts with moneyness by the symbol's skew; the model sees a flat 0.28
                let market_vol = 0.28 + skew * (spot / k - 1.0) * 10.0;
                let call = bs_price(spot, k, t, r, market_vol, OptionSide::Call, 0.005)?;
                let put = bs_price(spot, k, t, r, market_vol, OptionSide::Put, 0.005)?;
                calls.push(Quote::new(k, call * 0.99, call * 1.01).with_implied_vol(28.0));
                puts.push(Quote::new(k, put * 0.99, put * 1.01).with_implied_vol(0.28));
            }
            market.insert_chain(ChainSnapshot {
                symbol: symbol.to_string(),
                as_of,
                expiry,
                spot,
                calls,
                puts,
            });
        }
        market.set_dividend_yield(symbol, 0.005);
    }
    Ok(market)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("Offline Mispricing Batch");
    println!("========================");

    let expiry = NaiveDate::from_ymd_opt(2025, 6, 20).ok_or("bad expiry")?;
    let start = NaiveDate::from_ymd_opt(2025, 4, 1).ok_or("bad start")?;
    let end = start + Duration::days(6);
    let market = build_market(expiry, start)?;

    let params = default_configs::american().with_risk_free_rate(0.03);
    let table = compute_mispricing_batch(
        &market,
        &["AAPL", "MSFT", "UNLISTED"],
        expiry,
        start,
        end,
        FactorKind::Composite,
        &params,
        2,
    )?;

    if let MispricingTable::Composite(rows) = &table {
        println!(
            "{:<6} {:<10} {:>8} {:>10} {:>10} {:>10}",
            "sym", "date", "strike", "call", "put", "composite"
        );
        for row in rows {
            println!(
                "{:<6} {:<10} {:>8.2} {:>10.4} {:>10.4} {:>10.4}",
                row.symbol,
                row.valuation_date,
                row.strike,
                row.mispr_call.unwrap_or(f64::NAN),
                row.mispr_put.unwrap_or(f64::NAN),
                row.mispricing.unwrap_or(f64::NAN),
            );
        }
    }

    let out = std::env::temp_dir().join("offline_batch.csv");
    table.to_csv_path(&out)?;
    println!("\n{} rows written to {}", table.len(), out.display());
    Ok(())
}
