
use option_misprice::{
    compute_call_mispricing, compute_mispricing_batch, compute_mispricing_range,
    run_batch_config, BatchConfig, FactorKind, InMemoryMarketData, MispriceError,
    MispricingParams,
};
use test_utils::{
    date, expiry, fair_snapshot, init_tracing, listed_dates, synthetic_market, STRIKES,
};

#[test]
fn test_range_skips_missing_days() {
    init_tracing();
    let market = synthetic_market();
    let table = compute_mispricing_range(
        &market,
        "AAPL",
        expiry(),
        date(2025, 4, 1),
        date(2025, 4, 6),
        FactorKind::Composite,
        &MispricingParams::default(),
    )
    .unwrap();

    assert_eq!(table.len(), listed_dates().len() * STRIKES.len());
    let mut seen: Vec<_> = table.tags().into_iter().map(|(_, d)| d).collect();
    seen.dedup();
    assert_eq!(seen, listed_dates());
    assert!(table.as_composite().is_some());
}

#[test]
fn test_range_matches_single_date_results() {
    let market = synthetic_market();
    let params = MispricingParams::default();
    let table = compute_mispricing_range(
        &market,
        "AAPL",
        expiry(),
        date(2025, 4, 1),
        date(2025, 4, 4),
        FactorKind::Call,
        &params,
    )
    .unwrap();
    let rows = table.as_factor().unwrap();

    for day in listed_dates() {
        let single = compute_call_mispricing(&market, "AAPL", expiry(), Some(day), &params).unwrap();
        let from_range: Vec<_> = rows.iter().filter(|r| r.valuation_date == day).collect();
        assert_eq!(from_range.len(), single.len());
        for (a, b) in from_range.iter().zip(&single.rows) {
            assert_eq!(a.strike, b.strike);
            assert_eq!(a.mispricing, b.mispricing);
        }
    }
}

#[test]
fn test_range_without_data_is_empty_range() {
    let market = synthetic_market();
    let res = compute_mispricing_range(
        &market,
        "AAPL",
        expiry(),
        date(2025, 4, 5),
        date(2025, 4, 6),
        FactorKind::Put,
        &MispricingParams::default(),
    );
    assert!(matches!(res, Err(MispriceError::EmptyRange { .. })));
}

/// Illiquid chains and chains on or after expiry are skipped like missing days.
#[test]
fn test_range_skips_illiquid_and_expired_days() {
    let mut market = InMemoryMarketData::new();
    let live = fair_snapshot("AAPL", date(2025, 5, 14), 100.0);

    let mut illiquid = live.clone();
    illiquid.as_of = date(2025, 5, 15);
    for quote in &mut illiquid.calls {
        quote.bid = 0.0;
    }

    let mut on_expiry = live.clone();
    on_expiry.as_of = expiry();
    let mut after_expiry = live.clone();
    after_expiry.as_of = date(2025, 5, 17);

    for snapshot in [live, illiquid, on_expiry, after_expiry] {
        market.insert_chain(snapshot);
    }
    market.set_dividend_yield("AAPL", 0.0);

    let table = compute_mispricing_range(
        &market,
        "AAPL",
        expiry(),
        date(2025, 5, 14),
        date(2025, 5, 17),
        FactorKind::Call,
        &MispricingParams::default(),
    )
    .unwrap();

    assert!(!table.is_empty());
    assert!(table
        .tags()
        .iter()
        .all(|(symbol, day)| *symbol == "AAPL" && *day == date(2025, 5, 14)));
}

#[test]
fn test_call_range_ignores_composite_weights() {
    let market = synthetic_market();
    let params = MispricingParams::default().with_weights(1.1, -0.1);
    let range = |kind| {
        compute_mispricing_range(
            &market,
            "AAPL",
            expiry(),
            date(2025, 4, 1),
            date(2025, 4, 4),
            kind,
            &params,
        )
    };

    let calls = range(FactorKind::Call).unwrap();
    assert_eq!(calls.len(), listed_dates().len() * STRIKES.len());
    assert!(matches!(
        range(FactorKind::Composite),
        Err(MispriceError::InvalidWeights { .. })
    ));
}

#[test]
fn test_reversed_range_is_invalid() {
    let market = synthetic_market();
    let res = compute_mispricing_range(
        &market,
        "AAPL",
        expiry(),
        date(2025, 4, 4),
        date(2025, 4, 1),
        FactorKind::Call,
        &MispricingParams::default(),
    );
    assert!(matches!(res, Err(MispriceError::InvalidRange { .. })));
}

#[test]
fn test_batch_isolates_failing_symbols() {
    init_tracing();
    let market = synthetic_market();
    let table = compute_mispricing_batch(
        &market,
        &["AAPL", "__INVALID__"],
        expiry(),
        date(2025, 4, 1),
        date(2025, 4, 4),
        FactorKind::Composite,
        &MispricingParams::default(),
        2,
    )
    .unwrap();

    assert_eq!(table.len(), listed_dates().len() * STRIKES.len());
    assert!(table.tags().iter().all(|(symbol, _)| *symbol == "AAPL"));
}

#[test]
fn test_batch_keeps_symbol_order() {
    let market = synthetic_market();
    let symbols = vec!["MSFT".to_string(), "AAPL".to_string()];
    let table = compute_mispricing_batch(
        &market,
        &symbols,
        expiry(),
        date(2025, 4, 1),
        date(2025, 4, 2),
        FactorKind::Call,
        &MispricingParams::default(),
        1,
    )
    .unwrap();

    let tags = table.tags();
    let half = tags.len() / 2;
    assert!(tags[..half].iter().all(|(s, _)| *s == "MSFT"));
    assert!(tags[half..].iter().all(|(s, _)| *s == "AAPL"));
}

#[test]
fn test_batch_with_no_survivors_is_empty_batch() {
    let market = synthetic_market();
    let res = compute_mispricing_batch(
        &market,
        &["__INVALID__", "NOPE"],
        expiry(),
        date(2025, 4, 1),
        date(2025, 4, 4),
        FactorKind::Call,
        &MispricingParams::default(),
        4,
    );
    assert!(matches!(res, Err(MispriceError::EmptyBatch(2))));
}

#[test]
fn test_batch_rejects_bad_input_up_front() {
    let market = synthetic_market();
    let run = |symbols: &[&str], concurrency: usize, params: &MispricingParams| {
        compute_mispricing_batch(
            &market,
            symbols,
            expiry(),
            date(2025, 4, 1),
            date(2025, 4, 4),
            FactorKind::Composite,
            params,
            concurrency,
        )
    };
    let defaults = MispricingParams::default();

    assert!(matches!(
        run(&[], 4, &defaults),
        Err(MispriceError::InvalidParameter(_))
    ));
    assert!(matches!(
        run(&["AAPL"], 0, &defaults),
        Err(MispriceError::InvalidParameter(_))
    ));
    assert!(matches!(
        run(&["AAPL"], 4, &defaults.clone().with_weights(1.1, -0.1)),
        Err(MispriceError::InvalidWeights { .. })
    ));
}

#[test]
fn test_batch_config_round_trip_to_csv() {
    let market = synthetic_market();
    let out = std::env::temp_dir().join(format!("misprice-batch-{}.csv", std::process::id()));
    let toml = format!(
        r#"
symbols = ["AAPL", "MSFT", "__INVALID__"]
expiry = "2025-05-16"
start_date = "2025-04-01"
end_date = "2025-04-02"
factor = "put"
concurrency = 2
output = "{}"

[params]
volatility_override = 0.25
"#,
        out.display()
    );
    let config = BatchConfig::from_toml_str(&toml).unwrap();
    assert_eq!(config.params.steps, 2);
    assert_eq!(config.factor, FactorKind::Put);

    let table = run_batch_config(&market, &config).unwrap();
    assert_eq!(table.len(), 2 * 2 * STRIKES.len());

    let mut rdr = csv::Reader::from_path(&out).unwrap();
    let headers: Vec<String> = rdr.headers().unwrap().iter().map(String::from).collect();
    assert_eq!(
        headers,
        vec![
            "symbol",
            "valuation_date",
            "side",
            "strike",
            "market_price",
            "theoretical_price",
            "mispricing"
        ]
    );
    let records: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
    assert_eq!(records.len(), table.len());
    assert!(records.iter().all(|r| &r[2] == "put"));

    std::fs::remove_file(&out).ok();
}
