//! Call/put blend.
//!
//! The composite score at a strike is the weighted average of the two per-side
//! ratios, `w_call * mispr_call + w_put * mispr_put`. It is not recomputed as a
//! ratio of weighted prices.

use super::types::{CompositeRow, FactorTable};
use crate::error::{MispriceError, MispriceResult};

/// Tolerance on `w_call + w_put == 1`.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Both weights must lie in `[0, 1]` and sum to one.
pub fn validate_weights(w_call: f64, w_put: f64) -> MispriceResult<()> {
    let in_unit = |w: f64| (0.0..=1.0).contains(&w);
    if in_unit(w_call) && in_unit(w_put) && (w_call + w_put - 1.0).abs() < WEIGHT_SUM_TOLERANCE {
        Ok(())
    } else {
        Err(MispriceError::InvalidWeights { w_call, w_put })
    }
}

/// Inner-join call and put tables on strike and blend their mispricing.
///
/// Strikes present on only one side are dropped. Output follows the call
/// table's strike order.
pub fn combine(
    calls: &FactorTable,
    puts: &FactorTable,
    w_call: f64,
    w_put: f64,
) -> MispriceResult<Vec<CompositeRow>> {
    validate_weights(w_call, w_put)?;

    let mut rows = Vec::with_capacity(calls.len().min(puts.len()));
    for call in &calls.rows {
        for put in puts.rows.iter().filter(|p| p.strike == call.strike) {
            let mispricing = match (call.mispricing, put.mispricing) {
                (Some(c), Some(p)) => Some(w_call * c + w_put * p),
                _ => None,
            };
            rows.push(CompositeRow {
                strike: call.strike,
                market_call: call.market_price,
                theo_call: call.theoretical_price,
                mispr_call: call.mispricing,
                market_put: put.market_price,
                theo_put: put.theoretical_price,
                mispr_put: put.mispricing,
                mispricing,
            });
        }
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factor::types::StrikeResult;
    use crate::models::OptionSide;
    use chrono::NaiveDate;

    fn table(side: OptionSide, rows: &[(f64, f64, f64)]) -> FactorTable {
        let date = NaiveDate::from_ymd_opt(2025, 4, 1).unwrap();
        FactorTable {
            symbol: "AAPL".to_string(),
            valuation_date: date,
            side,
            expiry: NaiveDate::from_ymd_opt(2025, 5, 16).unwrap(),
            spot: 100.0,
            dividend_yield: 0.0,
            fallback_strikes: Vec::new(),
            rows: rows
                .iter()
                .map(|&(k, m, t)| StrikeResult::new(k, m, t))
                .collect(),
        }
    }

    #[test]
    fn test_weight_validation() {
        assert!(validate_weights(0.5, 0.5).is_ok());
        assert!(validate_weights(1.0, 0.0).is_ok());
        assert!(validate_weights(0.7, 0.3 + 5e-7).is_ok());
        for (c, p) in [(1.1, -0.1), (0.6, 0.6), (0.5, 0.49), (f64::NAN, 0.5)] {
            assert!(matches!(
                validate_weights(c, p),
                Err(MispriceError::InvalidWeights { .. })
            ));
        }
    }

    #[test]
    fn test_inner_join_and_weighted_ratio() {
        let calls = table(
            OptionSide::Call,
            &[(95.0, 8.0, 7.5), (100.0, 5.0, 5.0), (105.0, 2.2, 2.0)],
        );
        let puts = table(
            OptionSide::Put,
            &[(100.0, 4.4, 4.0), (105.0, 6.0, 7.5), (110.0, 10.5, 10.0)],
        );

        let rows = combine(&calls, &puts, 0.7, 0.3).unwrap();
        let strikes: Vec<f64> = rows.iter().map(|r| r.strike).collect();
        assert_eq!(strikes, vec![100.0, 105.0]);

        // 100: call 0%, put +10%
        assert!((rows[0].mispricing.unwrap() - 0.03).abs() < 1e-12);
        // 105: call +10%, put -20%
        assert!((rows[1].mispricing.unwrap() - (0.07 - 0.06)).abs() < 1e-12);
        assert_eq!(rows[1].market_put, 6.0);
        assert_eq!(rows[1].theo_call, 2.0);
    }

    #[test]
    fn test_no_overlap_is_empty() {
        let calls = table(OptionSide::Call, &[(95.0, 8.0, 7.5)]);
        let puts = table(OptionSide::Put, &[(110.0, 10.5, 10.0)]);
        assert!(combine(&calls, &puts, 0.5, 0.5).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_weights_fail_before_join() {
        let calls = table(OptionSide::Call, &[(100.0, 5.0, 5.0)]);
        let puts = table(OptionSide::Put, &[(100.0, 4.0, 4.0)]);
        assert!(matches!(
            combine(&calls, &puts, 1.1, -0.1),
            Err(MispriceError::InvalidWeights { .. })
        ));
    }
}
