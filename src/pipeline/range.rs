use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::error::{MispriceError, MispriceResult};
use crate::factor::{price_factor, FactorKind, MispricingParams, MispricingTable};
use crate::market::MarketData;

/// Repeat the single-date computation for every calendar day in
/// `[start, end]` and concatenate the days that succeeded.
///
/// A failing day contributes no rows. Data gaps (weekends, holidays, illiquid
/// chains) are logged at `debug`, anything else at `warn`. Caller-input errors
/// (bad range, bad parameters) are raised before any day is attempted.
///
/// # Errors
///
/// * `InvalidRange` when `end < start`
/// * `InvalidParameter` when `params` fail validation
/// * `InvalidWeights` for a composite `kind` with bad weights
/// * `EmptyRange` when no day succeeded
#[allow(clippy::too_many_arguments)]
pub fn aggregate<M>(
    market: &M,
    symbol: &str,
    expiry: NaiveDate,
    start: NaiveDate,
    end: NaiveDate,
    kind: FactorKind,
    params: &MispricingParams,
) -> MispriceResult<MispricingTable>
where
    M: MarketData + ?Sized,
{
    if end < start {
        return Err(MispriceError::InvalidRange { start, end });
    }
    params.validate_for(kind)?;

    let mut table = MispricingTable::empty(kind);
    let mut attempted = 0usize;
    let mut succeeded = 0usize;

    for day in start.iter_days().take_while(|d| *d <= end) {
        attempted += 1;
        match price_factor(market, symbol, expiry, day, kind, params) {
            Ok(day_table) => {
                table.append(day_table)?;
                succeeded += 1;
            }
            Err(err) if err.is_data_gap() => {
                debug!(symbol, date = %day, error = %err, "skipping valuation date");
            }
            Err(err) => {
                warn!(symbol, date = %day, error = %err, "valuation date failed");
            }
        }
    }

    if succeeded == 0 {
        return Err(MispriceError::EmptyRange {
            symbol: symbol.to_string(),
            start,
            end,
        });
    }

    info!(
        symbol,
        %kind,
        attempted,
        succeeded,
        rows = table.len(),
        "date range complete"
    );
    Ok(table)
}
