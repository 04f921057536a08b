use chrono::NaiveDate;
use rayon::prelude::*;
use tracing::{info, warn};

use super::range::aggregate;
use crate::error::{MispriceError, MispriceResult};
use crate::factor::{FactorKind, MispricingParams, MispricingTable};
use crate::market::MarketData;

/// Run [`aggregate`] for every symbol on a pool of at most `concurrency`
/// worker threads and concatenate the symbols that succeeded.
///
/// Each symbol is an independent task returning its own table or error; a
/// failed symbol is logged and contributes nothing, and never affects its
/// siblings. Rows come back grouped by symbol in input order.
///
/// # Errors
///
/// * `InvalidParameter` for an empty symbol list, zero concurrency or bad `params`
/// * `InvalidRange` when `end < start`
/// * `InvalidWeights` for a composite `kind` with bad weights
/// * `EmptyBatch` when every symbol failed
#[allow(clippy::too_many_arguments)]
pub fn run<M, S>(
    market: &M,
    symbols: &[S],
    expiry: NaiveDate,
    start: NaiveDate,
    end: NaiveDate,
    kind: FactorKind,
    params: &MispricingParams,
    concurrency: usize,
) -> MispriceResult<MispricingTable>
where
    M: MarketData + ?Sized,
    S: AsRef<str> + Sync,
{
    if symbols.is_empty() {
        return Err(MispriceError::invalid_parameter(
            "symbol list must not be empty",
        ));
    }
    if concurrency == 0 {
        return Err(MispriceError::invalid_parameter(
            "concurrency must be >= 1",
        ));
    }
    if end < start {
        return Err(MispriceError::InvalidRange { start, end });
    }
    params.validate_for(kind)?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(concurrency)
        .thread_name(|i| format!("misprice-worker-{i}"))
        .build()?;

    let outcomes: Vec<(&str, MispriceResult<MispricingTable>)> = pool.install(|| {
        symbols
            .par_iter()
            .map(|symbol| {
                let symbol = symbol.as_ref();
                (
                    symbol,
                    aggregate(market, symbol, expiry, start, end, kind, params),
                )
            })
            .collect()
    });

    let mut table = MispricingTable::empty(kind);
    let mut failed = 0usize;
    for (symbol, outcome) in outcomes {
        match outcome {
            Ok(symbol_table) => table.append(symbol_table)?,
            Err(err) => {
                failed += 1;
                warn!(symbol, error = %err, "skipping symbol");
            }
        }
    }

    if failed == symbols.len() {
        return Err(MispriceError::EmptyBatch(symbols.len()));
    }

    info!(
        symbols = symbols.len(),
        failed,
        rows = table.len(),
        concurrency,
        "batch complete"
    );
    Ok(table)
}
