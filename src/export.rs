//! CSV output for mispricing tables.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use tracing::info;

use crate::error::{MispriceError, MispriceResult};
use crate::factor::MispricingTable;

impl MispricingTable {
    /// Write the table as CSV with a header row.
    ///
    /// An empty table still gets its header, so downstream readers always see
    /// the column set for the factor kind.
    pub fn write_csv<W: Write>(&self, writer: W) -> MispriceResult<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        match self {
            MispricingTable::Factor(rows) if rows.is_empty() => {
                wtr.write_record(FACTOR_COLUMNS)?;
            }
            MispricingTable::Composite(rows) if rows.is_empty() => {
                wtr.write_record(COMPOSITE_COLUMNS)?;
            }
            MispricingTable::Factor(rows) => {
                for row in rows {
                    wtr.serialize(row)?;
                }
            }
            MispricingTable::Composite(rows) => {
                for row in rows {
                    wtr.serialize(row)?;
                }
            }
        }
        wtr.flush().map_err(csv::Error::from)?;
        Ok(())
    }

    /// Write the table to `path`, replacing any existing file.
    pub fn to_csv_path(&self, path: &Path) -> MispriceResult<()> {
        let file = File::create(path).map_err(|e| MispriceError::Export(e.into()))?;
        self.write_csv(file)?;
        info!(path = %path.display(), rows = self.len(), "wrote mispricing csv");
        Ok(())
    }
}

const FACTOR_COLUMNS: [&str; 7] = [
    "symbol",
    "valuation_date",
    "side",
    "strike",
    "market_price",
    "theoretical_price",
    "mispricing",
];

const COMPOSITE_COLUMNS: [&str; 10] = [
    "symbol",
    "valuation_date",
    "strike",
    "market_call",
    "theo_call",
    "mispr_call",
    "market_put",
    "theo_put",
    "mispr_put",
    "mispricing",
];
