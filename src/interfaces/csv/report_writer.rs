use std::io::Write;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::settlement::SettlementBatch;
use crate::error::Result;

#[derive(Serialize)]
struct ReportRow {
    driver: u64,
    payments: usize,
    total: Decimal,
}

/// Writes the pending-settlements report as CSV (`driver,payments,total`).
///
/// Batches arrive already ordered by driver id from the aggregator, so the
/// report is reproducible across runs over the same store.
pub struct ReportWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(destination: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(destination),
        }
    }

    pub fn write_batches(&mut self, batches: &[SettlementBatch]) -> Result<()> {
        for batch in batches {
            self.writer.serialize(ReportRow {
                driver: batch.driver.value(),
                payments: batch.len(),
                total: batch.total,
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::{DriverId, PaymentId};
    use rust_decimal_macros::dec;

    #[test]
    fn test_report_layout() {
        let batches = vec![
            SettlementBatch {
                driver: DriverId::new(3),
                payments: vec![PaymentId::new(2)],
                total: dec!(75.00),
            },
            SettlementBatch {
                driver: DriverId::new(7),
                payments: vec![PaymentId::new(1), PaymentId::new(4)],
                total: dec!(35000),
            },
        ];

        let mut out = Vec::new();
        ReportWriter::new(&mut out).write_batches(&batches).unwrap();

        let report = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(lines[0], "driver,payments,total");
        assert_eq!(lines[1], "3,1,75.00");
        assert_eq!(lines[2], "7,2,35000");
    }

    #[test]
    fn test_empty_report_writes_nothing() {
        // csv only emits the header with the first record, so an empty
        // batch set produces empty output.
        let mut out = Vec::new();
        ReportWriter::new(&mut out).write_batches(&[]).unwrap();
        let report = String::from_utf8(out).unwrap();
        assert_eq!(report, "");
    }
}
