use std::io::Read;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::application::engine::LedgerAction;
use crate::application::intake::PaymentReceipt;
use crate::domain::ids::{AdminId, CustomerId, DriverId, OrderId, PaymentId, ReceiptRef};
use crate::domain::money::Amount;
use crate::error::{LedgerError, Result};

/// One row of the action journal. Columns not applicable to an action are
/// left empty; which ones are required depends on the action and is
/// checked during conversion.
#[derive(Debug, Deserialize)]
struct ActionRow {
    action: String,
    #[serde(default)]
    payment: Option<u64>,
    #[serde(default)]
    order: Option<u64>,
    #[serde(default)]
    driver: Option<u64>,
    #[serde(default)]
    customer: Option<u64>,
    #[serde(default)]
    amount: Option<Decimal>,
    #[serde(default)]
    receipt: Option<String>,
    #[serde(default)]
    admin: Option<u64>,
    #[serde(default)]
    note: Option<String>,
}

fn require<T>(row_action: &str, column: &str, value: Option<T>) -> Result<T> {
    value.ok_or_else(|| {
        LedgerError::ValidationError(format!("'{row_action}' requires column '{column}'"))
    })
}

impl TryFrom<ActionRow> for LedgerAction {
    type Error = LedgerError;

    fn try_from(row: ActionRow) -> Result<Self> {
        let action = row.action.as_str();
        match action {
            "capture" => Ok(LedgerAction::Capture(PaymentReceipt {
                payment: PaymentId::new(require(action, "payment", row.payment)?),
                order: OrderId::new(require(action, "order", row.order)?),
                driver: DriverId::new(require(action, "driver", row.driver)?),
                customer: CustomerId::new(require(action, "customer", row.customer)?),
                amount: Amount::new(require(action, "amount", row.amount)?)?,
                receipt_ref: ReceiptRef::new(require(action, "receipt", row.receipt)?),
            })),
            "confirm" => Ok(LedgerAction::Confirm {
                payment: PaymentId::new(require(action, "payment", row.payment)?),
            }),
            "verify" => Ok(LedgerAction::Verify {
                payment: PaymentId::new(require(action, "payment", row.payment)?),
                notes: row.note,
            }),
            "reject" => Ok(LedgerAction::Reject {
                payment: PaymentId::new(require(action, "payment", row.payment)?),
                reason: require(action, "note", row.note)?,
            }),
            "dispute" => Ok(LedgerAction::Dispute {
                payment: PaymentId::new(require(action, "payment", row.payment)?),
            }),
            "resolve" => Ok(LedgerAction::Resolve {
                payment: PaymentId::new(require(action, "payment", row.payment)?),
            }),
            "settle" => Ok(LedgerAction::Settle {
                driver: DriverId::new(require(action, "driver", row.driver)?),
            }),
            "deposit" => Ok(LedgerAction::Deposit {
                driver: DriverId::new(require(action, "driver", row.driver)?),
                amount: row.amount.map(Amount::new).transpose()?,
            }),
            "activate" => Ok(LedgerAction::Activate {
                driver: DriverId::new(require(action, "driver", row.driver)?),
            }),
            "refund" => Ok(LedgerAction::Refund {
                driver: DriverId::new(require(action, "driver", row.driver)?),
                admin: AdminId::new(require(action, "admin", row.admin)?),
            }),
            "forfeit" => Ok(LedgerAction::Forfeit {
                driver: DriverId::new(require(action, "driver", row.driver)?),
                admin: AdminId::new(require(action, "admin", row.admin)?),
                notes: row.note,
            }),
            other => Err(LedgerError::ValidationError(format!(
                "unknown action '{other}'"
            ))),
        }
    }
}

/// Streams [`LedgerAction`]s from a CSV source.
///
/// Wraps `csv::Reader` with whitespace trimming and flexible record
/// lengths, so hand-written journals with trailing empty columns parse
/// cleanly. Rows are decoded lazily; a malformed row yields an `Err` item
/// without stopping the stream.
pub struct ActionReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> ActionReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    pub fn actions(self) -> impl Iterator<Item = Result<LedgerAction>> {
        self.reader.into_deserialize().map(|row| {
            row.map_err(LedgerError::from)
                .and_then(|row: ActionRow| LedgerAction::try_from(row))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const HEADER: &str = "action,payment,order,driver,customer,amount,receipt,admin,note";

    fn parse(rows: &str) -> Vec<Result<LedgerAction>> {
        let data = format!("{HEADER}\n{rows}");
        ActionReader::new(data.as_bytes()).actions().collect()
    }

    #[test]
    fn test_capture_row() {
        let results = parse("capture,1,10,7,55,120.50,s3://receipts/a.jpg,,");
        assert_eq!(results.len(), 1);
        match results[0].as_ref().unwrap() {
            LedgerAction::Capture(receipt) => {
                assert_eq!(receipt.payment, PaymentId::new(1));
                assert_eq!(receipt.driver, DriverId::new(7));
                assert_eq!(receipt.amount.value(), dec!(120.50));
                assert_eq!(receipt.receipt_ref.as_str(), "s3://receipts/a.jpg");
            }
            other => panic!("unexpected action {other:?}"),
        }
    }

    #[test]
    fn test_every_action_kind_parses() {
        let rows = "\
capture,1,10,7,55,120.50,r.jpg,,
confirm,1,,,,,,,
verify,1,,,,,,,looks genuine
reject,2,,,,,,,unreadable receipt
dispute,1,,,,,,,
resolve,1,,,,,,,
settle,,,7,,,,,
deposit,,,7,,500.00,,,
activate,,,7,,,,,
refund,,,7,,,,9,
forfeit,,,7,,,,9,kit lost";
        let results = parse(rows);
        assert_eq!(results.len(), 11);
        for result in &results {
            assert!(result.is_ok(), "row failed: {result:?}");
        }
        assert_eq!(
            *results[6].as_ref().unwrap(),
            LedgerAction::Settle {
                driver: DriverId::new(7)
            }
        );
        assert_eq!(
            *results[10].as_ref().unwrap(),
            LedgerAction::Forfeit {
                driver: DriverId::new(7),
                admin: AdminId::new(9),
                notes: Some("kit lost".to_string()),
            }
        );
    }

    #[test]
    fn test_missing_required_column_is_validation_error() {
        // Settle without a driver.
        let results = parse("settle,,,,,,,,");
        assert!(matches!(
            results[0],
            Err(LedgerError::ValidationError(_))
        ));

        // Capture without an amount.
        let results = parse("capture,1,10,7,55,,r.jpg,,");
        assert!(matches!(
            results[0],
            Err(LedgerError::ValidationError(_))
        ));
    }

    #[test]
    fn test_unknown_action_and_bad_number_do_not_stop_the_stream() {
        let rows = "\
teleport,1,,,,,,,
capture,1,10,abc,55,120.50,r.jpg,,
verify,1,,,,,,,";
        let results = parse(rows);
        assert_eq!(results.len(), 3);
        assert!(results[0].is_err());
        assert!(results[1].is_err());
        assert!(results[2].is_ok());
    }

    #[test]
    fn test_non_positive_amount_is_rejected() {
        let results = parse("capture,1,10,7,55,-5.00,r.jpg,,");
        assert!(matches!(
            results[0],
            Err(LedgerError::ValidationError(_))
        ));
    }
}
