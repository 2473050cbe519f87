use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::ids::{DriverId, PaymentId};
use crate::domain::payment::PaymentRecord;

/// One driver's settleable payments and their summed amount.
///
/// Derived at query time from the store, never persisted: keeping the total
/// a fold over current records means the ledger and the reported total can
/// never drift apart. Payment ids are sorted so repeated listings of an
/// unchanged store compare equal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SettlementBatch {
    pub driver: DriverId,
    pub payments: Vec<PaymentId>,
    pub total: Decimal,
}

impl SettlementBatch {
    pub fn from_records(driver: DriverId, records: &[PaymentRecord]) -> Self {
        let mut payments: Vec<PaymentId> = records.iter().map(|r| r.id).collect();
        payments.sort();
        let total = records.iter().map(|r| r.amount.value()).sum();
        Self {
            driver,
            payments,
            total,
        }
    }

    pub fn len(&self) -> usize {
        self.payments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payments.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::{CustomerId, OrderId, ReceiptRef};
    use crate::domain::money::Amount;
    use rust_decimal_macros::dec;

    fn record(id: u64, amount: Decimal) -> PaymentRecord {
        PaymentRecord::new(
            PaymentId::new(id),
            OrderId::new(id),
            DriverId::new(7),
            CustomerId::new(1),
            Amount::new(amount).unwrap(),
            ReceiptRef::new("r"),
        )
    }

    #[test]
    fn test_batch_sums_and_sorts() {
        let records = vec![record(3, dec!(25000)), record(1, dec!(10000))];
        let batch = SettlementBatch::from_records(DriverId::new(7), &records);
        assert_eq!(batch.total, dec!(35000));
        assert_eq!(batch.payments, vec![PaymentId::new(1), PaymentId::new(3)]);
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn test_empty_batch() {
        let batch = SettlementBatch::from_records(DriverId::new(7), &[]);
        assert!(batch.is_empty());
        assert_eq!(batch.total, Decimal::ZERO);
    }
}
