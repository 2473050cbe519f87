use std::collections::BTreeMap;

use chrono::Utc;

use crate::domain::ids::DriverId;
use crate::domain::payment::PaymentRecord;
use crate::domain::ports::PaymentStoreRef;
use crate::domain::settlement::SettlementBatch;
use crate::error::{LedgerError, Result};

/// Groups verified-but-unsettled payments per driver and commits them as
/// atomic settlement batches.
///
/// Totals are a query-time fold over current records, never cached: the
/// reported total cannot drift from the ledger. Commits go through the
/// store's `settle_all`, which validates every member inside one write
/// section and writes all of them or nothing.
#[derive(Clone)]
pub struct SettlementAggregator {
    payments: PaymentStoreRef,
}

impl SettlementAggregator {
    pub fn new(payments: PaymentStoreRef) -> Self {
        Self { payments }
    }

    /// One batch per driver with at least one settleable payment, ordered
    /// by driver id with payment ids sorted within each batch. Pure read;
    /// repeated calls over an unchanged store return identical batches.
    pub async fn list_pending(&self) -> Result<Vec<SettlementBatch>> {
        let records = self.payments.settleable().await?;
        let mut by_driver: BTreeMap<DriverId, Vec<PaymentRecord>> = BTreeMap::new();
        for record in records {
            by_driver.entry(record.driver).or_default().push(record);
        }
        Ok(by_driver
            .into_iter()
            .map(|(driver, records)| SettlementBatch::from_records(driver, &records))
            .collect())
    }

    /// Settles everything the driver currently has pending.
    ///
    /// The batch is recomputed from the store at call time, not reused from
    /// an earlier listing, so a payment disputed since then simply drops
    /// out. Conflicts can still arise between this read and the commit;
    /// the store then fails the whole batch with `SettlementConflict` and
    /// writes nothing.
    pub async fn settle_driver(&self, driver: DriverId) -> Result<SettlementBatch> {
        let records = self.payments.settleable_for(driver).await?;
        let batch = SettlementBatch::from_records(driver, &records);
        self.commit(batch).await
    }

    /// Commits a batch previously obtained from [`Self::list_pending`].
    ///
    /// This is the review-then-commit path of the admin surface: every
    /// listed member must still be settleable at commit time. A member
    /// disputed (or otherwise moved) since the listing fails the whole
    /// call with `SettlementConflict` and no record is mutated.
    pub async fn settle_batch(&self, batch: SettlementBatch) -> Result<SettlementBatch> {
        self.commit(batch).await
    }

    async fn commit(&self, batch: SettlementBatch) -> Result<SettlementBatch> {
        if batch.is_empty() {
            return Err(LedgerError::NoPendingPayments(batch.driver));
        }
        let settled = self
            .payments
            .settle_all(batch.driver, &batch.payments, Utc::now())
            .await?;
        let committed = SettlementBatch::from_records(batch.driver, &settled);
        tracing::info!(
            driver = %committed.driver,
            payments = committed.len(),
            total = %committed.total,
            "settlement batch committed"
        );
        Ok(committed)
    }
}
