use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::domain::deposit::DepositRecord;
use crate::domain::ids::{DepositId, DriverId, PaymentId};
use crate::domain::payment::PaymentRecord;
use crate::domain::ports::{DepositStore, DepositUpdate, PaymentStore, PaymentUpdate};
use crate::error::{LedgerError, Result};

/// Thread-safe in-memory payment store.
///
/// `Arc<RwLock<HashMap<..>>>` for shared concurrent access; transitions and
/// batch settlement run inside one write-lock scope, which is what makes
/// them linearizable and all-or-nothing.
#[derive(Default, Clone)]
pub struct InMemoryPaymentStore {
    records: Arc<RwLock<HashMap<PaymentId, PaymentRecord>>>,
}

impl InMemoryPaymentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn insert(&self, record: PaymentRecord) -> Result<()> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.id) {
            return Err(LedgerError::ValidationError(format!(
                "payment {} already exists",
                record.id
            )));
        }
        records.insert(record.id, record);
        Ok(())
    }

    async fn get(&self, id: PaymentId) -> Result<Option<PaymentRecord>> {
        let records = self.records.read().await;
        Ok(records.get(&id).cloned())
    }

    async fn update(&self, id: PaymentId, apply: PaymentUpdate) -> Result<PaymentRecord> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(&id)
            .ok_or_else(|| LedgerError::NotFound(format!("payment {id}")))?;
        // Apply to a copy so a failed transition leaves the record untouched.
        let mut updated = record.clone();
        apply(&mut updated)?;
        *record = updated.clone();
        Ok(updated)
    }

    async fn settleable(&self) -> Result<Vec<PaymentRecord>> {
        let records = self.records.read().await;
        let mut settleable: Vec<PaymentRecord> = records
            .values()
            .filter(|r| r.is_settleable())
            .cloned()
            .collect();
        settleable.sort_by_key(|r| r.id);
        Ok(settleable)
    }

    async fn settleable_for(&self, driver: DriverId) -> Result<Vec<PaymentRecord>> {
        let records = self.records.read().await;
        let mut settleable: Vec<PaymentRecord> = records
            .values()
            .filter(|r| r.driver == driver && r.is_settleable())
            .cloned()
            .collect();
        settleable.sort_by_key(|r| r.id);
        Ok(settleable)
    }

    async fn settle_all(
        &self,
        driver: DriverId,
        ids: &[PaymentId],
        settled_at: DateTime<Utc>,
    ) -> Result<Vec<PaymentRecord>> {
        let mut records = self.records.write().await;

        // Validate the whole batch before writing any of it.
        let mut staged = Vec::with_capacity(ids.len());
        for id in ids {
            let record = records.get(id).ok_or_else(|| {
                LedgerError::SettlementConflict(format!("payment {id} is not in the store"))
            })?;
            if record.driver != driver {
                return Err(LedgerError::SettlementConflict(format!(
                    "payment {id} does not belong to driver {driver}"
                )));
            }
            if !record.is_settleable() {
                return Err(LedgerError::SettlementConflict(format!(
                    "payment {id} is no longer settleable"
                )));
            }
            let mut updated = record.clone();
            updated.settle(settled_at)?;
            staged.push(updated);
        }

        for record in &staged {
            records.insert(record.id, record.clone());
        }
        Ok(staged)
    }
}

/// Thread-safe in-memory deposit store with a monotone id sequence.
#[derive(Default, Clone)]
pub struct InMemoryDepositStore {
    records: Arc<RwLock<HashMap<DepositId, DepositRecord>>>,
    sequence: Arc<AtomicU64>,
}

impl InMemoryDepositStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DepositStore for InMemoryDepositStore {
    async fn next_id(&self) -> Result<DepositId> {
        Ok(DepositId::new(self.sequence.fetch_add(1, Ordering::SeqCst) + 1))
    }

    async fn insert(&self, record: DepositRecord) -> Result<()> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.id) {
            return Err(LedgerError::ValidationError(format!(
                "deposit {} already exists",
                record.id
            )));
        }
        if records.values().any(|r| r.driver == record.driver && r.is_open()) {
            return Err(LedgerError::ValidationError(format!(
                "driver {} already has an open deposit",
                record.driver
            )));
        }
        records.insert(record.id, record);
        Ok(())
    }

    async fn get(&self, id: DepositId) -> Result<Option<DepositRecord>> {
        let records = self.records.read().await;
        Ok(records.get(&id).cloned())
    }

    async fn open_for_driver(&self, driver: DriverId) -> Result<Option<DepositRecord>> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .find(|r| r.driver == driver && r.is_open())
            .cloned())
    }

    async fn for_driver(&self, driver: DriverId) -> Result<Vec<DepositRecord>> {
        let records = self.records.read().await;
        let mut history: Vec<DepositRecord> = records
            .values()
            .filter(|r| r.driver == driver)
            .cloned()
            .collect();
        history.sort_by_key(|r| r.id);
        Ok(history)
    }

    async fn update(&self, id: DepositId, apply: DepositUpdate) -> Result<DepositRecord> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(&id)
            .ok_or_else(|| LedgerError::NotFound(format!("deposit {id}")))?;
        let mut updated = record.clone();
        apply(&mut updated)?;
        *record = updated.clone();
        Ok(updated)
    }
}
