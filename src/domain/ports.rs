use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::domain::deposit::DepositRecord;
use crate::domain::ids::{DepositId, DriverId, PaymentId};
use crate::domain::payment::PaymentRecord;
use crate::error::Result;

/// Transition closure applied to a stored payment under the store's lock.
pub type PaymentUpdate = Box<dyn FnOnce(&mut PaymentRecord) -> Result<()> + Send>;

/// Transition closure applied to a stored deposit under the store's lock.
pub type DepositUpdate = Box<dyn FnOnce(&mut DepositRecord) -> Result<()> + Send>;

/// Several services share one store, so the aliases are `Arc`, not `Box`.
pub type PaymentStoreRef = Arc<dyn PaymentStore>;
pub type DepositStoreRef = Arc<dyn DepositStore>;

/// Durable store of payment records, keyed by [`PaymentId`] with the
/// driver-indexed read used by settlement aggregation.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Inserts a new record. Fails `ValidationError` if the id exists.
    async fn insert(&self, record: PaymentRecord) -> Result<()>;

    async fn get(&self, id: PaymentId) -> Result<Option<PaymentRecord>>;

    /// Runs `apply` against the stored record inside the store's write
    /// section and persists the result, making each transition
    /// linearizable: of two concurrent identical transitions exactly one
    /// can succeed. Fails `NotFound` for unknown ids; an error from
    /// `apply` leaves the record untouched.
    async fn update(&self, id: PaymentId, apply: PaymentUpdate) -> Result<PaymentRecord>;

    /// Every verified, unsettled record, across all drivers.
    async fn settleable(&self) -> Result<Vec<PaymentRecord>>;

    /// The verified, unsettled records of one driver.
    async fn settleable_for(&self, driver: DriverId) -> Result<Vec<PaymentRecord>>;

    /// Atomically settles a batch with one shared `settled_at`: every
    /// listed payment must belong to `driver` and still be settleable at
    /// commit time, otherwise the whole call fails `SettlementConflict`
    /// and no record is written.
    async fn settle_all(
        &self,
        driver: DriverId,
        ids: &[PaymentId],
        settled_at: DateTime<Utc>,
    ) -> Result<Vec<PaymentRecord>>;
}

/// Durable store of deposit records. Enforces the single-open-deposit
/// invariant at the storage boundary.
#[async_trait]
pub trait DepositStore: Send + Sync {
    /// Allocates the next deposit id; ids stay unique for the lifetime of
    /// the store, including across reopen for persistent backends.
    async fn next_id(&self) -> Result<DepositId>;

    /// Inserts a new record. Fails `ValidationError` if the id exists or
    /// the driver already has an open (pending or active) deposit.
    async fn insert(&self, record: DepositRecord) -> Result<()>;

    async fn get(&self, id: DepositId) -> Result<Option<DepositRecord>>;

    /// The driver's open deposit, if any.
    async fn open_for_driver(&self, driver: DriverId) -> Result<Option<DepositRecord>>;

    /// Full deposit history for the driver, ordered by id.
    async fn for_driver(&self, driver: DriverId) -> Result<Vec<DepositRecord>>;

    /// Same contract as [`PaymentStore::update`].
    async fn update(&self, id: DepositId, apply: DepositUpdate) -> Result<DepositRecord>;
}
