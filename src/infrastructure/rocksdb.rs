use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rocksdb::{ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;

use crate::domain::deposit::DepositRecord;
use crate::domain::ids::{DepositId, DriverId, PaymentId};
use crate::domain::payment::PaymentRecord;
use crate::domain::ports::{DepositStore, DepositUpdate, PaymentStore, PaymentUpdate};
use crate::error::{LedgerError, Result};

/// Column family for payment records.
pub const CF_PAYMENTS: &str = "payments";
/// Column family for deposit records.
pub const CF_DEPOSITS: &str = "deposits";
/// Column family for store metadata (the deposit id sequence).
pub const CF_META: &str = "meta";

const DEPOSIT_SEQ_KEY: &[u8] = b"deposit_seq";

/// Persistent store backed by RocksDB.
///
/// Both record types live in one database under separate column families,
/// keyed by their big-endian id with `serde_json` values. `Clone` shares
/// the underlying `Arc<DB>`.
///
/// Reads go straight to the database; every mutation serializes through
/// the writer mutex so read-modify-write transitions are linearizable and
/// `settle_all` can validate the whole batch before committing it in one
/// `WriteBatch`.
#[derive(Clone)]
pub struct RocksDbStore {
    db: Arc<DB>,
    writer: Arc<Mutex<()>>,
}

impl RocksDbStore {
    /// Opens or creates the database at `path`, ensuring the required
    /// column families exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cfs = vec![
            ColumnFamilyDescriptor::new(CF_PAYMENTS, Options::default()),
            ColumnFamilyDescriptor::new(CF_DEPOSITS, Options::default()),
            ColumnFamilyDescriptor::new(CF_META, Options::default()),
        ];
        let db = DB::open_cf_descriptors(&opts, path, cfs)?;

        Ok(Self {
            db: Arc::new(db),
            writer: Arc::new(Mutex::new(())),
        })
    }

    fn handle(&self, name: &'static str) -> Result<&rocksdb::ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            LedgerError::InternalError(Box::new(std::io::Error::other(format!(
                "column family '{name}' not found"
            ))))
        })
    }

    fn read_payment(&self, id: PaymentId) -> Result<Option<PaymentRecord>> {
        let cf = self.handle(CF_PAYMENTS)?;
        match self.db.get_cf(cf, id.value().to_be_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn read_deposit(&self, id: DepositId) -> Result<Option<DepositRecord>> {
        let cf = self.handle(CF_DEPOSITS)?;
        match self.db.get_cf(cf, id.value().to_be_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn write_payment(&self, record: &PaymentRecord) -> Result<()> {
        let cf = self.handle(CF_PAYMENTS)?;
        self.db
            .put_cf(cf, record.id.value().to_be_bytes(), encode(record)?)?;
        Ok(())
    }

    fn write_deposit(&self, record: &DepositRecord) -> Result<()> {
        let cf = self.handle(CF_DEPOSITS)?;
        self.db
            .put_cf(cf, record.id.value().to_be_bytes(), encode(record)?)?;
        Ok(())
    }

    fn scan_payments(&self, mut keep: impl FnMut(&PaymentRecord) -> bool) -> Result<Vec<PaymentRecord>> {
        let cf = self.handle(CF_PAYMENTS)?;
        let mut records = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            let record: PaymentRecord = decode(&value)?;
            if keep(&record) {
                records.push(record);
            }
        }
        // Big-endian keys iterate in id order already; sorting keeps the
        // contract independent of the key encoding.
        records.sort_by_key(|r| r.id);
        Ok(records)
    }

    fn scan_deposits(&self, mut keep: impl FnMut(&DepositRecord) -> bool) -> Result<Vec<DepositRecord>> {
        let cf = self.handle(CF_DEPOSITS)?;
        let mut records = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            let record: DepositRecord = decode(&value)?;
            if keep(&record) {
                records.push(record);
            }
        }
        records.sort_by_key(|r| r.id);
        Ok(records)
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| LedgerError::InternalError(Box::new(e)))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| LedgerError::InternalError(Box::new(e)))
}

#[async_trait]
impl PaymentStore for RocksDbStore {
    async fn insert(&self, record: PaymentRecord) -> Result<()> {
        let _guard = self.writer.lock().await;
        if self.read_payment(record.id)?.is_some() {
            return Err(LedgerError::ValidationError(format!(
                "payment {} already exists",
                record.id
            )));
        }
        self.write_payment(&record)
    }

    async fn get(&self, id: PaymentId) -> Result<Option<PaymentRecord>> {
        self.read_payment(id)
    }

    async fn update(&self, id: PaymentId, apply: PaymentUpdate) -> Result<PaymentRecord> {
        let _guard = self.writer.lock().await;
        let mut record = self
            .read_payment(id)?
            .ok_or_else(|| LedgerError::NotFound(format!("payment {id}")))?;
        apply(&mut record)?;
        self.write_payment(&record)?;
        Ok(record)
    }

    async fn settleable(&self) -> Result<Vec<PaymentRecord>> {
        self.scan_payments(|r| r.is_settleable())
    }

    async fn settleable_for(&self, driver: DriverId) -> Result<Vec<PaymentRecord>> {
        self.scan_payments(|r| r.driver == driver && r.is_settleable())
    }

    async fn settle_all(
        &self,
        driver: DriverId,
        ids: &[PaymentId],
        settled_at: DateTime<Utc>,
    ) -> Result<Vec<PaymentRecord>> {
        let _guard = self.writer.lock().await;

        // Validate the whole batch under the writer lock, then commit it
        // through a single WriteBatch.
        let mut staged = Vec::with_capacity(ids.len());
        for id in ids {
            let record = self.read_payment(*id)?.ok_or_else(|| {
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
            let mut updated = record;
            updated.settle(settled_at)?;
            staged.push(updated);
        }

        let cf = self.handle(CF_PAYMENTS)?;
        let mut batch = WriteBatch::default();
        for record in &staged {
            batch.put_cf(cf, record.id.value().to_be_bytes(), encode(record)?);
        }
        self.db.write(batch)?;
        Ok(staged)
    }
}

#[async_trait]
impl DepositStore for RocksDbStore {
    async fn next_id(&self) -> Result<DepositId> {
        let _guard = self.writer.lock().await;
        let cf = self.handle(CF_META)?;
        let current = match self.db.get_cf(cf, DEPOSIT_SEQ_KEY)? {
            Some(bytes) => {
                let raw: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
                    LedgerError::InternalError(Box::new(std::io::Error::other(
                        "corrupt deposit sequence",
                    )))
                })?;
                u64::from_be_bytes(raw)
            }
            None => 0,
        };
        let next = current + 1;
        self.db.put_cf(cf, DEPOSIT_SEQ_KEY, next.to_be_bytes())?;
        Ok(DepositId::new(next))
    }

    async fn insert(&self, record: DepositRecord) -> Result<()> {
        let _guard = self.writer.lock().await;
        if self.read_deposit(record.id)?.is_some() {
            return Err(LedgerError::ValidationError(format!(
                "deposit {} already exists",
                record.id
            )));
        }
        let open = self.scan_deposits(|r| r.driver == record.driver && r.is_open())?;
        if !open.is_empty() {
            return Err(LedgerError::ValidationError(format!(
                "driver {} already has an open deposit",
                record.driver
            )));
        }
        self.write_deposit(&record)
    }

    async fn get(&self, id: DepositId) -> Result<Option<DepositRecord>> {
        self.read_deposit(id)
    }

    async fn open_for_driver(&self, driver: DriverId) -> Result<Option<DepositRecord>> {
        let open = self.scan_deposits(|r| r.driver == driver && r.is_open())?;
        Ok(open.into_iter().next())
    }

    async fn for_driver(&self, driver: DriverId) -> Result<Vec<DepositRecord>> {
        self.scan_deposits(|r| r.driver == driver)
    }

    async fn update(&self, id: DepositId, apply: DepositUpdate) -> Result<DepositRecord> {
        let _guard = self.writer.lock().await;
        let mut record = self
            .read_deposit(id)?
            .ok_or_else(|| LedgerError::NotFound(format!("deposit {id}")))?;
        apply(&mut record)?;
        self.write_deposit(&record)?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::{AdminId, CustomerId, OrderId, ReceiptRef};
    use crate::domain::money::Amount;
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    fn payment(id: u64, driver: u64) -> PaymentRecord {
        PaymentRecord::new(
            PaymentId::new(id),
            OrderId::new(id),
            DriverId::new(driver),
            CustomerId::new(1),
            Amount::new(dec!(100.00)).unwrap(),
            ReceiptRef::new("s3://receipts/r.jpg"),
        )
    }

    #[tokio::test]
    async fn test_open_creates_column_families() {
        let dir = tempdir().unwrap();
        let store = RocksDbStore::open(dir.path()).expect("failed to open RocksDB");
        assert!(store.db.cf_handle(CF_PAYMENTS).is_some());
        assert!(store.db.cf_handle(CF_DEPOSITS).is_some());
        assert!(store.db.cf_handle(CF_META).is_some());
    }

    #[tokio::test]
    async fn test_payment_round_trip_and_update() {
        let dir = tempdir().unwrap();
        let store = RocksDbStore::open(dir.path()).unwrap();

        PaymentStore::insert(&store, payment(1, 7)).await.unwrap();
        let retrieved = PaymentStore::get(&store, PaymentId::new(1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(retrieved.id, PaymentId::new(1));

        let updated = PaymentStore::update(&store, PaymentId::new(1), Box::new(|r| r.verify(None)))
            .await
            .unwrap();
        assert!(updated.is_settleable());

        let settleable = store.settleable_for(DriverId::new(7)).await.unwrap();
        assert_eq!(settleable.len(), 1);
    }

    #[tokio::test]
    async fn test_settle_all_conflict_writes_nothing() {
        let dir = tempdir().unwrap();
        let store = RocksDbStore::open(dir.path()).unwrap();

        for id in [1, 2] {
            PaymentStore::insert(&store, payment(id, 7)).await.unwrap();
            PaymentStore::update(&store, PaymentId::new(id), Box::new(|r| r.verify(None)))
                .await
                .unwrap();
        }
        PaymentStore::update(&store, PaymentId::new(2), Box::new(|r| r.dispute()))
            .await
            .unwrap();

        let err = store
            .settle_all(
                DriverId::new(7),
                &[PaymentId::new(1), PaymentId::new(2)],
                Utc::now(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::SettlementConflict(_)));

        let first = PaymentStore::get(&store, PaymentId::new(1))
            .await
            .unwrap()
            .unwrap();
        assert!(first.settled_at.is_none());
    }

    #[tokio::test]
    async fn test_deposit_sequence_survives_reopen() {
        let dir = tempdir().unwrap();

        let first_id;
        {
            let store = RocksDbStore::open(dir.path()).unwrap();
            first_id = store.next_id().await.unwrap();
            let record = DepositRecord::new(
                first_id,
                DriverId::new(1),
                Amount::new(dec!(500.00)).unwrap(),
            );
            DepositStore::insert(&store, record).await.unwrap();
        }

        let store = RocksDbStore::open(dir.path()).unwrap();
        let second_id = store.next_id().await.unwrap();
        assert!(second_id > first_id);

        // The first deposit is still there and still counts as open.
        let open = store.open_for_driver(DriverId::new(1)).await.unwrap();
        assert_eq!(open.unwrap().id, first_id);
    }

    #[tokio::test]
    async fn test_deposit_lifecycle_round_trip() {
        let dir = tempdir().unwrap();
        let store = RocksDbStore::open(dir.path()).unwrap();

        let id = store.next_id().await.unwrap();
        let record = DepositRecord::new(id, DriverId::new(3), Amount::new(dec!(500.00)).unwrap());
        DepositStore::insert(&store, record).await.unwrap();

        DepositStore::update(
            &store,
            id,
            Box::new(|d| {
                d.activate(Utc::now())?;
                d.refund(AdminId::new(9), Utc::now())
            }),
        )
        .await
        .unwrap();

        assert!(store.open_for_driver(DriverId::new(3)).await.unwrap().is_none());
        let history = store.for_driver(DriverId::new(3)).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].refunded_by, Some(AdminId::new(9)));
    }
}
