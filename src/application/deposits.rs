use chrono::{DateTime, Utc};

use crate::config::LedgerConfig;
use crate::domain::deposit::DepositRecord;
use crate::domain::ids::{AdminId, DriverId};
use crate::domain::money::Amount;
use crate::domain::ports::DepositStoreRef;
use crate::error::{LedgerError, Result};

/// Admin-gated lifecycle of a driver's refundable security deposit.
///
/// A driver has at most one open (pending or active) deposit at a time;
/// the store enforces that on insert. Terminal records stay behind as
/// history, and a correction after refund or forfeiture means opening a
/// fresh deposit, never reviving a closed one.
#[derive(Clone)]
pub struct DepositManager {
    deposits: DepositStoreRef,
    config: LedgerConfig,
}

impl DepositManager {
    pub fn new(deposits: DepositStoreRef, config: LedgerConfig) -> Self {
        Self { deposits, config }
    }

    /// Onboarding entry point: opens a pending deposit for the driver.
    /// Falls back to the configured default when no amount is supplied.
    pub async fn open(&self, driver: DriverId, amount: Option<Amount>) -> Result<DepositRecord> {
        let amount = amount.unwrap_or(self.config.default_deposit_amount);
        let id = self.deposits.next_id().await?;
        let record = DepositRecord::new(id, driver, amount);
        self.deposits.insert(record.clone()).await?;
        tracing::info!(deposit = %id, driver = %driver, amount = %amount, "deposit opened");
        Ok(record)
    }

    /// Records that the driver paid the deposit in.
    pub async fn activate(
        &self,
        driver: DriverId,
        paid_date: DateTime<Utc>,
    ) -> Result<DepositRecord> {
        let open = self.require_open(driver).await?;
        self.deposits
            .update(open.id, Box::new(move |record| record.activate(paid_date)))
            .await
    }

    /// Returns the deposit to the driver. Terminal.
    pub async fn refund(&self, driver: DriverId, admin: AdminId) -> Result<DepositRecord> {
        let open = self.require_open(driver).await?;
        let record = self
            .deposits
            .update(
                open.id,
                Box::new(move |record| record.refund(admin, Utc::now())),
            )
            .await?;
        tracing::info!(deposit = %record.id, driver = %driver, admin = %admin, "deposit refunded");
        Ok(record)
    }

    /// Keeps the deposit for the platform. Terminal.
    pub async fn forfeit(
        &self,
        driver: DriverId,
        admin: AdminId,
        notes: Option<String>,
    ) -> Result<DepositRecord> {
        let open = self.require_open(driver).await?;
        let record = self
            .deposits
            .update(
                open.id,
                Box::new(move |record| record.forfeit(admin, notes)),
            )
            .await?;
        tracing::warn!(deposit = %record.id, driver = %driver, admin = %admin, "deposit forfeited");
        Ok(record)
    }

    /// The driver's open deposit, if any. Eligibility read used by
    /// external collaborators; a driver without an active deposit is not
    /// cleared to operate, but enforcing that is the caller's concern.
    pub async fn open_deposit(&self, driver: DriverId) -> Result<Option<DepositRecord>> {
        self.deposits.open_for_driver(driver).await
    }

    /// Every deposit ever opened for the driver, ordered by id.
    pub async fn history(&self, driver: DriverId) -> Result<Vec<DepositRecord>> {
        self.deposits.for_driver(driver).await
    }

    /// Deposit records are never deleted, so a driver whose only deposits
    /// are terminal is a state-precondition miss, not a missing entity.
    /// `NotFound` is reserved for drivers with no deposit record at all.
    async fn require_open(&self, driver: DriverId) -> Result<DepositRecord> {
        if let Some(open) = self.deposits.open_for_driver(driver).await? {
            return Ok(open);
        }
        let history = self.deposits.for_driver(driver).await?;
        if history.is_empty() {
            Err(LedgerError::NotFound(format!(
                "no deposit for driver {driver}"
            )))
        } else {
            Err(LedgerError::InvalidStateTransition(format!(
                "driver {driver} has only terminal deposits"
            )))
        }
    }
}
