use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::ids::{AdminId, DepositId, DriverId};
use crate::domain::money::Amount;
use crate::error::LedgerError;

/// One-way deposit lifecycle. `Pending → Active` is the only entry to
/// `Active`; `Refunded` and `Forfeited` are terminal and only reachable
/// from `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DepositStatus {
    #[default]
    Pending,
    Active,
    Refunded,
    Forfeited,
}

/// A driver's refundable security deposit.
///
/// At most one deposit per driver may be open (`Pending` or `Active`) at a
/// time; terminal records accumulate as history and are never deleted.
/// Corrections after a terminal transition go through a fresh record, never
/// by mutating a closed one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepositRecord {
    pub id: DepositId,
    pub driver: DriverId,
    pub amount: Amount,
    pub status: DepositStatus,
    /// Set on `Pending → Active`.
    pub paid_date: Option<DateTime<Utc>>,
    /// Set on `Active → Refunded`.
    pub refund_date: Option<DateTime<Utc>>,
    /// The admin who authorized the refund or forfeiture.
    pub refunded_by: Option<AdminId>,
    pub notes: Option<String>,
}

impl DepositRecord {
    pub fn new(id: DepositId, driver: DriverId, amount: Amount) -> Self {
        Self {
            id,
            driver,
            amount,
            status: DepositStatus::default(),
            paid_date: None,
            refund_date: None,
            refunded_by: None,
            notes: None,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.status, DepositStatus::Pending | DepositStatus::Active)
    }

    /// Records that the driver paid the deposit in.
    pub fn activate(&mut self, paid_date: DateTime<Utc>) -> Result<(), LedgerError> {
        if self.status != DepositStatus::Pending {
            return Err(LedgerError::InvalidStateTransition(format!(
                "deposit {} cannot be activated from {:?}",
                self.id, self.status
            )));
        }
        self.status = DepositStatus::Active;
        self.paid_date = Some(paid_date);
        Ok(())
    }

    /// Returns the deposit to the driver. Terminal.
    pub fn refund(&mut self, admin: AdminId, at: DateTime<Utc>) -> Result<(), LedgerError> {
        if self.status != DepositStatus::Active {
            return Err(LedgerError::InvalidStateTransition(format!(
                "deposit {} cannot be refunded from {:?}",
                self.id, self.status
            )));
        }
        self.status = DepositStatus::Refunded;
        self.refund_date = Some(at);
        self.refunded_by = Some(admin);
        Ok(())
    }

    /// Keeps the deposit for the platform. Terminal.
    pub fn forfeit(&mut self, admin: AdminId, notes: Option<String>) -> Result<(), LedgerError> {
        if self.status != DepositStatus::Active {
            return Err(LedgerError::InvalidStateTransition(format!(
                "deposit {} cannot be forfeited from {:?}",
                self.id, self.status
            )));
        }
        self.status = DepositStatus::Forfeited;
        self.refunded_by = Some(admin);
        if notes.is_some() {
            self.notes = notes;
        }
        Ok(())
    }
}
