use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::ids::{CustomerId, DriverId, OrderId, PaymentId, ReceiptRef};
use crate::domain::money::Amount;
use crate::error::LedgerError;

/// Admin confirmation axis: has the receipt been checked against the order?
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationState {
    #[default]
    Unverified,
    Verified,
    Rejected,
}

/// Payout axis: has the receipt been reconciled into a settlement batch?
///
/// Kept separate from [`VerificationState`] so a payment can be disputed
/// before or after verification without multiplying combined states; every
/// transition precondition stays a single-field check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettlementState {
    #[default]
    Unsettled,
    Settled,
    Disputed,
}

/// One card-payment receipt collected by a driver on behalf of the platform.
///
/// Created by the order-capture collaborator, mutated only through the
/// transition methods below, and never deleted (retained for audit).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: PaymentId,
    pub order: OrderId,
    pub driver: DriverId,
    pub customer: CustomerId,
    /// Immutable after creation; equals the order's due amount as supplied
    /// by the capture collaborator.
    pub amount: Amount,
    pub receipt_ref: ReceiptRef,
    pub verification: VerificationState,
    pub settlement: SettlementState,
    /// Customer-facing confirmation flag, independent of both state axes.
    pub customer_confirmed: bool,
    pub verification_notes: Option<String>,
    /// Present iff `verification == Rejected`.
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Set iff `settlement == Settled`.
    pub settled_at: Option<DateTime<Utc>>,
}

impl PaymentRecord {
    pub fn new(
        id: PaymentId,
        order: OrderId,
        driver: DriverId,
        customer: CustomerId,
        amount: Amount,
        receipt_ref: ReceiptRef,
    ) -> Self {
        Self {
            id,
            order,
            driver,
            customer,
            amount,
            receipt_ref,
            verification: VerificationState::default(),
            settlement: SettlementState::default(),
            customer_confirmed: false,
            verification_notes: None,
            rejection_reason: None,
            created_at: Utc::now(),
            settled_at: None,
        }
    }

    /// Marks the receipt as verified by an admin.
    pub fn verify(&mut self, notes: Option<String>) -> Result<(), LedgerError> {
        if self.verification != VerificationState::Unverified {
            return Err(LedgerError::InvalidStateTransition(format!(
                "payment {} cannot be verified from {:?}",
                self.id, self.verification
            )));
        }
        self.verification = VerificationState::Verified;
        self.verification_notes = notes;
        Ok(())
    }

    /// Marks the receipt as rejected, recording why.
    pub fn reject(&mut self, reason: &str) -> Result<(), LedgerError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(LedgerError::ValidationError(
                "rejection reason must not be empty".to_string(),
            ));
        }
        if self.verification != VerificationState::Unverified {
            return Err(LedgerError::InvalidStateTransition(format!(
                "payment {} cannot be rejected from {:?}",
                self.id, self.verification
            )));
        }
        self.verification = VerificationState::Rejected;
        self.rejection_reason = Some(reason.to_string());
        Ok(())
    }

    /// Freezes the payment pending manual reconciliation. Applies to any
    /// unsettled record regardless of verification state; a settled record
    /// can no longer be disputed through the ledger.
    pub fn dispute(&mut self) -> Result<(), LedgerError> {
        if self.settlement != SettlementState::Unsettled {
            return Err(LedgerError::InvalidStateTransition(format!(
                "payment {} cannot be disputed from {:?}",
                self.id, self.settlement
            )));
        }
        self.settlement = SettlementState::Disputed;
        Ok(())
    }

    /// Admin dispute-resolution reset: returns a disputed payment to the
    /// unsettled pool without touching the verification axis.
    pub fn resolve(&mut self) -> Result<(), LedgerError> {
        if self.settlement != SettlementState::Disputed {
            return Err(LedgerError::InvalidStateTransition(format!(
                "payment {} cannot be resolved from {:?}",
                self.id, self.settlement
            )));
        }
        self.settlement = SettlementState::Unsettled;
        Ok(())
    }

    /// Moves the payment into a settlement batch. Only verified, unsettled
    /// records may settle; the whole batch shares one `settled_at`.
    pub fn settle(&mut self, at: DateTime<Utc>) -> Result<(), LedgerError> {
        if !self.is_settleable() {
            return Err(LedgerError::InvalidStateTransition(format!(
                "payment {} is not settleable ({:?}/{:?})",
                self.id, self.verification, self.settlement
            )));
        }
        self.settlement = SettlementState::Settled;
        self.settled_at = Some(at);
        Ok(())
    }

    /// Customer confirmation is idempotent and independent of both state
    /// machines.
    pub fn confirm(&mut self) {
        self.customer_confirmed = true;
    }

    pub fn is_settleable(&self) -> bool {
        self.verification == VerificationState::Verified
            && self.settlement == SettlementState::Unsettled
    }
}
