use chrono::Utc;

use crate::application::deposits::DepositManager;
use crate::application::intake::{PaymentIntake, PaymentReceipt};
use crate::application::settlement::SettlementAggregator;
use crate::application::verification::VerificationEngine;
use crate::config::LedgerConfig;
use crate::domain::ids::{AdminId, DriverId, PaymentId};
use crate::domain::money::Amount;
use crate::domain::ports::{DepositStoreRef, PaymentStoreRef};
use crate::domain::settlement::SettlementBatch;
use crate::error::Result;

/// One journal entry against the ledger: the command vocabulary shared by
/// the admin surface, the collaborators and the CSV replay binary.
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerAction {
    /// Order-capture collaborator delivers a receipt.
    Capture(PaymentReceipt),
    /// Customer confirms the charge on their side.
    Confirm { payment: PaymentId },
    Verify {
        payment: PaymentId,
        notes: Option<String>,
    },
    Reject {
        payment: PaymentId,
        reason: String,
    },
    Dispute { payment: PaymentId },
    Resolve { payment: PaymentId },
    /// Settle every pending payment of the driver.
    Settle { driver: DriverId },
    /// Onboarding opens a deposit; amount defaults from configuration.
    Deposit {
        driver: DriverId,
        amount: Option<Amount>,
    },
    Activate { driver: DriverId },
    Refund {
        driver: DriverId,
        admin: AdminId,
    },
    Forfeit {
        driver: DriverId,
        admin: AdminId,
        notes: Option<String>,
    },
}

/// Facade over the four ledger services sharing one store pair.
///
/// The services stay individually usable; the engine exists so callers
/// that speak the [`LedgerAction`] vocabulary (the CSV binary, tests) have
/// a single dispatch point.
pub struct LedgerEngine {
    intake: PaymentIntake,
    verification: VerificationEngine,
    settlements: SettlementAggregator,
    deposits: DepositManager,
}

impl LedgerEngine {
    pub fn new(
        payments: PaymentStoreRef,
        deposits: DepositStoreRef,
        config: LedgerConfig,
    ) -> Self {
        Self {
            intake: PaymentIntake::new(payments.clone()),
            verification: VerificationEngine::new(payments.clone()),
            settlements: SettlementAggregator::new(payments),
            deposits: DepositManager::new(deposits, config),
        }
    }

    /// Applies one journal action. Each action maps to exactly one service
    /// call; errors are the callee's and never mutate unrelated records.
    pub async fn apply(&self, action: LedgerAction) -> Result<()> {
        match action {
            LedgerAction::Capture(receipt) => {
                self.intake.capture(receipt).await?;
            }
            LedgerAction::Confirm { payment } => {
                self.intake.confirm_customer(payment).await?;
            }
            LedgerAction::Verify { payment, notes } => {
                self.verification.verify(payment, notes).await?;
            }
            LedgerAction::Reject { payment, reason } => {
                self.verification.reject(payment, &reason).await?;
            }
            LedgerAction::Dispute { payment } => {
                self.verification.dispute(payment).await?;
            }
            LedgerAction::Resolve { payment } => {
                self.verification.resolve(payment).await?;
            }
            LedgerAction::Settle { driver } => {
                self.settlements.settle_driver(driver).await?;
            }
            LedgerAction::Deposit { driver, amount } => {
                self.deposits.open(driver, amount).await?;
            }
            LedgerAction::Activate { driver } => {
                self.deposits.activate(driver, Utc::now()).await?;
            }
            LedgerAction::Refund { driver, admin } => {
                self.deposits.refund(driver, admin).await?;
            }
            LedgerAction::Forfeit {
                driver,
                admin,
                notes,
            } => {
                self.deposits.forfeit(driver, admin, notes).await?;
            }
        }
        Ok(())
    }

    pub async fn pending_settlements(&self) -> Result<Vec<SettlementBatch>> {
        self.settlements.list_pending().await
    }

    pub fn intake(&self) -> &PaymentIntake {
        &self.intake
    }

    pub fn verification(&self) -> &VerificationEngine {
        &self.verification
    }

    pub fn settlements(&self) -> &SettlementAggregator {
        &self.settlements
    }

    pub fn deposits(&self) -> &DepositManager {
        &self.deposits
    }
}
