use crate::domain::ids::{CustomerId, DriverId, OrderId, PaymentId, ReceiptRef};
use crate::domain::money::Amount;
use crate::domain::payment::PaymentRecord;
use crate::domain::ports::PaymentStoreRef;
use crate::error::Result;

/// Capture payload supplied by the order-capture collaborator.
///
/// The ledger trusts `amount` to equal the order's due amount; checking
/// that is the collaborator's job. `Amount` only guarantees positivity.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentReceipt {
    pub payment: PaymentId,
    pub order: OrderId,
    pub driver: DriverId,
    pub customer: CustomerId,
    pub amount: Amount,
    pub receipt_ref: ReceiptRef,
}

/// Collaborator-facing entry points: receipt capture and customer
/// confirmation. Neither belongs to the admin surface and neither touches
/// the verification or settlement state machines beyond creating records
/// in their initial states.
#[derive(Clone)]
pub struct PaymentIntake {
    payments: PaymentStoreRef,
}

impl PaymentIntake {
    pub fn new(payments: PaymentStoreRef) -> Self {
        Self { payments }
    }

    /// Creates the payment record in `Unverified`/`Unsettled`.
    ///
    /// Fails `ValidationError` when the collaborator re-sends an id the
    /// ledger already holds.
    pub async fn capture(&self, receipt: PaymentReceipt) -> Result<PaymentRecord> {
        let record = PaymentRecord::new(
            receipt.payment,
            receipt.order,
            receipt.driver,
            receipt.customer,
            receipt.amount,
            receipt.receipt_ref,
        );
        self.payments.insert(record.clone()).await?;
        tracing::debug!(payment = %record.id, driver = %record.driver, amount = %record.amount, "receipt captured");
        Ok(record)
    }

    /// Flips `customer_confirmed`. Idempotent; independent of both state
    /// axes.
    pub async fn confirm_customer(&self, id: PaymentId) -> Result<PaymentRecord> {
        self.payments
            .update(
                id,
                Box::new(|record| {
                    record.confirm();
                    Ok(())
                }),
            )
            .await
    }
}
