use crate::domain::ids::PaymentId;
use crate::domain::payment::PaymentRecord;
use crate::domain::ports::PaymentStoreRef;
use crate::error::{LedgerError, Result};

/// Admin-facing transitions on the verification and dispute axes.
///
/// Every call runs as one read-modify-write inside the store's write
/// section, so per-record transitions are linearizable: of two concurrent
/// identical calls exactly one succeeds and the other surfaces
/// `InvalidStateTransition`. A blind retry is therefore safe but never
/// silently a no-op.
#[derive(Clone)]
pub struct VerificationEngine {
    payments: PaymentStoreRef,
}

impl VerificationEngine {
    pub fn new(payments: PaymentStoreRef) -> Self {
        Self { payments }
    }

    /// Confirms the receipt is genuine and matches the order.
    pub async fn verify(&self, id: PaymentId, notes: Option<String>) -> Result<PaymentRecord> {
        let record = self
            .payments
            .update(id, Box::new(move |record| record.verify(notes)))
            .await?;
        tracing::info!(payment = %id, "receipt verified");
        Ok(record)
    }

    /// Rejects the receipt, recording why.
    pub async fn reject(&self, id: PaymentId, reason: &str) -> Result<PaymentRecord> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(LedgerError::ValidationError(
                "rejection reason must not be empty".to_string(),
            ));
        }
        let reason = reason.to_string();
        let record = self
            .payments
            .update(id, Box::new(move |record| record.reject(&reason)))
            .await?;
        tracing::info!(payment = %id, "receipt rejected");
        Ok(record)
    }

    /// Freezes the payment pending manual reconciliation, blocking it from
    /// any settlement batch.
    pub async fn dispute(&self, id: PaymentId) -> Result<PaymentRecord> {
        let record = self
            .payments
            .update(id, Box::new(|record| record.dispute()))
            .await?;
        tracing::warn!(payment = %id, "payment disputed");
        Ok(record)
    }

    /// Resolves a dispute, returning the payment to the unsettled pool.
    pub async fn resolve(&self, id: PaymentId) -> Result<PaymentRecord> {
        let record = self
            .payments
            .update(id, Box::new(|record| record.resolve()))
            .await?;
        tracing::info!(payment = %id, "dispute resolved");
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::intake::{PaymentIntake, PaymentReceipt};
    use crate::domain::ids::{CustomerId, DriverId, OrderId, ReceiptRef};
    use crate::domain::money::Amount;
    use crate::domain::payment::{SettlementState, VerificationState};
    use crate::infrastructure::in_memory::InMemoryPaymentStore;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    async fn engine_with_payment(id: u64) -> VerificationEngine {
        let store: PaymentStoreRef = Arc::new(InMemoryPaymentStore::new());
        let intake = PaymentIntake::new(store.clone());
        intake
            .capture(PaymentReceipt {
                payment: PaymentId::new(id),
                order: OrderId::new(id),
                driver: DriverId::new(1),
                customer: CustomerId::new(1),
                amount: Amount::new(dec!(100.00)).unwrap(),
                receipt_ref: ReceiptRef::new("r"),
            })
            .await
            .unwrap();
        VerificationEngine::new(store)
    }

    #[tokio::test]
    async fn test_verify_transitions_record() {
        let engine = engine_with_payment(1).await;
        let record = engine
            .verify(PaymentId::new(1), Some("ok".to_string()))
            .await
            .unwrap();
        assert_eq!(record.verification, VerificationState::Verified);
        assert_eq!(record.verification_notes.as_deref(), Some("ok"));
    }

    #[tokio::test]
    async fn test_double_verify_fails() {
        let engine = engine_with_payment(1).await;
        engine.verify(PaymentId::new(1), None).await.unwrap();
        let err = engine.verify(PaymentId::new(1), None).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidStateTransition(_)));
    }

    #[tokio::test]
    async fn test_reject_empty_reason_fails_before_store() {
        let engine = engine_with_payment(1).await;
        let err = engine.reject(PaymentId::new(1), "   ").await.unwrap_err();
        assert!(matches!(err, LedgerError::ValidationError(_)));

        // Also for ids the store has never seen: validation precedes lookup.
        let err = engine.reject(PaymentId::new(99), "").await.unwrap_err();
        assert!(matches!(err, LedgerError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_dispute_and_resolve_round_trip() {
        let engine = engine_with_payment(1).await;
        let disputed = engine.dispute(PaymentId::new(1)).await.unwrap();
        assert_eq!(disputed.settlement, SettlementState::Disputed);

        let resolved = engine.resolve(PaymentId::new(1)).await.unwrap();
        assert_eq!(resolved.settlement, SettlementState::Unsettled);
    }

    #[tokio::test]
    async fn test_unknown_payment_is_not_found() {
        let engine = engine_with_payment(1).await;
        let err = engine.verify(PaymentId::new(42), None).await.unwrap_err();
        assert!(matches!(err, LedgerError::NotFound(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_verify_has_one_winner() {
        let engine = engine_with_payment(1).await;
        let mut handles = Vec::new();
        for _ in 0..8 {
            let engine = engine.clone();
            handles.push(tokio::spawn(async move {
                engine.verify(PaymentId::new(1), None).await
            }));
        }

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                successes += 1;
            }
        }
        assert_eq!(successes, 1);
    }
}
