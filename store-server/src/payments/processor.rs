//! Payment processor
//!
//! Applies charges and refunds to orders. The gateway call runs outside any
//! storage transaction and under a timeout; state only changes in a single
//! write transaction after the outcome is known.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{
    Caller, Order, OrderStatus, PaymentKind, PaymentRecord, PaymentStatus,
};
use shared::util::now_millis;

use crate::orders::storage::{EngineStorage, StorageError};
use crate::payments::gateway::{ChargeOutcome, PaymentDetails, PaymentGateway, RefundOutcome};

/// Receipt returned for a settled charge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub order_id: String,
    pub order_number: String,
    pub reference: String,
    pub amount: Decimal,
    pub order_status: OrderStatus,
    pub payment_status: PaymentStatus,
}

/// Receipt returned for a settled refund
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundReceipt {
    pub order_id: String,
    pub reference: String,
    pub amount: Decimal,
    pub order_status: OrderStatus,
    pub payment_status: PaymentStatus,
}

/// Read-only payment status of an order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentStatusView {
    pub order_id: String,
    pub order_number: String,
    pub order_status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub total: Decimal,
}

fn db_err(e: StorageError) -> AppError {
    AppError::database(e.to_string())
}

/// Payment processor
#[derive(Clone)]
pub struct PaymentProcessor {
    storage: EngineStorage,
    gateway: Arc<dyn PaymentGateway>,
    gateway_timeout: Duration,
}

impl PaymentProcessor {
    pub fn new(
        storage: EngineStorage,
        gateway: Arc<dyn PaymentGateway>,
        gateway_timeout: Duration,
    ) -> Self {
        Self {
            storage,
            gateway,
            gateway_timeout,
        }
    }

    /// Charge an order's total through the gateway.
    ///
    /// Only the owning customer may pay. A `paid` order short-circuits with
    /// `OrderAlreadyPaid` and a terminal order with `OrderTerminal`, in both
    /// cases before the gateway is ever invoked. A declined or timed-out
    /// charge records a failed attempt and marks the payment `failed`; the
    /// order itself stays payable and stock is untouched.
    pub async fn apply_payment(
        &self,
        caller: &Caller,
        order_id: &str,
        method: &str,
        details: &PaymentDetails,
    ) -> AppResult<PaymentReceipt> {
        let order = self.load_order(order_id)?;
        if !caller.owns(&order.customer_id) {
            return Err(AppError::new(ErrorCode::NotOrderOwner));
        }
        // Idempotency guard: never charge a paid order twice
        if order.is_paid() {
            return Err(AppError::already_paid());
        }
        // Cancelled, refunded and delivered orders are no longer chargeable
        if order.status.is_terminal() {
            return Err(AppError::new(ErrorCode::OrderTerminal)
                .with_detail("status", order.status.name()));
        }

        let amount = order.total;
        let charge = tokio::time::timeout(
            self.gateway_timeout,
            self.gateway.charge(method, details, amount),
        )
        .await;

        match charge {
            Err(_elapsed) => {
                tracing::warn!(order_id = %order_id, "Payment gateway timed out");
                self.record_failed_charge(order_id, method, amount, "gateway timeout")?;
                Err(AppError::gateway_timeout())
            }
            Ok(ChargeOutcome::Declined { reason }) => {
                tracing::info!(order_id = %order_id, reason = %reason, "Payment declined");
                self.record_failed_charge(order_id, method, amount, &reason)?;
                Err(AppError::payment_declined(reason))
            }
            Ok(ChargeOutcome::Charged { reference }) => {
                self.settle_charge(order_id, method, amount, reference)
            }
        }
    }

    /// Apply a settled charge in one write transaction.
    ///
    /// Re-checks the paid flag under the transaction so a charge is applied
    /// at most once even if two attempts raced past the pre-check.
    fn settle_charge(
        &self,
        order_id: &str,
        method: &str,
        amount: Decimal,
        reference: String,
    ) -> AppResult<PaymentReceipt> {
        let txn = self.storage.begin_write().map_err(db_err)?;
        let mut order = self
            .storage
            .get_order_txn(&txn, order_id)
            .map_err(db_err)?
            .ok_or_else(|| AppError::order_not_found(order_id))?;

        if order.is_paid() {
            return Err(AppError::already_paid());
        }
        if order.status.is_terminal() {
            return Err(AppError::new(ErrorCode::OrderTerminal)
                .with_detail("status", order.status.name()));
        }

        order.record_payment(PaymentRecord {
            kind: PaymentKind::Charge,
            amount,
            succeeded: true,
            reference: Some(reference.clone()),
            method: Some(method.to_string()),
            reason: None,
            timestamp: now_millis(),
        });
        order.payment_status = PaymentStatus::Paid;
        if order.status == OrderStatus::Pending {
            order.status = OrderStatus::Processing;
        }
        order.updated_at = now_millis();

        self.storage.put_order_txn(&txn, &order).map_err(db_err)?;
        txn.commit().map_err(|e| AppError::database(e.to_string()))?;

        tracing::info!(
            order_id = %order.id,
            reference = %reference,
            amount = %amount,
            "Payment settled"
        );
        Ok(PaymentReceipt {
            order_id: order.id,
            order_number: order.order_number,
            reference,
            amount,
            order_status: order.status,
            payment_status: order.payment_status,
        })
    }

    fn record_failed_charge(
        &self,
        order_id: &str,
        method: &str,
        amount: Decimal,
        reason: &str,
    ) -> AppResult<()> {
        let txn = self.storage.begin_write().map_err(db_err)?;
        let mut order = self
            .storage
            .get_order_txn(&txn, order_id)
            .map_err(db_err)?
            .ok_or_else(|| AppError::order_not_found(order_id))?;

        // Never downgrade an order that was paid concurrently
        if order.is_paid() {
            return Ok(());
        }

        order.record_payment(PaymentRecord {
            kind: PaymentKind::Charge,
            amount,
            succeeded: false,
            reference: None,
            method: Some(method.to_string()),
            reason: Some(reason.to_string()),
            timestamp: now_millis(),
        });
        order.payment_status = PaymentStatus::Failed;
        order.updated_at = now_millis();

        self.storage.put_order_txn(&txn, &order).map_err(db_err)?;
        txn.commit().map_err(|e| AppError::database(e.to_string()))?;
        Ok(())
    }

    /// Refund a paid order (admin only).
    ///
    /// Reverses the applied charge through the gateway; on success the order
    /// is cancelled, its payment marked `refunded`, and a refund attempt
    /// appended. Stock reserved by the order is not returned.
    pub async fn refund(
        &self,
        caller: &Caller,
        order_id: &str,
        reason: Option<String>,
    ) -> AppResult<RefundReceipt> {
        if !caller.is_admin() {
            return Err(AppError::admin_required());
        }

        let order = self.load_order(order_id)?;
        if !order.is_paid() {
            return Err(AppError::not_paid());
        }
        let charge_reference = order
            .charge_reference()
            .ok_or_else(|| AppError::internal("paid order has no charge reference"))?
            .to_string();
        let amount = order.total;

        let outcome = tokio::time::timeout(
            self.gateway_timeout,
            self.gateway.reverse(&charge_reference, amount),
        )
        .await;

        match outcome {
            Err(_elapsed) => {
                tracing::warn!(order_id = %order_id, "Refund gateway timed out");
                self.record_failed_refund(order_id, amount, "gateway timeout")?;
                Err(AppError::gateway_timeout())
            }
            Ok(RefundOutcome::Failed { reason }) => {
                tracing::info!(order_id = %order_id, reason = %reason, "Refund rejected");
                self.record_failed_refund(order_id, amount, &reason)?;
                Err(AppError::refund_failed(reason))
            }
            Ok(RefundOutcome::Refunded { reference }) => {
                self.settle_refund(order_id, amount, reference, reason)
            }
        }
    }

    fn settle_refund(
        &self,
        order_id: &str,
        amount: Decimal,
        reference: String,
        reason: Option<String>,
    ) -> AppResult<RefundReceipt> {
        let txn = self.storage.begin_write().map_err(db_err)?;
        let mut order = self
            .storage
            .get_order_txn(&txn, order_id)
            .map_err(db_err)?
            .ok_or_else(|| AppError::order_not_found(order_id))?;

        if !order.is_paid() {
            return Err(AppError::not_paid());
        }

        order.record_payment(PaymentRecord {
            kind: PaymentKind::Refund,
            amount,
            succeeded: true,
            reference: Some(reference.clone()),
            method: None,
            reason,
            timestamp: now_millis(),
        });
        order.payment_status = PaymentStatus::Refunded;
        order.status = OrderStatus::Cancelled;
        order.updated_at = now_millis();

        self.storage.put_order_txn(&txn, &order).map_err(db_err)?;
        txn.commit().map_err(|e| AppError::database(e.to_string()))?;

        tracing::info!(
            order_id = %order.id,
            reference = %reference,
            amount = %amount,
            "Refund settled"
        );
        Ok(RefundReceipt {
            order_id: order.id,
            reference,
            amount,
            order_status: order.status,
            payment_status: order.payment_status,
        })
    }

    fn record_failed_refund(&self, order_id: &str, amount: Decimal, reason: &str) -> AppResult<()> {
        let txn = self.storage.begin_write().map_err(db_err)?;
        let mut order = self
            .storage
            .get_order_txn(&txn, order_id)
            .map_err(db_err)?
            .ok_or_else(|| AppError::order_not_found(order_id))?;

        order.record_payment(PaymentRecord {
            kind: PaymentKind::Refund,
            amount,
            succeeded: false,
            reference: None,
            method: None,
            reason: Some(reason.to_string()),
            timestamp: now_millis(),
        });
        order.updated_at = now_millis();

        self.storage.put_order_txn(&txn, &order).map_err(db_err)?;
        txn.commit().map_err(|e| AppError::database(e.to_string()))?;
        Ok(())
    }

    /// Payment status of an order, visible to its owner and to admins
    pub fn payment_status(&self, caller: &Caller, order_id: &str) -> AppResult<PaymentStatusView> {
        let order = self.load_order(order_id)?;
        if !caller.can_view(&order.customer_id) {
            return Err(AppError::new(ErrorCode::NotOrderOwner));
        }
        Ok(PaymentStatusView {
            order_id: order.id,
            order_number: order.order_number,
            order_status: order.status,
            payment_status: order.payment_status,
            total: order.total,
        })
    }

    fn load_order(&self, order_id: &str) -> AppResult<Order> {
        self.storage
            .get_order(order_id)
            .map_err(db_err)?
            .ok_or_else(|| AppError::order_not_found(order_id))
    }
}
