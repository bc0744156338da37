//! Payment gateway capability
//!
//! The processor talks to an injected [`PaymentGateway`]; the server wires
//! in [`MockGateway`], a deterministic stand-in that validates card input
//! and otherwise always settles. Tests inject scripted implementations.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque payment details forwarded to the gateway
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentDetails {
    pub card_number: Option<String>,
    pub card_holder: Option<String>,
    pub expiry: Option<String>,
}

/// Result of a charge attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChargeOutcome {
    Charged { reference: String },
    Declined { reason: String },
}

/// Result of a refund attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefundOutcome {
    Refunded { reference: String },
    Failed { reason: String },
}

/// External payment gateway
///
/// Implementations must be side-effect free on decline: a declined or
/// failed outcome means no money moved.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Attempt to charge `amount` with the given method and details
    async fn charge(&self, method: &str, details: &PaymentDetails, amount: Decimal)
    -> ChargeOutcome;

    /// Attempt to reverse a previous charge identified by `reference`
    async fn reverse(&self, reference: &str, amount: Decimal) -> RefundOutcome;
}

const SUPPORTED_METHODS: &[&str] = &["credit_card", "debit_card"];

/// Deterministic gateway stand-in
///
/// Declines unsupported methods and malformed card numbers (must be 13-19
/// digits); everything else settles with a fresh reference.
#[derive(Debug, Default, Clone)]
pub struct MockGateway;

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn charge(
        &self,
        method: &str,
        details: &PaymentDetails,
        _amount: Decimal,
    ) -> ChargeOutcome {
        if !SUPPORTED_METHODS.contains(&method) {
            return ChargeOutcome::Declined {
                reason: format!("unsupported payment method: {}", method),
            };
        }

        let card_number = match details.card_number.as_deref() {
            Some(n) => n,
            None => {
                return ChargeOutcome::Declined {
                    reason: "card number is required".to_string(),
                };
            }
        };
        let digits_only = card_number.chars().all(|c| c.is_ascii_digit());
        if !digits_only || !(13..=19).contains(&card_number.len()) {
            return ChargeOutcome::Declined {
                reason: "invalid card number".to_string(),
            };
        }

        ChargeOutcome::Charged {
            reference: format!("PAY-{}", Uuid::new_v4().simple()),
        }
    }

    async fn reverse(&self, _reference: &str, _amount: Decimal) -> RefundOutcome {
        RefundOutcome::Refunded {
            reference: format!("REF-{}", Uuid::new_v4().simple()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(number: &str) -> PaymentDetails {
        PaymentDetails {
            card_number: Some(number.to_string()),
            card_holder: Some("Alice Example".to_string()),
            expiry: Some("12/30".to_string()),
        }
    }

    #[tokio::test]
    async fn test_valid_card_settles() {
        let gateway = MockGateway;
        let outcome = gateway
            .charge("credit_card", &card("4242424242424242"), Decimal::new(2500, 2))
            .await;
        assert!(matches!(outcome, ChargeOutcome::Charged { reference } if reference.starts_with("PAY-")));
    }

    #[tokio::test]
    async fn test_short_card_declined() {
        let gateway = MockGateway;
        let outcome = gateway
            .charge("credit_card", &card("1234"), Decimal::new(100, 2))
            .await;
        assert!(
            matches!(outcome, ChargeOutcome::Declined { reason } if reason == "invalid card number")
        );
    }

    #[tokio::test]
    async fn test_non_digit_card_declined() {
        let gateway = MockGateway;
        let outcome = gateway
            .charge("credit_card", &card("4242-4242-4242-4242"), Decimal::ONE)
            .await;
        assert!(matches!(outcome, ChargeOutcome::Declined { .. }));
    }

    #[tokio::test]
    async fn test_missing_card_declined() {
        let gateway = MockGateway;
        let outcome = gateway
            .charge("credit_card", &PaymentDetails::default(), Decimal::ONE)
            .await;
        assert!(
            matches!(outcome, ChargeOutcome::Declined { reason } if reason == "card number is required")
        );
    }

    #[tokio::test]
    async fn test_unsupported_method_declined() {
        let gateway = MockGateway;
        let outcome = gateway
            .charge("wire_transfer", &card("4242424242424242"), Decimal::ONE)
            .await;
        assert!(matches!(outcome, ChargeOutcome::Declined { reason } if reason.contains("unsupported")));
    }

    #[tokio::test]
    async fn test_reverse_always_refunds() {
        let gateway = MockGateway;
        let outcome = gateway.reverse("PAY-abc", Decimal::new(2500, 2)).await;
        assert!(matches!(outcome, RefundOutcome::Refunded { reference } if reference.starts_with("REF-")));
    }
}
