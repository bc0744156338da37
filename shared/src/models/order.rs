//! Order domain model
//!
//! An order snapshots product names and unit prices at placement time and
//! carries its full payment attempt history. Status changes go through the
//! state machine in [`OrderStatus::can_transition_to`].

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

use crate::util::{now_millis, round_money};

/// Order fulfillment status
///
/// Usual progression: `pending → processing → shipped → delivered`, with
/// `cancelled` and `refunded` as side exits. Transitions are operator-driven
/// and unrestricted while the order is live; terminal states accept no
/// further transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    /// Terminal states reject every transition
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled | Self::Refunded)
    }

    /// Whether a transition from `self` to `next` is allowed.
    ///
    /// The operator chooses the next status explicitly; the only rule the
    /// engine enforces is that terminal states are final.
    pub fn can_transition_to(&self, _next: OrderStatus) -> bool {
        !self.is_terminal()
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Payment status of an order
///
/// `paid` is the single canonical vocabulary for a settled charge; a failed
/// attempt leaves the order payable again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Postal address snapshot stored on the order
#[derive(Debug, Clone, PartialEq, Eq, Validate, Serialize, Deserialize)]
pub struct Address {
    #[validate(length(min = 1, max = 200, message = "street is required"))]
    pub street: String,
    #[validate(length(min = 1, max = 100, message = "city is required"))]
    pub city: String,
    #[validate(length(min = 1, max = 20, message = "postal code is required"))]
    pub postal_code: String,
    #[validate(length(min = 1, max = 100, message = "country is required"))]
    pub country: String,
}

/// One item of a customer's cart, as submitted
#[derive(Debug, Clone, PartialEq, Eq, Validate, Serialize, Deserialize)]
pub struct CartItem {
    #[validate(length(min = 1, message = "product id is required"))]
    pub product_id: String,
    #[validate(range(min = 1, message = "quantity must be at least 1"))]
    pub quantity: u32,
}

/// One order line with name and unit price frozen at placement time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: String,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub line_total: Decimal,
}

impl OrderLine {
    pub fn new(
        product_id: impl Into<String>,
        name: impl Into<String>,
        unit_price: Decimal,
        quantity: u32,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            name: name.into(),
            unit_price,
            quantity,
            line_total: round_money(unit_price * Decimal::from(quantity)),
        }
    }
}

/// Direction of a payment attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentKind {
    Charge,
    Refund,
}

/// One payment attempt recorded against an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub kind: PaymentKind,
    pub amount: Decimal,
    pub succeeded: bool,
    /// Gateway reference, present on successful attempts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// Payment method for charges
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Decline or refund reason
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub timestamp: i64,
}

/// A customer order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    /// Human-readable order number (e.g. `ORD-20260824-00042`)
    pub order_number: String,
    pub customer_id: String,
    pub lines: Vec<OrderLine>,
    /// Sum of line totals, frozen at placement time
    pub total: Decimal,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub shipping_address: Address,
    pub billing_address: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracking_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_delivery: Option<String>,
    /// Payment attempt history, oldest first
    #[serde(default)]
    pub payments: Vec<PaymentRecord>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Order {
    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Paid
    }

    /// Gateway reference of the successful charge, if any
    pub fn charge_reference(&self) -> Option<&str> {
        self.payments
            .iter()
            .rev()
            .find(|p| p.kind == PaymentKind::Charge && p.succeeded)
            .and_then(|p| p.reference.as_deref())
    }

    /// Append a payment attempt and bump `updated_at`
    pub fn record_payment(&mut self, record: PaymentRecord) {
        self.payments.push(record);
        self.updated_at = now_millis();
    }
}
