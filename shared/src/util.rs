//! Small utilities shared across the workspace

use rust_decimal::{Decimal, RoundingStrategy};

/// Current unix timestamp in milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Round a monetary amount to 2 decimal places (half away from zero)
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
