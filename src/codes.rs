//! Order-number formatting and tracking-code generation.
//! Pure helpers, testable without HTTP or a database.

use chrono::{DateTime, Utc};
use uuid::Uuid;

pub const ORDER_NUMBER_PREFIX: &str = "ORD";
pub const TRACKING_CODE_LEN: usize = 10;

/// Format an order number from a sequence value: `ORD-YYYYMMDD-0042`.
/// The sequence is global and monotonic, so numbers never collide even
/// under concurrent creation; the date segment is informational.
pub fn format_order_number(created_at: DateTime<Utc>, seq: i64) -> String {
    format!(
        "{}-{}-{:04}",
        ORDER_NUMBER_PREFIX,
        created_at.format("%Y%m%d"),
        seq
    )
}

const TRACKING_CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generate one tracking-code candidate: 10 chars over A-Z0-9, drawn from
/// a v4 uuid's random bytes. Callers must check for collisions against
/// existing orders and regenerate until unused.
pub fn generate_tracking_code() -> String {
    Uuid::new_v4()
        .into_bytes()
        .iter()
        .take(TRACKING_CODE_LEN)
        .map(|b| TRACKING_CODE_CHARSET[*b as usize % TRACKING_CODE_CHARSET.len()] as char)
        .collect()
}

/// Tracking lookups are case-insensitive; codes are stored uppercase.
pub fn normalize_tracking_code(code: &str) -> String {
    code.trim().to_uppercase()
}
