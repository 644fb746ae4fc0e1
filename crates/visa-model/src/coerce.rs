//! Numeric coercion for loosely-typed store and form values
//!
//! Fees and processing days arrive as JSON values that may be numbers,
//! numeric strings, `null`, or missing entirely. These helpers are the only
//! place that interprets them.

use serde_json::Value;

/// Default processing time in days
pub const DEFAULT_PROCESSING_DAYS: u32 = 15;

/// Coerce a fee value to a non-negative finite amount.
///
/// Missing, `null`, non-numeric, negative and non-finite inputs become `0.0`.
#[must_use]
pub fn coerce_fee(value: Option<&Value>) -> f64 {
    match value.and_then(as_number) {
        Some(n) if n.is_finite() && n >= 0.0 => n,
        _ => 0.0,
    }
}

/// Coerce a processing-days value to a positive integer.
///
/// Fractional inputs are truncated; anything that ends up below one falls back
/// to `fallback`.
#[must_use]
pub fn coerce_days(value: Option<&Value>, fallback: u32) -> u32 {
    match value.and_then(as_number) {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Some(n) if n.is_finite() && n >= 1.0 && n <= f64::from(u32::MAX) => n.trunc() as u32,
        _ => fallback,
    }
}

/// True when a column carries a value (not missing and not `null`)
#[inline]
#[must_use]
pub fn is_present(value: Option<&Value>) -> bool {
    !matches!(value, None | Some(Value::Null))
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fee_accepts_numbers_and_numeric_strings() {
        assert_eq!(coerce_fee(Some(&json!(120.5))), 120.5);
        assert_eq!(coerce_fee(Some(&json!(" 80 "))), 80.0);
    }

    #[test]
    fn fee_falls_back_to_zero() {
        assert_eq!(coerce_fee(None), 0.0);
        assert_eq!(coerce_fee(Some(&Value::Null)), 0.0);
        assert_eq!(coerce_fee(Some(&json!("abc"))), 0.0);
        assert_eq!(coerce_fee(Some(&json!(-5))), 0.0);
        assert_eq!(coerce_fee(Some(&json!(true))), 0.0);
    }

    #[test]
    fn days_default_to_fifteen() {
        assert_eq!(coerce_days(None, DEFAULT_PROCESSING_DAYS), 15);
        assert_eq!(coerce_days(Some(&json!(0)), DEFAULT_PROCESSING_DAYS), 15);
        assert_eq!(coerce_days(Some(&json!("soon")), DEFAULT_PROCESSING_DAYS), 15);
        assert_eq!(coerce_days(Some(&json!("21")), DEFAULT_PROCESSING_DAYS), 21);
        assert_eq!(coerce_days(Some(&json!(7.9)), DEFAULT_PROCESSING_DAYS), 7);
    }

    #[test]
    fn presence() {
        assert!(!is_present(None));
        assert!(!is_present(Some(&Value::Null)));
        assert!(is_present(Some(&json!(0))));
    }
}
