//! Custom Test Assertions
//!
//! Assertion helpers for GOP outcomes that print the unexpected value.

use std::fmt::Debug;

use core_kernel::Amount;
use domain_gop::{GopError, GopStatus, GuaranteeOfPayment};
use rust_decimal::Decimal;

/// Asserts the outcome is the collapsed not-found/not-authorized result
pub fn assert_hidden<T: Debug>(result: Result<T, GopError>) {
    match result {
        Err(error) if error.is_hidden() => {}
        other => panic!("expected a not-found outcome, got {other:?}"),
    }
}

/// Asserts a validation failure on the given field
pub fn assert_validation<T: Debug>(result: Result<T, GopError>, expected_field: &str) {
    match result {
        Err(GopError::Validation { field, .. }) => assert_eq!(
            field, expected_field,
            "validation failed on {field}, expected {expected_field}"
        ),
        other => panic!("expected validation error on {expected_field}, got {other:?}"),
    }
}

/// Asserts a closed-request rejection
pub fn assert_closed<T: Debug>(result: Result<T, GopError>) {
    match result {
        Err(GopError::Closed(_)) => {}
        other => panic!("expected closed rejection, got {other:?}"),
    }
}

/// Asserts an amount equals a decimal exactly
pub fn assert_amount_eq(actual: Amount, expected: Decimal) {
    assert_eq!(actual.value(), expected, "amount {actual} != {expected}");
}

/// Asserts status and archive flag together
pub fn assert_state(gop: &GuaranteeOfPayment, status: GopStatus, closed: bool) {
    assert_eq!(
        (gop.status, gop.closed),
        (status, closed),
        "request {} is {} (closed: {})",
        gop.id,
        gop.status,
        gop.closed
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_assert_hidden_accepts_not_authorized() {
        assert_hidden::<()>(Err(GopError::NotAuthorized));
    }

    #[test]
    #[should_panic(expected = "expected validation error")]
    fn test_assert_validation_rejects_success() {
        assert_validation(Ok::<_, GopError>(()), "status");
    }

    #[test]
    fn test_assert_amount_eq() {
        assert_amount_eq(Amount::parse_lenient("1,500.00"), dec!(1500));
    }
}
