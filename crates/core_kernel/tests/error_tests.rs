//! Tests for the kernel error types

use core_kernel::{CoreError, PortError};

#[test]
fn test_unknown_variant_names_kind_and_value() {
    let error = CoreError::unknown_variant("room_type", "penthouse");

    assert_eq!(error.kind(), "room_type");
    assert_eq!(error.to_string(), "unknown room_type value: \"penthouse\"");
}

#[test]
fn test_unknown_variant_keeps_raw_input() {
    let error = CoreError::unknown_variant("status", "  In Review ");
    assert!(matches!(error, CoreError::UnknownVariant { ref value, .. } if value == "  In Review "));
}

#[test]
fn test_port_error_validation_field() {
    let error = PortError::validation_field("must not be empty", "stamp_author");

    match error {
        PortError::Validation { field, .. } => assert_eq!(field.as_deref(), Some("stamp_author")),
        _ => panic!("Expected Validation error"),
    }
}

#[test]
fn test_port_error_classification() {
    assert!(PortError::not_found("Payer", "PYR-9").is_not_found());
    assert!(PortError::connection("pool closed").is_transient());
    assert!(!PortError::validation("bad row").is_transient());
}
