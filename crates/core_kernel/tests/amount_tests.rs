//! Tests for lenient amount coercion as seen by API payloads

use core_kernel::Amount;
use rust_decimal_macros::dec;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct FeePayload {
    #[serde(default)]
    room_price: Amount,
    #[serde(default)]
    quotation: Amount,
}

#[test]
fn test_payload_with_bad_room_price_still_deserializes() {
    let payload: FeePayload =
        serde_json::from_str(r#"{"room_price": "abc", "quotation": "1,500.00"}"#).unwrap();

    assert_eq!(payload.room_price, Amount::ZERO);
    assert_eq!(payload.quotation.value(), dec!(1500.00));
}

#[test]
fn test_missing_fields_default_to_zero() {
    let payload: FeePayload = serde_json::from_str("{}").unwrap();

    assert!(payload.room_price.is_zero());
    assert!(payload.quotation.is_zero());
}

#[test]
fn test_objects_and_booleans_coerce_to_zero() {
    let payload: FeePayload =
        serde_json::from_str(r#"{"room_price": {"x": 1}, "quotation": true}"#).unwrap();

    assert!(payload.room_price.is_zero());
    assert!(payload.quotation.is_zero());
}

#[test]
fn test_serializes_as_number() {
    let json = serde_json::to_value(Amount::parse_lenient("99.9")).unwrap();
    assert_eq!(json, serde_json::json!(99.9));
}
