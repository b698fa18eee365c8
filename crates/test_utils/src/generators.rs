//! Property-Based Test Generators
//!
//! Proptest strategies for raw, user-typed input.

use proptest::prelude::*;

use domain_gop::GopStatus;

/// Well-formed amount text, optionally with thousands separators and padding
pub fn amount_text_strategy() -> impl Strategy<Value = (i64, String)> {
    (0i64..100_000_000, any::<bool>(), any::<bool>()).prop_map(|(cents, grouped, padded)| {
        let whole = cents / 100;
        let digits = whole.to_string();
        let whole_text = if grouped {
            group_thousands(&digits)
        } else {
            digits
        };
        let text = format!("{whole_text}.{:02}", cents % 100);
        let text = if padded { format!("  {text} ") } else { text };
        (cents, text)
    })
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}

/// Text that is not a number at all
pub fn garbage_amount_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z ]{1,12}".prop_filter("not a float keyword", |s| {
        let t = s.trim().to_ascii_lowercase();
        !t.is_empty() && !["inf", "infinity", "nan", "e"].contains(&t.as_str())
    })
}

/// Any request status
pub fn status_strategy() -> impl Strategy<Value = GopStatus> {
    prop::sample::select(GopStatus::ALL.to_vec())
}

/// Raw page parameter, valid or not
pub fn page_param_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        (1u32..500).prop_map(|n| n.to_string()),
        "-?[0-9]{1,3}",
        "[a-z]{0,4}",
    ]
}
