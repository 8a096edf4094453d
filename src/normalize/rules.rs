//! Field-level format rules shared by both normalizers.

use once_cell::sync::Lazy;
use regex::Regex;

static MOBILE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[789][0-9]{9}$").expect("mobile number pattern is valid"));

static ORDER_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^ORD-[0-9]{4}-[0-9]+$").expect("order id pattern is valid"));

static SOURCE_DATETIME_LAYOUT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}T[0-9]{2}:[0-9]{2}:[0-9]{2}$")
        .expect("datetime layout pattern is valid")
});

/// Exactly ten ASCII digits, the first one 7, 8 or 9.
pub fn is_valid_mobile_number(s: &str) -> bool {
    MOBILE_NUMBER.is_match(s)
}

/// `ORD-` + four digits + `-` + one or more digits.
pub fn is_valid_order_id(s: &str) -> bool {
    ORDER_ID.is_match(s)
}

/// `YYYY-MM-DDTHH:MM:SS` with ASCII digits only: no sign, no padding, no fraction or offset.
pub fn has_source_datetime_layout(s: &str) -> bool {
    SOURCE_DATETIME_LAYOUT.is_match(s)
}

/// Title-case `s`: a letter is upper-cased when it starts a word (the previous character is not a
/// letter) and lower-cased otherwise.
///
/// Idempotent: `title_case(title_case(s)) == title_case(s)`.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_is_letter = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_is_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            out.push(c);
            prev_is_letter = false;
        }
    }
    out
}
