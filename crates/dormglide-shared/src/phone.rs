//! Phone number normalisation.
//!
//! Numbers are stored as `+<digits>`. Ten-digit numbers and eleven-digit
//! numbers with a leading `1` are treated as North American.

fn digits_of(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Canonical storage form of a phone number; empty input stays empty.
pub fn sanitize_phone(raw: &str) -> String {
    let digits = digits_of(raw);
    if digits.is_empty() {
        return String::new();
    }
    if digits.len() == 11 && digits.starts_with('1') {
        return format!("+1{}", &digits[1..]);
    }
    if digits.len() == 10 {
        return format!("+1{digits}");
    }
    format!("+{digits}")
}

/// Human readable `(AAA) BBB-CCCC` form; anything not North American is
/// returned unchanged.
pub fn format_phone_readable(raw: &str) -> String {
    let digits = digits_of(raw);
    let local = match digits.len() {
        11 if digits.starts_with('1') => &digits[1..],
        10 => digits.as_str(),
        _ => return raw.to_string(),
    };
    format!("({}) {}-{}", &local[0..3], &local[3..6], &local[6..])
}
