//! crates/book_scanner_core/src/classifier.rs
//!
//! Decides whether a decoded barcode is a usable ISBN.
//!
//! Classification is a length/prefix heuristic only. Check digits are not
//! verified.

/// Strips every character that is not an ASCII decimal digit.
pub fn normalize(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Returns true for a 10-digit code, or a 13-digit code in the
/// Bookland ranges (978/979).
pub fn is_isbn(digits: &str) -> bool {
    match digits.len() {
        10 => true,
        13 => digits.starts_with("978") || digits.starts_with("979"),
        _ => false,
    }
}
