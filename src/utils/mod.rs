//! Utility functions and helpers.

pub mod http;
pub mod time;
pub mod url;

/// Decode a base-36 forum identifier into its numeric value.
///
/// Identifiers too long for an `i64` or containing other characters yield `None`.
pub fn b36decode(id: &str) -> Option<i64> {
    let id = strip_fullname(id);
    if id.is_empty() {
        return None;
    }
    i64::from_str_radix(id, 36).ok()
}

/// Strip the kind prefix from a fullname (`t3_abc` becomes `abc`).
pub fn strip_fullname(fullname: &str) -> &str {
    match fullname.split_once('_') {
        Some((prefix, rest)) if prefix.starts_with('t') && prefix.len() == 2 => rest,
        _ => fullname,
    }
}
