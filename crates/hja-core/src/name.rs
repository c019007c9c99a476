//! Company-name normalization.
//!
//! The same function is applied to the uploaded name and to the registry
//! name before comparison, so any change here moves records between `OK`
//! and `NEED_CHECK`. The tests below pin the exact behavior.
//!
//! Rules:
//! - NFKC fold (full-width ASCII becomes half-width, half-width katakana
//!   becomes full-width, `U+3000` becomes a plain space, `㈱` becomes `(株)`).
//! - Trim, and collapse every whitespace run to one ASCII space.
//! - Corporate suffixes such as `株式会社` are kept as-is.

use unicode_normalization::UnicodeNormalization;

/// Canonical form of a company name. Empty input stays empty.
pub fn normalize_name(raw: &str) -> String {
    let folded: String = raw.nfkc().collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Compare two names after normalizing both sides.
pub fn names_match(a: &str, b: &str) -> bool {
    normalize_name(a) == normalize_name(b)
}
