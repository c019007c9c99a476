//! Corporate-number canonicalization and check-digit validation.
//!
//! A corporate number is 13 ASCII digits. The leading digit is the check
//! digit; the remaining 12 are the payload. The check digit follows the
//! published NTA formula:
//!
//! ```text
//! P(n) = payload digit n, counted from the rightmost digit (n = 1..12)
//! Q(n) = 1 when n is odd, 2 when n is even
//! check = 9 - (sum(P(n) * Q(n)) mod 9)
//! ```
//!
//! This module does **not** contact the registry. A number that passes here
//! can still be unregistered.

use std::fmt;

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

/// Length of a canonical corporate number, check digit included.
pub const CORPORATE_NUMBER_LEN: usize = 13;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Why a corporate number is structurally unusable.
///
/// Every variant is permanent: retrying or looking the number up remotely
/// cannot change the outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MalformedReason {
    /// No digits at all.
    Empty,
    /// A non-digit in input that should already be canonical. Free-text
    /// input never produces this; normalization drops non-digits.
    InvalidCharacter(char),
    /// Digit count differs from 13.
    WrongLength(usize),
    /// 13 digits, but the leading digit disagrees with the computed one.
    CheckDigitMismatch { expected: u8, found: u8 },
}

impl MalformedReason {
    /// Stable machine-readable code, used in audit payloads.
    pub fn code(&self) -> &'static str {
        match self {
            MalformedReason::Empty => "EMPTY",
            MalformedReason::InvalidCharacter(_) => "INVALID_CHARACTER",
            MalformedReason::WrongLength(_) => "WRONG_LENGTH",
            MalformedReason::CheckDigitMismatch { .. } => "CHECK_DIGIT_MISMATCH",
        }
    }
}

impl fmt::Display for MalformedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MalformedReason::Empty => write!(f, "corporate number is empty"),
            MalformedReason::InvalidCharacter(c) => {
                write!(f, "corporate number contains invalid character {c:?}")
            }
            MalformedReason::WrongLength(n) => {
                write!(
                    f,
                    "corporate number must have {CORPORATE_NUMBER_LEN} digits, got {n}"
                )
            }
            MalformedReason::CheckDigitMismatch { expected, found } => {
                write!(
                    f,
                    "check digit mismatch: expected {expected}, found {found}"
                )
            }
        }
    }
}

impl std::error::Error for MalformedReason {}

// ---------------------------------------------------------------------------
// CorporateNumber
// ---------------------------------------------------------------------------

/// A structurally valid corporate number: 13 ASCII digits with a correct
/// check digit. The only way to build one is [`CorporateNumber::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CorporateNumber(String);

impl CorporateNumber {
    /// Parse an already-canonical 13-digit string. No stripping is done here;
    /// use [`normalize_corporate_number`] for user input.
    pub fn parse(digits: &str) -> Result<Self, MalformedReason> {
        if let Some(c) = digits.chars().find(|c| !c.is_ascii_digit()) {
            return Err(MalformedReason::InvalidCharacter(c));
        }
        if digits.is_empty() {
            return Err(MalformedReason::Empty);
        }
        if digits.len() != CORPORATE_NUMBER_LEN {
            return Err(MalformedReason::WrongLength(digits.len()));
        }

        let bytes = digits.as_bytes();
        let found = bytes[0] - b'0';
        let mut payload = [0u8; CORPORATE_NUMBER_LEN - 1];
        for (slot, b) in payload.iter_mut().zip(&bytes[1..]) {
            *slot = b - b'0';
        }
        let expected = compute_check_digit(&payload);
        if expected != found {
            return Err(MalformedReason::CheckDigitMismatch { expected, found });
        }

        Ok(Self(digits.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The leading check digit.
    pub fn check_digit(&self) -> u8 {
        self.0.as_bytes()[0] - b'0'
    }
}

impl fmt::Display for CorporateNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CorporateNumber {
    type Error = MalformedReason;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        CorporateNumber::parse(&s)
    }
}

impl From<CorporateNumber> for String {
    fn from(n: CorporateNumber) -> Self {
        n.0
    }
}

// ---------------------------------------------------------------------------
// Check digit
// ---------------------------------------------------------------------------

/// Compute the check digit for a 12-digit payload (most significant first).
///
/// Each element must be in `0..=9`. The result is always in `1..=9`.
pub fn compute_check_digit(payload: &[u8; CORPORATE_NUMBER_LEN - 1]) -> u8 {
    let weighted: u32 = payload
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            // i = 0 is n = 1 (odd, weight 1).
            let weight = if i % 2 == 0 { 1 } else { 2 };
            u32::from(d) * weight
        })
        .sum();

    // weighted % 9 is in 0..=8, so this never underflows.
    9 - (weighted % 9) as u8
}

/// `true` when `number` is exactly 13 ASCII digits and its leading digit
/// matches the computed check digit.
pub fn is_valid_check_digit(number: &str) -> bool {
    CorporateNumber::parse(number).is_ok()
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Outcome of canonicalizing a free-text corporate number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NumberCheck {
    /// 13 digits with a correct check digit; eligible for a registry lookup.
    Valid(CorporateNumber),
    /// Unusable. `candidate` holds the digits that survived NFKC folding,
    /// kept for display and audit.
    Malformed {
        candidate: String,
        reason: MalformedReason,
    },
}

impl NumberCheck {
    pub fn is_valid(&self) -> bool {
        matches!(self, NumberCheck::Valid(_))
    }

    /// The canonical digits for a valid number, or the stripped candidate
    /// for a malformed one.
    pub fn display_str(&self) -> &str {
        match self {
            NumberCheck::Valid(n) => n.as_str(),
            NumberCheck::Malformed { candidate, .. } => candidate,
        }
    }
}

/// Canonicalize a free-text corporate number.
///
/// Steps:
/// 1. NFKC fold (full-width digits become ASCII).
/// 2. Keep only ASCII digits. Separators, whitespace, prefixes such as
///    `No.` and trailing unit characters are all dropped.
/// 3. Validate length and check digit via [`CorporateNumber::parse`].
///
/// Total: never panics, always returns a classification.
pub fn normalize_corporate_number(raw: &str) -> NumberCheck {
    let candidate: String = raw
        .nfkc()
        .filter(char::is_ascii_digit)
        .collect();

    match CorporateNumber::parse(&candidate) {
        Ok(n) => NumberCheck::Valid(n),
        Err(reason) => NumberCheck::Malformed { candidate, reason },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn payload_of(s: &str) -> [u8; 12] {
        let mut out = [0u8; 12];
        for (slot, b) in out.iter_mut().zip(s.bytes()) {
            *slot = b - b'0';
        }
        out
    }

    #[test]
    fn nta_own_number_is_valid() {
        // National Tax Agency.
        assert!(is_valid_check_digit("7000012050002"));
        assert_eq!(compute_check_digit(&payload_of("000012050002")), 7);
    }

    #[test]
    fn all_nines_is_well_formed() {
        assert!(is_valid_check_digit("9999999999999"));
    }

    #[test]
    fn sequential_digits_need_leading_nine() {
        assert!(!is_valid_check_digit("1234567890123"));
        assert!(is_valid_check_digit("9234567890123"));
    }

    #[test]
    fn check_digit_is_never_zero() {
        let zero_payload = [0u8; 12];
        assert_eq!(compute_check_digit(&zero_payload), 9);
        assert!(!is_valid_check_digit("0000000000000"));
        assert!(is_valid_check_digit("9000000000000"));
    }

    #[test]
    fn parse_rejects_wrong_length() {
        assert_eq!(
            CorporateNumber::parse("123").unwrap_err(),
            MalformedReason::WrongLength(3)
        );
        assert_eq!(
            CorporateNumber::parse("70000120500020").unwrap_err(),
            MalformedReason::WrongLength(14)
        );
    }

    #[test]
    fn parse_rejects_non_digit() {
        assert_eq!(
            CorporateNumber::parse("700001205000A").unwrap_err(),
            MalformedReason::InvalidCharacter('A')
        );
    }

    #[test]
    fn parse_reports_expected_check_digit() {
        assert_eq!(
            CorporateNumber::parse("1000012050002").unwrap_err(),
            MalformedReason::CheckDigitMismatch {
                expected: 7,
                found: 1
            }
        );
    }

    #[test]
    fn normalize_strips_hyphens_and_spaces() {
        let n = normalize_corporate_number(" 7-0000-1205-0002 ");
        assert_eq!(n, NumberCheck::Valid(CorporateNumber::parse("7000012050002").unwrap()));
    }

    #[test]
    fn normalize_folds_full_width_digits() {
        let n = normalize_corporate_number("７０００－０１２０－５０００２");
        assert!(n.is_valid());
        assert_eq!(n.display_str(), "7000012050002");
    }

    #[test]
    fn normalize_strips_ideographic_space() {
        let n = normalize_corporate_number("7000012\u{3000}050002");
        assert!(n.is_valid());
    }

    #[test]
    fn normalize_empty_is_malformed_empty() {
        match normalize_corporate_number("  -  ") {
            NumberCheck::Malformed { candidate, reason } => {
                assert_eq!(candidate, "");
                assert_eq!(reason, MalformedReason::Empty);
            }
            other => panic!("expected malformed, got {other:?}"),
        }
    }

    #[test]
    fn normalize_short_keeps_candidate() {
        match normalize_corporate_number("123") {
            NumberCheck::Malformed { candidate, reason } => {
                assert_eq!(candidate, "123");
                assert_eq!(reason, MalformedReason::WrongLength(3));
            }
            other => panic!("expected malformed, got {other:?}"),
        }
    }

    #[test]
    fn normalize_drops_non_digit_decoration() {
        for raw in ["No.7000012050002", "7000012050002号", "T7000012050002", "法人番号：7000012050002"] {
            let n = normalize_corporate_number(raw);
            assert!(n.is_valid(), "{raw}: {n:?}");
            assert_eq!(n.display_str(), "7000012050002");
        }
    }

    #[test]
    fn normalize_letters_only_is_empty() {
        match normalize_corporate_number("N/A") {
            NumberCheck::Malformed { candidate, reason } => {
                assert_eq!(candidate, "");
                assert_eq!(reason, MalformedReason::Empty);
            }
            other => panic!("expected malformed, got {other:?}"),
        }
    }

    #[test]
    fn serde_round_trip_rejects_bad_number() {
        let ok: CorporateNumber = serde_json::from_str("\"7000012050002\"").unwrap();
        assert_eq!(ok.as_str(), "7000012050002");
        assert!(serde_json::from_str::<CorporateNumber>("\"7000012050003\"").is_err());
    }

    #[test]
    fn malformed_reason_display() {
        assert_eq!(
            MalformedReason::WrongLength(3).to_string(),
            "corporate number must have 13 digits, got 3"
        );
        assert_eq!(MalformedReason::Empty.code(), "EMPTY");
    }
}
