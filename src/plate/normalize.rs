//! Plate text normalization and candidate validation.
//!
//! Recognizer output is noisy: stray punctuation, latin letters misread
//! from bolts and frames, spaces. Only ASCII digits and Hangul syllables
//! can appear on a plate, so everything else is stripped.

use crate::recognition::{SENTINEL_INTERNAL_ERROR, SENTINEL_NOT_RECOGNIZED};
use thiserror::Error;

/// Minimum plate length accepted by default.
pub const MIN_PLATE_LEN: usize = 4;

/// True for characters that may appear on a plate.
#[inline]
pub fn is_plate_char(c: char) -> bool {
    c.is_ascii_digit() || ('\u{AC00}'..='\u{D7A3}').contains(&c)
}

/// Removes every character that is not an ASCII digit or Hangul syllable.
pub fn normalize(raw: &str) -> String {
    raw.chars().filter(|&c| is_plate_char(c)).collect()
}

/// Why a recognition did not become a candidate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("recognizer returned no text")]
    Missing,
    #[error("recognizer reported failure ({0})")]
    Sentinel(String),
    #[error("normalized text {text:?} shorter than {min}")]
    TooShort { text: String, min: usize },
}

/// Validates raw recognizer text against a minimum length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlateValidator {
    min_len: usize,
}

impl Default for PlateValidator {
    fn default() -> Self {
        Self::new(MIN_PLATE_LEN)
    }
}

impl PlateValidator {
    pub fn new(min_len: usize) -> Self {
        Self { min_len }
    }

    /// Returns the normalized plate text, or why it was rejected.
    pub fn validate(&self, raw: Option<&str>) -> Result<String, Rejection> {
        let raw = raw.ok_or(Rejection::Missing)?;
        if raw == SENTINEL_NOT_RECOGNIZED || raw == SENTINEL_INTERNAL_ERROR {
            return Err(Rejection::Sentinel(raw.to_string()));
        }

        let text = normalize(raw);
        if text.chars().count() < self.min_len {
            return Err(Rejection::TooShort {
                text,
                min: self.min_len,
            });
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_strips_noise() {
        assert_eq!(normalize(" 12가 3456\n"), "12가3456");
        assert_eq!(normalize("[서울]34-ab-5678!"), "서울345678");
        assert_eq!(normalize("ㄱㅏ12"), "12");
    }

    #[test]
    fn test_valid_plate() {
        let validator = PlateValidator::default();
        assert_eq!(validator.validate(Some("12가3456")).unwrap(), "12가3456");
        assert_eq!(validator.validate(Some("1 2 3 4")).unwrap(), "1234");
    }

    #[test]
    fn test_sentinels_rejected() {
        let validator = PlateValidator::default();
        assert!(matches!(
            validator.validate(Some("인식실패")),
            Err(Rejection::Sentinel(_))
        ));
        assert!(matches!(
            validator.validate(Some("오류발생")),
            Err(Rejection::Sentinel(_))
        ));
    }

    #[test]
    fn test_missing_and_short_rejected() {
        let validator = PlateValidator::default();
        assert_eq!(validator.validate(None), Err(Rejection::Missing));
        assert_eq!(
            validator.validate(Some("가12-")),
            Err(Rejection::TooShort {
                text: "가12".into(),
                min: 4
            })
        );
    }

    #[test]
    fn test_sentinel_with_noise_is_not_a_sentinel() {
        // Only the exact marker counts; anything else goes through normalization
        let validator = PlateValidator::default();
        assert_eq!(validator.validate(Some(" 인식실패")).unwrap(), "인식실패");
    }

    proptest! {
        #[test]
        fn prop_only_plate_chars_survive(raw in ".*") {
            prop_assert!(normalize(&raw).chars().all(is_plate_char));
        }

        #[test]
        fn prop_normalize_idempotent(raw in ".*") {
            let once = normalize(&raw);
            prop_assert_eq!(normalize(&once), once.clone());
        }

        #[test]
        fn prop_candidate_iff_long_enough(raw in "[0-9가-힣a-z \\-]{0,12}") {
            let validator = PlateValidator::default();
            let sentinel = raw == SENTINEL_NOT_RECOGNIZED || raw == SENTINEL_INTERNAL_ERROR;
            let long_enough = normalize(&raw).chars().count() >= MIN_PLATE_LEN;
            prop_assert_eq!(validator.validate(Some(&raw)).is_ok(), long_enough && !sentinel);
        }
    }
}
