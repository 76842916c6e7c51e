//! Public identifiers.
//!
//! Database keys are sequential integers. The API never exposes them as-is,
//! it renders them as short base-36 tokens (`0-9a-z`) instead.

use thiserror::Error;

const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const RADIX: u64 = 36;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum IdentifierError {
    #[error("identifier is empty")]
    Empty,

    #[error("identifier contains invalid character {0:?}")]
    InvalidCharacter(char),

    #[error("identifier is out of range")]
    Overflow,
}

pub fn encode(mut id: u64) -> String {
    if id == 0 {
        return "0".to_string();
    }

    let mut digits = Vec::with_capacity(13);
    while id > 0 {
        digits.push(ALPHABET[(id % RADIX) as usize]);
        id /= RADIX;
    }
    digits.reverse();

    // ALPHABET is pure ASCII.
    digits.into_iter().map(char::from).collect()
}

/// Decodes a token produced by [`encode`]. Upper-case letters are accepted as
/// well, anything outside `[0-9A-Za-z]` is rejected.
pub fn decode(token: &str) -> Result<u64, IdentifierError> {
    if token.is_empty() {
        return Err(IdentifierError::Empty);
    }

    token.chars().try_fold(0u64, |acc, c| {
        let digit = c
            .to_digit(RADIX as u32)
            .ok_or(IdentifierError::InvalidCharacter(c))?;

        acc.checked_mul(RADIX)
            .and_then(|acc| acc.checked_add(u64::from(digit)))
            .ok_or(IdentifierError::Overflow)
    })
}

/// Encodes a database key. Keys are `BIGSERIAL` and never negative.
pub fn encode_key(id: i64) -> String {
    encode(id.max(0) as u64)
}

/// Decodes a token into a database key, rejecting values past `i64::MAX`.
pub fn decode_key(token: &str) -> Result<i64, IdentifierError> {
    i64::try_from(decode(token)?).map_err(|_| IdentifierError::Overflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_known_values() {
        assert_eq!(encode(0), "0");
        assert_eq!(encode(35), "z");
        assert_eq!(encode(36), "10");
        assert_eq!(encode(1_000_000), "lfls");
        assert_eq!(encode(u64::MAX), "3w5e11264sgsf");
    }

    #[test]
    fn decode_inverts_encode() {
        for n in [0, 1, 9, 10, 35, 36, 1295, 1296, 46_655, 123_456_789, i64::MAX as u64, u64::MAX] {
            assert_eq!(decode(&encode(n)), Ok(n), "round trip of {n}");
        }
    }

    #[test]
    fn decode_accepts_upper_case() {
        assert_eq!(decode("LFLS"), Ok(1_000_000));
        assert_eq!(decode("Zz"), Ok(35 * 36 + 35));
    }

    #[test]
    fn decode_rejects_empty() {
        assert_eq!(decode(""), Err(IdentifierError::Empty));
    }

    #[test]
    fn decode_rejects_non_alphanumeric() {
        assert_eq!(decode("ab-c"), Err(IdentifierError::InvalidCharacter('-')));
        assert_eq!(decode(" 1"), Err(IdentifierError::InvalidCharacter(' ')));
        assert_eq!(decode("+1"), Err(IdentifierError::InvalidCharacter('+')));
        assert_eq!(decode("1_0"), Err(IdentifierError::InvalidCharacter('_')));
        assert_eq!(decode("é"), Err(IdentifierError::InvalidCharacter('é')));
    }

    #[test]
    fn decode_rejects_overflow() {
        assert_eq!(decode("3w5e11264sgsg"), Err(IdentifierError::Overflow));
        assert_eq!(decode("zzzzzzzzzzzzzz"), Err(IdentifierError::Overflow));
    }

    #[test]
    fn keys_stay_within_i64() {
        assert_eq!(decode_key(&encode_key(i64::MAX)), Ok(i64::MAX));
        assert_eq!(decode_key(&encode(i64::MAX as u64 + 1)), Err(IdentifierError::Overflow));
        assert_eq!(decode_key("5"), Ok(5));
    }
}
