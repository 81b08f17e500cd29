//! Random material for credentials handed to clients.
//!
//! Everything here draws from `OsRng`, which holds no state and is safe to use
//! from any number of concurrent request tasks.

use rand::distributions::{Alphanumeric, Uniform};
use rand::rngs::OsRng;
use rand::Rng;

/// Length of session tokens (alphanumeric, ~285 bits of entropy).
pub const SESSION_TOKEN_LEN: usize = 48;

/// Opaque, unguessable session token.
pub fn session_token() -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(SESSION_TOKEN_LEN)
        .map(char::from)
        .collect()
}

/// Numeric code of `len` digits, suitable for SMS verification.
pub fn numeric_code(len: usize) -> String {
    let digits = Uniform::new_inclusive(0u8, 9);
    (0..len)
        .map(|_| char::from(b'0' + OsRng.sample(digits)))
        .collect()
}

/// Alphanumeric key used for password resets.
pub fn reset_key(len: usize) -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn session_tokens_are_alphanumeric_and_distinct() {
        let tokens: HashSet<String> = (0..64).map(|_| session_token()).collect();
        assert_eq!(tokens.len(), 64);
        for t in &tokens {
            assert_eq!(t.len(), SESSION_TOKEN_LEN);
            assert!(t.chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }

    #[test]
    fn numeric_code_has_requested_digits() {
        let code = numeric_code(6);
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn reset_key_length() {
        assert_eq!(reset_key(20).len(), 20);
    }
}
