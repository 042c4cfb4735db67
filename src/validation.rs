//! Input validators for the wizard.
//!
//! Pure predicates: no side effects, same answer for the same input.

use regex::Regex;
use std::sync::LazyLock;

/// Minimum length for both the account password and the pool passphrase.
pub const MIN_SECRET_LEN: usize = 8;

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z_][a-z0-9_-]*$").expect("static username pattern"));

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@]+@[^@]+\.[^@]+$").expect("static email pattern"));

static HOSTNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9-]+$").expect("static hostname pattern"));

/// Lowercase letter or underscore first, then lowercase letters, digits, `_` or `-`.
pub fn is_valid_username(s: &str) -> bool {
    !s.is_empty() && USERNAME_RE.is_match(s)
}

/// Minimal syntactic check: `x@y.z` with no extra `@`. Not RFC 5322.
pub fn is_valid_email(s: &str) -> bool {
    !s.is_empty() && EMAIL_RE.is_match(s)
}

/// Letters, digits and hyphens only.
pub fn is_valid_hostname(s: &str) -> bool {
    !s.is_empty() && HOSTNAME_RE.is_match(s)
}

/// Length check shared by the account password and the encryption passphrase.
///
/// Measured in bytes of the UTF-8 input.
pub fn is_strong_secret(s: &str) -> bool {
    s.len() >= MIN_SECRET_LEN
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_accepts_posix_style_names() {
        for name in ["alice", "_svc", "dev-user", "a1_b2", "x"] {
            assert!(is_valid_username(name), "{name} should be valid");
        }
    }

    #[test]
    fn test_username_rejects_bad_first_char_and_case() {
        for name in ["", "1abc", "-abc", "Alice", "al ice", "al.ice", "ålice"] {
            assert!(!is_valid_username(name), "{name:?} should be invalid");
        }
    }

    #[test]
    fn test_email_minimal_shape() {
        assert!(is_valid_email("john@example.com"));
        assert!(is_valid_email("a@b.c"));
        assert!(is_valid_email("first.last@sub.example.org"));
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("john.example.com"));
        assert!(!is_valid_email("john@example"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("john@@example.com"));
        assert!(!is_valid_email("john@example."));
    }

    #[test]
    fn test_hostname_letters_digits_hyphens() {
        assert!(is_valid_hostname("laptop"));
        assert!(is_valid_hostname("Dev-Machine-01"));
        assert!(!is_valid_hostname(""));
        assert!(!is_valid_hostname("my_host"));
        assert!(!is_valid_hostname("host.local"));
        assert!(!is_valid_hostname("my host"));
    }

    #[test]
    fn test_secret_minimum_length() {
        assert!(!is_strong_secret(""));
        assert!(!is_strong_secret("1234567"));
        assert!(is_strong_secret("12345678"));
        assert!(is_strong_secret("correct horse battery staple"));
    }
}
