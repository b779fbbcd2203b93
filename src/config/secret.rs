//! Secure handling of policy keys using the secrecy crate
//!
//! The `hash` policy mixes a key into every digest. That key is kept in a
//! [`SecretString`], which zeros its memory on drop and redacts itself from
//! `Debug` output, so it never reaches logs or reports.
//!
//! # Example
//!
//! ```rust
//! use pii_process::config::secret_string;
//! use secrecy::ExposeSecret;
//!
//! let key = secret_string("my-key".to_string());
//! assert_eq!(key.expose_secret().as_str(), "my-key");
//! assert!(!format!("{key:?}").contains("my-key"));
//! ```

use secrecy::{CloneableSecret, DebugSecret, Secret};
use zeroize::Zeroize;

/// Newtype wrapper for String that implements the required traits for Secret
#[derive(Clone, Debug, Zeroize)]
#[zeroize(drop)]
pub struct SecretValue(String);

impl CloneableSecret for SecretValue {}
impl DebugSecret for SecretValue {}

impl From<String> for SecretValue {
    fn from(s: String) -> Self {
        SecretValue(s)
    }
}

impl AsRef<str> for SecretValue {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl SecretValue {
    /// Returns the secret as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check if the secret value is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Type alias for a secret string
pub type SecretString = Secret<SecretValue>;

/// Helper function to create a SecretString from a String
#[inline]
pub fn secret_string(value: String) -> SecretString {
    Secret::new(SecretValue::from(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_secret_string_creation() {
        let secret = secret_string("hash-key".to_string());
        assert_eq!(secret.expose_secret().as_str(), "hash-key");
        assert!(!secret.expose_secret().is_empty());
    }

    #[test]
    fn test_secret_debug_redacted() {
        let secret = secret_string("sensitive-data".to_string());
        let debug_output = format!("{secret:?}");

        assert!(!debug_output.contains("sensitive-data"));
        assert!(debug_output.contains("REDACTED") || debug_output.contains("Secret"));
    }

    #[test]
    fn test_secret_clone() {
        let secret = secret_string("k".to_string());
        let cloned = secret.clone();
        assert_eq!(cloned.expose_secret().as_str(), "k");
    }
}
