//! Configuration for sessions, the auth-state cache and registration rules.
//!
//! ```rust
//! use chrono::Duration;
//! use gatehouse::config::AuthConfig;
//!
//! let config = AuthConfig {
//!     session_lifetime: Duration::hours(12),
//!     ..AuthConfig::default()
//! };
//! assert!(config.validate().is_ok());
//! ```

use chrono::Duration;

use crate::crypto::SESSION_TOKEN_LENGTH;
use crate::validators::PasswordPolicy;

/// Key under which the session token is kept in client-side storage.
pub const DEFAULT_TOKEN_STORAGE_KEY: &str = "token";

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// How long a session issued at login stays valid.
    ///
    /// Default: 7 days
    pub session_lifetime: Duration,

    /// How long a resolved auth state is trusted before it is recomputed.
    ///
    /// Default: 5 minutes
    pub state_cache_ttl: Duration,

    /// Length of generated session tokens. Default: 50
    pub token_length: usize,

    pub token_storage_key: String,

    /// Buffer size of the state-change broadcast channel. Subscribers that
    /// fall further behind skip the oldest notifications.
    pub notification_capacity: usize,

    pub password_policy: PasswordPolicy,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_lifetime: Duration::days(7),
            state_cache_ttl: Duration::minutes(5),
            token_length: SESSION_TOKEN_LENGTH,
            token_storage_key: DEFAULT_TOKEN_STORAGE_KEY.to_owned(),
            notification_capacity: 16,
            password_policy: PasswordPolicy::default(),
        }
    }
}

impl AuthConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Long sessions and a short cache window, handy while iterating locally.
    pub fn development() -> Self {
        Self {
            session_lifetime: Duration::days(30),
            state_cache_ttl: Duration::seconds(30),
            ..Self::default()
        }
    }

    /// Short sessions, longer tokens and a standard password policy.
    pub fn strict() -> Self {
        Self {
            session_lifetime: Duration::hours(8),
            state_cache_ttl: Duration::minutes(1),
            token_length: 64,
            password_policy: PasswordPolicy::standard().require_digit().require_mixed_case(),
            ..Self::default()
        }
    }

    /// # Errors
    ///
    /// Returns a description of the first invalid setting.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.session_lifetime <= Duration::zero() {
            return Err("session_lifetime must be positive");
        }
        if self.state_cache_ttl < Duration::zero() {
            return Err("state_cache_ttl must not be negative");
        }
        if self.token_length < 32 {
            return Err("token_length should be at least 32 characters");
        }
        if self.token_storage_key.trim().is_empty() {
            return Err("token_storage_key must not be empty");
        }
        if self.notification_capacity == 0 {
            return Err("notification_capacity must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AuthConfig::default();

        assert_eq!(config.session_lifetime, Duration::days(7));
        assert_eq!(config.state_cache_ttl, Duration::minutes(5));
        assert_eq!(config.token_length, 50);
        assert_eq!(config.token_storage_key, "token");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presets_are_valid() {
        assert!(AuthConfig::development().validate().is_ok());

        let strict = AuthConfig::strict();
        assert!(strict.validate().is_ok());
        assert_eq!(strict.token_length, 64);
        assert_eq!(strict.password_policy.min_length, 8);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = AuthConfig {
            session_lifetime: Duration::zero(),
            ..AuthConfig::default()
        };
        assert!(config.validate().is_err());

        let config = AuthConfig {
            token_length: 8,
            ..AuthConfig::default()
        };
        assert!(config.validate().is_err());

        let config = AuthConfig {
            token_storage_key: " ".to_owned(),
            ..AuthConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
