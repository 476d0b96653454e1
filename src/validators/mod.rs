//! Input validation for registration.

mod email;
mod password;
mod username;

pub use email::validate_email;
pub use password::PasswordPolicy;
pub use username::validate_username;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("email cannot be empty")]
    EmailEmpty,
    #[error("email is too long (max 254 characters)")]
    EmailTooLong,
    #[error("invalid email format")]
    EmailInvalidFormat,
    #[error("password cannot be empty")]
    PasswordEmpty,
    #[error("password must be at least {0} characters")]
    PasswordTooShort(usize),
    #[error("password is too long (max {0} characters)")]
    PasswordTooLong(usize),
    #[error("password must contain a digit")]
    PasswordMissingDigit,
    #[error("password must contain upper and lower case letters")]
    PasswordMissingMixedCase,
    #[error("username cannot be empty")]
    UsernameEmpty,
    #[error("username is too long (max 64 characters)")]
    UsernameTooLong,
    #[error("username contains control characters")]
    UsernameInvalidCharacters,
}
