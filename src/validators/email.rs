use std::sync::LazyLock;

use regex::Regex;

use super::ValidationError;

#[allow(clippy::expect_used)]
static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email regex is valid")
});

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() {
        return Err(ValidationError::EmailEmpty);
    }

    if email.len() > 254 {
        return Err(ValidationError::EmailTooLong);
    }

    if !EMAIL_REGEX.is_match(email) {
        return Err(ValidationError::EmailInvalidFormat);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_emails() {
        assert!(validate_email("a@x.com").is_ok());
        assert!(validate_email("first.last+tag@mail.example.org").is_ok());
    }

    #[test]
    fn test_invalid_emails() {
        assert_eq!(validate_email("").unwrap_err(), ValidationError::EmailEmpty);
        assert_eq!(
            validate_email("a@x").unwrap_err(),
            ValidationError::EmailInvalidFormat
        );
        assert_eq!(
            validate_email("no at sign.com").unwrap_err(),
            ValidationError::EmailInvalidFormat
        );
    }

    #[test]
    fn test_email_too_long() {
        let email = format!("{}@x.com", "a".repeat(250));
        assert_eq!(validate_email(&email).unwrap_err(), ValidationError::EmailTooLong);
    }
}
