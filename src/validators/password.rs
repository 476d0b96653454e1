use super::ValidationError;

/// Rules applied to plaintext passwords at registration.
///
/// The default policy only rejects empty and absurdly long passwords;
/// [`PasswordPolicy::standard`] is what most deployments want.
///
/// ```
/// use gatehouse::validators::PasswordPolicy;
///
/// let policy = PasswordPolicy::standard().require_digit();
/// assert!(policy.validate("correct horse 1").is_ok());
/// assert!(policy.validate("short1").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub max_length: usize,
    pub require_digit: bool,
    pub require_mixed_case: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 1,
            max_length: 128,
            require_digit: false,
            require_mixed_case: false,
        }
    }
}

impl PasswordPolicy {
    /// At least 8 characters.
    #[must_use]
    pub fn standard() -> Self {
        Self::default().min(8)
    }

    #[must_use]
    pub fn min(mut self, len: usize) -> Self {
        self.min_length = len;
        self
    }

    #[must_use]
    pub fn max(mut self, len: usize) -> Self {
        self.max_length = len;
        self
    }

    #[must_use]
    pub fn require_digit(mut self) -> Self {
        self.require_digit = true;
        self
    }

    #[must_use]
    pub fn require_mixed_case(mut self) -> Self {
        self.require_mixed_case = true;
        self
    }

    /// # Errors
    ///
    /// Returns the first rule the password breaks.
    pub fn validate(&self, password: &str) -> Result<(), ValidationError> {
        if password.is_empty() {
            return Err(ValidationError::PasswordEmpty);
        }

        let chars = password.chars().count();
        if chars < self.min_length {
            return Err(ValidationError::PasswordTooShort(self.min_length));
        }
        if chars > self.max_length {
            return Err(ValidationError::PasswordTooLong(self.max_length));
        }

        if self.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
            return Err(ValidationError::PasswordMissingDigit);
        }

        if self.require_mixed_case
            && !(password.chars().any(char::is_uppercase)
                && password.chars().any(char::is_lowercase))
        {
            return Err(ValidationError::PasswordMissingMixedCase);
        }

        Ok(())
    }
}
