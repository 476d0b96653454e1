use super::ValidationError;

const MAX_USERNAME_CHARS: usize = 64;

pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    let trimmed = username.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::UsernameEmpty);
    }

    if trimmed.chars().count() > MAX_USERNAME_CHARS {
        return Err(ValidationError::UsernameTooLong);
    }

    if trimmed.chars().any(char::is_control) {
        return Err(ValidationError::UsernameInvalidCharacters);
    }

    Ok(())
}
