use crate::error::ValidationError;
use regex::Regex;
use std::sync::LazyLock;

/// Upper bound on accepted passwords. Argon2 cost grows with input length.
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// A practical subset of RFC 5322, compiled once.
static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .expect("Invalid email regex pattern")
});

/// Validates an email address
///
/// # Examples
///
/// ```rust
/// use latchkey_core::validation::validate_email;
///
/// assert!(validate_email("user@example.com").is_ok());
/// assert!(validate_email("invalid-email").is_err());
/// ```
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() {
        return Err(ValidationError::MissingField(
            "Email is required".to_string(),
        ));
    }

    if email.len() > 254 {
        return Err(ValidationError::InvalidEmail(
            "Email is too long".to_string(),
        ));
    }

    if EMAIL_REGEX.is_match(email) {
        Ok(())
    } else {
        Err(ValidationError::InvalidEmail(email.to_string()))
    }
}

/// Validates a password against the configured minimum length
///
/// Passwords may not be empty, whitespace only, shorter than `min_length`
/// or longer than [`MAX_PASSWORD_LENGTH`].
///
/// ```rust
/// use latchkey_core::validation::validate_password;
///
/// assert!(validate_password("pw1", 1).is_ok());
/// assert!(validate_password("pw1", 8).is_err());
/// assert!(validate_password("", 1).is_err());
/// ```
pub fn validate_password(password: &str, min_length: usize) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::MissingField(
            "Password is required".to_string(),
        ));
    }

    if password.trim().is_empty() {
        return Err(ValidationError::InvalidPassword(
            "Password cannot be only whitespace".to_string(),
        ));
    }

    if password.chars().count() < min_length {
        return Err(ValidationError::InvalidPassword(format!(
            "Password must be at least {min_length} characters long"
        )));
    }

    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::InvalidPassword(format!(
            "Password must be no more than {MAX_PASSWORD_LENGTH} characters long"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email_valid() {
        assert!(validate_email("u@test.com").is_ok());
        assert!(validate_email("user.name+tag@example.co.uk").is_ok());
        assert!(validate_email("a@x.com").is_ok());
    }

    #[test]
    fn test_validate_email_invalid() {
        assert!(matches!(
            validate_email(""),
            Err(ValidationError::MissingField(_))
        ));
        assert!(matches!(
            validate_email("invalid-email"),
            Err(ValidationError::InvalidEmail(_))
        ));
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("user@").is_err());

        let long_email = format!("{}@example.com", "a".repeat(250));
        assert!(validate_email(&long_email).is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("pw1", 1).is_ok());
        assert!(validate_password("securepassword123", 8).is_ok());

        assert!(matches!(
            validate_password("", 1),
            Err(ValidationError::MissingField(_))
        ));
        assert!(matches!(
            validate_password("   ", 1),
            Err(ValidationError::InvalidPassword(_))
        ));
        assert!(validate_password("short", 8).is_err());
        assert!(validate_password(&"a".repeat(129), 1).is_err());
    }
}
