//! Caller-input checks run before any storage access.

use crate::errors::AuthError;

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// bcrypt only reads this many bytes of the input.
pub const MAX_PASSWORD_BYTES: usize = 72;

fn require(value: &str, field: &str) -> Result<(), AuthError> {
    if value.trim().is_empty() {
        return Err(AuthError::InvalidArgument(format!("{} is required", field)));
    }
    Ok(())
}

pub fn validate_registration(username: &str, email: &str, password: &str) -> Result<(), AuthError> {
    require(username, "username")?;
    require(email, "email")?;
    require(password, "password")?;

    if !is_valid_email(email) {
        return Err(AuthError::InvalidArgument(
            "Invalid email format".to_string(),
        ));
    }

    validate_password(password)
}

pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::InvalidArgument(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(AuthError::InvalidArgument(format!(
            "Password must be at most {} bytes",
            MAX_PASSWORD_BYTES
        )));
    }
    Ok(())
}

/// Basic email shape: something@something.something, no whitespace.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    if local.is_empty() || domain.contains('@') {
        return false;
    }

    domain.contains('.') && domain.split('.').all(|label| !label.is_empty())
}
