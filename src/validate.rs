//! Registration field validation.
//!
//! Pure checks over caller-supplied strings; each failure carries the exact
//! message returned to the client. Presence checks live with the handlers
//! (they know which fields an operation needs); format rules live here.

/// A failed validation with its client-facing message.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct ValidationError(String);

impl ValidationError {
    fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    /// Error for required fields absent from a request body, e.g.
    /// `User data missing for registration: username, email.`
    pub fn missing_fields(operation: &str, missing: &[&str]) -> Self {
        Self(format!(
            "User data missing for {operation}: {}.",
            missing.join(", ")
        ))
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

/// Usernames are 3-50 chars, alphanumeric and underscore only.
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.chars().count() < 3 {
        return Err(ValidationError::new(
            "Username must be at least 3 characters long.",
        ));
    }
    if username.chars().count() > 50 {
        return Err(ValidationError::new(
            "Username must be 50 characters or fewer.",
        ));
    }

    let mut invalid: Vec<String> = Vec::new();
    for c in username.chars() {
        if !c.is_ascii_alphanumeric() && c != '_' {
            let s = c.to_string();
            if !invalid.contains(&s) {
                invalid.push(s);
            }
        }
    }
    if !invalid.is_empty() {
        return Err(ValidationError::new(format!(
            "Username can only contain alphanumeric characters and underscores. \
             Invalid characters found: {}",
            invalid.join(", ")
        )));
    }

    Ok(())
}

/// Passwords are at least 6 chars and need one uppercase letter, one
/// lowercase letter, one digit, and one special character.
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < 6 {
        return Err(ValidationError::new(
            "Password must be at least 6 characters long.",
        ));
    }

    let mut needed = Vec::new();
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        needed.push("uppercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        needed.push("lowercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        needed.push("digit");
    }
    if !password
        .chars()
        .any(|c| !c.is_ascii_alphanumeric() && !c.is_whitespace())
    {
        needed.push("special character");
    }

    if !needed.is_empty() {
        return Err(ValidationError::new(format!(
            "Password must include at least one {}.",
            needed.join(", ")
        )));
    }

    Ok(())
}

/// Emails must look like `local@domain.tld` (no whitespace, a single `@`,
/// a dot somewhere in the domain) and fit the 100-char column.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.chars().count() > 100 {
        return Err(ValidationError::new("Email must be 100 characters or fewer."));
    }
    if !is_valid_email(email) {
        return Err(ValidationError::new("Invalid email format."));
    }
    Ok(())
}

fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) if !local.is_empty() => match domain.rsplit_once('.') {
            Some((head, tail)) => !head.is_empty() && !tail.is_empty(),
            None => false,
        },
        _ => false,
    }
}
