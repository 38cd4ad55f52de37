//! Field checks plugged into `#[validate(custom(...))]`.

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use validator::ValidationError;

const SPECIAL_CHARACTERS: &str = "!@#$%^&*()_+-=[]{};':\"\\|,.<>/?`~";

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(invalid("blank", "This field is required"));
    }
    Ok(())
}

pub fn no_whitespace(value: &str) -> Result<(), ValidationError> {
    if value.chars().any(char::is_whitespace) {
        return Err(invalid("whitespace", "Must not contain spaces"));
    }
    Ok(())
}

/// At least one uppercase letter and one special character.
pub fn password_strength(value: &str) -> Result<(), ValidationError> {
    if !value.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(invalid(
            "password_uppercase",
            "Password must contain at least one uppercase letter",
        ));
    }
    if !value.chars().any(|c| SPECIAL_CHARACTERS.contains(c)) {
        return Err(invalid(
            "password_special",
            "Password must contain at least one special character",
        ));
    }
    Ok(())
}

pub fn date_order(start: &DateTime<Utc>, end: &DateTime<Utc>) -> Result<(), ValidationError> {
    if end < start {
        return Err(invalid(
            "date_order",
            "End date must be on or after the start date",
        ));
    }
    Ok(())
}

pub fn in_future(value: &DateTime<Utc>) -> Result<(), ValidationError> {
    if *value <= Utc::now() {
        return Err(invalid("past_date", "Date must be in the future"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn password_needs_uppercase_and_special() {
        assert!(password_strength("Hello!").is_ok());
        assert!(password_strength("hello!").is_err());
        assert!(password_strength("Hello1").is_err());
    }

    #[test]
    fn whitespace_and_blank_checks() {
        assert!(no_whitespace("ada").is_ok());
        assert!(no_whitespace("ada l").is_err());
        assert!(not_blank(" x ").is_ok());
        assert!(not_blank("  \t").is_err());
    }

    #[test]
    fn date_checks() {
        let now = Utc::now();
        assert!(date_order(&now, &now).is_ok());
        assert!(date_order(&now, &(now - Duration::seconds(1))).is_err());
        assert!(in_future(&(now + Duration::hours(1))).is_ok());
        assert!(in_future(&(now - Duration::hours(1))).is_err());
    }
}
