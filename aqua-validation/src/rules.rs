// String rules and the rules builder

use crate::validators::type_name;
use aqua_core::{ValidationError, ValidatorFn, validator};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::sync::Arc;

// Common regex patterns
static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$")
        .expect("email pattern")
});

static URL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://[^\s/$.?#].[^\s]*$").expect("url pattern"));

static UUID_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .expect("uuid pattern")
});

static ALPHANUMERIC_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9]+$").expect("alphanumeric pattern"));

/// A single check on a string value, reported against `field`.
pub type Rule = Arc<dyn Fn(&str, &str) -> Result<(), ValidationError> + Send + Sync>;

fn rule_error(field: &str, message: String, value: &str) -> ValidationError {
    ValidationError::new(field, message).with_value(Value::String(value.to_string()))
}

/// Validates that a string is not blank
pub struct NotEmpty;

impl NotEmpty {
    pub fn validate(value: &str, field: &str) -> Result<(), ValidationError> {
        if value.trim().is_empty() {
            Err(ValidationError::new(field, format!("{} should not be empty", field)))
        } else {
            Ok(())
        }
    }
}

/// Validates minimum string length (in characters)
pub struct MinLength(pub usize);

impl MinLength {
    pub fn validate(&self, value: &str, field: &str) -> Result<(), ValidationError> {
        if value.chars().count() < self.0 {
            Err(rule_error(
                field,
                format!("{} must be at least {} characters", field, self.0),
                value,
            ))
        } else {
            Ok(())
        }
    }
}

/// Validates maximum string length (in characters)
pub struct MaxLength(pub usize);

impl MaxLength {
    pub fn validate(&self, value: &str, field: &str) -> Result<(), ValidationError> {
        if value.chars().count() > self.0 {
            Err(rule_error(
                field,
                format!("{} must be at most {} characters", field, self.0),
                value,
            ))
        } else {
            Ok(())
        }
    }
}

/// Validates email format
pub struct IsEmail;

impl IsEmail {
    pub fn validate(value: &str, field: &str) -> Result<(), ValidationError> {
        if EMAIL_REGEX.is_match(value) {
            Ok(())
        } else {
            Err(rule_error(field, format!("{} must be a valid email", field), value))
        }
    }
}

/// Validates http(s) URL format
pub struct IsUrl;

impl IsUrl {
    pub fn validate(value: &str, field: &str) -> Result<(), ValidationError> {
        if URL_REGEX.is_match(value) {
            Ok(())
        } else {
            Err(rule_error(field, format!("{} must be a valid URL", field), value))
        }
    }
}

/// Validates UUID format
pub struct IsUuid;

impl IsUuid {
    pub fn validate(value: &str, field: &str) -> Result<(), ValidationError> {
        if UUID_REGEX.is_match(value) {
            Ok(())
        } else {
            Err(rule_error(field, format!("{} must be a valid UUID", field), value))
        }
    }
}

/// Validates ASCII letters and digits only
pub struct IsAlphanumeric;

impl IsAlphanumeric {
    pub fn validate(value: &str, field: &str) -> Result<(), ValidationError> {
        if ALPHANUMERIC_REGEX.is_match(value) {
            Ok(())
        } else {
            Err(rule_error(
                field,
                format!("{} must contain only letters and numbers", field),
                value,
            ))
        }
    }
}

/// Validates against a caller-supplied pattern
pub struct Matches(pub Regex);

impl Matches {
    pub fn validate(&self, value: &str, field: &str) -> Result<(), ValidationError> {
        if self.0.is_match(value) {
            Ok(())
        } else {
            Err(rule_error(
                field,
                format!("{} must match pattern {}", field, self.0.as_str()),
                value,
            ))
        }
    }
}

/// Builder for string rules on one field.
///
/// ```
/// use aqua_validation::{IsEmail, NotEmpty, ValidationRules};
/// use serde_json::json;
///
/// let email = ValidationRules::for_field("email")
///     .add(|value, field| NotEmpty::validate(value, field))
///     .add(|value, field| IsEmail::validate(value, field))
///     .into_validator();
///
/// assert!(email(&json!("ann@example.com")).is_ok());
/// assert_eq!(email(&json!("")).unwrap_err().len(), 2);
/// ```
#[derive(Clone)]
pub struct ValidationRules {
    rules: Vec<Rule>,
    field: String,
}

impl ValidationRules {
    /// Create new validation rules for a field
    pub fn for_field(field: impl Into<String>) -> Self {
        Self {
            rules: Vec::new(),
            field: field.into(),
        }
    }

    /// Add a rule
    #[allow(clippy::should_implement_trait)]
    pub fn add<F>(mut self, rule: F) -> Self
    where
        F: Fn(&str, &str) -> Result<(), ValidationError> + Send + Sync + 'static,
    {
        self.rules.push(Arc::new(rule));
        self
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    /// Run every rule against `value`, collecting all failures.
    pub fn validate(&self, value: &str) -> Result<(), Vec<ValidationError>> {
        let errors: Vec<ValidationError> = self
            .rules
            .iter()
            .filter_map(|rule| rule(value, &self.field).err())
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Turn the rules into a parameter validator.
    ///
    /// Non-string input fails with a type error under this field's name.
    pub fn into_validator(self) -> ValidatorFn {
        validator(move |value| match value {
            Value::String(s) => self.validate(s).map(|()| value.clone()),
            _ => {
                let error = ValidationError::new(
                    self.field.as_str(),
                    format!("Expected string, but got {}", type_name(value)),
                );
                Err(vec![match value {
                    Value::Null => error,
                    _ => error.with_value(value.clone()),
                }])
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_string_rules() {
        assert!(NotEmpty::validate("x", "name").is_ok());
        assert!(NotEmpty::validate("   ", "name").is_err());
        assert!(MinLength(3).validate("abc", "name").is_ok());
        assert!(MinLength(3).validate("ab", "name").is_err());
        assert!(MaxLength(2).validate("ééé", "name").is_err());
        assert!(MaxLength(3).validate("ééé", "name").is_ok());
        assert!(IsEmail::validate("test@example.com", "email").is_ok());
        assert!(IsEmail::validate("invalid", "email").is_err());
        assert!(IsUrl::validate("https://example.com/a", "site").is_ok());
        assert!(IsUrl::validate("ftp://example.com", "site").is_err());
        assert!(IsUuid::validate("550e8400-e29b-41d4-a716-446655440000", "id").is_ok());
        assert!(IsUuid::validate("not-a-uuid", "id").is_err());
        assert!(IsAlphanumeric::validate("abc123", "code").is_ok());
        assert!(IsAlphanumeric::validate("abc-123", "code").is_err());
    }

    #[test]
    fn test_error_carries_field_and_value() {
        let err = MinLength(5).validate("abc", "username").unwrap_err();
        assert_eq!(err.field, "username");
        assert_eq!(err.message, "username must be at least 5 characters");
        assert_eq!(err.value, Some(json!("abc")));
    }

    #[test]
    fn test_matches() {
        let slug = Matches(Regex::new("^[a-z-]+$").unwrap());
        assert!(slug.validate("hello-world", "slug").is_ok());
        assert!(slug.validate("Hello", "slug").is_err());
    }

    #[test]
    fn test_rules_collect_every_failure() {
        let rules = ValidationRules::for_field("email")
            .add(|value, field| MinLength(6).validate(value, field))
            .add(|value, field| IsEmail::validate(value, field));

        assert!(rules.validate("test@example.com").is_ok());
        assert_eq!(rules.validate("bad").unwrap_err().len(), 2);
        assert_eq!(rules.field(), "email");
    }

    #[test]
    fn test_into_validator() {
        let username = ValidationRules::for_field("username")
            .add(|value, field| IsAlphanumeric::validate(value, field))
            .into_validator();

        assert_eq!(username(&json!("ann42")).unwrap(), json!("ann42"));
        let err = username(&json!(42)).unwrap_err();
        assert_eq!(err[0].field, "username");
        assert_eq!(err[0].message, "Expected string, but got number");
        assert!(username(&Value::Null).unwrap_err()[0].value.is_none());
    }
}
