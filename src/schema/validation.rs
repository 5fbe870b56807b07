//! Attribute validators.
//!
//! A validator receives the configured value and the attribute name and
//! returns warnings and errors as plain messages. The schema turns them
//! into diagnostics tagged with the attribute.

use crate::discord::image::is_data_uri;
use crate::schema::attribute::as_integer;
use crate::discord::model::Snowflake;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            warnings: Vec::new(),
            errors: vec![message.into()],
        }
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

pub type Validator = Arc<dyn Fn(&Value, &str) -> ValidationResult + Send + Sync>;

/// Integer in `min..=max`.
pub fn int_between(min: i64, max: i64) -> Validator {
    Arc::new(move |value: &Value, key: &str| match as_integer(value) {
        Some(v) if v < min || v > max => ValidationResult::error(format!(
            "{} must be between {} and {} inclusive, got: {}",
            key, min, max, v
        )),
        Some(_) => ValidationResult::ok(),
        None => ValidationResult::error(format!("{} must be an integer, got: {}", key, value)),
    })
}

/// Integer that is exactly one of `allowed`.
pub fn int_one_of(allowed: &'static [i64]) -> Validator {
    Arc::new(move |value: &Value, key: &str| match as_integer(value) {
        Some(v) if allowed.contains(&v) => ValidationResult::ok(),
        Some(v) => ValidationResult::error(match allowed {
            [a, b] => format!("{} must be {} or {}, got: {}", key, a, b, v),
            _ => format!(
                "{} must be set to one of the following values: {:?}, but got: {}",
                key, allowed, v
            ),
        }),
        None => ValidationResult::error(format!("{} must be an integer, got: {}", key, value)),
    })
}

/// Non-empty strings must parse as a Discord snowflake.
pub fn snowflake() -> Validator {
    Arc::new(|value: &Value, key: &str| match value.as_str() {
        Some("") => ValidationResult::ok(),
        Some(s) if s.parse::<Snowflake>().is_ok() => ValidationResult::ok(),
        _ => ValidationResult::error(format!(
            "{} must be a Discord snowflake id, got: {}",
            key, value
        )),
    })
}

/// Non-empty strings must be a base64 image `data:` URI.
pub fn data_uri() -> Validator {
    Arc::new(|value: &Value, key: &str| match value.as_str() {
        Some("") => ValidationResult::ok(),
        Some(s) if is_data_uri(s) => ValidationResult::ok(),
        Some(s) => {
            let preview: String = s.chars().take(32).collect();
            ValidationResult::error(format!(
                "{} must be a base64 image data URI (data:image/<type>;base64,...), got: {}...",
                key, preview
            ))
        }
        None => ValidationResult::error(format!("{} must be a string", key)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const AFK_TIMEOUTS: &[i64] = &[60, 300, 900, 1800, 3600];

    #[test]
    fn test_afk_timeout_accepts_listed_values_only() {
        let validate = int_one_of(AFK_TIMEOUTS);

        assert!(validate(&json!(300), "afk_timeout").is_ok());
        assert!(validate(&json!(3600), "afk_timeout").is_ok());
        assert!(validate(&json!(300.0), "afk_timeout").is_ok());

        let rejected = validate(&json!(120), "afk_timeout");
        assert_eq!(
            rejected.errors,
            vec![
                "afk_timeout must be set to one of the following values: [60, 300, 900, 1800, 3600], but got: 120"
                    .to_string()
            ]
        );
    }

    #[test]
    fn test_int_between_boundaries() {
        let validate = int_between(0, 4);
        assert!(validate(&json!(0), "verification_level").is_ok());
        assert!(validate(&json!(4), "verification_level").is_ok());
        assert!(!validate(&json!(-1), "verification_level").is_ok());

        let rejected = validate(&json!(5), "verification_level");
        assert_eq!(
            rejected.errors[0],
            "verification_level must be between 0 and 4 inclusive, got: 5"
        );
    }

    #[test]
    fn test_two_value_set_message() {
        let validate = int_one_of(&[0, 1]);
        let rejected = validate(&json!(2), "default_message_notifications");
        assert_eq!(
            rejected.errors[0],
            "default_message_notifications must be 0 or 1, got: 2"
        );
    }

    #[test]
    fn test_snowflake_validator() {
        let validate = snowflake();
        assert!(validate(&json!(""), "owner_id").is_ok());
        assert!(validate(&json!("80351110224678912"), "owner_id").is_ok());
        assert!(!validate(&json!("not-an-id"), "owner_id").is_ok());
    }

    #[test]
    fn test_data_uri_validator() {
        let validate = data_uri();
        assert!(validate(&json!("data:image/png;base64,iVBORw=="), "icon_data_uri").is_ok());
        assert!(!validate(&json!("https://example.com/a.png"), "icon_data_uri").is_ok());
    }
}
