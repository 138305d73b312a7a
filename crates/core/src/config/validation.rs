use thiserror::Error;

/// Configuration error type
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required field: {field}. {hint}")]
    MissingRequired { field: String, hint: String },

    #[error("Invalid value for field '{field}': '{value}'. Expected: {expected}")]
    InvalidValue {
        field: String,
        value: String,
        expected: String,
    },

    #[error("The environment configuration for '{name}' is missing")]
    UnknownEnvironment { name: String },

    #[error("Configuration validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl ConfigError {
    /// Create a missing required field error
    pub fn missing_required(field: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::MissingRequired {
            field: field.into(),
            hint: hint.into(),
        }
    }

    /// Create an invalid value error
    pub fn invalid_value(
        field: impl Into<String>,
        value: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
            expected: expected.into(),
        }
    }

    /// Create an unknown environment error
    pub fn unknown_environment(name: impl Into<String>) -> Self {
        Self::UnknownEnvironment { name: name.into() }
    }

    /// Create a validation failed error
    pub fn validation_failed(message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            message: message.into(),
        }
    }
}

/// Trait for validating configuration values
pub trait ConfigValidator<T: ?Sized> {
    /// Validate a configuration value
    fn validate(&self, value: &T) -> Result<(), ConfigError>;
}

/// Database URL validator
pub struct UrlValidator {
    pub schemes: Vec<String>,
}

impl Default for UrlValidator {
    fn default() -> Self {
        Self {
            schemes: vec!["postgres".to_string(), "postgresql".to_string()],
        }
    }
}

impl ConfigValidator<str> for UrlValidator {
    fn validate(&self, value: &str) -> Result<(), ConfigError> {
        if value.is_empty() {
            return Err(ConfigError::invalid_value(
                "database_url",
                value,
                "non-empty URL",
            ));
        }

        let has_valid_scheme = self
            .schemes
            .iter()
            .any(|scheme| value.starts_with(&format!("{}://", scheme)));

        if !has_valid_scheme {
            return Err(ConfigError::invalid_value(
                "database_url",
                value,
                format!("URL with scheme: {}", self.schemes.join(", ")),
            ));
        }

        Ok(())
    }
}

/// Ledger table name validator
///
/// The table name is interpolated into SQL, so only plain identifiers
/// (optionally schema-qualified) are accepted.
pub struct TableNameValidator {
    pub max_length: usize,
}

impl Default for TableNameValidator {
    fn default() -> Self {
        Self { max_length: 63 }
    }
}

impl ConfigValidator<str> for TableNameValidator {
    fn validate(&self, value: &str) -> Result<(), ConfigError> {
        let expected = format!(
            "identifier of letters, digits and underscores, at most {} characters",
            self.max_length
        );

        if value.is_empty() || value.len() > self.max_length {
            return Err(ConfigError::invalid_value("migration_table", value, expected));
        }

        let valid = value.split('.').all(|part| {
            !part.is_empty()
                && !part.starts_with(|c: char| c.is_ascii_digit())
                && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        });

        if !valid {
            return Err(ConfigError::invalid_value("migration_table", value, expected));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_validator() {
        let validator = UrlValidator::default();

        assert!(validator.validate("postgres://localhost/app").is_ok());
        assert!(validator.validate("postgresql://user:pw@db:5432/app").is_ok());
        assert!(validator.validate("mysql://localhost/app").is_err());
        assert!(validator.validate("").is_err());
    }

    #[test]
    fn test_table_name_validator() {
        let validator = TableNameValidator::default();

        assert!(validator.validate("tidemark_log").is_ok());
        assert!(validator.validate("public.tidemark_log").is_ok());
        assert!(validator.validate("log; DROP TABLE users").is_err());
        assert!(validator.validate("1log").is_err());
        assert!(validator.validate("").is_err());
        assert!(validator.validate(&"x".repeat(64)).is_err());
    }
}
