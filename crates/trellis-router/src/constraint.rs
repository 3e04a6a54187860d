//! Parameter value constraints.

use regex::Regex;

use crate::error::ConfigError;

/// A violation reported by a failed constraint check.
///
/// Violations are ordinary values: the matcher turns them into a
/// non-match, never into an error.
#[derive(Debug, Clone)]
pub struct ConstraintViolation {
    /// Description of the rule the value broke.
    pub message: String,
}

impl ConstraintViolation {
    /// Creates a violation with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Trait for rules that route parameter values must satisfy.
pub trait Constraint: Send + Sync {
    /// Validates a value, returning a violation if it breaks the rule.
    fn validate(&self, value: &str) -> Result<(), ConstraintViolation>;
}

/// Constraint backed by a regular expression.
///
/// The pattern must match the whole value, not a substring of it.
#[derive(Debug, Clone)]
pub struct RegexConstraint {
    pattern: String,
    regex: Regex,
}

impl RegexConstraint {
    /// Compiles a constraint from a pattern string.
    pub fn new(pattern: &str) -> Result<Self, ConfigError> {
        let regex = Regex::new(&format!("^(?:{pattern})$"))?;
        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    /// Returns the original pattern string.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

impl Constraint for RegexConstraint {
    fn validate(&self, value: &str) -> Result<(), ConstraintViolation> {
        if self.regex.is_match(value) {
            Ok(())
        } else {
            Err(ConstraintViolation::new(format!(
                "value {value:?} does not match {}",
                self.pattern
            )))
        }
    }
}
