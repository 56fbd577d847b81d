//! Field-level validation reports
//!
//! Request inputs are checked before any state is touched. Every problem
//! found is collected as a [`FieldError`] so callers can report all of them
//! at once instead of failing on the first.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

/// A single rejected input field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Name of the offending field (e.g. `amount`, `player_<id>_initiative`)
    pub field: String,
    /// Human-readable reason
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Render a list of field errors as one line, for error `Display` impls
pub fn join_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Collector used by the `validate()` methods on request types
#[derive(Debug, Default)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldError::new(field, message));
    }

    /// Record an error when `value` is empty or whitespace only
    pub fn require_text(&mut self, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.push(field, "This field is required.");
        }
    }

    /// Record an error when `value` is longer than `max` characters
    pub fn max_length(&mut self, field: &str, value: &str, max: usize) {
        if value.chars().count() > max {
            self.push(
                field,
                format!("Ensure this value has at most {} characters.", max),
            );
        }
    }

    /// Read a submitted value as a whole number.
    ///
    /// JSON integers and integer strings ("12") are accepted. A missing or
    /// null value is recorded as required; anything else (12.5, "five",
    /// true) as not a whole number.
    pub fn whole_number(&mut self, field: &str, value: Option<&Value>) -> Option<i64> {
        let value = match value {
            None | Some(Value::Null) => {
                self.push(field, "This field is required.");
                return None;
            }
            Some(v) => v,
        };

        let number = match value {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        if number.is_none() {
            self.push(field, "Enter a whole number.");
        }
        number
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `Ok(())` when nothing was recorded, otherwise the collected errors
    pub fn finish(self) -> Result<(), Vec<FieldError>> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(self.0)
        }
    }
}
