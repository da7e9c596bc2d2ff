// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use std::collections::HashMap;

use crate::validation::{self, Constraint, Field, FieldValues, ValidationConfig};

/// Holds one form's value/error pair and bridges single-field change events
/// to the validation engine.
///
/// On every change the field's stale error is cleared first, the new value
/// is written, and only that field is re-validated, so errors for untouched
/// fields are never disturbed while the user types.
#[derive(Debug, Clone, Default)]
pub struct FormState {
    values: FieldValues,
    errors: HashMap<Field, String>,
}

impl FormState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populates values, e.g. when editing an existing entity.
    pub fn with_values(values: FieldValues) -> Self {
        Self {
            values,
            errors: HashMap::new(),
        }
    }

    /// The current value for `field`; missing fields read as empty, the
    /// same coercion the engine applies.
    pub fn value(&self, field: Field) -> &str {
        self.values.get(&field).map(String::as_str).unwrap_or("")
    }

    pub fn values(&self) -> &FieldValues {
        &self.values
    }

    pub fn error(&self, field: Field) -> Option<&str> {
        self.errors.get(&field).map(String::as_str)
    }

    pub fn errors(&self) -> &HashMap<Field, String> {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Handles a single-field change: writes the value, clears the field's
    /// previous error, then re-validates just that field. Returns true when
    /// the new value still fails.
    ///
    /// An unset `constraint` falls back to required-only via
    /// `validate_field` (progressive validation: a touched field is
    /// mandatory unless the caller says otherwise).
    pub fn handle_change(
        &mut self,
        field: Field,
        value: impl Into<String>,
        constraint: Option<&Constraint>,
    ) -> bool {
        let value = value.into();
        self.values.insert(field, value.clone());
        self.errors.remove(&field);

        if let Some(message) = validation::validate_field(field, &value, constraint, &self.values) {
            self.errors.insert(field, message);
            true
        } else {
            false
        }
    }

    /// Validates the whole form at submit time. Collected messages are
    /// merged into the existing error map (not a wholesale replace), so
    /// server-injected errors on unconfigured fields survive.
    pub fn validate_all(&mut self, config: &ValidationConfig) -> bool {
        let outcome = validation::validate_forms(&self.values, config, None);
        self.errors.extend(outcome.messages);
        outcome.has_error
    }

    /// Injects a server-mapped field error (e.g. "email already taken")
    /// into the same slot client-side messages use, so the form renders
    /// identically regardless of origin.
    pub fn set_field_error(&mut self, field: Field, message: impl Into<String>) {
        self.errors.insert(field, message.into());
    }

    pub fn clear_errors(&mut self) {
        self.errors.clear();
    }
}
