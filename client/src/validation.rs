// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use std::collections::HashMap;

use common::{Difficulty, GoalStatus};
use lazy_static::lazy_static;
use regex::Regex;

/// The fixed set of form fields the engine knows how to validate.
/// A field outside this set is simply never validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Title,
    Description,
    TargetDate,
    Email,
    Password,
    VerifyPassword,
    Username,
    FirstName,
    Color,
    Task,
    Difficulty,
    Status,
}

impl Field {
    /// The field's name as it appears on form inputs and in API payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Description => "description",
            Field::TargetDate => "targetDate",
            Field::Email => "email",
            Field::Password => "password",
            Field::VerifyPassword => "verifyPassword",
            Field::Username => "username",
            Field::FirstName => "firstName",
            Field::Color => "color",
            Field::Task => "task",
            Field::Difficulty => "difficulty",
            Field::Status => "status",
        }
    }

    /// Human-readable label used in error messages.
    fn label(&self) -> &'static str {
        match self {
            Field::Title => "Title",
            Field::Description => "Description",
            Field::TargetDate => "Target date",
            Field::Email => "Email",
            Field::Password => "Password",
            Field::VerifyPassword => "Password confirmation",
            Field::Username => "Username",
            Field::FirstName => "First name",
            Field::Color => "Color",
            Field::Task => "Task",
            Field::Difficulty => "Difficulty",
            Field::Status => "Status",
        }
    }
}

/// Per-field validation constraint.
///
/// This replaces the loose "boolean or `{min, max, regex, ...}` object"
/// configuration of the original design with an exhaustive variant, so rules
/// pattern-match instead of probing for sub-properties at runtime.
///
/// `Length` and `Pattern` both imply `Required`: the required rule is always
/// the first entry in a field's rule list and fires regardless of variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    /// Non-empty (after trimming) is the only check.
    Required,
    /// Required, plus optional character-count bounds.
    Length { min: Option<u32>, max: Option<u32> },
    /// Required, plus the field's format rules (email regex, username
    /// no-space/lowercase checks).
    Pattern,
}

/// The value bag a form hands to the engine: one string per touched field.
/// Missing and `None` values must be coerced to the empty string by the
/// caller before validation (see `FormState::handle_change`).
pub type FieldValues = HashMap<Field, String>;

/// Which fields to validate, and how. A field absent from the config is
/// skipped entirely by the whole-form path.
pub type ValidationConfig = HashMap<Field, Constraint>;

/// The result of a whole-form validation pass.
#[derive(Debug, Clone, Default)]
pub struct ValidationOutcome {
    pub has_error: bool,
    /// First failing rule's message per field. Rules short-circuit per
    /// field: at most one message, never a concatenation.
    pub messages: HashMap<Field, String>,
}

/// A single rule. Returns `Some(message)` when the rule fires.
type RuleFn = fn(Field, &str, &Constraint, &FieldValues) -> Option<String>;

fn required(field: Field, value: &str, _constraint: &Constraint, _siblings: &FieldValues) -> Option<String> {
    if value.trim().is_empty() {
        Some(format!("{} is required.", field.label()))
    } else {
        None
    }
}

fn max_length(field: Field, value: &str, constraint: &Constraint, _siblings: &FieldValues) -> Option<String> {
    let Constraint::Length { max: Some(max), .. } = constraint else {
        return None;
    };
    if value.chars().count() as u32 > *max {
        Some(format!("{} must be {} characters or fewer.", field.label(), max))
    } else {
        None
    }
}

fn min_length(field: Field, value: &str, constraint: &Constraint, _siblings: &FieldValues) -> Option<String> {
    let Constraint::Length { min: Some(min), .. } = constraint else {
        return None;
    };
    if (value.chars().count() as u32) < *min {
        Some(format!("{} must be at least {} characters long.", field.label(), min))
    } else {
        None
    }
}

fn email_format(_field: Field, value: &str, constraint: &Constraint, _siblings: &FieldValues) -> Option<String> {
    if *constraint != Constraint::Pattern {
        return None;
    }
    if EMAIL_RE.is_match(value) {
        None
    } else {
        Some("Please enter a valid email address.".to_string())
    }
}

fn password_match(_field: Field, value: &str, _constraint: &Constraint, siblings: &FieldValues) -> Option<String> {
    let password = siblings.get(&Field::Password).map(String::as_str).unwrap_or("");
    if value == password {
        None
    } else {
        Some("Passwords do not match.".to_string())
    }
}

fn username_no_space(_field: Field, value: &str, constraint: &Constraint, _siblings: &FieldValues) -> Option<String> {
    if *constraint != Constraint::Pattern {
        return None;
    }
    if value.contains(' ') {
        Some("Username cannot contain spaces.".to_string())
    } else {
        None
    }
}

fn username_lowercase(_field: Field, value: &str, constraint: &Constraint, _siblings: &FieldValues) -> Option<String> {
    if *constraint != Constraint::Pattern {
        return None;
    }
    if value != value.to_lowercase() {
        Some("Username must be lowercase.".to_string())
    } else {
        None
    }
}

fn difficulty_member(_field: Field, value: &str, _constraint: &Constraint, _siblings: &FieldValues) -> Option<String> {
    if Difficulty::OPTIONS.contains(&value) {
        None
    } else {
        Some(format!("Difficulty must be one of: {}.", Difficulty::OPTIONS.join(", ")))
    }
}

fn status_member(_field: Field, value: &str, _constraint: &Constraint, _siblings: &FieldValues) -> Option<String> {
    if GoalStatus::OPTIONS.contains(&value) {
        None
    } else {
        Some(format!("Status must be one of: {}.", GoalStatus::OPTIONS.join(", ")))
    }
}

// Ordered rule lists. Order matters: the first firing rule for a field wins
// and the rest are not evaluated.
const TEXT_RULES: &[RuleFn] = &[required, max_length, min_length];
const REQUIRED_ONLY: &[RuleFn] = &[required];
const EMAIL_RULES: &[RuleFn] = &[required, email_format];
const VERIFY_PASSWORD_RULES: &[RuleFn] = &[password_match];
const USERNAME_RULES: &[RuleFn] = &[required, username_no_space, username_lowercase];
const DIFFICULTY_RULES: &[RuleFn] = &[required, difficulty_member];
const STATUS_RULES: &[RuleFn] = &[required, status_member];

lazy_static! {
    // Pattern kept equivalent to the historical client-side check; the
    // server remains the authority on deliverability.
    static ref EMAIL_RE: Regex =
        Regex::new(r"^\w+([.-]?\w+)*@\w+([.-]?\w+)*(\.\w{2,3})+$").expect("email regex is valid");

    // The global, lazily initialized rule table: field -> ordered rules.
    static ref RULES: HashMap<Field, &'static [RuleFn]> = {
        let mut table: HashMap<Field, &'static [RuleFn]> = HashMap::new();
        table.insert(Field::Title, TEXT_RULES);
        table.insert(Field::Description, TEXT_RULES);
        table.insert(Field::TargetDate, REQUIRED_ONLY);
        table.insert(Field::Email, EMAIL_RULES);
        table.insert(Field::Password, TEXT_RULES);
        table.insert(Field::VerifyPassword, VERIFY_PASSWORD_RULES);
        table.insert(Field::Username, USERNAME_RULES);
        table.insert(Field::FirstName, REQUIRED_ONLY);
        table.insert(Field::Color, REQUIRED_ONLY);
        table.insert(Field::Task, TEXT_RULES);
        table.insert(Field::Difficulty, DIFFICULTY_RULES);
        table.insert(Field::Status, STATUS_RULES);
        table
    };
}

/// Runs `field`'s rule list against `value`, returning the first firing
/// rule's message. A field with no rule list is never an error.
fn run_rules(field: Field, value: &str, constraint: &Constraint, siblings: &FieldValues) -> Option<String> {
    let rules = RULES.get(&field)?;
    rules.iter().find_map(|rule| rule(field, value, constraint, siblings))
}

/// Validates every field present in `values` against `config`.
///
/// Fields without a config entry are skipped (the whole-form path only
/// checks what the caller opted into). `all_values` supplies the sibling
/// bag for cross-field rules; when omitted, `values` itself is used.
pub fn validate_forms(
    values: &FieldValues,
    config: &ValidationConfig,
    all_values: Option<&FieldValues>,
) -> ValidationOutcome {
    let siblings = all_values.unwrap_or(values);
    let mut messages = HashMap::new();
    for (field, value) in values {
        let Some(constraint) = config.get(field) else {
            continue;
        };
        if let Some(message) = run_rules(*field, value, constraint, siblings) {
            messages.insert(*field, message);
        }
    }
    ValidationOutcome {
        has_error: !messages.is_empty(),
        messages,
    }
}

/// Validates one field, for per-keystroke feedback.
///
/// Unlike `validate_forms`, a missing constraint here defaults to
/// `Required` instead of skipping the field. This asymmetry is deliberate:
/// the per-field path runs only after the user has interacted with the
/// field, and an unset constraint means "mandatory if touched". Both call
/// paths depend on this, so do not "fix" it into the skip behavior.
pub fn validate_field(
    field: Field,
    value: &str,
    constraint: Option<&Constraint>,
    siblings: &FieldValues,
) -> Option<String> {
    let constraint = constraint.unwrap_or(&Constraint::Required);
    run_rules(field, value, constraint, siblings)
}
