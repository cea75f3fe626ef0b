//! Declarative field validation.
//!
//! Entities describe their invariants as a table of [`Rule`]s. Each rule binds
//! one field value to a message and a set of predicates; the rule is violated
//! when any predicate holds. [`validate`] evaluates every rule (no
//! short-circuit) and returns the violated messages in declaration order.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;

/// Message template for missing or blank values.
pub const BLANK_MESSAGE: &str = "Field=[{}] should not be empty or null";

/// Message template for values that fail a format check.
pub const PATTERN_MESSAGE: &str = "The field=[{}] has an invalid pattern";

/// Message template for timestamps later than the current instant.
pub const FUTURE_DATE_MESSAGE: &str = "Field=[{}] must not be in the future";

/// Message template for non-positive numbers.
pub const NON_POSITIVE_MESSAGE: &str = "Field=[{}] must be greater than 0";

/// Aggregate validation failure for one construction attempt.
///
/// Carries every violated rule message, already suffixed with the domain
/// label, in the order the rules were declared.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", .messages.join(", "))]
pub struct DomainError {
    messages: Vec<String>,
}

impl DomainError {
    #[must_use]
    pub fn new(messages: Vec<String>) -> Self {
        Self { messages }
    }

    /// Violated rule messages in declaration order.
    #[must_use]
    pub fn messages(&self) -> &[String] {
        &self.messages
    }
}

/// Predicate over an optional field value. Returns `true` when violated.
pub type Predicate<'a, T> = Box<dyn Fn(Option<&T>) -> bool + 'a>;

/// A single entry of a rule table.
pub struct Rule<'a, T: ?Sized> {
    value: Option<&'a T>,
    message: String,
    predicates: Vec<Predicate<'a, T>>,
}

impl<'a, T: ?Sized> Rule<'a, T> {
    /// Bind `value` to a message built from `template` and `field`.
    #[must_use]
    pub fn new(value: Option<&'a T>, template: &str, field: &str) -> Self {
        Self {
            value,
            message: template.replacen("{}", field, 1),
            predicates: Vec::new(),
        }
    }

    /// Add a predicate; the rule is violated if any predicate holds.
    #[must_use]
    pub fn when(mut self, predicate: impl Fn(Option<&T>) -> bool + 'a) -> Self {
        self.predicates.push(Box::new(predicate));
        self
    }
}

/// Object-safe view of a [`Rule`] so tables can mix field types.
pub trait Check {
    fn is_violated(&self) -> bool;
    fn message(&self) -> &str;
}

impl<T: ?Sized> Check for Rule<'_, T> {
    fn is_violated(&self) -> bool {
        self.predicates.iter().any(|p| p(self.value))
    }

    fn message(&self) -> &str {
        &self.message
    }
}

/// Evaluate every rule and collect `"{message} {label}"` for each violation.
#[must_use]
pub fn validate(rules: &[&dyn Check], label: &str) -> Vec<String> {
    rules
        .iter()
        .filter(|rule| rule.is_violated())
        .map(|rule| format!("{} {}", rule.message(), label))
        .collect()
}

/// Like [`validate`], but fails with a [`DomainError`] when anything is violated.
///
/// # Errors
/// Returns `DomainError` listing every violated rule.
pub fn ensure(rules: &[&dyn Check], label: &str) -> Result<(), DomainError> {
    let errors = validate(rules, label);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(DomainError::new(errors))
    }
}

pub fn is_absent<T: ?Sized>(value: Option<&T>) -> bool {
    value.is_none()
}

/// Absent, empty or whitespace-only.
pub fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |s| s.trim().is_empty())
}

/// Absent or not exactly eleven ASCII digits.
pub fn is_invalid_cpf(value: Option<&str>) -> bool {
    static CPF: OnceLock<Regex> = OnceLock::new();
    let pattern = CPF.get_or_init(|| Regex::new(r"^[0-9]{11}$").expect("Valid regex"));
    value.map_or(true, |s| !pattern.is_match(s))
}

/// Present and strictly later than `now`. Absent values never match.
pub fn is_after(now: DateTime<Utc>) -> impl Fn(Option<&DateTime<Utc>>) -> bool {
    move |value| value.is_some_and(|date| *date > now)
}

/// Present and `<= 0`. Absent values never match.
pub fn is_non_positive(value: Option<&i64>) -> bool {
    value.is_some_and(|v| *v <= 0)
}
