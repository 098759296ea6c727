//! Field-scoped validation findings.
//!
//! Validators collect every rule they find broken into a [`Violations`] list
//! instead of stopping at the first one. The list converts into an
//! [`AppError`](crate::AppError) whose kind is the most severe finding.

use std::fmt;

use serde::Serialize;

/// Category of a broken rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// A required attribute is missing or blank.
    Required,
    /// Characters outside the allow-list for the field.
    Format,
    /// Too short or too long.
    Length,
    /// Semantically invalid value (dates out of range, wrong shape, wrong role).
    Invalid,
    /// A foreign key does not resolve to an existing row.
    Reference,
    /// The target is in a lifecycle state that forbids the operation.
    State,
    /// The actor is not allowed to perform the operation.
    Authorization,
    /// The value collides with an existing row.
    Uniqueness,
}

impl ViolationKind {
    /// Ordering used to pick the error kind for a whole list.
    const fn severity(self) -> u8 {
        match self {
            Self::Authorization => 4,
            Self::Reference => 3,
            Self::State => 2,
            Self::Uniqueness => 1,
            Self::Required | Self::Format | Self::Length | Self::Invalid => 0,
        }
    }
}

/// A single broken rule attached to a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Attribute the rule applies to.
    pub field: String,
    /// Rule category.
    pub kind: ViolationKind,
    /// Human-readable message.
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.message)
    }
}

/// Accumulated violations for one candidate entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Violations(Vec<Violation>);

impl Violations {
    /// Create an empty list.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Record a violation.
    pub fn push(&mut self, field: &str, kind: ViolationKind, message: impl Into<String>) {
        self.0.push(Violation {
            field: field.to_string(),
            kind,
            message: message.into(),
        });
    }

    /// Append every violation of another list.
    pub fn extend(&mut self, other: Self) {
        self.0.extend(other.0);
    }

    /// Whether no rule was broken.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of recorded violations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate over the recorded violations.
    pub fn iter(&self) -> std::slice::Iter<'_, Violation> {
        self.0.iter()
    }

    /// Whether any violation of `kind` was recorded.
    #[must_use]
    pub fn has_kind(&self, kind: ViolationKind) -> bool {
        self.0.iter().any(|v| v.kind == kind)
    }

    /// Whether any violation concerns `field`.
    #[must_use]
    pub fn has_field(&self, field: &str) -> bool {
        self.0.iter().any(|v| v.field == field)
    }

    /// The most severe kind present, if any.
    #[must_use]
    pub fn dominant_kind(&self) -> Option<ViolationKind> {
        self.0.iter().map(|v| v.kind).max_by_key(|k| k.severity())
    }

    /// `Ok(())` when empty, otherwise the list itself as the error.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "{}", messages.join(", "))
    }
}

impl IntoIterator for Violations {
    type Item = Violation;
    type IntoIter = std::vec::IntoIter<Violation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl From<validator::ValidationErrors> for Violations {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut out = Self::new();
        for (field, field_errors) in errors.field_errors() {
            for error in field_errors {
                let kind = match &*error.code {
                    "length" => ViolationKind::Length,
                    "required" => ViolationKind::Required,
                    "email" | "regex" => ViolationKind::Format,
                    _ => ViolationKind::Invalid,
                };
                let message = error
                    .message
                    .as_ref()
                    .map_or_else(|| format!("is invalid ({})", error.code), ToString::to_string);
                out.push(&field.to_string(), kind, message);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_list_is_ok() {
        assert!(Violations::new().into_result().is_ok());
    }

    #[test]
    fn test_dominant_kind_prefers_authorization() {
        let mut v = Violations::new();
        v.push("content", ViolationKind::Length, "is too long");
        v.push("poll_id", ViolationKind::Authorization, "is not accessible");
        v.push("poll_id", ViolationKind::Reference, "must reference an existing poll");

        assert_eq!(v.dominant_kind(), Some(ViolationKind::Authorization));
        assert_eq!(v.len(), 3);
    }

    #[test]
    fn test_display_joins_messages() {
        let mut v = Violations::new();
        v.push("title", ViolationKind::Required, "can't be blank");
        v.push("end_date", ViolationKind::Invalid, "must be after start date");

        assert_eq!(
            v.to_string(),
            "title can't be blank, end_date must be after start date"
        );
    }
}
