//! Stateless attribute rules: allow-listed characters and length bounds.

use std::sync::LazyLock;

use pollhub_common::{ViolationKind, Violations};
use regex::Regex;

/// Letters, digits, spaces and a fixed punctuation set.
static SINGLE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\A[a-zA-Z0-9.,!?:;\-()'" ]+\z"#).expect("single-line allow-list")
});

/// [`SINGLE_LINE`] plus line breaks.
static MULTI_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\A[a-zA-Z0-9.,!?:;\-()'" \r\n]+\z"#).expect("multi-line allow-list")
});

static USERNAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\A[A-Za-z0-9_-]+\z").expect("username pattern"));

/// Inclusive character-count bounds of a text field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub min: usize,
    pub max: usize,
}

pub const POLL_TITLE: Bounds = Bounds { min: 3, max: 100 };
pub const POLL_DESCRIPTION: Bounds = Bounds { min: 10, max: 2000 };
pub const QUESTION_TEXT: Bounds = Bounds { min: 5, max: 500 };
pub const OPTION_TEXT: Bounds = Bounds { min: 1, max: 255 };
pub const COMMENT_CONTENT: Bounds = Bounds { min: 1, max: 1000 };
pub const USERNAME_LENGTH: Bounds = Bounds { min: 3, max: 50 };

/// Which allow-list a text field is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    SingleLine,
    MultiLine,
}

impl Charset {
    fn allows(self, value: &str) -> bool {
        match self {
            Self::SingleLine => SINGLE_LINE.is_match(value),
            Self::MultiLine => MULTI_LINE.is_match(value),
        }
    }
}

/// Check a free-text field: not blank, within `bounds`, allow-listed.
///
/// Blank values get a single `Required` violation and skip the other rules.
pub fn check_text(
    violations: &mut Violations,
    field: &str,
    value: &str,
    bounds: Bounds,
    charset: Charset,
) {
    if value.trim().is_empty() {
        violations.push(field, ViolationKind::Required, "can't be blank");
        return;
    }

    check_length(violations, field, value, bounds);

    if !charset.allows(value) {
        violations.push(field, ViolationKind::Format, "contains invalid characters");
    }
}

fn check_length(violations: &mut Violations, field: &str, value: &str, bounds: Bounds) {
    let len = value.chars().count();
    if len < bounds.min {
        violations.push(
            field,
            ViolationKind::Length,
            format!("is too short (minimum is {} characters)", bounds.min),
        );
    } else if len > bounds.max {
        violations.push(
            field,
            ViolationKind::Length,
            format!("is too long (maximum is {} characters)", bounds.max),
        );
    }
}

pub fn check_poll_title(violations: &mut Violations, title: &str) {
    check_text(violations, "title", title, POLL_TITLE, Charset::SingleLine);
}

pub fn check_poll_description(violations: &mut Violations, description: &str) {
    check_text(violations, "description", description, POLL_DESCRIPTION, Charset::MultiLine);
}

pub fn check_question_text(violations: &mut Violations, text: &str) {
    check_text(violations, "text", text, QUESTION_TEXT, Charset::SingleLine);
}

pub fn check_option_text(violations: &mut Violations, text: &str) {
    check_text(violations, "text", text, OPTION_TEXT, Charset::SingleLine);
}

pub fn check_comment_content(violations: &mut Violations, content: &str) {
    check_text(violations, "content", content, COMMENT_CONTENT, Charset::MultiLine);
}

/// Usernames: 3-50 letters, digits, `_` or `-`.
pub fn check_username(violations: &mut Violations, username: &str) {
    if username.is_empty() {
        violations.push("username", ViolationKind::Required, "can't be blank");
        return;
    }
    check_length(violations, "username", username, USERNAME_LENGTH);
    if !USERNAME.is_match(username) {
        violations.push(
            "username",
            ViolationKind::Format,
            "may only contain letters, digits, underscores and dashes",
        );
    }
}

/// Option texts are compared trimmed and case-sensitively.
#[must_use]
pub fn same_option_text(a: &str, b: &str) -> bool {
    a.trim() == b.trim()
}
