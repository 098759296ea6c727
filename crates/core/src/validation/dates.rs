//! Date rules for polls.

use chrono::{Months, NaiveDate};
use pollhub_common::{ViolationKind, Violations};

/// How far ahead a poll may start, and how long it may run.
const MAX_SPAN: Months = Months::new(12);

/// Check a poll's date range against `today`.
///
/// When `active` is set the poll is, or is about to become, open for
/// voting, and neither date may lie in the past.
pub fn check_poll_dates(
    violations: &mut Violations,
    start_date: NaiveDate,
    end_date: NaiveDate,
    today: NaiveDate,
    active: bool,
) {
    if today
        .checked_add_months(MAX_SPAN)
        .is_some_and(|limit| start_date > limit)
    {
        violations.push(
            "start_date",
            ViolationKind::Invalid,
            "cannot be more than one year in the future",
        );
    }

    if end_date <= start_date {
        violations.push("end_date", ViolationKind::Invalid, "must be after start date");
    } else if start_date
        .checked_add_months(MAX_SPAN)
        .is_some_and(|limit| end_date > limit)
    {
        violations.push(
            "end_date",
            ViolationKind::Invalid,
            "cannot be more than one year after start date",
        );
    }

    if active {
        if start_date < today {
            violations.push(
                "start_date",
                ViolationKind::Invalid,
                "cannot be in the past for active polls",
            );
        }
        if end_date < today {
            violations.push(
                "end_date",
                ViolationKind::Invalid,
                "cannot be in the past for active polls",
            );
        }
    }
}
