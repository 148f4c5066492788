//! Current-employment resolution.
//!
//! Decides which affiliation groups of an `activities` response describe an
//! employment that is still active on a given day. Pure: callers inject
//! `today`, which keeps the decision reproducible in tests.

use chrono::{Datelike, NaiveDate};
use tracing::{debug, warn};

use expertbase_shared::Employment;

use crate::model::{ActivitiesResponse, EmploymentSummary, FuzzyDate};

/// Stand-in year when an end date carries no usable year.
pub const MISSING_YEAR_SENTINEL: i32 = 2050;

/// Return the employments active on `today`, in registry group order.
///
/// Only the first summary of each affiliation group is considered.
pub fn current_employments(activities: &ActivitiesResponse, today: NaiveDate) -> Vec<Employment> {
    activities
        .affiliation_groups()
        .iter()
        .filter_map(|group| group.authoritative())
        .filter(|summary| is_current(summary.end_date.as_ref(), today))
        .map(to_employment)
        .collect()
}

/// Apply the end-date policy to one summary.
///
/// 1. No end date: active.
/// 2. End year before the current year: expired.
/// 3. Otherwise the full date (missing month/day = 1, missing year =
///    [`MISSING_YEAR_SENTINEL`]) must lie strictly after `today`.
pub fn is_current(end_date: Option<&FuzzyDate>, today: NaiveDate) -> bool {
    let Some(end) = end_date else {
        return true;
    };

    let year = end.year();
    if let Some(year) = year {
        if year < today.year() {
            return false;
        }
    }

    let year = year.unwrap_or(MISSING_YEAR_SENTINEL);
    let month = end.month().unwrap_or(1);
    let day = end.day().unwrap_or(1);

    match NaiveDate::from_ymd_opt(year, month, day) {
        Some(date) => {
            debug!(%date, %today, "comparing employment end date");
            date > today
        }
        None => {
            warn!(year, month, day, "impossible employment end date, treating as expired");
            false
        }
    }
}

fn to_employment(summary: &EmploymentSummary) -> Employment {
    Employment {
        role_title: summary.role_title.clone().unwrap_or_default(),
        department_name: summary.department_name.clone().unwrap_or_default(),
        organization_name: summary
            .organization
            .as_ref()
            .and_then(|o| o.name.clone())
            .unwrap_or_default(),
    }
}
