//! Expiry Calculator
//!
//! Expiry is the supply instant moved forward by a whole number of calendar
//! years. Month, day and time of day are preserved. A Feb 29 supply date that
//! lands in a non-leap year is pinned to the 28th of the same month, never
//! rolled over into March.

use chrono::{DateTime, Datelike, Utc};

use crate::lifecycle::{
    error::{LifecycleError, LifecycleResult},
    types::Tool,
};

/// Latest expiry year accepted. Timestamps are persisted as four-digit-year
/// RFC 3339 text, which cannot hold anything later.
pub const MAX_EXPIRY_YEAR: i32 = 9999;

/// Derive the expiry instant for a tool supplied at `supply` and valid for
/// `validity_years`.
pub fn compute_expiry(supply: DateTime<Utc>, validity_years: u32) -> LifecycleResult<DateTime<Utc>> {
    let target_year = i32::try_from(validity_years)
        .ok()
        .and_then(|years| supply.year().checked_add(years))
        .filter(|year| *year <= MAX_EXPIRY_YEAR)
        .ok_or_else(|| {
            LifecycleError::validation(format!(
                "Validity period of {} years is out of range",
                validity_years
            ))
        })?;

    supply
        .with_year(target_year)
        .or_else(|| supply.with_day(28).and_then(|d| d.with_year(target_year)))
        .ok_or_else(|| {
            LifecycleError::validation(format!(
                "Cannot represent expiry for supply date {} plus {} years",
                supply, validity_years
            ))
        })
}

/// Like [`compute_expiry`] but for possibly-missing schedule inputs.
///
/// Both inputs are required; no default validity is assumed here.
pub fn derive_expiry(
    supply: Option<DateTime<Utc>>,
    validity_years: Option<u32>,
) -> LifecycleResult<DateTime<Utc>> {
    let supply = supply
        .ok_or_else(|| LifecycleError::validation("Expiry requires a date of supply"))?;
    let years = validity_years
        .ok_or_else(|| LifecycleError::validation("Expiry requires a validity period"))?;
    compute_expiry(supply, years)
}

/// Recompute `tool.expiry_date` from its schedule when both inputs are set.
///
/// Returns `true` when the expiry was recomputed. An incomplete schedule
/// leaves whatever expiry the tool already carries.
pub fn refresh_expiry(tool: &mut Tool) -> LifecycleResult<bool> {
    match (tool.date_of_supply, tool.validity_period) {
        (Some(supply), Some(years)) => {
            tool.expiry_date = Some(compute_expiry(supply, years)?);
            Ok(true)
        }
        _ => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 9, 30, 0).unwrap()
    }

    #[test]
    fn adds_years_preserving_month_day_and_time() {
        assert_eq!(compute_expiry(at(2021, 6, 15), 3).unwrap(), at(2024, 6, 15));
    }

    #[test]
    fn leap_day_into_non_leap_year_falls_back_to_28th() {
        assert_eq!(compute_expiry(at(2024, 2, 29), 1).unwrap(), at(2025, 2, 28));
    }

    #[test]
    fn leap_day_into_leap_year_is_kept() {
        assert_eq!(compute_expiry(at(2024, 2, 29), 4).unwrap(), at(2028, 2, 29));
    }

    #[test]
    fn zero_years_is_identity() {
        assert_eq!(compute_expiry(at(2023, 1, 31), 0).unwrap(), at(2023, 1, 31));
    }

    #[test]
    fn absurd_validity_is_rejected() {
        let err = compute_expiry(at(2023, 1, 1), u32::MAX).unwrap_err();
        assert!(matches!(err, LifecycleError::Validation { .. }));
    }

    #[test]
    fn expiry_past_year_9999_is_rejected() {
        assert_eq!(compute_expiry(at(2025, 3, 1), 7974).unwrap(), at(9999, 3, 1));
        let err = compute_expiry(at(2025, 3, 1), 8000).unwrap_err();
        assert!(matches!(err, LifecycleError::Validation { .. }));
    }

    #[test]
    fn derive_requires_supply_date() {
        let err = derive_expiry(None, Some(3)).unwrap_err();
        assert!(matches!(err, LifecycleError::Validation { .. }));
    }

    #[test]
    fn derive_requires_validity() {
        let err = derive_expiry(Some(at(2023, 1, 1)), None).unwrap_err();
        assert!(matches!(err, LifecycleError::Validation { .. }));
    }
}
