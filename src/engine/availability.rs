use crate::limits::*;
use crate::model::*;

use super::store::Calendar;
use super::EngineError;

// ── Template validation ──────────────────────────────────────────

/// Field checks for a template about to be stored. Overlap with siblings is
/// checked separately by [`find_overlap`].
pub(crate) fn validate_template(a: &Availability) -> Result<(), EngineError> {
    if a.day_of_week > 6 {
        return Err(EngineError::Validation(format!(
            "day_of_week must be 0 (Sunday) to 6 (Saturday), got {}",
            a.day_of_week
        )));
    }
    if a.start_time >= a.end_time {
        return Err(EngineError::InvalidRange {
            start: hhmm::format(&a.start_time),
            end: hhmm::format(&a.end_time),
        });
    }
    if !(MIN_SLOT_MINUTES..=MAX_SLOT_MINUTES).contains(&a.slot_duration) {
        return Err(EngineError::Validation(format!(
            "slot_duration must be between {MIN_SLOT_MINUTES} and {MAX_SLOT_MINUTES} minutes"
        )));
    }
    if !(MIN_MAX_BOOKINGS..=MAX_MAX_BOOKINGS).contains(&a.max_bookings) {
        return Err(EngineError::Validation(format!(
            "max_bookings must be between {MIN_MAX_BOOKINGS} and {MAX_MAX_BOOKINGS}"
        )));
    }
    if let Some(until) = a.valid_until
        && until < a.valid_from
    {
        return Err(EngineError::InvalidRange {
            start: a.valid_from.to_string(),
            end: until.to_string(),
        });
    }
    if let Some(ref st) = a.session_type
        && st.len() > MAX_NAME_LEN
    {
        return Err(EngineError::LimitExceeded("session type too long"));
    }
    Ok(())
}

/// First other active template of the same coach on the same weekday whose
/// time-of-day window overlaps `candidate`'s. Recurrence is weekly, so dates
/// play no part.
pub(crate) fn find_overlap<'a>(cal: &'a Calendar, candidate: &Availability) -> Option<&'a Availability> {
    if !candidate.is_active {
        return None;
    }
    let window = candidate.window();
    let mut clashes: Vec<&Availability> = cal
        .templates_of(&candidate.coach_id)
        .filter(|other| {
            other.id != candidate.id
                && other.is_active
                && other.day_of_week == candidate.day_of_week
                && other.window().overlaps(&window)
        })
        .collect();
    clashes.sort_by_key(|a| (a.start_time, a.id));
    clashes.into_iter().next()
}

pub(crate) fn check_overlap(cal: &Calendar, candidate: &Availability) -> Result<(), EngineError> {
    match find_overlap(cal, candidate) {
        Some(existing) => Err(EngineError::OverlappingAvailability {
            existing: existing.id,
            day_of_week: existing.day_of_week,
            window: format!(
                "{}-{}",
                hhmm::format(&existing.start_time),
                hhmm::format(&existing.end_time)
            ),
        }),
        None => Ok(()),
    }
}

/// Template filter used by `list_availability`.
pub(crate) fn matches_filter(a: &Availability, filter: &AvailabilityFilter) -> bool {
    filter.coach_id.is_none_or(|c| c == a.coach_id)
        && filter.day_of_week.is_none_or(|d| d == a.day_of_week)
        && filter.active.is_none_or(|active| active == a.is_active)
        && a.validity_intersects(filter.from, filter.to)
}
