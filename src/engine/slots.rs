use std::collections::HashMap;

use chrono::NaiveDate;
use ulid::Ulid;

use crate::model::*;

// ── Slot materialization ─────────────────────────────────────────

/// Expand templates into dated slots over `[start, end]` inclusive.
///
/// `taken` maps `(template, date)` to the number of live bookings on that
/// slot. Slots with no remaining capacity are left out. The result is sorted
/// by `(date, start_time)`.
///
/// Pure: recomputes everything from its inputs and keeps no state.
pub fn materialize_slots<'a>(
    templates: impl IntoIterator<Item = &'a Availability>,
    taken: &HashMap<(Ulid, NaiveDate), u32>,
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<Slot> {
    let templates: Vec<&Availability> = templates
        .into_iter()
        .filter(|t| t.is_active && t.validity_intersects(Some(start), Some(end)))
        .collect();

    let mut slots = Vec::new();
    for date in start.iter_days().take_while(|d| *d <= end) {
        for template in templates.iter().filter(|t| t.recurs_on(date)) {
            let count = taken.get(&(template.id, date)).copied().unwrap_or(0);
            let remaining = remaining_capacity(template.max_bookings, count);
            if remaining > 0 {
                slots.push(Slot {
                    date,
                    start_time: template.start_time,
                    end_time: template.end_time,
                    availability_id: template.id,
                    remaining_capacity: remaining,
                    session_type: template.session_type.clone(),
                });
            }
        }
    }
    slots.sort_by_key(|s| (s.date, s.start_time));
    slots
}

pub fn remaining_capacity(max_bookings: u32, booked: u32) -> u32 {
    max_bookings.saturating_sub(booked)
}
