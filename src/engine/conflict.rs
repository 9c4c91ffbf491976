use chrono::{NaiveDate, Utc};
use ulid::Ulid;

use crate::model::*;
use crate::observability::CONFLICTS_TOTAL;

use super::store::Calendar;
use super::EngineError;

pub(crate) fn now() -> Timestamp {
    Utc::now().naive_utc()
}

pub(crate) fn validate_window(start: Timestamp, end: Timestamp) -> Result<Span<Timestamp>, EngineError> {
    Span::try_new(start, end).ok_or_else(|| EngineError::InvalidRange {
        start: start.to_string(),
        end: end.to_string(),
    })
}

/// Events left out of the busy checks.
///
/// Rescheduling a booking must not collide with its own event; joining an
/// existing event must not collide with that event on the coach side, while
/// the player side still flags a player who is already in it.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct Exclude {
    pub coach_event: Option<Ulid>,
    pub player_event: Option<Ulid>,
}

impl Exclude {
    pub fn nothing() -> Self {
        Self::default()
    }

    /// Ignore the event owned by `booking_id`. Unknown ids exclude nothing.
    pub fn booking(cal: &Calendar, booking_id: Option<Ulid>) -> Self {
        let event = booking_id.and_then(|id| cal.booking(&id)).map(|b| b.event_id);
        Self {
            coach_event: event,
            player_event: event,
        }
    }

    pub fn joining(event_id: Ulid) -> Self {
        Self {
            coach_event: Some(event_id),
            player_event: None,
        }
    }
}

/// Non-cancelled events overlapping `window`, earliest first.
fn overlapping<'a>(
    events: impl Iterator<Item = &'a CalendarEvent>,
    window: &Span<Timestamp>,
    skip: Option<Ulid>,
) -> Vec<&'a CalendarEvent> {
    let mut hits: Vec<_> = events
        .filter(|e| e.status.is_active() && Some(e.id) != skip && e.span().overlaps(window))
        .collect();
    hits.sort_by_key(|e| (e.start_time, e.id));
    hits
}

pub(crate) fn coach_busy(
    cal: &Calendar,
    coach: &Coach,
    window: &Span<Timestamp>,
    skip: Option<Ulid>,
) -> Option<Conflict> {
    let hits = overlapping(cal.events_of_coach(&coach.id), window, skip);
    let sample = hits.first()?;
    Some(Conflict {
        kind: ConflictKind::CoachBusy,
        message: format!("Coach {} has {} overlapping session(s)", coach.name, hits.len()),
        event: Some((*sample).clone()),
    })
}

fn player_busy(
    cal: &Calendar,
    player: &Player,
    window: &Span<Timestamp>,
    skip: Option<Ulid>,
) -> Option<Conflict> {
    let hits = overlapping(cal.events_of_player(&player.id), window, skip);
    let sample = hits.first()?;
    Some(Conflict {
        kind: ConflictKind::PlayerBusy,
        message: format!("{} has {} overlapping session(s)", player.name, hits.len()),
        event: Some((*sample).clone()),
    })
}

/// Coach-busy and player-busy checks for a candidate window. Events without
/// a coach only get the player check. Finding conflicts is a normal result,
/// not an error.
pub(crate) fn detect_conflicts(
    cal: &Calendar,
    coach: Option<&Coach>,
    player: &Player,
    window: &Span<Timestamp>,
    exclude: Exclude,
) -> Vec<Conflict> {
    let conflicts: Vec<Conflict> = coach
        .and_then(|coach| coach_busy(cal, coach, window, exclude.coach_event))
        .into_iter()
        .chain(player_busy(cal, player, window, exclude.player_event))
        .collect();
    record(&conflicts);
    conflicts
}

pub(crate) fn slot_full(template: &Availability, date: NaiveDate) -> Conflict {
    Conflict {
        kind: ConflictKind::CapacityFull,
        message: format!(
            "No remaining capacity on {date} {}-{} (max {} booking(s))",
            hhmm::format(&template.start_time),
            hhmm::format(&template.end_time),
            template.max_bookings
        ),
        event: None,
    }
}

pub(crate) fn event_full(event: &CalendarEvent) -> Conflict {
    Conflict {
        kind: ConflictKind::CapacityFull,
        message: format!(
            "Event {} is full ({}/{} participants)",
            event.title, event.current_count, event.max_participants
        ),
        event: Some(event.clone()),
    }
}

pub(crate) fn record(conflicts: &[Conflict]) {
    for c in conflicts {
        metrics::counter!(CONFLICTS_TOTAL, "kind" => c.kind.as_str()).increment(1);
    }
}
