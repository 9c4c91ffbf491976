use std::cmp::Ordering;

use chrono::NaiveDate;
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;

use super::availability::matches_filter;
use super::conflict::{detect_conflicts, validate_window, Exclude};
use super::slots::materialize_slots;
use super::{Engine, EngineError};

impl Engine {
    pub async fn get_coach(&self, id: Ulid) -> Result<Coach, EngineError> {
        let cal = self.state.read().await;
        cal.require_coach(&id).cloned()
    }

    pub async fn get_player(&self, id: Ulid) -> Result<Player, EngineError> {
        let cal = self.state.read().await;
        cal.require_player(&id).cloned()
    }

    pub async fn get_availability(&self, id: Ulid) -> Result<Availability, EngineError> {
        let cal = self.state.read().await;
        cal.require_template(&id).cloned()
    }

    /// Templates matching `filter`, ordered by weekday then start time.
    pub async fn list_availability(&self, filter: &AvailabilityFilter) -> Result<Vec<Availability>, EngineError> {
        if let (Some(from), Some(to)) = (filter.from, filter.to)
            && to < from
        {
            return Err(EngineError::InvalidRange {
                start: from.to_string(),
                end: to.to_string(),
            });
        }
        let cal = self.state.read().await;
        let mut templates: Vec<Availability> = match filter.coach_id {
            Some(coach_id) => cal
                .templates_of(&coach_id)
                .filter(|a| matches_filter(a, filter))
                .cloned()
                .collect(),
            None => cal.templates().filter(|a| matches_filter(a, filter)).cloned().collect(),
        };
        templates.sort_by_key(|a| (a.coach_id, a.day_of_week, a.start_time, a.id));
        Ok(templates)
    }

    /// Bookable slots for a coach over `[start, end]` inclusive, ordered by
    /// date then start time.
    pub async fn available_slots(
        &self,
        coach_id: Ulid,
        start: NaiveDate,
        end: NaiveDate,
        session_type: Option<&str>,
    ) -> Result<Vec<Slot>, EngineError> {
        if end < start {
            return Err(EngineError::InvalidRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        if (end - start).num_days() >= MAX_QUERY_DAYS {
            return Err(EngineError::LimitExceeded("slot query range too wide"));
        }

        let cal = self.state.read().await;
        cal.require_coach(&coach_id)?;
        let taken = cal.taken_slots(&coach_id, start, end);
        let templates = cal
            .templates_of(&coach_id)
            .filter(|t| session_type.is_none_or(|st| t.session_type.as_deref() == Some(st)));
        Ok(materialize_slots(templates, &taken, start, end))
    }

    /// Advisory conflict check. Writes repeat it under the write lock.
    pub async fn check_conflicts(
        &self,
        coach_id: Ulid,
        player_id: Ulid,
        start: Timestamp,
        end: Timestamp,
        exclude_booking: Option<Ulid>,
    ) -> Result<ConflictReport, EngineError> {
        let window = validate_window(start, end)?;
        let cal = self.state.read().await;
        let coach = cal.require_coach(&coach_id)?;
        let player = cal.require_player(&player_id)?;
        let conflicts = detect_conflicts(&cal, Some(coach), player, &window, Exclude::booking(&cal, exclude_booking));
        Ok(ConflictReport::new(conflicts))
    }

    pub async fn get_event(&self, id: Ulid) -> Result<CalendarEvent, EngineError> {
        let cal = self.state.read().await;
        cal.require_event(&id).cloned()
    }

    pub async fn get_booking(&self, id: Ulid) -> Result<BookingDetails, EngineError> {
        let cal = self.state.read().await;
        let booking = cal.require_booking(&id)?.clone();
        let event = cal.require_event(&booking.event_id)?.clone();
        Ok(BookingDetails { booking, event })
    }

    pub async fn list_bookings(&self, query: &BookingQuery) -> Result<BookingPage, EngineError> {
        if query.page == 0 {
            return Err(EngineError::Validation("page starts at 1".into()));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&query.limit) {
            return Err(EngineError::Validation(format!("limit must be between 1 and {MAX_PAGE_SIZE}")));
        }

        let cal = self.state.read().await;
        let mut rows: Vec<(&Booking, &CalendarEvent)> = cal
            .bookings()
            .filter_map(|b| cal.event(&b.event_id).map(|e| (b, e)))
            .filter(|(b, e)| {
                query.player_id.is_none_or(|p| p == b.player_id)
                    && query.coach_id.is_none_or(|c| e.coach_id == Some(c))
                    && query.status.is_none_or(|s| s == b.status)
                    && query.from.is_none_or(|from| e.start_time >= from)
                    && query.to.is_none_or(|to| e.end_time <= to)
                    && query
                        .session_type
                        .as_deref()
                        .is_none_or(|st| e.session_type.as_deref() == Some(st))
            })
            .collect();

        rows.sort_by(|a, b| {
            let ord = match query.sort_by {
                BookingSort::EventStart => a.1.start_time.cmp(&b.1.start_time),
                BookingSort::BookedAt => a.0.booked_at.cmp(&b.0.booked_at),
                BookingSort::Status => a.0.status.cmp(&b.0.status),
            };
            let ord = match query.order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            };
            // Ties stay deterministic across pages
            if ord == Ordering::Equal { a.0.id.cmp(&b.0.id) } else { ord }
        });

        let total = rows.len();
        let limit = query.limit as usize;
        let total_pages = total.div_ceil(limit);
        let offset = (query.page as usize - 1).saturating_mul(limit);
        let bookings = rows
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|(b, e)| BookingDetails {
                booking: b.clone(),
                event: e.clone(),
            })
            .collect();

        Ok(BookingPage {
            bookings,
            page: query.page,
            limit: query.limit,
            total,
            total_pages,
        })
    }
}
