use tracing::info;
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;

use super::availability::{check_overlap, validate_template};
use super::conflict::{self, coach_busy, detect_conflicts, event_full, now, slot_full, validate_window, Exclude};
use super::slots::remaining_capacity;
use super::{Engine, EngineError};

fn required_text(value: &str, field: &str, max: usize) -> Result<String, EngineError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::Validation(format!("{field} is required")));
    }
    if trimmed.len() > max {
        return Err(EngineError::Validation(format!("{field} exceeds {max} bytes")));
    }
    Ok(trimmed.to_string())
}

/// Blank counts as absent.
fn optional_text(value: Option<String>, field: &str, max: usize) -> Result<Option<String>, EngineError> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => required_text(v, field, max).map(Some),
    }
}

fn check_amount(amount: Option<i64>) -> Result<(), EngineError> {
    match amount {
        Some(a) if a < 0 => Err(EngineError::Validation("payment_amount must not be negative".into())),
        _ => Ok(()),
    }
}

fn invalid_booking_state(booking: &Booking, action: &'static str) -> EngineError {
    EngineError::InvalidState {
        entity: "booking",
        id: booking.id,
        status: booking.status.as_str(),
        action,
    }
}

impl Engine {
    // ── Directory ────────────────────────────────────────────

    pub async fn register_coach(&self, id: Ulid, name: &str) -> Result<Coach, EngineError> {
        let name = required_text(name, "name", MAX_NAME_LEN)?;
        let mut cal = self.state.write().await;
        let coach = Coach { id, name };
        self.commit(&mut cal, vec![Change::CoachRegistered(coach.clone())]).await?;
        Ok(coach)
    }

    pub async fn register_player(&self, id: Ulid, name: &str) -> Result<Player, EngineError> {
        let name = required_text(name, "name", MAX_NAME_LEN)?;
        let mut cal = self.state.write().await;
        let player = Player { id, name };
        self.commit(&mut cal, vec![Change::PlayerRegistered(player.clone())]).await?;
        Ok(player)
    }

    // ── Availability templates ───────────────────────────────

    pub async fn create_availability(&self, new: NewAvailability) -> Result<Availability, EngineError> {
        let session_type = optional_text(new.session_type, "session_type", MAX_NAME_LEN)?;
        let at = now();
        let template = Availability {
            id: Ulid::new(),
            coach_id: new.coach_id,
            day_of_week: new.day_of_week,
            start_time: new.start_time,
            end_time: new.end_time,
            slot_duration: new.slot_duration,
            max_bookings: new.max_bookings,
            session_type,
            is_active: true,
            valid_from: new.valid_from,
            valid_until: new.valid_until,
            created_at: at,
            updated_at: at,
        };

        let mut cal = self.state.write().await;
        cal.require_coach(&template.coach_id)?;
        validate_template(&template)?;
        if cal.template_count(&template.coach_id) >= MAX_TEMPLATES_PER_COACH {
            return Err(EngineError::LimitExceeded("too many availability templates for coach"));
        }
        check_overlap(&cal, &template)?;

        self.commit(&mut cal, vec![Change::AvailabilityCreated(template.clone())]).await?;
        info!(
            availability_id = %template.id,
            coach_id = %template.coach_id,
            day_of_week = template.day_of_week,
            "availability created"
        );
        Ok(template)
    }

    pub async fn update_availability(&self, id: Ulid, patch: AvailabilityPatch) -> Result<Availability, EngineError> {
        let session_type = match patch.session_type {
            Some(st) => Some(optional_text(st, "session_type", MAX_NAME_LEN)?),
            None => None,
        };

        let mut cal = self.state.write().await;
        let current = cal.require_template(&id)?.clone();
        let mut next = current.clone();
        if let Some(d) = patch.day_of_week {
            next.day_of_week = d;
        }
        if let Some(t) = patch.start_time {
            next.start_time = t;
        }
        if let Some(t) = patch.end_time {
            next.end_time = t;
        }
        if let Some(m) = patch.slot_duration {
            next.slot_duration = m;
        }
        if let Some(m) = patch.max_bookings {
            next.max_bookings = m;
        }
        if let Some(st) = session_type {
            next.session_type = st;
        }
        if let Some(active) = patch.is_active {
            next.is_active = active;
        }
        if let Some(from) = patch.valid_from {
            next.valid_from = from;
        }
        if let Some(until) = patch.valid_until {
            next.valid_until = until;
        }
        next.updated_at = now();

        validate_template(&next)?;
        let moved = next.window() != current.window()
            || next.day_of_week != current.day_of_week
            || (next.is_active && !current.is_active);
        if moved {
            check_overlap(&cal, &next)?;
        }

        self.commit(&mut cal, vec![Change::AvailabilityUpdated(next.clone())]).await?;
        info!(availability_id = %id, "availability updated");
        Ok(next)
    }

    /// Refused while any non-cancelled booking made from this template sits
    /// on a non-cancelled event that has not started yet.
    pub async fn delete_availability(&self, id: Ulid) -> Result<(), EngineError> {
        let mut cal = self.state.write().await;
        let template = cal.require_template(&id)?;
        let coach_id = template.coach_id;
        let at = now();
        let count = cal
            .bookings_of_template(&id)
            .filter(|b| b.status != BookingStatus::Cancelled)
            .filter_map(|b| cal.event(&b.event_id))
            .filter(|e| e.status.is_active() && e.start_time > at)
            .count();
        if count > 0 {
            return Err(EngineError::AvailabilityInUse { id, count });
        }

        self.commit(&mut cal, vec![Change::AvailabilityDeleted { id, coach_id }]).await?;
        info!(availability_id = %id, coach_id = %coach_id, "availability deleted");
        Ok(())
    }

    // ── Calendar events ──────────────────────────────────────

    /// Schedule an event (typically a group session) that bookings can join.
    pub async fn schedule_event(&self, new: NewEvent) -> Result<CalendarEvent, EngineError> {
        let title = required_text(&new.title, "title", MAX_NAME_LEN)?;
        let location = optional_text(new.location, "location", MAX_NAME_LEN)?;
        let session_type = optional_text(new.session_type, "session_type", MAX_NAME_LEN)?;
        let window = validate_window(new.start_time, new.end_time)?;
        if !(1..=MAX_EVENT_PARTICIPANTS).contains(&new.max_participants) {
            return Err(EngineError::Validation(format!(
                "max_participants must be between 1 and {MAX_EVENT_PARTICIPANTS}"
            )));
        }

        let mut cal = self.state.write().await;
        if let Some(coach_id) = new.coach_id {
            let coach = cal.require_coach(&coach_id)?;
            if let Some(c) = coach_busy(&cal, coach, &window, None) {
                conflict::record(std::slice::from_ref(&c));
                return Err(EngineError::Conflict(vec![c]));
            }
        }

        let event = CalendarEvent {
            id: Ulid::new(),
            coach_id: new.coach_id,
            title,
            location,
            session_type,
            start_time: window.start,
            end_time: window.end,
            max_participants: new.max_participants,
            current_count: 0,
            status: EventStatus::Scheduled,
            created_at: now(),
        };
        self.commit(&mut cal, vec![Change::EventScheduled(event.clone())]).await?;
        info!(event_id = %event.id, "event scheduled");
        Ok(event)
    }

    /// Cancel an event together with every pending/confirmed booking on it.
    /// Refused once any session on it has been completed.
    pub async fn cancel_event(&self, id: Ulid, reason: &str) -> Result<CalendarEvent, EngineError> {
        let reason = required_text(reason, "reason", MAX_TEXT_LEN)?;

        let mut cal = self.state.write().await;
        let mut event = cal.require_event(&id)?.clone();
        if !event.status.accepts_bookings() {
            return Err(EngineError::InvalidState {
                entity: "event",
                id,
                status: event.status.as_str(),
                action: "cancel",
            });
        }
        if cal.completed_bookings_on(&id) > 0 {
            return Err(EngineError::InvalidState {
                entity: "event",
                id,
                status: "partially_completed",
                action: "cancel",
            });
        }

        let at = now();
        let mut changes = Vec::new();
        for booking in cal.bookings_on(&id).filter(|b| b.status.is_live()) {
            let mut cancelled = booking.clone();
            cancelled.status = BookingStatus::Cancelled;
            cancelled.cancelled_at = Some(at);
            cancelled.cancellation_reason = Some(reason.clone());
            changes.push(Change::BookingUpdated(cancelled));
            changes.push(Change::ParticipantLeft {
                event_id: id,
                player_id: booking.player_id,
            });
        }
        let cascaded = changes.len() / 2;
        event.status = EventStatus::Cancelled;
        event.current_count = 0;
        changes.push(Change::EventUpdated(event.clone()));

        self.commit(&mut cal, changes).await?;
        info!(event_id = %id, bookings = cascaded, "event cancelled");
        Ok(event)
    }

    // ── Bookings ─────────────────────────────────────────────

    /// Create a pending booking.
    ///
    /// With `event_id` the player joins that event; otherwise a
    /// single-participant event is created for the booking. Event, booking and
    /// participant link commit as one WAL record. All conflict and capacity
    /// checks run under the write lock.
    pub async fn create_booking(&self, booked_by: Ulid, req: NewBooking) -> Result<Booking, EngineError> {
        let window = validate_window(req.start_time, req.end_time)?;
        let session_type = required_text(&req.session_type, "session_type", MAX_NAME_LEN)?;
        let notes = optional_text(req.notes, "notes", MAX_TEXT_LEN)?;
        let title = optional_text(req.title, "title", MAX_NAME_LEN)?;
        let location = optional_text(req.location, "location", MAX_NAME_LEN)?;
        check_amount(req.payment_amount)?;
        if req.event_id.is_some() && req.availability_id.is_some() {
            return Err(EngineError::Validation(
                "availability_id and event_id cannot both be set".into(),
            ));
        }

        let mut cal = self.state.write().await;
        let coach = cal.require_coach(&req.coach_id)?.clone();
        let player = cal.require_player(&req.player_id)?.clone();
        let at = now();

        let mut booking = Booking {
            id: Ulid::new(),
            event_id: Ulid::nil(),
            player_id: player.id,
            availability_id: req.availability_id,
            booked_by,
            booked_at: at,
            status: BookingStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_amount: req.payment_amount,
            notes,
            confirmed_at: None,
            cancelled_at: None,
            cancellation_reason: None,
        };

        let (event_id, event_change) = match req.event_id {
            Some(event_id) => {
                let mut event = cal.require_event(&event_id)?.clone();
                if event.span() != window {
                    return Err(EngineError::Validation(format!(
                        "start_time/end_time must match event {event_id}"
                    )));
                }
                if event.coach_id.is_some_and(|c| c != coach.id) {
                    return Err(EngineError::Validation(format!(
                        "event {event_id} belongs to another coach"
                    )));
                }
                if !event.status.accepts_bookings() {
                    return Err(EngineError::InvalidState {
                        entity: "event",
                        id: event_id,
                        status: event.status.as_str(),
                        action: "book",
                    });
                }

                let mut conflicts =
                    detect_conflicts(&cal, Some(&coach), &player, &window, Exclude::joining(event_id));
                if event.is_full() {
                    let full = event_full(&event);
                    conflict::record(std::slice::from_ref(&full));
                    conflicts.push(full);
                }
                if !conflicts.is_empty() {
                    tracing::debug!(event_id = %event_id, player_id = %player.id, "booking rejected");
                    return Err(EngineError::Conflict(conflicts));
                }

                event.current_count += 1;
                (event_id, Change::EventUpdated(event))
            }
            None => {
                let template = match req.availability_id {
                    Some(aid) => {
                        let t = cal
                            .template(&aid)
                            .filter(|t| t.is_active && t.coach_id == coach.id)
                            .ok_or(EngineError::not_found("availability", aid))?;
                        if !t.covers(&window) {
                            return Err(EngineError::Validation(format!(
                                "booking window is outside availability {aid}"
                            )));
                        }
                        Some(t)
                    }
                    None => None,
                };

                let mut conflicts = detect_conflicts(&cal, Some(&coach), &player, &window, Exclude::nothing());
                if let Some(t) = template {
                    let date = window.start.date();
                    let booked = cal.booked_count(&t.id, date, None);
                    if remaining_capacity(t.max_bookings, booked) == 0 {
                        let full = slot_full(t, date);
                        conflict::record(std::slice::from_ref(&full));
                        conflicts.push(full);
                    }
                }
                if !conflicts.is_empty() {
                    tracing::debug!(coach_id = %coach.id, player_id = %player.id, "booking rejected");
                    return Err(EngineError::Conflict(conflicts));
                }

                let event_id = Ulid::new();
                let event = CalendarEvent {
                    id: event_id,
                    coach_id: Some(coach.id),
                    title: title.unwrap_or_else(|| format!("Training Session - {session_type}")),
                    location,
                    session_type: Some(session_type),
                    start_time: window.start,
                    end_time: window.end,
                    max_participants: 1,
                    current_count: 1,
                    status: EventStatus::Scheduled,
                    created_at: at,
                };
                (event_id, Change::EventScheduled(event))
            }
        };

        booking.event_id = event_id;
        let participant = Participant {
            event_id,
            player_id: player.id,
            status: ParticipantStatus::Confirmed,
        };
        let changes = vec![
            event_change,
            Change::BookingCreated(booking.clone()),
            Change::ParticipantJoined(participant),
        ];

        self.commit(&mut cal, changes).await?;
        metrics::counter!(crate::observability::BOOKINGS_TOTAL, "transition" => "created").increment(1);
        info!(
            booking_id = %booking.id,
            event_id = %booking.event_id,
            coach_id = %coach.id,
            player_id = %player.id,
            "booking created"
        );
        Ok(booking)
    }

    /// Update a booking and its event in one commit. A time change re-runs
    /// the conflict checks with the booking's own event excluded.
    pub async fn update_booking(&self, id: Ulid, patch: BookingPatch) -> Result<Booking, EngineError> {
        let notes = patch
            .notes
            .map(|n| optional_text(n, "notes", MAX_TEXT_LEN))
            .transpose()?;
        let location = patch
            .location
            .map(|l| optional_text(l, "location", MAX_NAME_LEN))
            .transpose()?;
        check_amount(patch.payment_amount.flatten())?;

        let mut cal = self.state.write().await;
        let mut booking = cal.require_booking(&id)?.clone();
        if booking.status == BookingStatus::Cancelled {
            return Err(invalid_booking_state(&booking, "update"));
        }
        let mut event = cal.require_event(&booking.event_id)?.clone();
        let original_event = event.clone();

        let start = patch.start_time.unwrap_or(event.start_time);
        let end = patch.end_time.unwrap_or(event.end_time);
        if start != event.start_time || end != event.end_time {
            let window = validate_window(start, end)?;
            if booking.status == BookingStatus::Completed {
                return Err(invalid_booking_state(&booking, "reschedule"));
            }
            if cal.live_bookings_on(&event.id, Some(id)) + cal.completed_bookings_on(&event.id) > 0 {
                return Err(EngineError::InvalidState {
                    entity: "event",
                    id: event.id,
                    status: "shared",
                    action: "reschedule",
                });
            }

            let coach = match event.coach_id {
                Some(coach_id) => Some(cal.require_coach(&coach_id)?),
                None => None,
            };
            let player = cal.require_player(&booking.player_id)?;
            let mut conflicts = detect_conflicts(&cal, coach, player, &window, Exclude::booking(&cal, Some(id)));

            if let Some(template) = booking.availability_id.and_then(|aid| cal.template(&aid)) {
                if !template.covers(&window) {
                    return Err(EngineError::Validation(format!(
                        "booking window is outside availability {}",
                        template.id
                    )));
                }
                let date = window.start.date();
                if date != event.start_time.date()
                    && remaining_capacity(template.max_bookings, cal.booked_count(&template.id, date, Some(id))) == 0
                {
                    let full = slot_full(template, date);
                    conflict::record(std::slice::from_ref(&full));
                    conflicts.push(full);
                }
            }
            if !conflicts.is_empty() {
                return Err(EngineError::Conflict(conflicts));
            }

            event.start_time = window.start;
            event.end_time = window.end;
        }
        if let Some(location) = location {
            event.location = location;
        }

        if let Some(ps) = patch.payment_status {
            booking.payment_status = ps;
        }
        if let Some(amount) = patch.payment_amount {
            booking.payment_amount = amount;
        }
        if let Some(notes) = notes {
            booking.notes = notes;
        }

        let mut changes = Vec::with_capacity(2);
        if event != original_event {
            changes.push(Change::EventUpdated(event));
        }
        changes.push(Change::BookingUpdated(booking.clone()));
        self.commit(&mut cal, changes).await?;
        info!(booking_id = %id, "booking updated");
        Ok(booking)
    }

    pub async fn confirm_booking(&self, id: Ulid) -> Result<Booking, EngineError> {
        let mut cal = self.state.write().await;
        let mut booking = cal.require_booking(&id)?.clone();
        if booking.status != BookingStatus::Pending {
            return Err(invalid_booking_state(&booking, "confirm"));
        }
        let mut event = cal.require_event(&booking.event_id)?.clone();

        booking.status = BookingStatus::Confirmed;
        booking.confirmed_at.get_or_insert_with(now);
        let mut changes = vec![Change::BookingUpdated(booking.clone())];
        if event.status == EventStatus::Scheduled {
            event.status = EventStatus::Confirmed;
            changes.push(Change::EventUpdated(event));
        }

        self.commit(&mut cal, changes).await?;
        metrics::counter!(crate::observability::BOOKINGS_TOTAL, "transition" => "confirmed").increment(1);
        info!(booking_id = %id, "booking confirmed");
        Ok(booking)
    }

    /// Cancel a pending or confirmed booking. Frees its seat. Once no live
    /// booking remains, the event is cancelled, or completed if a session on
    /// it already was. Never re-validates conflicts.
    pub async fn cancel_booking(&self, id: Ulid, reason: &str) -> Result<Booking, EngineError> {
        let reason = required_text(reason, "reason", MAX_TEXT_LEN)?;

        let mut cal = self.state.write().await;
        let mut booking = cal.require_booking(&id)?.clone();
        if !booking.status.is_live() {
            return Err(invalid_booking_state(&booking, "cancel"));
        }
        let mut event = cal.require_event(&booking.event_id)?.clone();

        booking.status = BookingStatus::Cancelled;
        booking.cancelled_at = Some(now());
        booking.cancellation_reason = Some(reason);
        event.current_count = event.current_count.saturating_sub(1);
        if cal.live_bookings_on(&event.id, Some(id)) == 0 {
            event.status = if cal.completed_bookings_on(&event.id) > 0 {
                EventStatus::Completed
            } else {
                EventStatus::Cancelled
            };
        }

        let changes = vec![
            Change::BookingUpdated(booking.clone()),
            Change::ParticipantLeft {
                event_id: event.id,
                player_id: booking.player_id,
            },
            Change::EventUpdated(event),
        ];
        self.commit(&mut cal, changes).await?;
        metrics::counter!(crate::observability::BOOKINGS_TOTAL, "transition" => "cancelled").increment(1);
        info!(booking_id = %id, "booking cancelled");
        Ok(booking)
    }

    /// `confirmed → completed`. The event completes with its last live booking.
    pub async fn complete_booking(&self, id: Ulid) -> Result<Booking, EngineError> {
        let mut cal = self.state.write().await;
        let mut booking = cal.require_booking(&id)?.clone();
        if booking.status != BookingStatus::Confirmed {
            return Err(invalid_booking_state(&booking, "complete"));
        }
        let mut event = cal.require_event(&booking.event_id)?.clone();

        booking.status = BookingStatus::Completed;
        let mut changes = vec![Change::BookingUpdated(booking.clone())];
        if cal.live_bookings_on(&event.id, Some(id)) == 0 && event.status.accepts_bookings() {
            event.status = EventStatus::Completed;
            changes.push(Change::EventUpdated(event));
        }

        self.commit(&mut cal, changes).await?;
        metrics::counter!(crate::observability::BOOKINGS_TOTAL, "transition" => "completed").increment(1);
        info!(booking_id = %id, "booking completed");
        Ok(booking)
    }
}
