use std::collections::HashMap;

use chrono::NaiveDate;
use ulid::Ulid;

use crate::model::*;

use super::EngineError;

/// One tenant's tables plus the secondary indexes the engine queries by.
///
/// Never mutated except through [`Calendar::apply`], so replaying the WAL and
/// serving live writes go through the same code path.
#[derive(Debug, Default)]
pub struct Calendar {
    coaches: HashMap<Ulid, Coach>,
    players: HashMap<Ulid, Player>,
    templates: HashMap<Ulid, Availability>,
    events: HashMap<Ulid, CalendarEvent>,
    bookings: HashMap<Ulid, Booking>,
    /// event id → participant links, in join order.
    participants: HashMap<Ulid, Vec<Participant>>,

    coach_templates: HashMap<Ulid, Vec<Ulid>>,
    coach_events: HashMap<Ulid, Vec<Ulid>>,
    player_events: HashMap<Ulid, Vec<Ulid>>,
    event_bookings: HashMap<Ulid, Vec<Ulid>>,
    template_bookings: HashMap<Ulid, Vec<Ulid>>,
}

impl Calendar {
    // ── Lookups ──────────────────────────────────────────────

    pub fn coach(&self, id: &Ulid) -> Option<&Coach> {
        self.coaches.get(id)
    }

    pub fn player(&self, id: &Ulid) -> Option<&Player> {
        self.players.get(id)
    }

    pub fn template(&self, id: &Ulid) -> Option<&Availability> {
        self.templates.get(id)
    }

    pub fn event(&self, id: &Ulid) -> Option<&CalendarEvent> {
        self.events.get(id)
    }

    pub fn booking(&self, id: &Ulid) -> Option<&Booking> {
        self.bookings.get(id)
    }

    pub fn require_coach(&self, id: &Ulid) -> Result<&Coach, EngineError> {
        self.coach(id).ok_or(EngineError::not_found("coach", *id))
    }

    pub fn require_player(&self, id: &Ulid) -> Result<&Player, EngineError> {
        self.player(id).ok_or(EngineError::not_found("player", *id))
    }

    pub fn require_template(&self, id: &Ulid) -> Result<&Availability, EngineError> {
        self.template(id).ok_or(EngineError::not_found("availability", *id))
    }

    pub fn require_event(&self, id: &Ulid) -> Result<&CalendarEvent, EngineError> {
        self.event(id).ok_or(EngineError::not_found("event", *id))
    }

    pub fn require_booking(&self, id: &Ulid) -> Result<&Booking, EngineError> {
        self.booking(id).ok_or(EngineError::not_found("booking", *id))
    }

    pub fn templates(&self) -> impl Iterator<Item = &Availability> {
        self.templates.values()
    }

    pub fn bookings(&self) -> impl Iterator<Item = &Booking> {
        self.bookings.values()
    }

    pub fn templates_of(&self, coach_id: &Ulid) -> impl Iterator<Item = &Availability> {
        self.coach_templates
            .get(coach_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.templates.get(id))
    }

    pub fn template_count(&self, coach_id: &Ulid) -> usize {
        self.coach_templates.get(coach_id).map_or(0, Vec::len)
    }

    /// Every event the coach leads, whatever its status.
    pub fn events_of_coach(&self, coach_id: &Ulid) -> impl Iterator<Item = &CalendarEvent> {
        self.coach_events
            .get(coach_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.events.get(id))
    }

    /// Events the player currently participates in (link not cancelled).
    pub fn events_of_player<'a>(&'a self, player_id: &'a Ulid) -> impl Iterator<Item = &'a CalendarEvent> {
        self.player_events
            .get(player_id)
            .into_iter()
            .flatten()
            .filter(|event_id| self.is_participant(event_id, player_id))
            .filter_map(|id| self.events.get(id))
    }

    pub fn is_participant(&self, event_id: &Ulid, player_id: &Ulid) -> bool {
        self.participants.get(event_id).is_some_and(|links| {
            links
                .iter()
                .any(|p| p.player_id == *player_id && p.status == ParticipantStatus::Confirmed)
        })
    }

    pub fn participants_of(&self, event_id: &Ulid) -> &[Participant] {
        self.participants.get(event_id).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn bookings_on(&self, event_id: &Ulid) -> impl Iterator<Item = &Booking> {
        self.event_bookings
            .get(event_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.bookings.get(id))
    }

    pub fn bookings_of_template(&self, availability_id: &Ulid) -> impl Iterator<Item = &Booking> {
        self.template_bookings
            .get(availability_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.bookings.get(id))
    }

    /// Pending/confirmed bookings on an event, optionally ignoring one.
    pub fn live_bookings_on(&self, event_id: &Ulid, skip: Option<Ulid>) -> usize {
        self.bookings_on(event_id)
            .filter(|b| b.status.is_live() && Some(b.id) != skip)
            .count()
    }

    pub fn completed_bookings_on(&self, event_id: &Ulid) -> usize {
        self.bookings_on(event_id)
            .filter(|b| b.status == BookingStatus::Completed)
            .count()
    }

    // ── Capacity ─────────────────────────────────────────────

    /// Seats taken on one dated slot of a template: non-cancelled bookings
    /// that reference it and sit on a non-cancelled event starting on `date`.
    /// A completed session keeps its seat. Always recounted, never cached.
    pub fn booked_count(&self, availability_id: &Ulid, date: NaiveDate, skip: Option<Ulid>) -> u32 {
        self.bookings_of_template(availability_id)
            .filter(|b| b.status != BookingStatus::Cancelled && Some(b.id) != skip)
            .filter_map(|b| self.events.get(&b.event_id))
            .filter(|e| e.status.is_active() && e.start_time.date() == date)
            .count() as u32
    }

    /// Seats taken per `(template, date)` for every template of a coach, over
    /// `[from, to]` inclusive.
    pub fn taken_slots(&self, coach_id: &Ulid, from: NaiveDate, to: NaiveDate) -> HashMap<(Ulid, NaiveDate), u32> {
        let mut taken = HashMap::new();
        for template in self.templates_of(coach_id) {
            for booking in self.bookings_of_template(&template.id) {
                if booking.status == BookingStatus::Cancelled {
                    continue;
                }
                let Some(event) = self.events.get(&booking.event_id) else {
                    continue;
                };
                let date = event.start_time.date();
                if event.status.is_active() && from <= date && date <= to {
                    *taken.entry((template.id, date)).or_insert(0) += 1;
                }
            }
        }
        taken
    }

    // ── Change application ───────────────────────────────────

    pub fn apply(&mut self, change: &Change) {
        match change {
            Change::CoachRegistered(coach) => {
                self.coaches.insert(coach.id, coach.clone());
            }
            Change::PlayerRegistered(player) => {
                self.players.insert(player.id, player.clone());
            }
            Change::AvailabilityCreated(a) => {
                self.coach_templates.entry(a.coach_id).or_default().push(a.id);
                self.templates.insert(a.id, a.clone());
            }
            Change::AvailabilityUpdated(a) => {
                self.templates.insert(a.id, a.clone());
            }
            Change::AvailabilityDeleted { id, coach_id } => {
                self.templates.remove(id);
                if let Some(ids) = self.coach_templates.get_mut(coach_id) {
                    ids.retain(|t| t != id);
                }
                self.template_bookings.remove(id);
            }
            Change::EventScheduled(e) => {
                if let Some(coach_id) = e.coach_id {
                    self.coach_events.entry(coach_id).or_default().push(e.id);
                }
                self.events.insert(e.id, e.clone());
            }
            Change::EventUpdated(e) => {
                self.events.insert(e.id, e.clone());
            }
            Change::BookingCreated(b) => {
                self.event_bookings.entry(b.event_id).or_default().push(b.id);
                if let Some(aid) = b.availability_id {
                    self.template_bookings.entry(aid).or_default().push(b.id);
                }
                self.bookings.insert(b.id, b.clone());
            }
            Change::BookingUpdated(b) => {
                self.bookings.insert(b.id, b.clone());
            }
            Change::ParticipantJoined(p) => {
                let links = self.participants.entry(p.event_id).or_default();
                match links.iter_mut().find(|l| l.player_id == p.player_id) {
                    Some(existing) => existing.status = p.status,
                    None => {
                        links.push(p.clone());
                        self.player_events.entry(p.player_id).or_default().push(p.event_id);
                    }
                }
            }
            Change::ParticipantLeft { event_id, player_id } => {
                if let Some(link) = self
                    .participants
                    .get_mut(event_id)
                    .and_then(|links| links.iter_mut().find(|l| l.player_id == *player_id))
                {
                    link.status = ParticipantStatus::Cancelled;
                }
            }
        }
    }

    /// Coach/player ids whose notification channels a change concerns.
    pub fn audience(&self, change: &Change) -> Vec<Ulid> {
        let mut ids = Vec::new();
        match change {
            Change::CoachRegistered(c) => ids.push(c.id),
            Change::PlayerRegistered(p) => ids.push(p.id),
            Change::AvailabilityCreated(a) | Change::AvailabilityUpdated(a) => ids.push(a.coach_id),
            Change::AvailabilityDeleted { coach_id, .. } => ids.push(*coach_id),
            Change::EventScheduled(e) | Change::EventUpdated(e) => {
                ids.extend(e.coach_id);
                ids.extend(self.participants_of(&e.id).iter().map(|p| p.player_id));
            }
            Change::BookingCreated(b) | Change::BookingUpdated(b) => {
                ids.push(b.player_id);
                ids.extend(self.events.get(&b.event_id).and_then(|e| e.coach_id));
            }
            Change::ParticipantJoined(Participant { event_id, player_id, .. })
            | Change::ParticipantLeft { event_id, player_id } => {
                ids.push(*player_id);
                ids.extend(self.events.get(event_id).and_then(|e| e.coach_id));
            }
        }
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Minimal change list that rebuilds the current state.
    pub fn snapshot(&self) -> Vec<Change> {
        let mut changes = Vec::with_capacity(
            self.coaches.len() + self.players.len() + self.templates.len() + self.events.len() + self.bookings.len(),
        );
        changes.extend(self.coaches.values().cloned().map(Change::CoachRegistered));
        changes.extend(self.players.values().cloned().map(Change::PlayerRegistered));
        changes.extend(self.templates.values().cloned().map(Change::AvailabilityCreated));
        changes.extend(self.events.values().cloned().map(Change::EventScheduled));
        changes.extend(self.bookings.values().cloned().map(Change::BookingCreated));
        changes.extend(
            self.participants
                .values()
                .flatten()
                .cloned()
                .map(Change::ParticipantJoined),
        );
        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn ts(s: &str) -> Timestamp {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn event(coach_id: Ulid, start: &str, end: &str) -> CalendarEvent {
        CalendarEvent {
            id: Ulid::new(),
            coach_id: Some(coach_id),
            title: "Session".into(),
            location: None,
            session_type: None,
            start_time: ts(start),
            end_time: ts(end),
            max_participants: 1,
            current_count: 1,
            status: EventStatus::Scheduled,
            created_at: ts("2030-01-01 00:00"),
        }
    }

    fn booking(event_id: Ulid, player_id: Ulid, availability_id: Option<Ulid>) -> Booking {
        Booking {
            id: Ulid::new(),
            event_id,
            player_id,
            availability_id,
            booked_by: player_id,
            booked_at: ts("2030-01-01 00:00"),
            status: BookingStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_amount: None,
            notes: None,
            confirmed_at: None,
            cancelled_at: None,
            cancellation_reason: None,
        }
    }

    #[test]
    fn participant_left_hides_event_from_player() {
        let mut cal = Calendar::default();
        let coach = Ulid::new();
        let player = Ulid::new();
        let e = event(coach, "2030-01-07 09:00", "2030-01-07 10:00");
        cal.apply(&Change::EventScheduled(e.clone()));
        cal.apply(&Change::ParticipantJoined(Participant {
            event_id: e.id,
            player_id: player,
            status: ParticipantStatus::Confirmed,
        }));
        assert_eq!(cal.events_of_player(&player).count(), 1);

        cal.apply(&Change::ParticipantLeft { event_id: e.id, player_id: player });
        assert_eq!(cal.events_of_player(&player).count(), 0);
        assert_eq!(cal.participants_of(&e.id).len(), 1);
    }

    #[test]
    fn booked_count_ignores_cancelled_and_other_dates() {
        let mut cal = Calendar::default();
        let coach = Ulid::new();
        let template = Ulid::new();

        let monday = event(coach, "2030-01-07 09:00", "2030-01-07 09:30");
        let next_monday = event(coach, "2030-01-14 09:00", "2030-01-14 09:30");
        let mut cancelled = event(coach, "2030-01-07 09:30", "2030-01-07 10:00");
        cancelled.status = EventStatus::Cancelled;
        for e in [&monday, &next_monday, &cancelled] {
            cal.apply(&Change::EventScheduled(e.clone()));
        }

        let kept = booking(monday.id, Ulid::new(), Some(template));
        cal.apply(&Change::BookingCreated(kept.clone()));
        cal.apply(&Change::BookingCreated(booking(next_monday.id, Ulid::new(), Some(template))));
        cal.apply(&Change::BookingCreated(booking(cancelled.id, Ulid::new(), Some(template))));

        let date = monday.start_time.date();
        assert_eq!(cal.booked_count(&template, date, None), 1);
        assert_eq!(cal.booked_count(&template, date, Some(kept.id)), 0);
    }

    #[test]
    fn audience_covers_coach_and_player() {
        let mut cal = Calendar::default();
        let coach = Ulid::new();
        let player = Ulid::new();
        let e = event(coach, "2030-01-07 09:00", "2030-01-07 10:00");
        cal.apply(&Change::EventScheduled(e.clone()));
        let b = booking(e.id, player, None);
        let change = Change::BookingCreated(b);
        cal.apply(&change);

        let mut expected = vec![coach, player];
        expected.sort_unstable();
        assert_eq!(cal.audience(&change), expected);
    }

    #[test]
    fn snapshot_rebuilds_state() {
        let mut cal = Calendar::default();
        let coach = Ulid::new();
        let player = Ulid::new();
        cal.apply(&Change::CoachRegistered(Coach { id: coach, name: "Ada".into() }));
        cal.apply(&Change::PlayerRegistered(Player { id: player, name: "Bo".into() }));
        let e = event(coach, "2030-01-07 09:00", "2030-01-07 10:00");
        cal.apply(&Change::EventScheduled(e.clone()));
        let mut b = booking(e.id, player, None);
        cal.apply(&Change::BookingCreated(b.clone()));
        cal.apply(&Change::ParticipantJoined(Participant {
            event_id: e.id,
            player_id: player,
            status: ParticipantStatus::Confirmed,
        }));
        b.status = BookingStatus::Cancelled;
        cal.apply(&Change::BookingUpdated(b.clone()));
        cal.apply(&Change::ParticipantLeft { event_id: e.id, player_id: player });

        let mut rebuilt = Calendar::default();
        for change in cal.snapshot() {
            rebuilt.apply(&change);
        }
        assert_eq!(rebuilt.booking(&b.id), Some(&b));
        assert_eq!(rebuilt.events_of_coach(&coach).count(), 1);
        assert!(!rebuilt.is_participant(&e.id, &player));
        assert_eq!(rebuilt.coach(&coach).map(|c| c.name.as_str()), Some("Ada"));
    }
}
