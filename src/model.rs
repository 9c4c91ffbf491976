use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize};
use ulid::Ulid;

use crate::limits::DEFAULT_PAGE_SIZE;

/// Absolute instant in the tenant's canonical zone. No offsets, no conversion.
pub type Timestamp = NaiveDateTime;

/// Half-open interval `[start, end)`.
///
/// Used for time-of-day windows (`Span<NaiveTime>`) as well as absolute
/// windows (`Span<Timestamp>`); every overlap question in the engine is
/// answered by [`Span::overlaps`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span<T> {
    pub start: T,
    pub end: T,
}

impl<T: Ord + Copy> Span<T> {
    pub fn new(start: T, end: T) -> Self {
        debug_assert!(start < end, "Span start must be before end");
        Self { start, end }
    }

    /// `None` when `start >= end`.
    pub fn try_new(start: T, end: T) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }

    /// Back-to-back spans (`a.end == b.start`) do not overlap.
    pub fn overlaps(&self, other: &Span<T>) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Returns true if `self` fully contains `other`.
    pub fn contains_span(&self, other: &Span<T>) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// 0 = Sunday … 6 = Saturday.
pub fn day_of_week(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

/// Zero-padded `"HH:MM"` time-of-day encoding.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M";

    pub fn parse(raw: &str) -> Result<NaiveTime, String> {
        if raw.len() != 5 {
            return Err(format!("expected HH:MM, got {raw:?}"));
        }
        NaiveTime::parse_from_str(raw, FORMAT).map_err(|e| format!("bad time {raw:?}: {e}"))
    }

    pub fn format(t: &NaiveTime) -> String {
        t.format(FORMAT).to_string()
    }

    pub fn serialize<S: Serializer>(t: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format(t))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use chrono::NaiveTime;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(t: &Option<NaiveTime>, s: S) -> Result<S::Ok, S::Error> {
            match t {
                Some(t) => s.serialize_some(&super::format(t)),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveTime>, D::Error> {
            match Option::<String>::deserialize(d)? {
                Some(raw) => super::parse(&raw).map(Some).map_err(serde::de::Error::custom),
                None => Ok(None),
            }
        }
    }
}

/// Distinguishes an absent patch field (`None`) from an explicit `null`
/// (`Some(None)`, i.e. "clear this field").
fn explicit_null<'de, D, T>(d: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(d).map(Some)
}

// ── Directory ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coach {
    pub id: Ulid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: Ulid,
    pub name: String,
}

// ── Availability templates ───────────────────────────────────────

/// A coach's recurring weekly offer: one time-of-day window on one weekday,
/// bounded by a validity date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    pub id: Ulid,
    pub coach_id: Ulid,
    pub day_of_week: u8,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    /// Minutes.
    pub slot_duration: u16,
    /// Concurrent non-cancelled bookings allowed per dated slot.
    pub max_bookings: u32,
    pub session_type: Option<String>,
    pub is_active: bool,
    pub valid_from: NaiveDate,
    /// `None` = open-ended.
    pub valid_until: Option<NaiveDate>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Availability {
    pub fn window(&self) -> Span<NaiveTime> {
        Span {
            start: self.start_time,
            end: self.end_time,
        }
    }

    pub fn is_valid_on(&self, date: NaiveDate) -> bool {
        date >= self.valid_from && self.valid_until.is_none_or(|until| date <= until)
    }

    /// Does `[valid_from, valid_until or +inf)` intersect `[from, to]`?
    pub fn validity_intersects(&self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> bool {
        let starts_in_time = to.is_none_or(|to| self.valid_from <= to);
        let lasts_long_enough = match (self.valid_until, from) {
            (Some(until), Some(from)) => until >= from,
            _ => true,
        };
        starts_in_time && lasts_long_enough
    }

    pub fn recurs_on(&self, date: NaiveDate) -> bool {
        day_of_week(date) == self.day_of_week && self.is_valid_on(date)
    }

    /// True when `window` lies on a date this template recurs on and inside
    /// its time-of-day window.
    pub fn covers(&self, window: &Span<Timestamp>) -> bool {
        let date = window.start.date();
        let times = Span {
            start: window.start.time(),
            end: window.end.time(),
        };
        window.end.date() == date && self.recurs_on(date) && self.window().contains_span(&times)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAvailability {
    pub coach_id: Ulid,
    pub day_of_week: u8,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    pub slot_duration: u16,
    pub max_bookings: u32,
    #[serde(default)]
    pub session_type: Option<String>,
    pub valid_from: NaiveDate,
    #[serde(default)]
    pub valid_until: Option<NaiveDate>,
}

/// Partial update of a template. `session_type` and `valid_until` accept an
/// explicit `null` to clear them.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AvailabilityPatch {
    pub day_of_week: Option<u8>,
    #[serde(with = "hhmm::option")]
    pub start_time: Option<NaiveTime>,
    #[serde(with = "hhmm::option")]
    pub end_time: Option<NaiveTime>,
    pub slot_duration: Option<u16>,
    pub max_bookings: Option<u32>,
    #[serde(deserialize_with = "explicit_null")]
    pub session_type: Option<Option<String>>,
    pub is_active: Option<bool>,
    pub valid_from: Option<NaiveDate>,
    #[serde(deserialize_with = "explicit_null")]
    pub valid_until: Option<Option<NaiveDate>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AvailabilityFilter {
    pub coach_id: Option<Ulid>,
    pub day_of_week: Option<u8>,
    pub active: Option<bool>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

// ── Calendar events ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Scheduled,
    Confirmed,
    Cancelled,
    Completed,
}

impl EventStatus {
    /// Blocks time on the calendar.
    pub fn is_active(self) -> bool {
        !matches!(self, EventStatus::Cancelled)
    }

    pub fn accepts_bookings(self) -> bool {
        matches!(self, EventStatus::Scheduled | EventStatus::Confirmed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EventStatus::Scheduled => "scheduled",
            EventStatus::Confirmed => "confirmed",
            EventStatus::Cancelled => "cancelled",
            EventStatus::Completed => "completed",
        }
    }
}

/// The authoritative time-blocking record. A booking always points at one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: Ulid,
    pub coach_id: Option<Ulid>,
    pub title: String,
    pub location: Option<String>,
    pub session_type: Option<String>,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub max_participants: u32,
    pub current_count: u32,
    pub status: EventStatus,
    pub created_at: Timestamp,
}

impl CalendarEvent {
    pub fn span(&self) -> Span<Timestamp> {
        Span {
            start: self.start_time,
            end: self.end_time,
        }
    }

    pub fn is_full(&self) -> bool {
        self.current_count >= self.max_participants
    }
}

fn default_max_participants() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEvent {
    pub title: String,
    #[serde(default)]
    pub coach_id: Option<Ulid>,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default = "default_max_participants")]
    pub max_participants: u32,
    #[serde(default)]
    pub session_type: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantStatus {
    Confirmed,
    Cancelled,
}

/// Event ↔ player link; the player-busy check walks these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub event_id: Ulid,
    pub player_id: Ulid,
    pub status: ParticipantStatus,
}

// ── Bookings ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl BookingStatus {
    /// Still holds its seat: pending or confirmed.
    pub fn is_live(self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Waived,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Ulid,
    pub event_id: Ulid,
    pub player_id: Ulid,
    /// `None` when booked directly against an ad-hoc or group event.
    pub availability_id: Option<Ulid>,
    pub booked_by: Ulid,
    pub booked_at: Timestamp,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    /// Minor currency units.
    pub payment_amount: Option<i64>,
    pub notes: Option<String>,
    pub confirmed_at: Option<Timestamp>,
    pub cancelled_at: Option<Timestamp>,
    pub cancellation_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBooking {
    pub coach_id: Ulid,
    pub player_id: Ulid,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub session_type: String,
    #[serde(default)]
    pub availability_id: Option<Ulid>,
    #[serde(default)]
    pub event_id: Option<Ulid>,
    #[serde(default)]
    pub payment_amount: Option<i64>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Title of the synthesized event; ignored when joining `event_id`.
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

impl NewBooking {
    pub fn new(
        coach_id: Ulid,
        player_id: Ulid,
        start_time: Timestamp,
        end_time: Timestamp,
        session_type: impl Into<String>,
    ) -> Self {
        Self {
            coach_id,
            player_id,
            start_time,
            end_time,
            session_type: session_type.into(),
            availability_id: None,
            event_id: None,
            payment_amount: None,
            notes: None,
            title: None,
            location: None,
        }
    }
}

/// Partial update of a booking and its event. `location`, `payment_amount`
/// and `notes` accept an explicit `null` (or, for text, a blank string) to
/// clear them.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct BookingPatch {
    pub start_time: Option<Timestamp>,
    pub end_time: Option<Timestamp>,
    #[serde(deserialize_with = "explicit_null")]
    pub location: Option<Option<String>>,
    pub payment_status: Option<PaymentStatus>,
    #[serde(deserialize_with = "explicit_null")]
    pub payment_amount: Option<Option<i64>>,
    #[serde(deserialize_with = "explicit_null")]
    pub notes: Option<Option<String>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingSort {
    #[default]
    EventStart,
    BookedAt,
    Status,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookingQuery {
    pub player_id: Option<Ulid>,
    pub coach_id: Option<Ulid>,
    pub status: Option<BookingStatus>,
    /// Event start >= `from`.
    pub from: Option<Timestamp>,
    /// Event end <= `to`.
    pub to: Option<Timestamp>,
    pub session_type: Option<String>,
    pub sort_by: BookingSort,
    pub order: SortOrder,
    /// 1-based.
    pub page: u32,
    pub limit: u32,
}

impl Default for BookingQuery {
    fn default() -> Self {
        Self {
            player_id: None,
            coach_id: None,
            status: None,
            from: None,
            to: None,
            session_type: None,
            sort_by: BookingSort::default(),
            order: SortOrder::default(),
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

// ── Write-ahead log record ───────────────────────────────────────

/// One state change. A committed transaction is a `Vec<Change>` written as a
/// single WAL record, so replay never observes half of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Change {
    CoachRegistered(Coach),
    PlayerRegistered(Player),
    AvailabilityCreated(Availability),
    AvailabilityUpdated(Availability),
    AvailabilityDeleted { id: Ulid, coach_id: Ulid },
    EventScheduled(CalendarEvent),
    EventUpdated(CalendarEvent),
    BookingCreated(Booking),
    BookingUpdated(Booking),
    ParticipantJoined(Participant),
    ParticipantLeft { event_id: Ulid, player_id: Ulid },
}

// ── Query result types ───────────────────────────────────────────

/// A dated instantiation of an availability template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    pub availability_id: Ulid,
    pub remaining_capacity: u32,
    pub session_type: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    CoachBusy,
    PlayerBusy,
    CapacityFull,
}

impl ConflictKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ConflictKind::CoachBusy => "coach_busy",
            ConflictKind::PlayerBusy => "player_busy",
            ConflictKind::CapacityFull => "capacity_full",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    pub kind: ConflictKind,
    pub message: String,
    /// A sample colliding event, when there is one.
    pub event: Option<CalendarEvent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictReport {
    pub has_conflicts: bool,
    pub conflicts: Vec<Conflict>,
}

impl ConflictReport {
    pub fn new(conflicts: Vec<Conflict>) -> Self {
        Self {
            has_conflicts: !conflicts.is_empty(),
            conflicts,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingDetails {
    pub booking: Booking,
    pub event: CalendarEvent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingPage {
    pub bookings: Vec<BookingDetails>,
    pub page: u32,
    pub limit: u32,
    pub total: usize,
    pub total_pages: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> Timestamp {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn tod(s: &str) -> NaiveTime {
        hhmm::parse(s).unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn template(dow: u8, from: &str, until: Option<&str>) -> Availability {
        let at = ts("2030-01-01 00:00");
        Availability {
            id: Ulid::new(),
            coach_id: Ulid::new(),
            day_of_week: dow,
            start_time: tod("09:00"),
            end_time: tod("10:00"),
            slot_duration: 30,
            max_bookings: 2,
            session_type: None,
            is_active: true,
            valid_from: date(from),
            valid_until: until.map(date),
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn span_overlap() {
        let a = Span::new(100, 200);
        let b = Span::new(150, 250);
        let c = Span::new(200, 300);
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&c)); // back-to-back, not overlapping
    }

    #[test]
    fn span_contains_span() {
        let outer = Span::new(tod("09:00"), tod("10:00"));
        assert!(outer.contains_span(&Span::new(tod("09:00"), tod("09:30"))));
        assert!(outer.contains_span(&outer));
        assert!(!outer.contains_span(&Span::new(tod("09:30"), tod("10:30"))));
    }

    #[test]
    fn span_try_new_rejects_empty_and_inverted() {
        assert!(Span::try_new(tod("10:00"), tod("10:00")).is_none());
        assert!(Span::try_new(tod("11:00"), tod("10:00")).is_none());
        assert!(Span::try_new(tod("09:00"), tod("10:00")).is_some());
    }

    #[test]
    fn span_timestamps_across_midnight() {
        let late = Span::new(ts("2030-01-07 23:00"), ts("2030-01-08 01:00"));
        let early = Span::new(ts("2030-01-08 00:30"), ts("2030-01-08 02:00"));
        assert!(late.overlaps(&early));
    }

    #[test]
    fn hhmm_requires_zero_padding() {
        assert_eq!(hhmm::parse("09:30").unwrap(), NaiveTime::from_hms_opt(9, 30, 0).unwrap());
        assert!(hhmm::parse("9:30").is_err());
        assert!(hhmm::parse("09:30:00").is_err());
        assert!(hhmm::parse("24:00").is_err());
        assert_eq!(hhmm::format(&tod("07:05")), "07:05");
    }

    #[test]
    fn day_of_week_starts_on_sunday() {
        assert_eq!(day_of_week(date("2030-01-06")), 0); // Sunday
        assert_eq!(day_of_week(date("2030-01-07")), 1); // Monday
        assert_eq!(day_of_week(date("2030-01-12")), 6); // Saturday
    }

    #[test]
    fn availability_validity_window() {
        let t = template(1, "2030-01-07", Some("2030-01-21"));
        assert!(!t.is_valid_on(date("2030-01-06")));
        assert!(t.is_valid_on(date("2030-01-07")));
        assert!(t.is_valid_on(date("2030-01-21")));
        assert!(!t.is_valid_on(date("2030-01-22")));

        let open = template(1, "2030-01-07", None);
        assert!(open.is_valid_on(date("2099-12-28")));
    }

    #[test]
    fn availability_validity_intersects_range() {
        let t = template(1, "2030-02-01", Some("2030-02-28"));
        assert!(t.validity_intersects(Some(date("2030-01-01")), Some(date("2030-02-01"))));
        assert!(t.validity_intersects(Some(date("2030-02-28")), None));
        assert!(!t.validity_intersects(Some(date("2030-03-01")), None));
        assert!(!t.validity_intersects(None, Some(date("2030-01-31"))));
        assert!(t.validity_intersects(None, None));
    }

    #[test]
    fn availability_covers_window() {
        let t = template(1, "2030-01-01", None);
        // 2030-01-07 is a Monday
        assert!(t.covers(&Span::new(ts("2030-01-07 09:00"), ts("2030-01-07 09:30"))));
        assert!(t.covers(&Span::new(ts("2030-01-07 09:00"), ts("2030-01-07 10:00"))));
        assert!(!t.covers(&Span::new(ts("2030-01-07 09:30"), ts("2030-01-07 10:30"))));
        assert!(!t.covers(&Span::new(ts("2030-01-08 09:00"), ts("2030-01-08 09:30"))));
    }

    #[test]
    fn status_predicates() {
        assert!(BookingStatus::Pending.is_live());
        assert!(BookingStatus::Confirmed.is_live());
        assert!(!BookingStatus::Completed.is_live());
        assert!(!BookingStatus::Cancelled.is_live());
        assert!(EventStatus::Completed.is_active());
        assert!(!EventStatus::Cancelled.is_active());
        assert!(!EventStatus::Completed.accepts_bookings());
    }

    #[test]
    fn availability_json_uses_hhmm() {
        let t = template(2, "2030-01-01", None);
        let json = serde_json::to_value(&t).unwrap();
        assert_eq!(json["start_time"], "09:00");
        assert_eq!(json["end_time"], "10:00");
        assert_eq!(json["valid_from"], "2030-01-01");
        assert!(json["valid_until"].is_null());
    }

    #[test]
    fn patch_distinguishes_missing_from_null() {
        let patch: AvailabilityPatch =
            serde_json::from_str(r#"{"valid_until": null, "start_time": "08:00"}"#).unwrap();
        assert_eq!(patch.valid_until, Some(None));
        assert_eq!(patch.session_type, None);
        assert_eq!(patch.start_time, Some(tod("08:00")));
        assert_eq!(patch.end_time, None);
    }

    #[test]
    fn booking_query_defaults() {
        let q: BookingQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(q.page, 1);
        assert_eq!(q.limit, DEFAULT_PAGE_SIZE);
        assert_eq!(q.sort_by, BookingSort::EventStart);
        assert_eq!(q.order, SortOrder::Asc);
    }

    #[test]
    fn change_survives_bincode() {
        let change = Change::AvailabilityCreated(template(3, "2030-01-01", Some("2030-06-30")));
        let bytes = bincode::serialize(&change).unwrap();
        let decoded: Change = bincode::deserialize(&bytes).unwrap();
        assert_eq!(change, decoded);
    }
}
