//! Hard caps on input sizes and per-tenant cardinalities.

pub const MAX_TENANTS: usize = 1024;
pub const MAX_TENANT_NAME_LEN: usize = 256;

/// Coach/player display names, event titles, locations, session types.
pub const MAX_NAME_LEN: usize = 256;
/// Booking notes and cancellation reasons.
pub const MAX_TEXT_LEN: usize = 2048;

pub const MAX_TEMPLATES_PER_COACH: usize = 1000;
pub const MAX_EVENT_PARTICIPANTS: u32 = 500;

/// Widest `[start_date, end_date]` range a slot query may expand.
pub const MAX_QUERY_DAYS: i64 = 366;

pub const MIN_SLOT_MINUTES: u16 = 15;
pub const MAX_SLOT_MINUTES: u16 = 240;
pub const MIN_MAX_BOOKINGS: u32 = 1;
pub const MAX_MAX_BOOKINGS: u32 = 10;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Longest accepted wire frame (one JSON request per line).
pub const MAX_FRAME_LEN: usize = 64 * 1024;
