//! Newline-delimited JSON protocol: request parsing and reply framing.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio_util::codec::LinesCodecError;
use ulid::Ulid;

use crate::auth::AuthError;
use crate::engine::EngineError;
use crate::model::*;

/// First frame on every connection.
#[derive(Debug, Deserialize)]
pub struct Startup {
    pub tenant: String,
    /// Caller identity; recorded as `booked_by` on bookings.
    pub user: Ulid,
    pub password: String,
}

/// One request per frame, tagged by `"op"`.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    RegisterCoach {
        id: Ulid,
        name: String,
    },
    RegisterPlayer {
        id: Ulid,
        name: String,
    },
    GetCoach {
        id: Ulid,
    },
    GetPlayer {
        id: Ulid,
    },
    CreateAvailability(NewAvailability),
    ListAvailability(AvailabilityFilter),
    GetAvailability {
        id: Ulid,
    },
    UpdateAvailability {
        id: Ulid,
        #[serde(flatten)]
        patch: AvailabilityPatch,
    },
    DeleteAvailability {
        id: Ulid,
    },
    GetAvailableSlots {
        coach_id: Ulid,
        start_date: NaiveDate,
        end_date: NaiveDate,
        #[serde(default)]
        session_type: Option<String>,
    },
    CheckConflicts {
        coach_id: Ulid,
        player_id: Ulid,
        start_time: Timestamp,
        end_time: Timestamp,
        #[serde(default)]
        exclude_booking_id: Option<Ulid>,
    },
    ScheduleEvent(NewEvent),
    GetEvent {
        id: Ulid,
    },
    CancelEvent {
        id: Ulid,
        #[serde(default)]
        reason: String,
    },
    CreateBooking(NewBooking),
    GetBooking {
        id: Ulid,
    },
    ListBookings(BookingQuery),
    UpdateBooking {
        id: Ulid,
        #[serde(flatten)]
        patch: BookingPatch,
    },
    ConfirmBooking {
        id: Ulid,
    },
    CancelBooking {
        id: Ulid,
        #[serde(default)]
        reason: String,
    },
    CompleteBooking {
        id: Ulid,
    },
    /// Subscribe to changes concerning a coach or player id.
    Listen {
        channel: Ulid,
    },
    Unlisten {
        channel: Ulid,
    },
    UnlistenAll,
}

impl Request {
    /// Short label for metrics and logs.
    pub fn op_label(&self) -> &'static str {
        match self {
            Request::RegisterCoach { .. } => "register_coach",
            Request::RegisterPlayer { .. } => "register_player",
            Request::GetCoach { .. } => "get_coach",
            Request::GetPlayer { .. } => "get_player",
            Request::CreateAvailability(_) => "create_availability",
            Request::ListAvailability(_) => "list_availability",
            Request::GetAvailability { .. } => "get_availability",
            Request::UpdateAvailability { .. } => "update_availability",
            Request::DeleteAvailability { .. } => "delete_availability",
            Request::GetAvailableSlots { .. } => "get_available_slots",
            Request::CheckConflicts { .. } => "check_conflicts",
            Request::ScheduleEvent(_) => "schedule_event",
            Request::GetEvent { .. } => "get_event",
            Request::CancelEvent { .. } => "cancel_event",
            Request::CreateBooking(_) => "create_booking",
            Request::GetBooking { .. } => "get_booking",
            Request::ListBookings(_) => "list_bookings",
            Request::UpdateBooking { .. } => "update_booking",
            Request::ConfirmBooking { .. } => "confirm_booking",
            Request::CancelBooking { .. } => "cancel_booking",
            Request::CompleteBooking { .. } => "complete_booking",
            Request::Listen { .. } => "listen",
            Request::Unlisten { .. } => "unlisten",
            Request::UnlistenAll => "unlisten_all",
        }
    }
}

pub fn parse_startup(line: &str) -> Result<Startup, ProtocolError> {
    Ok(serde_json::from_str(line)?)
}

pub fn parse_request(line: &str) -> Result<Request, ProtocolError> {
    Ok(serde_json::from_str(line)?)
}

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("frame error: {0}")]
    Codec(#[from] LinesCodecError),
    #[error("connection closed before startup")]
    NoStartup,
    #[error("unauthorized: {0}")]
    Unauthorized(#[from] AuthError),
    #[error("tenant error: {0}")]
    Tenant(std::io::Error),
}

impl ProtocolError {
    pub fn kind(&self) -> &'static str {
        match self {
            ProtocolError::Unauthorized(_) => "unauthorized",
            ProtocolError::Tenant(e) if e.kind() != std::io::ErrorKind::InvalidInput => "storage_error",
            _ => "validation_error",
        }
    }
}

// ── Server → client frames ───────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub kind: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflicts: Option<Vec<Conflict>>,
}

impl From<&EngineError> for ErrorBody {
    fn from(e: &EngineError) -> Self {
        Self {
            kind: e.kind().as_str(),
            message: e.to_string(),
            conflicts: e.conflicts().map(<[Conflict]>::to_vec),
        }
    }
}

impl From<&ProtocolError> for ErrorBody {
    fn from(e: &ProtocolError) -> Self {
        Self {
            kind: e.kind(),
            message: e.to_string(),
            conflicts: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Reply {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl Reply {
    pub fn ok(data: serde_json::Value) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(body: ErrorBody) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(body),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Notification {
    pub channel: Ulid,
    pub change: Change,
}

#[derive(Debug, Serialize)]
pub struct NotificationFrame {
    pub notification: Notification,
}
