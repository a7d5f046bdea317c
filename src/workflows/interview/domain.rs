use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workflows::ids::{AppId, BookingId, OrgId, SlotId};

/// Lifecycle of an interview booking. There is deliberately no cancelled or
/// declined state: an applicant cannot withdraw a requested slot and an
/// organization cannot decline one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Requested,
    Confirmed,
    Done,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 3] =
        [BookingStatus::Requested, BookingStatus::Confirmed, BookingStatus::Done];

    pub const fn label(self) -> &'static str {
        match self {
            BookingStatus::Requested => "REQUESTED",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Done => "DONE",
        }
    }
}

/// An interview window offered by an organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSlot {
    pub id: SlotId,
    pub org_id: OrgId,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub is_open: bool,
}

/// Partial update for a slot; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotPatch {
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub is_open: Option<bool>,
}

/// A single interview booking, 1:1 with an adoption application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewBooking {
    pub id: BookingId,
    pub app_id: AppId,
    pub slot_id: SlotId,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Booking joined with its slot for org- and applicant-facing reads.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingWithSlot {
    #[serde(flatten)]
    pub booking: InterviewBooking,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot: Option<ScheduleSlot>,
}
