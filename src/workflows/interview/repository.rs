use chrono::{DateTime, Utc};

use super::domain::{BookingStatus, InterviewBooking, ScheduleSlot};
use crate::workflows::ids::{AppId, OrgId, SlotId};

/// New slot captured at creation time.
#[derive(Debug, Clone)]
pub struct NewSlot {
    pub org_id: OrgId,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub is_open: bool,
}

/// Storage abstraction for schedule slots.
pub trait SlotStore: Send + Sync {
    fn insert(&self, slot: NewSlot) -> Result<ScheduleSlot, StoreError>;
    fn fetch(&self, id: SlotId) -> Result<Option<ScheduleSlot>, StoreError>;
    fn update(&self, slot: ScheduleSlot) -> Result<(), StoreError>;
    fn delete(&self, id: SlotId) -> Result<(), StoreError>;
    fn list_by_org(&self, org: OrgId) -> Result<Vec<ScheduleSlot>, StoreError>;
}

/// New booking captured when the applicant requests a slot.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub app_id: AppId,
    pub slot_id: SlotId,
    pub requested_at: DateTime<Utc>,
}

/// Storage abstraction for interview bookings.
pub trait BookingStore: Send + Sync {
    fn insert(&self, booking: NewBooking) -> Result<InterviewBooking, StoreError>;
    fn fetch_by_app(&self, app: AppId) -> Result<Option<InterviewBooking>, StoreError>;
    fn list_by_slots(&self, slots: &[SlotId]) -> Result<Vec<InterviewBooking>, StoreError>;
    /// Conditional transition keyed on the application id: writes `next`
    /// (stamping `updated_at`) only while the booking is still in
    /// `expected`. A concurrent writer observes `StaleStatus` instead of
    /// double-applying the transition.
    fn transition(
        &self,
        app: AppId,
        expected: BookingStatus,
        next: BookingStatus,
        at: DateTime<Utc>,
    ) -> Result<InterviewBooking, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("row no longer in the expected status")]
    StaleStatus,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
