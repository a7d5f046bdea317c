//! Interview scheduling: organization-owned slots and the single
//! REQUESTED → CONFIRMED → DONE booking per adoption application.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

pub use domain::{BookingStatus, BookingWithSlot, InterviewBooking, ScheduleSlot, SlotPatch};
pub use repository::{BookingStore, NewBooking, NewSlot, SlotStore, StoreError};
pub use router::{interview_router, InterviewRouterState};
pub use service::{InterviewError, InterviewService};
