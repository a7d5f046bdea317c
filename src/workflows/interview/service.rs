use std::sync::Arc;

use chrono::Utc;
use tracing::warn;

use super::domain::{BookingStatus, BookingWithSlot, InterviewBooking, ScheduleSlot, SlotPatch};
use super::repository::{BookingStore, NewBooking, NewSlot, SlotStore, StoreError};
use crate::workflows::clients::{AdoptionLookup, ClientError};
use crate::workflows::ids::{AppId, OrgId, SlotId};
use crate::workflows::orchestration::OrchestrationCoordinator;

/// Service owning slot scheduling and the interview-booking state machine.
///
/// Slot mutations are org-scoped; booking transitions follow the single
/// REQUESTED → CONFIRMED → DONE path. Nothing here locks a slot against a
/// second application confirming it concurrently: slot exclusivity is a
/// policy expectation, not a stored guarantee.
pub struct InterviewService<S, B> {
    slots: Arc<S>,
    bookings: Arc<B>,
    adoptions: Arc<dyn AdoptionLookup>,
    coordinator: Arc<OrchestrationCoordinator>,
}

impl<S, B> InterviewService<S, B>
where
    S: SlotStore + 'static,
    B: BookingStore + 'static,
{
    pub fn new(
        slots: Arc<S>,
        bookings: Arc<B>,
        adoptions: Arc<dyn AdoptionLookup>,
        coordinator: Arc<OrchestrationCoordinator>,
    ) -> Self {
        Self {
            slots,
            bookings,
            adoptions,
            coordinator,
        }
    }

    /// Create a slot for the caller's organization. Slots default to open.
    pub fn create_slot(
        &self,
        org: OrgId,
        start_at: chrono::DateTime<Utc>,
        end_at: chrono::DateTime<Utc>,
        is_open: Option<bool>,
    ) -> Result<ScheduleSlot, InterviewError> {
        if start_at >= end_at {
            return Err(InterviewError::Validation(
                "slot must start before it ends".to_string(),
            ));
        }
        let slot = self.slots.insert(NewSlot {
            org_id: org,
            start_at,
            end_at,
            is_open: is_open.unwrap_or(true),
        })?;
        Ok(slot)
    }

    pub fn update_slot(
        &self,
        org: OrgId,
        slot_id: SlotId,
        patch: SlotPatch,
    ) -> Result<ScheduleSlot, InterviewError> {
        let mut slot = self
            .slots
            .fetch(slot_id)?
            .ok_or(InterviewError::SlotNotFound)?;
        if slot.org_id != org {
            return Err(InterviewError::Forbidden);
        }

        if let Some(start_at) = patch.start_at {
            slot.start_at = start_at;
        }
        if let Some(end_at) = patch.end_at {
            slot.end_at = end_at;
        }
        if let Some(is_open) = patch.is_open {
            slot.is_open = is_open;
        }
        if slot.start_at >= slot.end_at {
            return Err(InterviewError::Validation(
                "slot must start before it ends".to_string(),
            ));
        }

        self.slots.update(slot.clone())?;
        Ok(slot)
    }

    pub fn delete_slot(&self, org: OrgId, slot_id: SlotId) -> Result<(), InterviewError> {
        let slot = self
            .slots
            .fetch(slot_id)?
            .ok_or(InterviewError::SlotNotFound)?;
        if slot.org_id != org {
            return Err(InterviewError::Forbidden);
        }
        self.slots.delete(slot_id)?;
        Ok(())
    }

    /// Every slot the organization has published, open or not.
    pub fn slots_for_org(&self, org: OrgId) -> Result<Vec<ScheduleSlot>, InterviewError> {
        let mut slots = self.slots.list_by_org(org)?;
        slots.sort_by_key(|slot| slot.start_at);
        Ok(slots)
    }

    /// Open slots only, ordered by start time ascending.
    pub fn open_slots_for_org(&self, org: OrgId) -> Result<Vec<ScheduleSlot>, InterviewError> {
        let mut slots = self.slots.list_by_org(org)?;
        slots.retain(|slot| slot.is_open);
        slots.sort_by_key(|slot| slot.start_at);
        Ok(slots)
    }

    /// Applicant-facing slot listing: slots belong to organizations, not
    /// applications, so the application's org is resolved through the
    /// adoption domain first. That lookup is part of the primary operation
    /// and its failure surfaces to the caller.
    pub fn available_slots_for_application(
        &self,
        app: AppId,
    ) -> Result<Vec<ScheduleSlot>, InterviewError> {
        let parties = self
            .adoptions
            .application_parties(app)?
            .ok_or(InterviewError::ApplicationNotFound)?;
        self.open_slots_for_org(parties.org_id)
    }

    /// Request an interview slot for an application. At most one booking may
    /// ever exist per application, whatever slot it names.
    pub fn request(&self, app: AppId, slot_id: SlotId) -> Result<InterviewBooking, InterviewError> {
        if self.bookings.fetch_by_app(app)?.is_some() {
            return Err(InterviewError::AlreadyBooked);
        }

        let slot = self
            .slots
            .fetch(slot_id)?
            .ok_or(InterviewError::SlotNotFound)?;
        if !slot.is_open {
            return Err(InterviewError::SlotClosed);
        }

        let booking = self.bookings.insert(NewBooking {
            app_id: app,
            slot_id,
            requested_at: Utc::now(),
        })?;

        self.coordinator.interview_requested(app);
        Ok(booking)
    }

    /// Confirm a requested interview. On success the applicant is notified
    /// with the slot's formatted time window, best-effort.
    pub fn confirm(&self, app: AppId) -> Result<InterviewBooking, InterviewError> {
        let booking = self
            .bookings
            .fetch_by_app(app)?
            .ok_or(InterviewError::BookingNotFound)?;
        if booking.status != BookingStatus::Requested {
            return Err(InterviewError::InvalidTransition {
                from: booking.status,
            });
        }

        let confirmed = self.apply_transition(
            app,
            BookingStatus::Requested,
            BookingStatus::Confirmed,
        )?;

        match self.slots.fetch(confirmed.slot_id) {
            Ok(Some(slot)) => self.coordinator.interview_confirmed(app, &slot),
            Ok(None) => warn!(%app, slot_id = %confirmed.slot_id, "confirmed booking references a missing slot"),
            Err(err) => warn!(%app, error = %err, "could not load slot for confirmation notice"),
        }

        Ok(confirmed)
    }

    /// Mark a confirmed interview as held. DONE is terminal; handover is
    /// driven from the adoption application afterwards.
    pub fn complete(&self, app: AppId) -> Result<InterviewBooking, InterviewError> {
        let booking = self
            .bookings
            .fetch_by_app(app)?
            .ok_or(InterviewError::BookingNotFound)?;
        if booking.status != BookingStatus::Confirmed {
            return Err(InterviewError::InvalidTransition {
                from: booking.status,
            });
        }

        self.apply_transition(app, BookingStatus::Confirmed, BookingStatus::Done)
    }

    pub fn booking_for_application(
        &self,
        app: AppId,
    ) -> Result<BookingWithSlot, InterviewError> {
        let booking = self
            .bookings
            .fetch_by_app(app)?
            .ok_or(InterviewError::BookingNotFound)?;
        let slot = self.slots.fetch(booking.slot_id)?;
        Ok(BookingWithSlot { booking, slot })
    }

    /// Every booking against the organization's slots, each with its slot.
    pub fn bookings_for_org(&self, org: OrgId) -> Result<Vec<BookingWithSlot>, InterviewError> {
        let slots = self.slots.list_by_org(org)?;
        let slot_ids: Vec<SlotId> = slots.iter().map(|slot| slot.id).collect();
        let bookings = self.bookings.list_by_slots(&slot_ids)?;
        Ok(bookings
            .into_iter()
            .map(|booking| {
                let slot = slots.iter().find(|slot| slot.id == booking.slot_id).cloned();
                BookingWithSlot { booking, slot }
            })
            .collect())
    }

    fn apply_transition(
        &self,
        app: AppId,
        expected: BookingStatus,
        next: BookingStatus,
    ) -> Result<InterviewBooking, InterviewError> {
        match self.bookings.transition(app, expected, next, Utc::now()) {
            Ok(booking) => Ok(booking),
            Err(StoreError::StaleStatus) => {
                // Lost a race: report the status the row actually holds now.
                let current = self
                    .bookings
                    .fetch_by_app(app)?
                    .ok_or(InterviewError::BookingNotFound)?;
                Err(InterviewError::InvalidTransition {
                    from: current.status,
                })
            }
            Err(other) => Err(InterviewError::Store(other)),
        }
    }
}

/// Error raised by the interview service.
#[derive(Debug, thiserror::Error)]
pub enum InterviewError {
    #[error("interview slot not found")]
    SlotNotFound,
    #[error("interview booking not found")]
    BookingNotFound,
    #[error("adoption application not found")]
    ApplicationNotFound,
    #[error("caller's organization does not own this slot")]
    Forbidden,
    #[error("slot is not open for booking")]
    SlotClosed,
    #[error("an interview booking already exists for this application")]
    AlreadyBooked,
    #[error("transition not allowed from status {}", .from.label())]
    InvalidTransition { from: BookingStatus },
    #[error("{0}")]
    Validation(String),
    #[error("upstream collaborator failed: {0}")]
    Upstream(#[from] ClientError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
