//! The saga seam between the state machines and their side effects.
//!
//! Every method here runs after a transition has already committed. The
//! contract is one-sided on purpose: a downstream failure (pet registry,
//! directory, message channel) is logged and absorbed, never propagated,
//! and never rolls back the transition that triggered it. Repeating a call
//! for the same event produces duplicate inbox messages rather than an
//! error; no dedup key is tracked.

use std::sync::Arc;

use tracing::warn;

use crate::workflows::adoption::domain::AdoptionApplication;
use crate::workflows::clients::{AdoptionLookup, PetAvailability, PetRegistry};
use crate::workflows::ids::{AppId, PetId, Role};
use crate::workflows::interview::domain::ScheduleSlot;
use crate::workflows::notify::NotificationDispatcher;

pub struct OrchestrationCoordinator {
    pets: Arc<dyn PetRegistry>,
    adoptions: Arc<dyn AdoptionLookup>,
    dispatcher: Arc<NotificationDispatcher>,
}

impl OrchestrationCoordinator {
    pub fn new(
        pets: Arc<dyn PetRegistry>,
        adoptions: Arc<dyn AdoptionLookup>,
        dispatcher: Arc<NotificationDispatcher>,
    ) -> Self {
        Self {
            pets,
            adoptions,
            dispatcher,
        }
    }

    pub fn application_submitted(&self, application: &AdoptionApplication) {
        self.dispatcher.notify_user(
            application.applicant_id,
            "Adoption application submitted",
            "Your adoption application was submitted and is waiting for the organization's review.",
            Some("ADOPTION_SUBMITTED_TO_USER"),
        );
        self.dispatcher.notify_org_admins(
            application.org_id,
            "New adoption application",
            "A new adoption application is waiting for initial review.",
            Some("ADOPTION_SUBMITTED"),
        );
    }

    pub fn org_review_recorded(&self, application: &AdoptionApplication, approved: bool) {
        if approved {
            self.propagate_pet_status(application.pet_id, PetAvailability::Reserved);
            self.dispatcher.notify_user(
                application.applicant_id,
                "Adoption application passed initial review",
                "Your adoption application passed the organization's initial review and is waiting for platform review.",
                Some("ADOPTION_ORG_APPROVED"),
            );
            self.dispatcher.broadcast_to_role(
                Role::Auditor,
                "Adoption application awaiting platform review",
                "An adoption application passed initial review and is waiting for platform review.",
                Some("ADOPTION_PENDING_REVIEW"),
            );
        } else {
            self.dispatcher.notify_user(
                application.applicant_id,
                "Adoption application rejected in initial review",
                &with_reason(
                    "Your adoption application did not pass the organization's initial review.",
                    application.reject_reason.as_deref(),
                ),
                Some("ADOPTION_ORG_REJECTED"),
            );
        }
    }

    pub fn platform_review_recorded(&self, application: &AdoptionApplication, approved: bool) {
        if approved {
            self.dispatcher.notify_user(
                application.applicant_id,
                "Adoption application approved by the platform",
                "Congratulations! Your adoption application passed platform review; an interview can now be scheduled.",
                Some("ADOPTION_PLATFORM_APPROVED"),
            );
            self.dispatcher.notify_org_admins(
                application.org_id,
                "Adoption application approved by the platform",
                "An adoption application passed platform review; interview scheduling can begin.",
                Some("ADOPTION_PLATFORM_APPROVED_TO_ORG"),
            );
        } else {
            self.propagate_pet_status(application.pet_id, PetAvailability::Available);
            self.dispatcher.notify_user(
                application.applicant_id,
                "Adoption application rejected by the platform",
                &with_reason(
                    "Your adoption application did not pass platform review.",
                    application.reject_reason.as_deref(),
                ),
                Some("ADOPTION_PLATFORM_REJECTED"),
            );
            self.dispatcher.notify_org_admins(
                application.org_id,
                "Adoption application rejected by the platform",
                "An adoption application did not pass platform review; the pet is available again.",
                Some("ADOPTION_PLATFORM_REJECTED_TO_ORG"),
            );
        }
    }

    pub fn handover_completed(&self, application: &AdoptionApplication) {
        self.propagate_pet_status(application.pet_id, PetAvailability::Adopted);
        self.dispatcher.notify_user(
            application.applicant_id,
            "Adoption handover completed",
            "Congratulations! The handover is complete and the adoption is final.",
            Some("ADOPTION_COMPLETED"),
        );
        self.dispatcher.notify_org_admins(
            application.org_id,
            "Adoption handover completed",
            "The handover is complete and the pet is recorded as adopted.",
            Some("ADOPTION_COMPLETED_TO_ORG"),
        );
        self.dispatcher.broadcast_to_role(
            Role::OrgStaff,
            "New adoption completed",
            "A pet finished its adoption handover; follow-up tracking can begin.",
            Some("ADOPTION_COMPLETED_TO_STAFF"),
        );
    }

    /// An applicant requested an interview slot: let the organization's
    /// admins know. The application's parties are resolved here so a dead
    /// adoption domain only costs the notification, not the booking.
    pub fn interview_requested(&self, app: AppId) {
        match self.adoptions.application_parties(app) {
            Ok(Some(parties)) => {
                self.dispatcher.notify_org_admins(
                    parties.org_id,
                    "New interview request",
                    "An applicant requested an interview slot; please confirm it.",
                    Some("INTERVIEW_REQUESTED"),
                );
            }
            Ok(None) => warn!(%app, "interview request notice dropped: application unknown"),
            Err(err) => {
                warn!(%app, error = %err, "interview request notice dropped: adoption domain unavailable");
            }
        }
    }

    /// The organization confirmed the interview: tell the applicant when.
    pub fn interview_confirmed(&self, app: AppId, slot: &ScheduleSlot) {
        match self.adoptions.application_parties(app) {
            Ok(Some(parties)) => {
                let window = format_window(slot);
                self.dispatcher.notify_user(
                    parties.applicant_id,
                    "Interview time confirmed",
                    &format!(
                        "Your interview is confirmed for {window}. Please attend on time."
                    ),
                    Some("INTERVIEW_CONFIRMED"),
                );
            }
            Ok(None) => warn!(%app, "interview confirmation notice dropped: application unknown"),
            Err(err) => {
                warn!(%app, error = %err, "interview confirmation notice dropped: adoption domain unavailable");
            }
        }
    }

    fn propagate_pet_status(&self, pet: PetId, status: PetAvailability) {
        if let Err(err) = self.pets.update_availability(pet, status) {
            warn!(%pet, status = status.label(), error = %err, "pet status propagation failed");
        }
    }
}

/// Human-readable interview window, e.g. `2026-03-07 10:00 - 2026-03-07 10:30`.
pub fn format_window(slot: &ScheduleSlot) -> String {
    format!(
        "{} - {}",
        slot.start_at.format("%Y-%m-%d %H:%M"),
        slot.end_at.format("%Y-%m-%d %H:%M")
    )
}

fn with_reason(base: &str, reason: Option<&str>) -> String {
    match reason {
        Some(reason) if !reason.is_empty() => format!("{base} Reason: {reason}"),
        _ => base.to_string(),
    }
}
