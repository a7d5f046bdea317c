use std::sync::Arc;

use chrono::Utc;

use super::domain::{AdoptionApplication, AdoptionStatus};
use super::repository::{AdoptionRepository, NewApplication, RepositoryError};
use crate::workflows::clients::{ClientError, InterviewLookup};
use crate::workflows::ids::{AppId, OrgId, PetId, UserId};
use crate::workflows::interview::domain::BookingStatus;
use crate::workflows::orchestration::OrchestrationCoordinator;

/// Service owning the adoption application state machine.
///
/// Guard failures for the operation at hand always surface to the caller;
/// everything that happens after a committed transition (pet availability,
/// notifications) is routed through the coordinator and can only fail
/// silently.
pub struct AdoptionService<R> {
    repository: Arc<R>,
    interviews: Arc<dyn InterviewLookup>,
    coordinator: Arc<OrchestrationCoordinator>,
}

impl<R> AdoptionService<R>
where
    R: AdoptionRepository + 'static,
{
    pub fn new(
        repository: Arc<R>,
        interviews: Arc<dyn InterviewLookup>,
        coordinator: Arc<OrchestrationCoordinator>,
    ) -> Self {
        Self {
            repository,
            interviews,
            coordinator,
        }
    }

    /// Submit a new application for a pet. At most one non-terminal
    /// application may exist per (applicant, pet) pair; the check is
    /// an existence probe at submission time.
    pub fn submit(
        &self,
        pet: PetId,
        applicant: UserId,
        org: OrgId,
    ) -> Result<AdoptionApplication, AdoptionError> {
        if self.repository.has_open_application(applicant, pet)? {
            return Err(AdoptionError::DuplicatePending);
        }

        let application = self.repository.insert(NewApplication {
            pet_id: pet,
            applicant_id: applicant,
            org_id: org,
            submitted_at: Utc::now(),
        })?;

        self.coordinator.application_submitted(&application);
        Ok(application)
    }

    /// First-stage review by the organization owning the application.
    pub fn review_by_org(
        &self,
        id: AppId,
        org: OrgId,
        approve: bool,
        reason: Option<&str>,
    ) -> Result<AdoptionApplication, AdoptionError> {
        let reason = validate_reject_reason(approve, reason)?;

        let application = self.fetch(id)?;
        if application.org_id != org {
            return Err(AdoptionError::Forbidden);
        }
        if application.status != AdoptionStatus::Pending {
            return Err(AdoptionError::InvalidTransition {
                from: application.status,
            });
        }

        let next = if approve {
            AdoptionStatus::OrgApproved
        } else {
            AdoptionStatus::OrgRejected
        };
        let updated = self.apply_transition(id, AdoptionStatus::Pending, next, reason)?;

        self.coordinator.org_review_recorded(&updated, approve);
        Ok(updated)
    }

    /// Second-stage review by the platform, only after org approval.
    pub fn review_by_platform(
        &self,
        id: AppId,
        approve: bool,
        reason: Option<&str>,
    ) -> Result<AdoptionApplication, AdoptionError> {
        let reason = validate_reject_reason(approve, reason)?;

        let application = self.fetch(id)?;
        if application.status != AdoptionStatus::OrgApproved {
            return Err(AdoptionError::InvalidTransition {
                from: application.status,
            });
        }

        let next = if approve {
            AdoptionStatus::PlatformApproved
        } else {
            AdoptionStatus::PlatformRejected
        };
        let updated = self.apply_transition(id, AdoptionStatus::OrgApproved, next, reason)?;

        self.coordinator.platform_review_recorded(&updated, approve);
        Ok(updated)
    }

    /// Record the physical handover. The linked interview booking, if one
    /// exists, must already be DONE; that cross-domain check belongs to the
    /// primary operation, so an unavailable interview domain aborts the
    /// handover instead of being absorbed.
    pub fn complete_handover(
        &self,
        id: AppId,
        org: OrgId,
    ) -> Result<AdoptionApplication, AdoptionError> {
        let application = self.fetch(id)?;
        if application.org_id != org {
            return Err(AdoptionError::Forbidden);
        }
        if !application.status.permits_handover() {
            return Err(AdoptionError::InvalidTransition {
                from: application.status,
            });
        }

        match self.interviews.booking_status(id)? {
            Some(BookingStatus::Done) | None => {}
            Some(_) => return Err(AdoptionError::InterviewUnfinished),
        }

        let updated =
            self.apply_transition(id, application.status, AdoptionStatus::Completed, None)?;

        self.coordinator.handover_completed(&updated);
        Ok(updated)
    }

    pub fn application(&self, id: AppId) -> Result<AdoptionApplication, AdoptionError> {
        self.fetch(id)
    }

    pub fn my_applications(
        &self,
        applicant: UserId,
    ) -> Result<Vec<AdoptionApplication>, AdoptionError> {
        Ok(self.repository.list_by_applicant(applicant)?)
    }

    /// Review queue for an organization; defaults to the PENDING backlog.
    pub fn applications_for_org(
        &self,
        org: OrgId,
        status: Option<AdoptionStatus>,
    ) -> Result<Vec<AdoptionApplication>, AdoptionError> {
        let status = status.unwrap_or(AdoptionStatus::Pending);
        Ok(self.repository.list_by_org_and_status(org, status)?)
    }

    fn fetch(&self, id: AppId) -> Result<AdoptionApplication, AdoptionError> {
        self.repository.fetch(id)?.ok_or(AdoptionError::NotFound)
    }

    fn apply_transition(
        &self,
        id: AppId,
        expected: AdoptionStatus,
        next: AdoptionStatus,
        reject_reason: Option<String>,
    ) -> Result<AdoptionApplication, AdoptionError> {
        match self
            .repository
            .transition(id, expected, next, reject_reason, Utc::now())
        {
            Ok(application) => Ok(application),
            Err(RepositoryError::StaleStatus) => {
                // Lost a race: report the status the row actually holds now.
                let current = self.fetch(id)?;
                Err(AdoptionError::InvalidTransition {
                    from: current.status,
                })
            }
            Err(other) => Err(AdoptionError::Repository(other)),
        }
    }
}

fn validate_reject_reason(
    approve: bool,
    reason: Option<&str>,
) -> Result<Option<String>, AdoptionError> {
    if approve {
        return Ok(None);
    }
    match reason.map(str::trim) {
        Some(reason) if !reason.is_empty() => Ok(Some(reason.to_string())),
        _ => Err(AdoptionError::Validation(
            "a reject reason is required".to_string(),
        )),
    }
}

/// Error raised by the adoption service.
#[derive(Debug, thiserror::Error)]
pub enum AdoptionError {
    #[error("adoption application not found")]
    NotFound,
    #[error("caller's organization does not own this application")]
    Forbidden,
    #[error("transition not allowed from status {}", .from.label())]
    InvalidTransition { from: AdoptionStatus },
    #[error("an open application already exists for this pet")]
    DuplicatePending,
    #[error("the interview for this application has not been completed")]
    InterviewUnfinished,
    #[error("{0}")]
    Validation(String),
    #[error("upstream collaborator failed: {0}")]
    Upstream(#[from] ClientError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
