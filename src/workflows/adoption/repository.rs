use chrono::{DateTime, Utc};

use super::domain::{AdoptionApplication, AdoptionStatus};
use crate::workflows::ids::{AppId, OrgId, PetId, UserId};

/// New application captured at submission time.
#[derive(Debug, Clone)]
pub struct NewApplication {
    pub pet_id: PetId,
    pub applicant_id: UserId,
    pub org_id: OrgId,
    pub submitted_at: DateTime<Utc>,
}

/// Storage abstraction so the state machine can be exercised in isolation.
pub trait AdoptionRepository: Send + Sync {
    fn insert(&self, row: NewApplication) -> Result<AdoptionApplication, RepositoryError>;
    fn fetch(&self, id: AppId) -> Result<Option<AdoptionApplication>, RepositoryError>;
    /// True when a non-terminal application exists for the pair. This is the
    /// submission-time existence check: check-then-act, not race-proof.
    fn has_open_application(&self, applicant: UserId, pet: PetId)
        -> Result<bool, RepositoryError>;
    fn list_by_applicant(&self, applicant: UserId)
        -> Result<Vec<AdoptionApplication>, RepositoryError>;
    fn list_by_org_and_status(
        &self,
        org: OrgId,
        status: AdoptionStatus,
    ) -> Result<Vec<AdoptionApplication>, RepositoryError>;
    /// Conditional transition: writes `next` (stamping `updated_at`, and
    /// `reject_reason` when given) only while the row is still in
    /// `expected`. A concurrent writer observes `StaleStatus` instead of
    /// double-applying the transition.
    fn transition(
        &self,
        id: AppId,
        expected: AdoptionStatus,
        next: AdoptionStatus,
        reject_reason: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<AdoptionApplication, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("row no longer in the expected status")]
    StaleStatus,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
