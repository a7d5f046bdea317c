//! Client traits for the services this one collaborates with.
//!
//! Every cross-service round-trip in the workflows goes through one of these
//! seams so the orchestration can be exercised without live collaborators.
//! Calls are synchronous request/response: implementations are expected to
//! apply their own timeout and report it as [`ClientError::Timeout`].

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::ids::{AppId, OrgId, PetId, Role, UserId};
use super::interview::domain::BookingStatus;

/// Failure of a collaborator round-trip. Whether this aborts the caller or is
/// absorbed depends on the call site: guards that belong to the primary
/// operation surface it, orchestration side effects log and continue.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),
    #[error("collaborator call timed out after {0:?}")]
    Timeout(Duration),
}

/// One user as reported by the account directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryUser {
    pub id: UserId,
    pub roles: Vec<Role>,
}

/// One page of the account directory listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPage {
    pub users: Vec<DirectoryUser>,
    pub total: u64,
}

/// Account directory: paged access to every platform user and their role
/// set. Pages are numbered from 1.
pub trait AccountDirectory: Send + Sync {
    fn list_users(&self, page: u32, page_size: u32) -> Result<UserPage, ClientError>;
}

/// Org directory: resolves the acting user's organization membership. Used
/// to authorize org-scoped operations, so failures here are hard failures.
pub trait OrgDirectory: Send + Sync {
    fn primary_org(&self, user: UserId) -> Result<Option<OrgId>, ClientError>;
}

/// Availability values the orchestration propagates to the pet registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PetAvailability {
    Available,
    Reserved,
    Adopted,
}

impl PetAvailability {
    pub const fn label(self) -> &'static str {
        match self {
            PetAvailability::Available => "AVAILABLE",
            PetAvailability::Reserved => "RESERVED",
            PetAvailability::Adopted => "ADOPTED",
        }
    }
}

/// Pet registry: flips a pet's availability as the application advances.
pub trait PetRegistry: Send + Sync {
    fn update_availability(&self, pet: PetId, status: PetAvailability) -> Result<(), ClientError>;
}

/// The application parties the interview domain and the orchestration need
/// when all they hold is an application id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplicationParties {
    pub org_id: OrgId,
    pub applicant_id: UserId,
    pub pet_id: PetId,
}

/// Read-only view into the adoption domain, mirroring what the interview
/// service fetches over RPC: the parties behind an application id.
pub trait AdoptionLookup: Send + Sync {
    fn application_parties(&self, app: AppId) -> Result<Option<ApplicationParties>, ClientError>;
}

/// Read-only view into the interview domain, used by the handover guard:
/// the status of the booking linked to an application, if one exists.
pub trait InterviewLookup: Send + Sync {
    fn booking_status(&self, app: AppId) -> Result<Option<BookingStatus>, ClientError>;
}
