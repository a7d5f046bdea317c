use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workflows::ids::{AppId, OrgId, PetId, UserId};

/// Lifecycle of an adoption application.
///
/// PENDING is the initial state; ORG_REJECTED, PLATFORM_REJECTED, and
/// COMPLETED are terminal. Only a terminal application frees the
/// (applicant, pet) pair for a new submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdoptionStatus {
    Pending,
    OrgApproved,
    OrgRejected,
    PlatformApproved,
    PlatformRejected,
    Completed,
}

impl AdoptionStatus {
    pub const ALL: [AdoptionStatus; 6] = [
        AdoptionStatus::Pending,
        AdoptionStatus::OrgApproved,
        AdoptionStatus::OrgRejected,
        AdoptionStatus::PlatformApproved,
        AdoptionStatus::PlatformRejected,
        AdoptionStatus::Completed,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            AdoptionStatus::Pending => "PENDING",
            AdoptionStatus::OrgApproved => "ORG_APPROVED",
            AdoptionStatus::OrgRejected => "ORG_REJECTED",
            AdoptionStatus::PlatformApproved => "PLATFORM_APPROVED",
            AdoptionStatus::PlatformRejected => "PLATFORM_REJECTED",
            AdoptionStatus::Completed => "COMPLETED",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            AdoptionStatus::OrgRejected
                | AdoptionStatus::PlatformRejected
                | AdoptionStatus::Completed
        )
    }

    /// Statuses from which the handover can be completed.
    pub const fn permits_handover(self) -> bool {
        matches!(
            self,
            AdoptionStatus::OrgApproved | AdoptionStatus::PlatformApproved
        )
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Some(AdoptionStatus::Pending),
            "ORG_APPROVED" => Some(AdoptionStatus::OrgApproved),
            "ORG_REJECTED" => Some(AdoptionStatus::OrgRejected),
            "PLATFORM_APPROVED" => Some(AdoptionStatus::PlatformApproved),
            "PLATFORM_REJECTED" => Some(AdoptionStatus::PlatformRejected),
            "COMPLETED" => Some(AdoptionStatus::Completed),
            _ => None,
        }
    }
}

/// One adoption application, owned by the adoption domain. Mutated only by
/// the organization reviewer, the platform reviewer, or the handover step;
/// never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdoptionApplication {
    pub id: AppId,
    pub pet_id: PetId,
    pub applicant_id: UserId,
    pub org_id: OrgId,
    pub status: AdoptionStatus,
    /// Set only by a *_REJECTED transition, verbatim from the reviewer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reject_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
