//! The adoption application lifecycle: submission, two-stage review, and
//! handover completion.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

pub use domain::{AdoptionApplication, AdoptionStatus};
pub use repository::{AdoptionRepository, NewApplication, RepositoryError};
pub use router::{adoption_router, AdoptionRouterState};
pub use service::{AdoptionError, AdoptionService};
