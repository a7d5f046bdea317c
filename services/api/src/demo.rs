use crate::infra::{
    AdoptionDirectoryAdapter, BookingDirectoryAdapter, InMemoryAccountDirectory,
    InMemoryAdoptionRepository, InMemoryBookingStore, InMemoryNotificationStore,
    InMemoryPetRegistry, InMemorySlotStore,
};
use chrono::{Duration, Utc};
use clap::Args;
use pawflow::error::AppError;
use pawflow::workflows::adoption::AdoptionService;
use pawflow::workflows::clients::DirectoryUser;
use pawflow::workflows::ids::{OrgId, PetId, Role, UserId};
use pawflow::workflows::interview::InterviewService;
use pawflow::workflows::notify::channel::{ChannelError, MessageChannel};
use pawflow::workflows::notify::store::NotificationStore;
use pawflow::workflows::notify::{NotificationConsumer, NotificationDispatcher};
use pawflow::workflows::orchestration::OrchestrationCoordinator;
use std::fmt::Display;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Skip the interview leg and hand over straight after review
    #[arg(long)]
    pub(crate) skip_interview: bool,
}

/// Channel that delivers each event to the consumer inline, so the demo can
/// read materialized inbox messages without a running pump task.
struct InlineChannel {
    consumer: NotificationConsumer,
}

impl MessageChannel for InlineChannel {
    fn publish(&self, _routing_key: &str, payload: &str) -> Result<(), ChannelError> {
        self.consumer
            .handle(payload)
            .map_err(|err| ChannelError::Rejected(err.to_string()))
    }
}

fn demo_err(err: impl Display) -> AppError {
    AppError::Io(std::io::Error::new(
        std::io::ErrorKind::Other,
        err.to_string(),
    ))
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let applicant = UserId(1);
    let org = OrgId(1);
    let pet = PetId(7);

    let accounts = Arc::new(InMemoryAccountDirectory::with_users(vec![
        DirectoryUser {
            id: UserId(100),
            roles: vec![Role::User, Role::OrgAdmin],
        },
        DirectoryUser {
            id: UserId(200),
            roles: vec![Role::User, Role::Auditor],
        },
        DirectoryUser {
            id: applicant,
            roles: vec![Role::User],
        },
    ]));
    let adoption_repository = Arc::new(InMemoryAdoptionRepository::default());
    let slot_store = Arc::new(InMemorySlotStore::default());
    let booking_store = Arc::new(InMemoryBookingStore::default());
    let notification_store = Arc::new(InMemoryNotificationStore::default());
    let pet_registry = Arc::new(InMemoryPetRegistry::default());

    let dispatcher = Arc::new(NotificationDispatcher::new(
        Arc::new(InlineChannel {
            consumer: NotificationConsumer::new(notification_store.clone()),
        }),
        accounts,
        100,
    ));

    let adoption_lookup = Arc::new(AdoptionDirectoryAdapter::new(adoption_repository.clone()));
    let coordinator = Arc::new(OrchestrationCoordinator::new(
        pet_registry.clone(),
        adoption_lookup.clone(),
        dispatcher,
    ));

    let adoptions = AdoptionService::new(
        adoption_repository,
        Arc::new(BookingDirectoryAdapter::new(booking_store.clone())),
        coordinator.clone(),
    );
    let interviews = InterviewService::new(
        slot_store,
        booking_store,
        adoption_lookup,
        coordinator,
    );

    println!("Adoption coordination demo");

    let application = adoptions.submit(pet, applicant, org).map_err(demo_err)?;
    println!(
        "  submitted application {} for pet {} -> {}",
        application.id,
        pet,
        application.status.label()
    );

    let application = adoptions
        .review_by_org(application.id, org, true, None)
        .map_err(demo_err)?;
    println!("  org review passed -> {}", application.status.label());

    let application = adoptions
        .review_by_platform(application.id, true, None)
        .map_err(demo_err)?;
    println!("  platform review passed -> {}", application.status.label());

    if !args.skip_interview {
        let start = Utc::now() + Duration::days(1);
        let slot = interviews
            .create_slot(org, start, start + Duration::minutes(30), None)
            .map_err(demo_err)?;
        println!("  org published slot {}", slot.id);

        interviews
            .request(application.id, slot.id)
            .map_err(demo_err)?;
        println!("  applicant requested the slot");

        interviews.confirm(application.id).map_err(demo_err)?;
        println!("  org confirmed the interview");

        interviews.complete(application.id).map_err(demo_err)?;
        println!("  interview held");
    }

    let application = adoptions
        .complete_handover(application.id, org)
        .map_err(demo_err)?;
    println!("  handover complete -> {}", application.status.label());

    match pet_registry.status_of(pet) {
        Some(status) => println!("  pet {} availability -> {}", pet, status.label()),
        None => println!("  pet {} availability unchanged", pet),
    }

    let inbox = notification_store
        .inbox_for_user(applicant)
        .map_err(demo_err)?;
    println!("  applicant inbox ({} messages):", inbox.len());
    for message in inbox {
        println!("    - {}: {}", message.title, message.body);
    }

    Ok(())
}
