use crate::cli::ServeArgs;
use crate::infra::{
    spawn_consumer_pump, AdoptionDirectoryAdapter, AppState, BookingDirectoryAdapter,
    InMemoryAccountDirectory, InMemoryAdoptionRepository, InMemoryBookingStore,
    InMemoryNotificationStore, InMemoryOrgDirectory, InMemoryPetRegistry, InMemorySlotStore,
    QueueMessageChannel,
};
use crate::routes::with_platform_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use pawflow::config::AppConfig;
use pawflow::error::AppError;
use pawflow::telemetry;
use pawflow::workflows::adoption::{adoption_router, AdoptionRouterState, AdoptionService};
use pawflow::workflows::clients::{DirectoryUser, OrgDirectory};
use pawflow::workflows::ids::{OrgId, Role, UserId};
use pawflow::workflows::interview::{interview_router, InterviewRouterState, InterviewService};
use pawflow::workflows::notify::{
    notification_router, NotificationConsumer, NotificationDispatcher, NotifyRouterState,
};
use pawflow::workflows::orchestration::OrchestrationCoordinator;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

/// Development fixtures standing in for the account and org directories
/// until the real services are wired up: one org admin, one auditor, one
/// staff member, one applicant.
fn seed_directories() -> (Arc<InMemoryAccountDirectory>, Arc<InMemoryOrgDirectory>) {
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
            id: UserId(300),
            roles: vec![Role::User, Role::OrgStaff],
        },
        DirectoryUser {
            id: UserId(1),
            roles: vec![Role::User],
        },
    ]));

    let orgs = Arc::new(InMemoryOrgDirectory::default());
    orgs.assign(UserId(100), OrgId(1));
    orgs.assign(UserId(300), OrgId(1));

    (accounts, orgs)
}

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let (accounts, orgs) = seed_directories();
    let orgs: Arc<dyn OrgDirectory> = orgs;

    let adoption_repository = Arc::new(InMemoryAdoptionRepository::default());
    let slot_store = Arc::new(InMemorySlotStore::default());
    let booking_store = Arc::new(InMemoryBookingStore::default());
    let notification_store = Arc::new(InMemoryNotificationStore::default());
    let pet_registry = Arc::new(InMemoryPetRegistry::default());

    let (channel, channel_events) = QueueMessageChannel::new();
    spawn_consumer_pump(
        channel_events,
        NotificationConsumer::new(notification_store.clone()),
    );

    let dispatcher = Arc::new(NotificationDispatcher::new(
        Arc::new(channel),
        accounts,
        config.notify.directory_page_size,
    ));

    let adoption_lookup = Arc::new(AdoptionDirectoryAdapter::new(adoption_repository.clone()));
    let coordinator = Arc::new(OrchestrationCoordinator::new(
        pet_registry,
        adoption_lookup.clone(),
        dispatcher,
    ));

    let adoption_service = Arc::new(AdoptionService::new(
        adoption_repository,
        Arc::new(BookingDirectoryAdapter::new(booking_store.clone())),
        coordinator.clone(),
    ));
    let interview_service = Arc::new(InterviewService::new(
        slot_store,
        booking_store,
        adoption_lookup,
        coordinator,
    ));

    let app = with_platform_routes(
        adoption_router(AdoptionRouterState {
            service: adoption_service,
            orgs: orgs.clone(),
        }),
        interview_router(InterviewRouterState {
            service: interview_service,
            orgs,
        }),
        notification_router(NotifyRouterState {
            store: notification_store,
        }),
    )
    .layer(Extension(app_state))
    .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "adoption coordination service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
