//! In-memory infrastructure: storage traits, collaborator clients, and the
//! message channel, implemented over process-local state. Production
//! deployments swap these for the relational store, the directory services,
//! and the broker; the workflows cannot tell the difference.

use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use pawflow::workflows::adoption::domain::{AdoptionApplication, AdoptionStatus};
use pawflow::workflows::adoption::repository::{
    AdoptionRepository, NewApplication, RepositoryError,
};
use pawflow::workflows::clients::{
    AccountDirectory, AdoptionLookup, ApplicationParties, ClientError, DirectoryUser,
    InterviewLookup, OrgDirectory, PetAvailability, PetRegistry, UserPage,
};
use pawflow::workflows::ids::{
    AppId, BookingId, MessageId, OrgId, PetId, SlotId, TaskId, UserId,
};
use pawflow::workflows::interview::domain::{BookingStatus, InterviewBooking, ScheduleSlot};
use pawflow::workflows::interview::repository::{
    BookingStore, NewBooking, NewSlot, SlotStore, StoreError as InterviewStoreError,
};
use pawflow::workflows::notify::channel::{ChannelError, MessageChannel};
use pawflow::workflows::notify::consumer::NotificationConsumer;
use pawflow::workflows::notify::domain::{DirectMessage, InboxMessage, NotifyTask, TaskStatus};
use pawflow::workflows::notify::store::{
    NewDirectMessage, NewInboxMessage, NewNotifyTask, NotificationStore,
    StoreError as NotifyStoreError,
};
use tokio::sync::mpsc;
use tracing::{error, info};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default)]
pub(crate) struct InMemoryAdoptionRepository {
    rows: Mutex<HashMap<AppId, AdoptionApplication>>,
    next_id: AtomicI64,
}

impl AdoptionRepository for InMemoryAdoptionRepository {
    fn insert(&self, row: NewApplication) -> Result<AdoptionApplication, RepositoryError> {
        let id = AppId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let application = AdoptionApplication {
            id,
            pet_id: row.pet_id,
            applicant_id: row.applicant_id,
            org_id: row.org_id,
            status: AdoptionStatus::Pending,
            reject_reason: None,
            created_at: row.submitted_at,
            updated_at: row.submitted_at,
        };
        let mut guard = self.rows.lock().expect("repository mutex poisoned");
        guard.insert(id, application.clone());
        Ok(application)
    }

    fn fetch(&self, id: AppId) -> Result<Option<AdoptionApplication>, RepositoryError> {
        let guard = self.rows.lock().expect("repository mutex poisoned");
        Ok(guard.get(&id).cloned())
    }

    fn has_open_application(
        &self,
        applicant: UserId,
        pet: PetId,
    ) -> Result<bool, RepositoryError> {
        let guard = self.rows.lock().expect("repository mutex poisoned");
        Ok(guard.values().any(|row| {
            row.applicant_id == applicant && row.pet_id == pet && !row.status.is_terminal()
        }))
    }

    fn list_by_applicant(
        &self,
        applicant: UserId,
    ) -> Result<Vec<AdoptionApplication>, RepositoryError> {
        let guard = self.rows.lock().expect("repository mutex poisoned");
        let mut rows: Vec<AdoptionApplication> = guard
            .values()
            .filter(|row| row.applicant_id == applicant)
            .cloned()
            .collect();
        rows.sort_by_key(|row| row.id);
        Ok(rows)
    }

    fn list_by_org_and_status(
        &self,
        org: OrgId,
        status: AdoptionStatus,
    ) -> Result<Vec<AdoptionApplication>, RepositoryError> {
        let guard = self.rows.lock().expect("repository mutex poisoned");
        let mut rows: Vec<AdoptionApplication> = guard
            .values()
            .filter(|row| row.org_id == org && row.status == status)
            .cloned()
            .collect();
        rows.sort_by_key(|row| row.id);
        Ok(rows)
    }

    fn transition(
        &self,
        id: AppId,
        expected: AdoptionStatus,
        next: AdoptionStatus,
        reject_reason: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<AdoptionApplication, RepositoryError> {
        let mut guard = self.rows.lock().expect("repository mutex poisoned");
        let row = guard.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        if row.status != expected {
            return Err(RepositoryError::StaleStatus);
        }
        row.status = next;
        if reject_reason.is_some() {
            row.reject_reason = reject_reason;
        }
        row.updated_at = at;
        Ok(row.clone())
    }
}

#[derive(Default)]
pub(crate) struct InMemorySlotStore {
    rows: Mutex<HashMap<SlotId, ScheduleSlot>>,
    next_id: AtomicI64,
}

impl SlotStore for InMemorySlotStore {
    fn insert(&self, slot: NewSlot) -> Result<ScheduleSlot, InterviewStoreError> {
        let id = SlotId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let slot = ScheduleSlot {
            id,
            org_id: slot.org_id,
            start_at: slot.start_at,
            end_at: slot.end_at,
            is_open: slot.is_open,
        };
        let mut guard = self.rows.lock().expect("slot mutex poisoned");
        guard.insert(id, slot.clone());
        Ok(slot)
    }

    fn fetch(&self, id: SlotId) -> Result<Option<ScheduleSlot>, InterviewStoreError> {
        let guard = self.rows.lock().expect("slot mutex poisoned");
        Ok(guard.get(&id).cloned())
    }

    fn update(&self, slot: ScheduleSlot) -> Result<(), InterviewStoreError> {
        let mut guard = self.rows.lock().expect("slot mutex poisoned");
        if !guard.contains_key(&slot.id) {
            return Err(InterviewStoreError::NotFound);
        }
        guard.insert(slot.id, slot);
        Ok(())
    }

    fn delete(&self, id: SlotId) -> Result<(), InterviewStoreError> {
        let mut guard = self.rows.lock().expect("slot mutex poisoned");
        guard.remove(&id).ok_or(InterviewStoreError::NotFound)?;
        Ok(())
    }

    fn list_by_org(&self, org: OrgId) -> Result<Vec<ScheduleSlot>, InterviewStoreError> {
        let guard = self.rows.lock().expect("slot mutex poisoned");
        Ok(guard
            .values()
            .filter(|slot| slot.org_id == org)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub(crate) struct InMemoryBookingStore {
    rows: Mutex<HashMap<AppId, InterviewBooking>>,
    next_id: AtomicI64,
}

impl BookingStore for InMemoryBookingStore {
    fn insert(&self, booking: NewBooking) -> Result<InterviewBooking, InterviewStoreError> {
        let id = BookingId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let booking_row = InterviewBooking {
            id,
            app_id: booking.app_id,
            slot_id: booking.slot_id,
            status: BookingStatus::Requested,
            created_at: booking.requested_at,
            updated_at: booking.requested_at,
        };
        let mut guard = self.rows.lock().expect("booking mutex poisoned");
        guard.insert(booking.app_id, booking_row.clone());
        Ok(booking_row)
    }

    fn fetch_by_app(&self, app: AppId) -> Result<Option<InterviewBooking>, InterviewStoreError> {
        let guard = self.rows.lock().expect("booking mutex poisoned");
        Ok(guard.get(&app).cloned())
    }

    fn list_by_slots(
        &self,
        slots: &[SlotId],
    ) -> Result<Vec<InterviewBooking>, InterviewStoreError> {
        let guard = self.rows.lock().expect("booking mutex poisoned");
        let mut rows: Vec<InterviewBooking> = guard
            .values()
            .filter(|booking| slots.contains(&booking.slot_id))
            .cloned()
            .collect();
        rows.sort_by_key(|booking| booking.id);
        Ok(rows)
    }

    fn transition(
        &self,
        app: AppId,
        expected: BookingStatus,
        next: BookingStatus,
        at: DateTime<Utc>,
    ) -> Result<InterviewBooking, InterviewStoreError> {
        let mut guard = self.rows.lock().expect("booking mutex poisoned");
        let row = guard.get_mut(&app).ok_or(InterviewStoreError::NotFound)?;
        if row.status != expected {
            return Err(InterviewStoreError::StaleStatus);
        }
        row.status = next;
        row.updated_at = at;
        Ok(row.clone())
    }
}

#[derive(Default)]
pub(crate) struct InMemoryNotificationStore {
    tasks: Mutex<HashMap<TaskId, NotifyTask>>,
    inbox: Mutex<Vec<InboxMessage>>,
    directs: Mutex<Vec<DirectMessage>>,
    next_task_id: AtomicI64,
    next_message_id: AtomicI64,
}

impl NotificationStore for InMemoryNotificationStore {
    fn insert_task(&self, task: NewNotifyTask) -> Result<NotifyTask, NotifyStoreError> {
        let id = TaskId(self.next_task_id.fetch_add(1, Ordering::Relaxed) + 1);
        let row = NotifyTask {
            id,
            user_id: task.user_id,
            channel: task.channel,
            template_code: task.template_code,
            payload: task.payload,
            status: TaskStatus::Pending,
            retry_count: 0,
            created_at: task.created_at,
        };
        let mut guard = self.tasks.lock().expect("task mutex poisoned");
        guard.insert(id, row.clone());
        Ok(row)
    }

    fn mark_task_sent(&self, id: TaskId) -> Result<(), NotifyStoreError> {
        let mut guard = self.tasks.lock().expect("task mutex poisoned");
        let task = guard.get_mut(&id).ok_or(NotifyStoreError::NotFound)?;
        task.status = TaskStatus::Sent;
        Ok(())
    }

    fn insert_inbox(&self, message: NewInboxMessage) -> Result<InboxMessage, NotifyStoreError> {
        let id = MessageId(self.next_message_id.fetch_add(1, Ordering::Relaxed) + 1);
        let row = InboxMessage {
            id,
            to_user_id: message.to_user_id,
            title: message.title,
            body: message.body,
            is_read: false,
            created_at: message.created_at,
        };
        let mut guard = self.inbox.lock().expect("inbox mutex poisoned");
        guard.push(row.clone());
        Ok(row)
    }

    fn insert_direct(
        &self,
        message: NewDirectMessage,
    ) -> Result<DirectMessage, NotifyStoreError> {
        let id = MessageId(self.next_message_id.fetch_add(1, Ordering::Relaxed) + 1);
        let row = DirectMessage {
            id,
            from_user_id: message.from_user_id,
            to_user_id: message.to_user_id,
            content: message.content,
            created_at: message.created_at,
        };
        let mut guard = self.directs.lock().expect("direct mutex poisoned");
        guard.push(row.clone());
        Ok(row)
    }

    fn inbox_for_user(&self, user: UserId) -> Result<Vec<InboxMessage>, NotifyStoreError> {
        let guard = self.inbox.lock().expect("inbox mutex poisoned");
        Ok(guard
            .iter()
            .filter(|message| message.to_user_id == user)
            .cloned()
            .collect())
    }

    fn direct_for_user(&self, user: UserId) -> Result<Vec<DirectMessage>, NotifyStoreError> {
        let guard = self.directs.lock().expect("direct mutex poisoned");
        Ok(guard
            .iter()
            .filter(|message| message.to_user_id == user || message.from_user_id == user)
            .cloned()
            .collect())
    }

    fn mark_read(&self, id: MessageId) -> Result<(), NotifyStoreError> {
        let mut guard = self.inbox.lock().expect("inbox mutex poisoned");
        let message = guard
            .iter_mut()
            .find(|message| message.id == id)
            .ok_or(NotifyStoreError::NotFound)?;
        message.is_read = true;
        Ok(())
    }

    fn mark_all_read(&self, user: UserId) -> Result<(), NotifyStoreError> {
        let mut guard = self.inbox.lock().expect("inbox mutex poisoned");
        for message in guard.iter_mut().filter(|message| message.to_user_id == user) {
            message.is_read = true;
        }
        Ok(())
    }
}

/// Fixed account directory, paged the way the auth service pages its user
/// listing.
pub(crate) struct InMemoryAccountDirectory {
    users: Vec<DirectoryUser>,
}

impl InMemoryAccountDirectory {
    pub(crate) fn with_users(users: Vec<DirectoryUser>) -> Self {
        Self { users }
    }
}

impl AccountDirectory for InMemoryAccountDirectory {
    fn list_users(&self, page: u32, page_size: u32) -> Result<UserPage, ClientError> {
        let start = page.saturating_sub(1).saturating_mul(page_size) as usize;
        let end = (start + page_size as usize).min(self.users.len());
        let users = if start < self.users.len() {
            self.users[start..end].to_vec()
        } else {
            Vec::new()
        };
        Ok(UserPage {
            users,
            total: self.users.len() as u64,
        })
    }
}

#[derive(Default)]
pub(crate) struct InMemoryOrgDirectory {
    memberships: Mutex<HashMap<UserId, OrgId>>,
}

impl InMemoryOrgDirectory {
    pub(crate) fn assign(&self, user: UserId, org: OrgId) {
        let mut guard = self.memberships.lock().expect("membership mutex poisoned");
        guard.insert(user, org);
    }
}

impl OrgDirectory for InMemoryOrgDirectory {
    fn primary_org(&self, user: UserId) -> Result<Option<OrgId>, ClientError> {
        let guard = self.memberships.lock().expect("membership mutex poisoned");
        Ok(guard.get(&user).copied())
    }
}

/// Pet registry stub that records the propagated availability flips.
#[derive(Default)]
pub(crate) struct InMemoryPetRegistry {
    statuses: Mutex<HashMap<PetId, PetAvailability>>,
}

impl InMemoryPetRegistry {
    pub(crate) fn status_of(&self, pet: PetId) -> Option<PetAvailability> {
        let guard = self.statuses.lock().expect("pet mutex poisoned");
        guard.get(&pet).copied()
    }
}

impl PetRegistry for InMemoryPetRegistry {
    fn update_availability(
        &self,
        pet: PetId,
        status: PetAvailability,
    ) -> Result<(), ClientError> {
        let mut guard = self.statuses.lock().expect("pet mutex poisoned");
        guard.insert(pet, status);
        info!(%pet, status = status.label(), "pet availability updated");
        Ok(())
    }
}

/// Adapter giving the interview domain and the coordinator their read-only
/// view of adoption applications, the role the adoption service's RPC
/// client plays in the deployed system.
pub(crate) struct AdoptionDirectoryAdapter<R> {
    repository: Arc<R>,
}

impl<R> AdoptionDirectoryAdapter<R> {
    pub(crate) fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }
}

impl<R> AdoptionLookup for AdoptionDirectoryAdapter<R>
where
    R: AdoptionRepository + 'static,
{
    fn application_parties(
        &self,
        app: AppId,
    ) -> Result<Option<ApplicationParties>, ClientError> {
        let row = self
            .repository
            .fetch(app)
            .map_err(|err| ClientError::Unavailable(err.to_string()))?;
        Ok(row.map(|application| ApplicationParties {
            org_id: application.org_id,
            applicant_id: application.applicant_id,
            pet_id: application.pet_id,
        }))
    }
}

/// Adapter giving the adoption domain its view of interview bookings for
/// the handover guard.
pub(crate) struct BookingDirectoryAdapter<B> {
    bookings: Arc<B>,
}

impl<B> BookingDirectoryAdapter<B> {
    pub(crate) fn new(bookings: Arc<B>) -> Self {
        Self { bookings }
    }
}

impl<B> InterviewLookup for BookingDirectoryAdapter<B>
where
    B: BookingStore + 'static,
{
    fn booking_status(&self, app: AppId) -> Result<Option<BookingStatus>, ClientError> {
        let row = self
            .bookings
            .fetch_by_app(app)
            .map_err(|err| ClientError::Unavailable(err.to_string()))?;
        Ok(row.map(|booking| booking.status))
    }
}

/// One message in flight between the dispatcher and the consumer pump.
#[derive(Debug)]
pub(crate) struct ChannelEvent {
    pub(crate) routing_key: String,
    pub(crate) payload: String,
}

/// Topic channel backed by an in-process queue. Publishing enqueues and
/// returns; the pump drains the queue on its own task, which preserves the
/// fire-and-forget contract of the broker it stands in for.
pub(crate) struct QueueMessageChannel {
    sender: mpsc::UnboundedSender<ChannelEvent>,
}

impl QueueMessageChannel {
    pub(crate) fn new() -> (Self, mpsc::UnboundedReceiver<ChannelEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl MessageChannel for QueueMessageChannel {
    fn publish(&self, routing_key: &str, payload: &str) -> Result<(), ChannelError> {
        self.sender
            .send(ChannelEvent {
                routing_key: routing_key.to_string(),
                payload: payload.to_string(),
            })
            .map_err(|_| ChannelError::Unavailable("consumer pump stopped".to_string()))
    }
}

/// Drain the channel queue into the consumer. Consumer errors are logged
/// and the pump keeps going; one bad event must not stall the stream.
pub(crate) fn spawn_consumer_pump(
    mut receiver: mpsc::UnboundedReceiver<ChannelEvent>,
    consumer: NotificationConsumer,
) {
    tokio::spawn(async move {
        while let Some(event) = receiver.recv().await {
            if let Err(err) = consumer.handle(&event.payload) {
                error!(routing_key = event.routing_key, error = %err, "notification event dropped");
            }
        }
    });
}
