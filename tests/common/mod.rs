//! Shared in-memory fixtures for the workflow integration suites.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use pawflow::workflows::adoption::domain::{AdoptionApplication, AdoptionStatus};
use pawflow::workflows::adoption::repository::{
    AdoptionRepository, NewApplication, RepositoryError,
};
use pawflow::workflows::adoption::AdoptionService;
use pawflow::workflows::clients::{
    AccountDirectory, AdoptionLookup, ApplicationParties, ClientError, DirectoryUser,
    InterviewLookup, OrgDirectory, PetAvailability, PetRegistry, UserPage,
};
use pawflow::workflows::ids::{
    AppId, BookingId, MessageId, OrgId, PetId, Role, SlotId, TaskId, UserId,
};
use pawflow::workflows::interview::domain::{BookingStatus, InterviewBooking, ScheduleSlot};
use pawflow::workflows::interview::repository::{
    BookingStore, NewBooking, NewSlot, SlotStore, StoreError as InterviewStoreError,
};
use pawflow::workflows::interview::InterviewService;
use pawflow::workflows::notify::channel::{ChannelError, MessageChannel};
use pawflow::workflows::notify::domain::{DirectMessage, InboxMessage, NotifyTask, TaskStatus};
use pawflow::workflows::notify::store::{
    NewDirectMessage, NewInboxMessage, NewNotifyTask, NotificationStore,
    StoreError as NotifyStoreError,
};
use pawflow::workflows::notify::NotificationDispatcher;
use pawflow::workflows::orchestration::OrchestrationCoordinator;

#[derive(Default)]
pub struct MemoryAdoptionRepository {
    rows: Mutex<HashMap<AppId, AdoptionApplication>>,
    next_id: AtomicI64,
}

impl MemoryAdoptionRepository {
    /// Test hook: force a row into an arbitrary status.
    pub fn set_status(&self, id: AppId, status: AdoptionStatus) {
        let mut guard = self.rows.lock().expect("lock");
        if let Some(row) = guard.get_mut(&id) {
            row.status = status;
        }
    }
}

impl AdoptionRepository for MemoryAdoptionRepository {
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
        self.rows
            .lock()
            .expect("lock")
            .insert(id, application.clone());
        Ok(application)
    }

    fn fetch(&self, id: AppId) -> Result<Option<AdoptionApplication>, RepositoryError> {
        Ok(self.rows.lock().expect("lock").get(&id).cloned())
    }

    fn has_open_application(
        &self,
        applicant: UserId,
        pet: PetId,
    ) -> Result<bool, RepositoryError> {
        Ok(self.rows.lock().expect("lock").values().any(|row| {
            row.applicant_id == applicant && row.pet_id == pet && !row.status.is_terminal()
        }))
    }

    fn list_by_applicant(
        &self,
        applicant: UserId,
    ) -> Result<Vec<AdoptionApplication>, RepositoryError> {
        let mut rows: Vec<AdoptionApplication> = self
            .rows
            .lock()
            .expect("lock")
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
        let mut rows: Vec<AdoptionApplication> = self
            .rows
            .lock()
            .expect("lock")
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
        let mut guard = self.rows.lock().expect("lock");
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
pub struct MemorySlotStore {
    rows: Mutex<HashMap<SlotId, ScheduleSlot>>,
    next_id: AtomicI64,
}

impl SlotStore for MemorySlotStore {
    fn insert(&self, slot: NewSlot) -> Result<ScheduleSlot, InterviewStoreError> {
        let id = SlotId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let slot = ScheduleSlot {
            id,
            org_id: slot.org_id,
            start_at: slot.start_at,
            end_at: slot.end_at,
            is_open: slot.is_open,
        };
        self.rows.lock().expect("lock").insert(id, slot.clone());
        Ok(slot)
    }

    fn fetch(&self, id: SlotId) -> Result<Option<ScheduleSlot>, InterviewStoreError> {
        Ok(self.rows.lock().expect("lock").get(&id).cloned())
    }

    fn update(&self, slot: ScheduleSlot) -> Result<(), InterviewStoreError> {
        let mut guard = self.rows.lock().expect("lock");
        if !guard.contains_key(&slot.id) {
            return Err(InterviewStoreError::NotFound);
        }
        guard.insert(slot.id, slot);
        Ok(())
    }

    fn delete(&self, id: SlotId) -> Result<(), InterviewStoreError> {
        self.rows
            .lock()
            .expect("lock")
            .remove(&id)
            .map(|_| ())
            .ok_or(InterviewStoreError::NotFound)
    }

    fn list_by_org(&self, org: OrgId) -> Result<Vec<ScheduleSlot>, InterviewStoreError> {
        Ok(self
            .rows
            .lock()
            .expect("lock")
            .values()
            .filter(|slot| slot.org_id == org)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct MemoryBookingStore {
    rows: Mutex<HashMap<AppId, InterviewBooking>>,
    next_id: AtomicI64,
}

impl BookingStore for MemoryBookingStore {
    fn insert(&self, booking: NewBooking) -> Result<InterviewBooking, InterviewStoreError> {
        let id = BookingId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let row = InterviewBooking {
            id,
            app_id: booking.app_id,
            slot_id: booking.slot_id,
            status: BookingStatus::Requested,
            created_at: booking.requested_at,
            updated_at: booking.requested_at,
        };
        self.rows
            .lock()
            .expect("lock")
            .insert(booking.app_id, row.clone());
        Ok(row)
    }

    fn fetch_by_app(&self, app: AppId) -> Result<Option<InterviewBooking>, InterviewStoreError> {
        Ok(self.rows.lock().expect("lock").get(&app).cloned())
    }

    fn list_by_slots(
        &self,
        slots: &[SlotId],
    ) -> Result<Vec<InterviewBooking>, InterviewStoreError> {
        let mut rows: Vec<InterviewBooking> = self
            .rows
            .lock()
            .expect("lock")
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
        let mut guard = self.rows.lock().expect("lock");
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
pub struct MemoryNotificationStore {
    tasks: Mutex<HashMap<TaskId, NotifyTask>>,
    inbox: Mutex<Vec<InboxMessage>>,
    directs: Mutex<Vec<DirectMessage>>,
    next_task_id: AtomicI64,
    next_message_id: AtomicI64,
}

impl MemoryNotificationStore {
    pub fn tasks(&self) -> Vec<NotifyTask> {
        self.tasks.lock().expect("lock").values().cloned().collect()
    }

    pub fn inbox(&self) -> Vec<InboxMessage> {
        self.inbox.lock().expect("lock").clone()
    }

    pub fn directs(&self) -> Vec<DirectMessage> {
        self.directs.lock().expect("lock").clone()
    }
}

impl NotificationStore for MemoryNotificationStore {
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
        self.tasks.lock().expect("lock").insert(id, row.clone());
        Ok(row)
    }

    fn mark_task_sent(&self, id: TaskId) -> Result<(), NotifyStoreError> {
        let mut guard = self.tasks.lock().expect("lock");
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
        self.inbox.lock().expect("lock").push(row.clone());
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
        self.directs.lock().expect("lock").push(row.clone());
        Ok(row)
    }

    fn inbox_for_user(&self, user: UserId) -> Result<Vec<InboxMessage>, NotifyStoreError> {
        Ok(self
            .inbox
            .lock()
            .expect("lock")
            .iter()
            .filter(|message| message.to_user_id == user)
            .cloned()
            .collect())
    }

    fn direct_for_user(&self, user: UserId) -> Result<Vec<DirectMessage>, NotifyStoreError> {
        Ok(self
            .directs
            .lock()
            .expect("lock")
            .iter()
            .filter(|message| message.to_user_id == user || message.from_user_id == user)
            .cloned()
            .collect())
    }

    fn mark_read(&self, id: MessageId) -> Result<(), NotifyStoreError> {
        let mut guard = self.inbox.lock().expect("lock");
        let message = guard
            .iter_mut()
            .find(|message| message.id == id)
            .ok_or(NotifyStoreError::NotFound)?;
        message.is_read = true;
        Ok(())
    }

    fn mark_all_read(&self, user: UserId) -> Result<(), NotifyStoreError> {
        let mut guard = self.inbox.lock().expect("lock");
        for message in guard.iter_mut().filter(|message| message.to_user_id == user) {
            message.is_read = true;
        }
        Ok(())
    }
}

/// Channel fake recording every publish; can be switched to fail on demand.
#[derive(Default)]
pub struct RecordingChannel {
    events: Mutex<Vec<(String, String)>>,
    failing: AtomicBool,
}

impl RecordingChannel {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn events(&self) -> Vec<(String, String)> {
        self.events.lock().expect("lock").clone()
    }

    pub fn events_for_key(&self, routing_key: &str) -> Vec<String> {
        self.events
            .lock()
            .expect("lock")
            .iter()
            .filter(|(key, _)| key == routing_key)
            .map(|(_, payload)| payload.clone())
            .collect()
    }
}

impl MessageChannel for RecordingChannel {
    fn publish(&self, routing_key: &str, payload: &str) -> Result<(), ChannelError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ChannelError::Unavailable("broker down".to_string()));
        }
        self.events
            .lock()
            .expect("lock")
            .push((routing_key.to_string(), payload.to_string()));
        Ok(())
    }
}

/// Directory fake serving a fixed user list page by page, counting calls.
pub struct PagedDirectory {
    users: Vec<DirectoryUser>,
    calls: AtomicU32,
}

impl PagedDirectory {
    pub fn with_users(users: Vec<DirectoryUser>) -> Self {
        Self {
            users,
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl AccountDirectory for PagedDirectory {
    fn list_users(&self, page: u32, page_size: u32) -> Result<UserPage, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
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
pub struct StaticOrgDirectory {
    memberships: Mutex<HashMap<UserId, OrgId>>,
}

impl StaticOrgDirectory {
    pub fn assign(&self, user: UserId, org: OrgId) {
        self.memberships.lock().expect("lock").insert(user, org);
    }
}

impl OrgDirectory for StaticOrgDirectory {
    fn primary_org(&self, user: UserId) -> Result<Option<OrgId>, ClientError> {
        Ok(self.memberships.lock().expect("lock").get(&user).copied())
    }
}

/// Pet registry fake recording every propagated flip.
#[derive(Default)]
pub struct RecordingPetRegistry {
    flips: Mutex<Vec<(PetId, PetAvailability)>>,
    failing: AtomicBool,
}

impl RecordingPetRegistry {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn flips(&self) -> Vec<(PetId, PetAvailability)> {
        self.flips.lock().expect("lock").clone()
    }

    pub fn last_status(&self, pet: PetId) -> Option<PetAvailability> {
        self.flips
            .lock()
            .expect("lock")
            .iter()
            .rev()
            .find(|(flipped, _)| *flipped == pet)
            .map(|(_, status)| *status)
    }
}

impl PetRegistry for RecordingPetRegistry {
    fn update_availability(
        &self,
        pet: PetId,
        status: PetAvailability,
    ) -> Result<(), ClientError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ClientError::Unavailable("pet registry down".to_string()));
        }
        self.flips.lock().expect("lock").push((pet, status));
        Ok(())
    }
}

pub struct RepositoryLookup {
    repository: Arc<MemoryAdoptionRepository>,
}

impl AdoptionLookup for RepositoryLookup {
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

pub struct BookingLookup {
    bookings: Arc<MemoryBookingStore>,
}

impl InterviewLookup for BookingLookup {
    fn booking_status(&self, app: AppId) -> Result<Option<BookingStatus>, ClientError> {
        let row = self
            .bookings
            .fetch_by_app(app)
            .map_err(|err| ClientError::Unavailable(err.to_string()))?;
        Ok(row.map(|booking| booking.status))
    }
}

/// Everything a workflow scenario needs, wired the way the api service
/// wires it.
pub struct World {
    pub adoptions: Arc<AdoptionService<MemoryAdoptionRepository>>,
    pub interviews: Arc<InterviewService<MemorySlotStore, MemoryBookingStore>>,
    pub repository: Arc<MemoryAdoptionRepository>,
    pub slots: Arc<MemorySlotStore>,
    pub bookings: Arc<MemoryBookingStore>,
    pub channel: Arc<RecordingChannel>,
    pub directory: Arc<PagedDirectory>,
    pub orgs: Arc<StaticOrgDirectory>,
    pub pets: Arc<RecordingPetRegistry>,
}

pub const ORG: OrgId = OrgId(1);
pub const ORG_ADMIN: UserId = UserId(100);
pub const APPLICANT: UserId = UserId(3);

pub fn directory_users() -> Vec<DirectoryUser> {
    vec![
        DirectoryUser {
            id: ORG_ADMIN,
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
            id: APPLICANT,
            roles: vec![Role::User],
        },
    ]
}

pub fn build_world() -> World {
    build_world_with_users(directory_users())
}

pub fn build_world_with_users(users: Vec<DirectoryUser>) -> World {
    let repository = Arc::new(MemoryAdoptionRepository::default());
    let slots = Arc::new(MemorySlotStore::default());
    let bookings = Arc::new(MemoryBookingStore::default());
    let channel = Arc::new(RecordingChannel::default());
    let directory = Arc::new(PagedDirectory::with_users(users));
    let orgs = Arc::new(StaticOrgDirectory::default());
    orgs.assign(ORG_ADMIN, ORG);
    let pets = Arc::new(RecordingPetRegistry::default());

    let dispatcher = Arc::new(NotificationDispatcher::new(
        channel.clone(),
        directory.clone(),
        100,
    ));
    let lookup = Arc::new(RepositoryLookup {
        repository: repository.clone(),
    });
    let coordinator = Arc::new(OrchestrationCoordinator::new(
        pets.clone(),
        lookup.clone(),
        dispatcher,
    ));

    let adoptions = Arc::new(AdoptionService::new(
        repository.clone(),
        Arc::new(BookingLookup {
            bookings: bookings.clone(),
        }),
        coordinator.clone(),
    ));
    let interviews = Arc::new(InterviewService::new(
        slots.clone(),
        bookings.clone(),
        lookup,
        coordinator,
    ));

    World {
        adoptions,
        interviews,
        repository,
        slots,
        bookings,
        channel,
        directory,
        orgs,
        pets,
    }
}

/// A slot one day out, half an hour long.
pub fn tomorrow_slot(world: &World) -> ScheduleSlot {
    let start = Utc::now() + Duration::days(1);
    world
        .interviews
        .create_slot(ORG, start, start + Duration::minutes(30), None)
        .expect("slot creates")
}
