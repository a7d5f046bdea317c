use std::sync::Arc;

use tracing::{debug, info, warn};

use super::channel::MessageChannel;
use super::domain::NotifyEvent;
use crate::workflows::clients::AccountDirectory;
use crate::workflows::ids::{OrgId, Role, UserId};

/// Publishes typed notification events to the message channel and expands
/// role-addressed broadcasts into per-user publishes.
///
/// Publishing is deliberately infallible from the caller's point of view:
/// notification delivery must never fail the business operation that
/// triggered it, so channel errors are logged here and absorbed.
pub struct NotificationDispatcher {
    channel: Arc<dyn MessageChannel>,
    directory: Arc<dyn AccountDirectory>,
    page_size: u32,
}

impl NotificationDispatcher {
    pub fn new(
        channel: Arc<dyn MessageChannel>,
        directory: Arc<dyn AccountDirectory>,
        page_size: u32,
    ) -> Self {
        Self {
            channel,
            directory,
            page_size: page_size.max(1),
        }
    }

    /// Serialize and publish one event under its routing key.
    pub fn publish(&self, event: &NotifyEvent) {
        let routing_key = event.routing_key();
        let payload = event.envelope().to_string();
        match self.channel.publish(routing_key, &payload) {
            Ok(()) => debug!(routing_key, "notification event published"),
            Err(err) => warn!(routing_key, error = %err, "notification publish failed"),
        }
    }

    /// Publish a system notification addressed to one user.
    pub fn notify_user(
        &self,
        user_id: UserId,
        title: &str,
        body: &str,
        template_code: Option<&str>,
    ) {
        self.publish(&NotifyEvent::System {
            user_id,
            title: title.to_string(),
            body: body.to_string(),
            template_code: template_code.map(str::to_string),
        });
    }

    /// Fan a system notification out to every user holding `role`.
    ///
    /// Walks the account directory page by page from page 1, filters each
    /// page by role membership, and publishes once per match. The walk stops
    /// when `page * page_size` reaches the directory-reported total or a
    /// page comes back empty. Delivery is one-shot with no retries; a failed
    /// per-user publish does not abort the remainder. Returns the number of
    /// matching users a publish was attempted for.
    pub fn broadcast_to_role(
        &self,
        role: Role,
        title: &str,
        body: &str,
        template_code: Option<&str>,
    ) -> usize {
        let mut delivered = 0usize;
        let mut page = 1u32;

        loop {
            let listing = match self.directory.list_users(page, self.page_size) {
                Ok(listing) => listing,
                Err(err) => {
                    warn!(role = %role, page, error = %err, "role fan-out aborted: directory unavailable");
                    break;
                }
            };

            if listing.users.is_empty() {
                break;
            }

            for user in listing.users.iter().filter(|user| user.roles.contains(&role)) {
                self.notify_user(user.id, title, body, template_code);
                delivered += 1;
            }

            if u64::from(page) * u64::from(self.page_size) >= listing.total {
                break;
            }
            page += 1;
        }

        if delivered == 0 {
            warn!(role = %role, "role fan-out matched no recipients");
        } else {
            info!(role = %role, delivered, "role fan-out complete");
        }
        delivered
    }

    /// Notify an organization's administrators.
    ///
    /// The directory has no per-org membership view, so this fans out to the
    /// whole ORG_ADMIN role; `org_id` is carried for the log trail until the
    /// org directory can narrow the recipient set.
    pub fn notify_org_admins(
        &self,
        org_id: OrgId,
        title: &str,
        body: &str,
        template_code: Option<&str>,
    ) -> usize {
        let delivered = self.broadcast_to_role(Role::OrgAdmin, title, body, template_code);
        debug!(%org_id, delivered, "org admin notification fan-out");
        delivered
    }
}
