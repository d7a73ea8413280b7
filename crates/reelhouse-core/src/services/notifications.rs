use std::sync::Arc;

use reelhouse_api::{ApiRequest, RealtimeChannel};
use serde::de::IgnoredAny;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::model::{ListPayload, NotificationId, UserNotification};
use crate::request::Requester;
use crate::store::ListCache;
use crate::stream::{EntityStream, Snapshot};

const LIST_PATH: &str = "/user-notification/get-all";
const DELETE_PATH: &str = "/user-notification/delete";
const CLEAR_PATH: &str = "/user-notification/clear-all";

/// Where the broker pushes new notifications for the current user.
pub const NOTIFICATION_QUEUE: &str = "/user/queue/notifications";

pub const NOTIFICATION_DELETED: &str = "Notification deleted";
pub const NOTIFICATIONS_CLEARED: &str = "All notifications cleared";

/// The user's notification inbox.
#[derive(Debug, Clone)]
pub struct NotificationService {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    requester: Requester,
    cache: ListCache<UserNotification>,
}

impl NotificationService {
    pub fn new(requester: Requester) -> Self {
        Self {
            inner: Arc::new(Inner {
                requester,
                cache: ListCache::new(),
            }),
        }
    }

    pub fn notifications(&self) -> Snapshot<UserNotification> {
        self.inner.cache.snapshot()
    }

    pub fn subscribe(&self) -> EntityStream<UserNotification> {
        self.inner.cache.subscribe()
    }

    pub async fn fetch(&self) -> Option<Vec<UserNotification>> {
        let payload: ListPayload<UserNotification> = self.inner.requester.get(LIST_PATH).await?;
        let notifications = payload.into_vec();
        debug!(count = notifications.len(), "notifications fetched");
        self.inner.cache.replace(notifications.clone());
        Some(notifications)
    }

    pub async fn delete(&self, id: NotificationId) -> bool {
        let request = ApiRequest::delete(DELETE_PATH).query("notificationId", id);
        if self
            .inner
            .requester
            .execute::<IgnoredAny>(request)
            .await
            .is_none()
        {
            return false;
        }
        self.inner.requester.notifier().success(NOTIFICATION_DELETED);
        self.inner.cache.retain(|n| n.notification_id != id);
        true
    }

    pub async fn clear_all(&self) -> bool {
        if self
            .inner
            .requester
            .delete::<IgnoredAny>(CLEAR_PATH)
            .await
            .is_none()
        {
            return false;
        }
        self.inner.requester.notifier().success(NOTIFICATIONS_CLEARED);
        self.inner.cache.clear();
        true
    }

    /// Listen for pushed notifications on `channel`.
    ///
    /// Each one is put at the top of the inbox and announced with an info
    /// toast. The subscription is registered immediately and survives
    /// reconnects; the returned task runs until aborted, and is removed
    /// from the channel when the task ends.
    pub fn follow(&self, channel: &RealtimeChannel) -> JoinHandle<()> {
        let mut messages = channel.messages();
        let guard = SubscriptionGuard {
            id: channel.subscribe(NOTIFICATION_QUEUE),
            channel: channel.clone(),
        };
        let inner = Arc::clone(&self.inner);

        tokio::spawn(async move {
            let subscription = &guard.id;
            loop {
                let message = match messages.recv().await {
                    Ok(m) => m,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "notification listener lagged");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };
                if message.subscription.as_ref() != Some(subscription)
                    && message.destination != NOTIFICATION_QUEUE
                {
                    continue;
                }
                match message.json::<UserNotification>() {
                    Ok(notification) => {
                        info!(id = notification.notification_id, "notification pushed");
                        inner.requester.notifier().info(&notification.message);
                        inner.cache.prepend(notification);
                    }
                    Err(e) => warn!(error = %e, "ignoring malformed pushed notification"),
                }
            }
            debug!("notification listener stopped");
        })
    }
}

struct SubscriptionGuard {
    id: String,
    channel: RealtimeChannel,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.channel.unsubscribe(&self.id);
    }
}
