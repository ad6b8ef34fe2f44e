use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::notifications::seed::seed_notifications;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    Info,
    Success,
    Warning,
    Error,
    JobMatch,
    Interview,
    Feedback,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewNotification {
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    pub link: Option<String>,
    pub job_id: Option<Uuid>,
}

impl NewNotification {
    fn into_notification(self) -> Notification {
        Notification {
            id: Uuid::new_v4(),
            kind: self.kind,
            title: self.title,
            message: self.message,
            timestamp: Utc::now(),
            read: false,
            link: self.link,
            job_id: self.job_id,
        }
    }
}

/// In-memory notification lists keyed by user. Newest first.
///
/// A user's list is seeded with the mock set the first time it is touched.
#[derive(Clone, Default)]
pub struct NotificationStore {
    inner: Arc<RwLock<HashMap<Uuid, Vec<Notification>>>>,
}

impl NotificationStore {
    pub async fn list(&self, user_id: Uuid) -> Vec<Notification> {
        let mut inner = self.inner.write().await;
        inner
            .entry(user_id)
            .or_insert_with(seed_notifications)
            .clone()
    }

    pub async fn unread_count(&self, user_id: Uuid) -> usize {
        let mut inner = self.inner.write().await;
        inner
            .entry(user_id)
            .or_insert_with(seed_notifications)
            .iter()
            .filter(|n| !n.read)
            .count()
    }

    pub async fn add(&self, user_id: Uuid, new: NewNotification) -> Notification {
        let notification = new.into_notification();
        let mut inner = self.inner.write().await;
        inner
            .entry(user_id)
            .or_insert_with(seed_notifications)
            .insert(0, notification.clone());
        notification
    }

    /// Returns the updated notification, or `None` if the id is unknown.
    pub async fn mark_read(&self, user_id: Uuid, id: Uuid) -> Option<Notification> {
        let mut inner = self.inner.write().await;
        let list = inner.entry(user_id).or_insert_with(seed_notifications);
        let found = list.iter_mut().find(|n| n.id == id)?;
        found.read = true;
        Some(found.clone())
    }

    /// Marks everything read and returns how many changed.
    pub async fn mark_all_read(&self, user_id: Uuid) -> usize {
        let mut inner = self.inner.write().await;
        let list = inner.entry(user_id).or_insert_with(seed_notifications);
        let mut changed = 0;
        for n in list.iter_mut().filter(|n| !n.read) {
            n.read = true;
            changed += 1;
        }
        changed
    }

    /// Removes exactly the matching entry; the rest keep their order.
    pub async fn delete(&self, user_id: Uuid, id: Uuid) -> bool {
        let mut inner = self.inner.write().await;
        let list = inner.entry(user_id).or_insert_with(seed_notifications);
        match list.iter().position(|n| n.id == id) {
            Some(idx) => {
                list.remove(idx);
                true
            }
            None => false,
        }
    }

    pub async fn clear(&self, user_id: Uuid) -> usize {
        let mut inner = self.inner.write().await;
        let list = inner.entry(user_id).or_insert_with(seed_notifications);
        let removed = list.len();
        list.clear();
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_info(title: &str) -> NewNotification {
        NewNotification {
            kind: NotificationType::Info,
            title: title.to_string(),
            message: format!("{title} body"),
            link: None,
            job_id: None,
        }
    }

    #[tokio::test]
    async fn test_first_access_seeds_list() {
        let store = NotificationStore::default();
        let list = store.list(Uuid::new_v4()).await;
        assert!(!list.is_empty());
        assert!(list.iter().any(|n| !n.read));
    }

    #[tokio::test]
    async fn test_users_are_isolated() {
        let store = NotificationStore::default();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        store.clear(a).await;
        store.add(a, new_info("only for a")).await;
        assert_eq!(store.list(a).await.len(), 1);
        assert!(store.list(b).await.iter().all(|n| n.title != "only for a"));
    }

    #[tokio::test]
    async fn test_add_prepends_unread() {
        let store = NotificationStore::default();
        let user = Uuid::new_v4();
        let before = store.list(user).await.len();
        let added = store.add(user, new_info("Interview booked")).await;
        let list = store.list(user).await;
        assert_eq!(list.len(), before + 1);
        assert_eq!(list[0].id, added.id);
        assert!(!list[0].read);
    }

    #[tokio::test]
    async fn test_mark_read_single() {
        let store = NotificationStore::default();
        let user = Uuid::new_v4();
        let added = store.add(user, new_info("x")).await;
        let updated = store.mark_read(user, added.id).await.unwrap();
        assert!(updated.read);
        assert!(store.mark_read(user, Uuid::new_v4()).await.is_none());
    }

    #[tokio::test]
    async fn test_mark_all_read_marks_every_entry() {
        let store = NotificationStore::default();
        let user = Uuid::new_v4();
        store.add(user, new_info("a")).await;
        store.add(user, new_info("b")).await;
        let changed = store.mark_all_read(user).await;
        assert!(changed >= 2);
        assert!(store.list(user).await.iter().all(|n| n.read));
        assert_eq!(store.unread_count(user).await, 0);
        assert_eq!(store.mark_all_read(user).await, 0);
    }

    #[tokio::test]
    async fn test_delete_removes_exactly_one_and_keeps_order() {
        let store = NotificationStore::default();
        let user = Uuid::new_v4();
        store.add(user, new_info("third")).await;
        let middle = store.add(user, new_info("second")).await;
        store.add(user, new_info("first")).await;

        let before: Vec<Uuid> = store.list(user).await.iter().map(|n| n.id).collect();
        assert!(store.delete(user, middle.id).await);
        let after: Vec<Uuid> = store.list(user).await.iter().map(|n| n.id).collect();

        let expected: Vec<Uuid> = before.into_iter().filter(|id| *id != middle.id).collect();
        assert_eq!(after, expected);
        assert!(!store.delete(user, middle.id).await);
    }

    #[tokio::test]
    async fn test_clear_all() {
        let store = NotificationStore::default();
        let user = Uuid::new_v4();
        let seeded = store.list(user).await.len();
        assert_eq!(store.clear(user).await, seeded);
        assert!(store.list(user).await.is_empty());
    }

    #[test]
    fn test_type_field_name_on_wire() {
        let n = new_info("wire").into_notification();
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["type"], "info");
        assert!(json.get("link").is_none());
    }
}
