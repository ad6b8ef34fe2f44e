use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::notifications::store::{Notification, NotificationType};

/// (type, title, message, link, minutes ago, read)
const SEED: &[(NotificationType, &str, &str, Option<&str>, i64, bool)] = &[
    (
        NotificationType::JobMatch,
        "New candidate match",
        "A candidate matching 4 of 5 required skills applied to Senior Rust Engineer.",
        Some("/jobs"),
        15,
        false,
    ),
    (
        NotificationType::Interview,
        "Interview scheduled",
        "Technical interview confirmed for tomorrow at 10:00.",
        Some("/interviews"),
        90,
        false,
    ),
    (
        NotificationType::Feedback,
        "Feedback pending",
        "Submit feedback for yesterday's screening call.",
        Some("/feedback"),
        60 * 20,
        true,
    ),
    (
        NotificationType::System,
        "Welcome",
        "Your workspace is ready. Review your branch and department settings.",
        None,
        60 * 24 * 3,
        true,
    ),
];

/// Builds the mock notification set handed to a user on first access.
pub fn seed_notifications() -> Vec<Notification> {
    let now = Utc::now();
    SEED.iter()
        .map(|&(kind, title, message, link, minutes_ago, read)| Notification {
            id: Uuid::new_v4(),
            kind,
            title: title.to_string(),
            message: message.to_string(),
            timestamp: now - Duration::minutes(minutes_ago),
            read,
            link: link.map(String::from),
            job_id: None,
        })
        .collect()
}
