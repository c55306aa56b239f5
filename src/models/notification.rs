use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Entry of the global notification log (`notifications` collection).
/// Read state lives in `readBy`, one entry per user who marked it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opportunity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    pub created_at: i64,
    #[serde(default)]
    pub read_by: Vec<String>,
}

impl Notification {
    pub fn new(message: String, opportunity: Option<String>, resource: Option<String>, now: i64) -> Self {
        Notification {
            id: None,
            message,
            opportunity,
            resource,
            created_at: now,
            read_by: Vec::new(),
        }
    }

    pub fn is_read_by(&self, user_id: &str) -> bool {
        self.read_by.iter().any(|u| u == user_id)
    }

    /// Adds `user_id` to the readers; returns false if it was already there
    pub fn mark_read(&mut self, user_id: &str) -> bool {
        if self.is_read_by(user_id) {
            return false;
        }
        self.read_by.push(user_id.to_string());
        true
    }
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct NotificationOpportunityRef {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct NotificationResourceRef {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub domain: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub message: String,
    pub opportunity: Option<NotificationOpportunityRef>,
    pub resource: Option<NotificationResourceRef>,
    pub created_at: i64,
    pub read_by: Vec<String>,
    /// Whether the caller has marked it read
    pub read: bool,
}

impl NotificationResponse {
    pub fn new(
        n: Notification,
        viewer: &str,
        opportunity: Option<NotificationOpportunityRef>,
        resource: Option<NotificationResourceRef>,
    ) -> Self {
        NotificationResponse {
            read: n.is_read_by(viewer),
            id: n.id.map(|id| id.to_hex()).unwrap_or_default(),
            message: n.message,
            opportunity,
            resource,
            created_at: n.created_at,
            read_by: n.read_by,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_read_is_idempotent() {
        let mut n = Notification::new("New Job posted: Rust dev".into(), Some("opp".into()), None, 1);
        assert!(!n.is_read_by("u1"));
        assert!(n.mark_read("u1"));
        assert!(!n.mark_read("u1"));
        assert!(n.mark_read("u2"));
        assert_eq!(n.read_by, vec!["u1".to_string(), "u2".to_string()]);
    }

    #[test]
    fn test_response_read_flag_is_per_viewer() {
        let mut n = Notification::new("New resource posted: Rust Book".into(), None, Some("res".into()), 1);
        n.mark_read("u1");

        assert!(NotificationResponse::new(n.clone(), "u1", None, None).read);
        assert!(!NotificationResponse::new(n, "u2", None, None).read);
    }
}
