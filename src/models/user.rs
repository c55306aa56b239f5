use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Stored user document (`users` collection)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub username: String,
    pub email: String,
    /// bcrypt hash; `None` for Google-only accounts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_id: Option<String>,
    #[serde(default)]
    pub bookmarks: Vec<String>,
    #[serde(default)]
    pub resource_bookmarks: Vec<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl User {
    pub fn id_hex(&self) -> String {
        self.id.map(|id| id.to_hex()).unwrap_or_default()
    }
}

/// Minimal author info embedded in other responses (the "populated" user)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, utoipa::ToSchema)]
pub struct UserSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    pub email: String,
}

impl UserSummary {
    /// Placeholder for references whose user no longer exists
    pub fn unknown(id: &str) -> Self {
        Self {
            id: id.to_string(),
            username: "[deleted]".to_string(),
            email: String::new(),
        }
    }
}

impl From<&User> for UserSummary {
    fn from(u: &User) -> Self {
        Self {
            id: u.id_hex(),
            username: u.username.clone(),
            email: u.email.clone(),
        }
    }
}

/// Own profile: everything except the password hash
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    pub email: String,
    pub google_linked: bool,
    pub bookmarks: Vec<String>,
    pub resource_bookmarks: Vec<String>,
    pub created_at: i64,
}

impl From<User> for ProfileResponse {
    fn from(u: User) -> Self {
        ProfileResponse {
            id: u.id_hex(),
            google_linked: u.google_id.is_some(),
            username: u.username,
            email: u.email,
            bookmarks: u.bookmarks,
            resource_bookmarks: u.resource_bookmarks,
            created_at: u.created_at,
        }
    }
}

/// Someone else's profile
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    pub email: String,
    pub created_at: i64,
}

impl From<User> for PublicProfile {
    fn from(u: User) -> Self {
        PublicProfile {
            id: u.id_hex(),
            username: u.username,
            email: u.email,
            created_at: u.created_at,
        }
    }
}

#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> User {
        User {
            id: Some(ObjectId::new()),
            username: "ana".into(),
            email: "ana@example.com".into(),
            password: Some("$2b$12$hash".into()),
            google_id: None,
            bookmarks: vec![],
            resource_bookmarks: vec![],
            created_at: 1,
            updated_at: 1,
        }
    }

    #[test]
    fn test_profile_never_contains_password() {
        let json = serde_json::to_value(ProfileResponse::from(sample())).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["username"], "ana");
        assert_eq!(json["googleLinked"], false);
    }

    #[test]
    fn test_stored_field_names_are_camel_case() {
        let mut user = sample();
        user.google_id = Some("g-123".into());
        let doc = mongodb::bson::to_document(&user).unwrap();
        assert!(doc.contains_key("googleId"));
        assert!(doc.contains_key("resourceBookmarks"));
        assert!(doc.contains_key("_id"));
    }

    #[test]
    fn test_missing_lists_default_to_empty() {
        let json = serde_json::json!({
            "username": "old",
            "email": "old@example.com",
            "createdAt": 0,
            "updatedAt": 0
        });
        let user: User = serde_json::from_value(json).unwrap();
        assert!(user.bookmarks.is_empty());
        assert!(user.password.is_none());
    }
}
