use std::collections::HashMap;

use mongodb::bson::{doc, oid::ObjectId, Document};
use serde::{Deserialize, Serialize};

use super::{Owned, UserSummary};
use crate::utils::{non_blank, AppError, AppResult};

/// What a comment is attached to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentTarget {
    Opportunity(String),
    Resource(String),
}

impl CommentTarget {
    /// Filter matching the comments of this target
    pub fn filter(&self) -> Document {
        match self {
            CommentTarget::Opportunity(id) => doc! { "opportunity": id },
            CommentTarget::Resource(id) => doc! { "resource": id },
        }
    }
}

/// Stored comment (`comments` collection). Exactly one of `opportunity` /
/// `resource` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opportunity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    pub user: String,
    pub text: String,
    /// Parent comment id; stored as null for top-level comments
    #[serde(default)]
    pub parent: Option<String>,
    pub created_at: i64,
}

impl Owned for Comment {
    fn owner_id(&self) -> &str {
        &self.user
    }
}

impl Comment {
    /// Builds a comment. `parent` must be the top-level comment it replies
    /// to, already loaded by the caller; only resource comments take replies.
    pub fn new(
        target: CommentTarget,
        user: &str,
        text: Option<&str>,
        parent: Option<&Comment>,
        now: i64,
    ) -> AppResult<Self> {
        let text = non_blank(text).ok_or_else(|| AppError::BadRequest("Comment text is required.".to_string()))?;

        let parent_id = match parent {
            None => None,
            Some(parent) => {
                let CommentTarget::Resource(resource_id) = &target else {
                    return Err(AppError::BadRequest(
                        "Replies are only supported on resource comments.".to_string(),
                    ));
                };
                if parent.resource.as_deref() != Some(resource_id.as_str()) {
                    return Err(AppError::BadRequest(
                        "Parent comment belongs to a different resource.".to_string(),
                    ));
                }
                if parent.parent.is_some() {
                    return Err(AppError::BadRequest("Replies cannot be nested further.".to_string()));
                }
                Some(
                    parent
                        .id
                        .map(|id| id.to_hex())
                        .ok_or_else(|| AppError::Internal("Parent comment has no id".to_string()))?,
                )
            }
        };

        let (opportunity, resource) = match target {
            CommentTarget::Opportunity(id) => (Some(id), None),
            CommentTarget::Resource(id) => (None, Some(id)),
        };

        Ok(Comment {
            id: None,
            opportunity,
            resource,
            user: user.to_string(),
            text,
            parent: parent_id,
            created_at: now,
        })
    }

    pub fn id_hex(&self) -> String {
        self.id.map(|id| id.to_hex()).unwrap_or_default()
    }
}

#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
pub struct CommentRequest {
    pub text: Option<String>,
    /// Id of the top-level comment being answered (resource comments only)
    pub parent: Option<String>,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opportunity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    pub user: UserSummary,
    pub text: String,
    pub parent: Option<String>,
    pub created_at: i64,
}

impl CommentResponse {
    pub fn new(c: Comment, user: UserSummary) -> Self {
        CommentResponse {
            id: c.id_hex(),
            opportunity: c.opportunity,
            resource: c.resource,
            user,
            text: c.text,
            parent: c.parent,
            created_at: c.created_at,
        }
    }
}

/// Top-level comment with its replies
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CommentThread {
    #[serde(flatten)]
    pub comment: CommentResponse,
    pub replies: Vec<CommentResponse>,
}

/// Groups replies under their parents. Both inputs are expected oldest
/// first; replies whose parent is not in `top_level` are dropped.
pub fn build_threads(top_level: Vec<CommentResponse>, replies: Vec<CommentResponse>) -> Vec<CommentThread> {
    let mut by_parent: HashMap<String, Vec<CommentResponse>> = HashMap::new();
    for reply in replies {
        if let Some(parent) = reply.parent.clone() {
            by_parent.entry(parent).or_default().push(reply);
        }
    }

    top_level
        .into_iter()
        .map(|comment| {
            let replies = by_parent.remove(&comment.id).unwrap_or_default();
            CommentThread { comment, replies }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESOURCE: &str = "65f1c2a9e4b0a1b2c3d4e5a1";
    const OTHER_RESOURCE: &str = "65f1c2a9e4b0a1b2c3d4e5a2";
    const AUTHOR: &str = "65f1c2a9e4b0a1b2c3d4e5f6";
    const READER: &str = "65f1c2a9e4b0a1b2c3d4e5f7";

    fn stored(mut c: Comment) -> Comment {
        c.id = Some(ObjectId::new());
        c
    }

    fn response(id: &str, parent: Option<&str>, at: i64) -> CommentResponse {
        CommentResponse {
            id: id.to_string(),
            opportunity: None,
            resource: Some(RESOURCE.to_string()),
            user: UserSummary::unknown(AUTHOR),
            text: format!("comment {}", id),
            parent: parent.map(String::from),
            created_at: at,
        }
    }

    #[test]
    fn test_text_required_and_trimmed() {
        let target = CommentTarget::Opportunity("opp".into());
        let err = Comment::new(target.clone(), AUTHOR, Some("   "), None, 1).unwrap_err();
        assert_eq!(err.to_string(), "Comment text is required.");

        let c = Comment::new(target, AUTHOR, Some("  nice  "), None, 1).unwrap();
        assert_eq!(c.text, "nice");
        assert_eq!(c.opportunity.as_deref(), Some("opp"));
        assert!(c.resource.is_none());
    }

    #[test]
    fn test_reply_to_top_level_resource_comment() {
        let parent = stored(Comment::new(CommentTarget::Resource(RESOURCE.into()), AUTHOR, Some("q"), None, 1).unwrap());
        let reply = Comment::new(CommentTarget::Resource(RESOURCE.into()), READER, Some("a"), Some(&parent), 2).unwrap();
        assert_eq!(reply.parent, Some(parent.id_hex()));
    }

    #[test]
    fn test_replies_only_one_level_deep() {
        let parent = stored(Comment::new(CommentTarget::Resource(RESOURCE.into()), AUTHOR, Some("q"), None, 1).unwrap());
        let reply = stored(Comment::new(CommentTarget::Resource(RESOURCE.into()), READER, Some("a"), Some(&parent), 2).unwrap());

        let err = Comment::new(CommentTarget::Resource(RESOURCE.into()), AUTHOR, Some("b"), Some(&reply), 3).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn test_reply_must_share_resource() {
        let parent = stored(Comment::new(CommentTarget::Resource(OTHER_RESOURCE.into()), AUTHOR, Some("q"), None, 1).unwrap());
        assert!(Comment::new(CommentTarget::Resource(RESOURCE.into()), READER, Some("a"), Some(&parent), 2).is_err());
    }

    #[test]
    fn test_opportunity_comments_are_flat() {
        let parent = stored(Comment::new(CommentTarget::Opportunity("opp".into()), AUTHOR, Some("q"), None, 1).unwrap());
        assert!(Comment::new(CommentTarget::Opportunity("opp".into()), READER, Some("a"), Some(&parent), 2).is_err());
    }

    #[test]
    fn test_only_author_owns_comment() {
        let c = Comment::new(CommentTarget::Resource(RESOURCE.into()), AUTHOR, Some("q"), None, 1).unwrap();
        assert!(c.ensure_owned_by(AUTHOR).is_ok());
        assert!(c.ensure_owned_by(READER).is_err());
    }

    #[test]
    fn test_target_filters() {
        assert_eq!(CommentTarget::Opportunity("x".into()).filter(), doc! { "opportunity": "x" });
        assert_eq!(CommentTarget::Resource("y".into()).filter(), doc! { "resource": "y" });
    }

    #[test]
    fn test_build_threads_groups_replies_in_order() {
        let top = vec![response("a", None, 1), response("b", None, 2)];
        let replies = vec![
            response("r1", Some("b"), 3),
            response("r2", Some("a"), 4),
            response("r3", Some("b"), 5),
            response("orphan", Some("zzz"), 6),
        ];

        let threads = build_threads(top, replies);
        assert_eq!(threads.len(), 2);
        assert_eq!(threads[0].comment.id, "a");
        assert_eq!(threads[0].replies.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(), vec!["r2"]);
        assert_eq!(
            threads[1].replies.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(),
            vec!["r1", "r3"]
        );
    }

    #[test]
    fn test_thread_serializes_flat_with_replies() {
        let threads = build_threads(vec![response("a", None, 1)], vec![]);
        let json = serde_json::to_value(&threads[0]).unwrap();
        assert_eq!(json["_id"], "a");
        assert_eq!(json["replies"].as_array().unwrap().len(), 0);
    }
}
