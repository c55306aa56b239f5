use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use super::{OpportunityResponse, Owned, UserSummary};
use crate::utils::{require, AppError, AppResult};

/// A job application (`requests` collection). One per (opportunity, user),
/// backed by a unique index on `{opportunity, requestedBy}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRequest {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub opportunity: String,
    pub requested_by: String,
    pub description: String,
    /// Stored file name under the resume directory
    pub resume_path: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Owned for JobRequest {
    fn owner_id(&self) -> &str {
        &self.requested_by
    }
}

impl JobRequest {
    pub fn new(
        opportunity: &str,
        requested_by: &str,
        description: Option<&str>,
        resume_path: Option<String>,
        now: i64,
    ) -> AppResult<Self> {
        let resume_path =
            resume_path.ok_or_else(|| AppError::BadRequest("Resume upload is required.".to_string()))?;

        Ok(JobRequest {
            id: None,
            opportunity: opportunity.to_string(),
            requested_by: requested_by.to_string(),
            description: require(description, "Description")?,
            resume_path,
            created_at: now,
            updated_at: now,
        })
    }

    /// The applicant and the owner of the opportunity may read the resume
    pub fn can_view_resume(&self, user_id: &str, opportunity_owner: Option<&str>) -> bool {
        self.is_owned_by(user_id) || opportunity_owner.map_or(false, |owner| !user_id.is_empty() && owner == user_id)
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobRequestResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub opportunity: String,
    pub requested_by: UserSummary,
    pub description: String,
    /// API path to download the resume
    pub resume_url: String,
    pub created_at: i64,
}

impl JobRequestResponse {
    pub fn new(r: JobRequest, requested_by: UserSummary) -> Self {
        let id = r.id.map(|id| id.to_hex()).unwrap_or_default();
        JobRequestResponse {
            resume_url: format!("/api/requests/{}/resume", id),
            id,
            opportunity: r.opportunity,
            requested_by,
            description: r.description,
            created_at: r.created_at,
        }
    }
}

/// Entry of `GET /requests/my-requests`: the request with its opportunity
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MyRequestResponse {
    #[serde(flatten)]
    pub request: JobRequestResponse,
    /// `None` when the opportunity has been deleted since
    pub opportunity_details: Option<OpportunityResponse>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const APPLICANT: &str = "65f1c2a9e4b0a1b2c3d4e5f6";
    const POSTER: &str = "65f1c2a9e4b0a1b2c3d4e5f7";
    const STRANGER: &str = "65f1c2a9e4b0a1b2c3d4e5f8";

    #[test]
    fn test_resume_is_required() {
        let err = JobRequest::new("opp", APPLICANT, Some("Hire me"), None, 1).unwrap_err();
        assert_eq!(err.to_string(), "Resume upload is required.");
    }

    #[test]
    fn test_description_is_required_and_trimmed() {
        assert!(JobRequest::new("opp", APPLICANT, Some("  "), Some("r.pdf".into()), 1).is_err());

        let r = JobRequest::new("opp", APPLICANT, Some(" Hire me "), Some("r.pdf".into()), 1).unwrap();
        assert_eq!(r.description, "Hire me");
    }

    #[test]
    fn test_only_applicant_owns_request() {
        let r = JobRequest::new("opp", APPLICANT, Some("Hire me"), Some("r.pdf".into()), 1).unwrap();
        assert!(r.ensure_owned_by(APPLICANT).is_ok());
        assert!(r.ensure_owned_by(POSTER).is_err());
    }

    #[test]
    fn test_resume_visibility() {
        let r = JobRequest::new("opp", APPLICANT, Some("Hire me"), Some("r.pdf".into()), 1).unwrap();
        assert!(r.can_view_resume(APPLICANT, Some(POSTER)));
        assert!(r.can_view_resume(POSTER, Some(POSTER)));
        assert!(!r.can_view_resume(STRANGER, Some(POSTER)));
        assert!(!r.can_view_resume(POSTER, None));
    }

    #[test]
    fn test_response_links_resume_route() {
        let mut r = JobRequest::new("opp", APPLICANT, Some("Hire me"), Some("r.pdf".into()), 1).unwrap();
        let id = ObjectId::new();
        r.id = Some(id);
        let response = JobRequestResponse::new(r, UserSummary::unknown(APPLICANT));
        assert_eq!(response.resume_url, format!("/api/requests/{}/resume", id.to_hex()));
    }
}
