use std::collections::HashMap;
use std::path::PathBuf;

use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId};

use crate::{
    config::AppConfig,
    database::{MongoDB, OPPORTUNITIES, REQUESTS},
    models::{JobRequest, JobRequestResponse, MyRequestResponse, Opportunity, OpportunityKind, Owned},
    services::{
        opportunity_service,
        upload_service::{self, MultipartForm, UploadKind},
        user_service,
    },
    utils::{is_duplicate_key, now_millis, parse_object_id, AppError, AppResult},
};

fn already_requested() -> AppError {
    AppError::BadRequest("You have already requested this opportunity".to_string())
}

async fn find(db: &MongoDB, request_id: &str) -> AppResult<JobRequest> {
    let oid = parse_object_id(request_id, "request")?;
    db.collection::<JobRequest>(REQUESTS)
        .find_one(doc! { "_id": oid })
        .await?
        .ok_or_else(|| AppError::NotFound("Request not found".to_string()))
}

/// Applies to a job with a description and a resume file
pub async fn create(
    db: &MongoDB,
    user_id: &str,
    opportunity_id: &str,
    mut form: MultipartForm,
) -> AppResult<JobRequestResponse> {
    let Some(resume) = form.take_file(UploadKind::Resume) else {
        return Err(AppError::BadRequest("Resume upload is required.".to_string()));
    };

    let result = async {
        let opportunity = opportunity_service::find(db, opportunity_id).await?;
        if opportunity.kind != OpportunityKind::Job {
            return Err(AppError::BadRequest("Only jobs accept requests".to_string()));
        }

        let collection = db.collection::<JobRequest>(REQUESTS);
        let existing = collection
            .find_one(doc! { "opportunity": opportunity_id, "requestedBy": user_id })
            .await?;
        if existing.is_some() {
            return Err(already_requested());
        }

        let mut request = JobRequest::new(
            opportunity_id,
            user_id,
            form.text("description"),
            Some(resume.file_name.clone()),
            now_millis(),
        )?;

        match collection.insert_one(&request).await {
            Ok(inserted) => request.id = inserted.inserted_id.as_object_id(),
            Err(e) if is_duplicate_key(&e) => return Err(already_requested()),
            Err(e) => return Err(e.into()),
        }
        Ok::<_, AppError>(request)
    }
    .await;

    match result {
        Ok(request) => {
            log::info!("✅ Request created for opportunity {} by {}", opportunity_id, user_id);
            let users = user_service::summaries(db, [user_id]).await?;
            Ok(JobRequestResponse::new(request, user_service::summary_of(&users, user_id)))
        }
        Err(e) => {
            upload_service::remove_file(&resume.path).await;
            form.discard().await;
            Err(e)
        }
    }
}

/// The caller's requests, newest first, each with its opportunity
pub async fn my_requests(db: &MongoDB, user_id: &str) -> AppResult<Vec<MyRequestResponse>> {
    let requests: Vec<JobRequest> = db
        .collection::<JobRequest>(REQUESTS)
        .find(doc! { "requestedBy": user_id })
        .sort(doc! { "createdAt": -1 })
        .await?
        .try_collect()
        .await?;

    let opportunity_ids: Vec<ObjectId> = requests
        .iter()
        .filter_map(|r| ObjectId::parse_str(&r.opportunity).ok())
        .collect();
    let opportunities: Vec<Opportunity> = if opportunity_ids.is_empty() {
        Vec::new()
    } else {
        db.collection::<Opportunity>(OPPORTUNITIES)
            .find(doc! { "_id": { "$in": opportunity_ids } })
            .await?
            .try_collect()
            .await?
    };

    let mut details: HashMap<String, _> = opportunity_service::with_posters(db, opportunities)
        .await?
        .into_iter()
        .map(|o| (o.id.clone(), o))
        .collect();

    let users = user_service::summaries(db, [user_id]).await?;
    Ok(requests
        .into_iter()
        .map(|r| {
            // one request per (opportunity, user)
            let opportunity_details = details.remove(&r.opportunity);
            MyRequestResponse {
                request: JobRequestResponse::new(r, user_service::summary_of(&users, user_id)),
                opportunity_details,
            }
        })
        .collect())
}

/// Requests for one opportunity; only its poster may list them
pub async fn for_opportunity(db: &MongoDB, user_id: &str, opportunity_id: &str) -> AppResult<Vec<JobRequestResponse>> {
    let opportunity = opportunity_service::find(db, opportunity_id).await?;
    opportunity.ensure_owned_by(user_id)?;

    let requests: Vec<JobRequest> = db
        .collection::<JobRequest>(REQUESTS)
        .find(doc! { "opportunity": opportunity_id })
        .sort(doc! { "createdAt": -1 })
        .await?
        .try_collect()
        .await?;

    let users = user_service::summaries(db, requests.iter().map(|r| r.requested_by.as_str())).await?;
    Ok(requests
        .into_iter()
        .map(|r| {
            let requested_by = user_service::summary_of(&users, &r.requested_by);
            JobRequestResponse::new(r, requested_by)
        })
        .collect())
}

/// Location of a resume the caller may read
pub async fn resume_path(db: &MongoDB, config: &AppConfig, user_id: &str, request_id: &str) -> AppResult<PathBuf> {
    let request = find(db, request_id).await?;

    let owner = match opportunity_service::find(db, &request.opportunity).await {
        Ok(opportunity) => Some(opportunity.posted_by),
        Err(AppError::NotFound(_)) | Err(AppError::BadRequest(_)) => None,
        Err(e) => return Err(e),
    };

    if !request.can_view_resume(user_id, owner.as_deref()) {
        return Err(AppError::Forbidden("Not authorized".to_string()));
    }
    if !upload_service::is_safe_file_name(&request.resume_path) {
        return Err(AppError::NotFound("Resume not found".to_string()));
    }

    let path = config.resume_dir().join(&request.resume_path);
    if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
        return Err(AppError::NotFound("Resume not found".to_string()));
    }
    Ok(path)
}

/// Withdraws the caller's request and removes its resume
pub async fn delete(db: &MongoDB, config: &AppConfig, user_id: &str, request_id: &str) -> AppResult<()> {
    let request = find(db, request_id).await?;
    request.ensure_owned_by(user_id)?;

    let oid = parse_object_id(request_id, "request")?;
    db.collection::<JobRequest>(REQUESTS)
        .delete_one(doc! { "_id": oid })
        .await?;

    if upload_service::is_safe_file_name(&request.resume_path) {
        upload_service::remove_file(&config.resume_dir().join(&request.resume_path)).await;
    }

    log::info!("🗑️  Request {} withdrawn by {}", request_id, user_id);
    Ok(())
}
