use futures::TryStreamExt;
use mongodb::bson::{self, doc, Document};

use crate::{
    config::AppConfig,
    database::{MongoDB, COMMENTS, OPPORTUNITIES, REQUESTS},
    models::{JobRequest, Opportunity, OpportunityForm, OpportunityQuery, OpportunityResponse, Owned},
    services::{
        notification_service,
        upload_service::{self, MultipartForm, UploadKind},
        user_service,
    },
    utils::{capitalize, now_millis, parse_object_id, AppError, AppResult},
};

/// Optional stored fields; those absent after an update are `$unset`
const OPTIONAL_FIELDS: [&str; 15] = [
    "externalLink",
    "logo",
    "pic",
    "jobType",
    "salary",
    "companyName",
    "companyAddress",
    "contactInfo",
    "applicationDeadline",
    "organizer",
    "prize",
    "contestDateTime",
    "speaker",
    "platform",
    "webinarDateTime",
];

/// Fields an update never touches
const IMMUTABLE_FIELDS: [&str; 4] = ["_id", "postedBy", "createdAt", "registrations"];

pub async fn find(db: &MongoDB, id: &str) -> AppResult<Opportunity> {
    let oid = parse_object_id(id, "opportunity")?;
    db.collection::<Opportunity>(OPPORTUNITIES)
        .find_one(doc! { "_id": oid })
        .await?
        .ok_or_else(|| AppError::NotFound("Opportunity not found".to_string()))
}

/// Attaches the poster summary to each opportunity (one user query)
pub async fn with_posters(db: &MongoDB, opportunities: Vec<Opportunity>) -> AppResult<Vec<OpportunityResponse>> {
    let users = user_service::summaries(db, opportunities.iter().map(|o| o.posted_by.as_str())).await?;
    Ok(opportunities
        .into_iter()
        .map(|o| {
            let poster = user_service::summary_of(&users, &o.posted_by);
            OpportunityResponse::new(o, poster)
        })
        .collect())
}

pub async fn with_poster(db: &MongoDB, opportunity: Opportunity) -> AppResult<OpportunityResponse> {
    with_posters(db, vec![opportunity])
        .await?
        .pop()
        .ok_or_else(|| AppError::Internal("Opportunity lost while resolving poster".to_string()))
}

async fn find_sorted(db: &MongoDB, filter: Document) -> AppResult<Vec<Opportunity>> {
    let opportunities = db
        .collection::<Opportunity>(OPPORTUNITIES)
        .find(filter)
        .sort(doc! { "createdAt": -1 })
        .await?
        .try_collect()
        .await?;
    Ok(opportunities)
}

/// Public listing, newest first
pub async fn list(db: &MongoDB, query: &OpportunityQuery) -> AppResult<Vec<OpportunityResponse>> {
    let opportunities = find_sorted(db, query.to_filter()?).await?;
    with_posters(db, opportunities).await
}

pub async fn list_by_poster(db: &MongoDB, user_id: &str) -> AppResult<Vec<OpportunityResponse>> {
    let opportunities = find_sorted(db, doc! { "postedBy": user_id }).await?;
    with_posters(db, opportunities).await
}

pub async fn get(db: &MongoDB, id: &str) -> AppResult<OpportunityResponse> {
    with_poster(db, find(db, id).await?).await
}

fn uploaded_paths(form: &mut MultipartForm) -> (Option<String>, Option<String>) {
    let logo = form.take_file(UploadKind::Logo);
    let pic = form.take_file(UploadKind::Pic);
    let logo_path = logo.as_ref().and_then(|f| f.public_path());
    let pic_path = pic.as_ref().and_then(|f| f.public_path());
    // keep them tracked so a failed validation can still clean up
    form.files.extend(logo.into_iter().chain(pic));
    (logo_path, pic_path)
}

pub async fn create(db: &MongoDB, user_id: &str, mut form: MultipartForm) -> AppResult<OpportunityResponse> {
    let fields = OpportunityForm::from_fields(&form.fields);
    let (logo, pic) = uploaded_paths(&mut form);

    let mut opportunity = match Opportunity::from_form(&fields, user_id, logo, pic, now_millis()) {
        Ok(o) => o,
        Err(e) => {
            form.discard().await;
            return Err(e);
        }
    };

    let result = match db.collection::<Opportunity>(OPPORTUNITIES).insert_one(&opportunity).await {
        Ok(result) => result,
        Err(e) => {
            form.discard().await;
            return Err(e.into());
        }
    };
    opportunity.id = result.inserted_id.as_object_id();
    let id = opportunity.id.map(|id| id.to_hex()).unwrap_or_default();

    log::info!("✅ Opportunity created: {} ({})", id, opportunity.kind.as_str());

    notification_service::notify(
        db,
        format!("New {} posted: {}", capitalize(opportunity.kind.as_str()), opportunity.title),
        Some(id),
        None,
    )
    .await;

    with_poster(db, opportunity).await
}

/// `$set` for the stored fields plus `$unset` for optional fields that no
/// longer apply, leaving registrations untouched
pub fn update_document(opportunity: &Opportunity) -> AppResult<Document> {
    let mut set = bson::to_document(opportunity)?;
    for field in IMMUTABLE_FIELDS {
        set.remove(field);
    }

    let mut unset = Document::new();
    for field in OPTIONAL_FIELDS {
        if !set.contains_key(field) {
            unset.insert(field, "");
        }
    }

    let mut update = doc! { "$set": set };
    if !unset.is_empty() {
        update.insert("$unset", unset);
    }
    Ok(update)
}

pub async fn update(db: &MongoDB, user_id: &str, id: &str, mut form: MultipartForm) -> AppResult<OpportunityResponse> {
    let fields = OpportunityForm::from_fields(&form.fields);
    let (logo, pic) = uploaded_paths(&mut form);

    let result = async {
        let mut opportunity = find(db, id).await?;
        opportunity.ensure_owned_by(user_id)?;
        opportunity.apply_update(&fields, logo, pic, now_millis())?;

        let oid = parse_object_id(id, "opportunity")?;
        db.collection::<Opportunity>(OPPORTUNITIES)
            .update_one(doc! { "_id": oid }, update_document(&opportunity)?)
            .await?;
        Ok::<_, AppError>(opportunity)
    }
    .await;

    match result {
        Ok(_) => {
            log::info!("✅ Opportunity updated: {}", id);
            // re-read so registrations added meanwhile are counted
            get(db, id).await
        }
        Err(e) => {
            form.discard().await;
            Err(e)
        }
    }
}

/// Deletes the opportunity with its requests (and their resumes) and comments
pub async fn delete(db: &MongoDB, config: &AppConfig, user_id: &str, id: &str) -> AppResult<()> {
    let opportunity = find(db, id).await?;
    opportunity.ensure_owned_by(user_id)?;

    let oid = parse_object_id(id, "opportunity")?;
    db.collection::<Opportunity>(OPPORTUNITIES)
        .delete_one(doc! { "_id": oid })
        .await?;

    let requests: Vec<JobRequest> = db
        .collection::<JobRequest>(REQUESTS)
        .find(doc! { "opportunity": id })
        .await?
        .try_collect()
        .await?;
    for request in &requests {
        if upload_service::is_safe_file_name(&request.resume_path) {
            upload_service::remove_file(&config.resume_dir().join(&request.resume_path)).await;
        }
    }

    let removed_requests = db
        .collection::<JobRequest>(REQUESTS)
        .delete_many(doc! { "opportunity": id })
        .await?
        .deleted_count;
    let removed_comments = db
        .collection::<Document>(COMMENTS)
        .delete_many(doc! { "opportunity": id })
        .await?
        .deleted_count;

    log::info!(
        "🗑️  Opportunity {} deleted with {} request(s) and {} comment(s)",
        id,
        removed_requests,
        removed_comments
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OpportunityKind, Registration};
    use std::collections::HashMap;

    fn form(pairs: &[(&str, &str)]) -> OpportunityForm {
        let mut fields: HashMap<String, Vec<String>> = HashMap::new();
        for (k, v) in pairs {
            fields.entry(k.to_string()).or_default().push(v.to_string());
        }
        OpportunityForm::from_fields(&fields)
    }

    fn contest() -> Opportunity {
        Opportunity::from_form(
            &form(&[
                ("type", "contest"),
                ("title", "Hackathon"),
                ("description", "48h"),
                ("domain", "Web"),
                ("date", "2030-01-10"),
                ("organizer", "ACM"),
                ("registrationFee", "100"),
            ]),
            "65f1c2a9e4b0a1b2c3d4e5f6",
            Some("/public/logos/x.png".into()),
            None,
            1,
        )
        .unwrap()
    }

    #[test]
    fn test_update_document_keeps_registrations_and_owner() {
        let mut o = contest();
        o.registrations.push(Registration {
            user: "u".into(),
            name: "n".into(),
            college: None,
            email: "e@example.com".into(),
            mobile: None,
            payment_id: Some("pay_1".into()),
            paid: true,
            registered_at: 1,
        });

        let update = update_document(&o).unwrap();
        let set = update.get_document("$set").unwrap();
        assert!(!set.contains_key("registrations"));
        assert!(!set.contains_key("postedBy"));
        assert!(!set.contains_key("createdAt"));
        assert_eq!(set.get_str("organizer").unwrap(), "ACM");
        assert_eq!(set.get_str("logo").unwrap(), "/public/logos/x.png");
    }

    #[test]
    fn test_update_document_unsets_foreign_fields_after_type_change() {
        let mut o = contest();
        o.apply_update(
            &form(&[
                ("type", "job"),
                ("jobType", "full-time"),
                ("applicationDeadline", "2030-02-01"),
                ("companyName", "Acme"),
            ]),
            None,
            None,
            2,
        )
        .unwrap();
        assert_eq!(o.kind, OpportunityKind::Job);

        let update = update_document(&o).unwrap();
        let unset = update.get_document("$unset").unwrap();
        assert!(unset.contains_key("organizer"));
        assert!(unset.contains_key("speaker"));
        assert!(!unset.contains_key("companyName"));
        assert!(!unset.contains_key("logo"));

        let set = update.get_document("$set").unwrap();
        assert_eq!(set.get_str("type").unwrap(), "job");
    }
}
