use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Document},
    options::ReturnDocument,
};

use crate::{
    database::{MongoDB, COMMENTS, RESOURCES},
    models::{sort_resources, validate_rating, Owned, Resource, ResourceRequest, ResourceResponse, ResourceSort},
    services::notification_service,
    utils::{now_millis, parse_object_id, AppError, AppResult},
};

fn not_found() -> AppError {
    AppError::NotFound("Resource not found".to_string())
}

pub async fn find(db: &MongoDB, id: &str) -> AppResult<Resource> {
    let oid = parse_object_id(id, "resource")?;
    db.collection::<Resource>(RESOURCES)
        .find_one(doc! { "_id": oid })
        .await?
        .ok_or_else(not_found)
}

/// Every resource, ordered in memory since top-rated depends on the average
pub async fn list(db: &MongoDB, sort: ResourceSort) -> AppResult<Vec<ResourceResponse>> {
    let mut resources: Vec<Resource> = db
        .collection::<Resource>(RESOURCES)
        .find(doc! {})
        .await?
        .try_collect()
        .await?;
    sort_resources(&mut resources, sort);
    Ok(resources.into_iter().map(ResourceResponse::from).collect())
}

pub async fn list_by_owner(db: &MongoDB, user_id: &str) -> AppResult<Vec<ResourceResponse>> {
    let resources: Vec<Resource> = db
        .collection::<Resource>(RESOURCES)
        .find(doc! { "userId": user_id })
        .sort(doc! { "createdAt": -1 })
        .await?
        .try_collect()
        .await?;
    Ok(resources.into_iter().map(ResourceResponse::from).collect())
}

pub async fn create(db: &MongoDB, user_id: &str, request: ResourceRequest) -> AppResult<ResourceResponse> {
    let mut resource = Resource::from_request(request, user_id, now_millis())?;
    let result = db.collection::<Resource>(RESOURCES).insert_one(&resource).await?;
    resource.id = result.inserted_id.as_object_id();
    let id = resource.id.map(|id| id.to_hex()).unwrap_or_default();

    log::info!("✅ Resource created: {} ({})", id, resource.title);

    notification_service::notify(db, format!("New resource posted: {}", resource.title), None, Some(id)).await;

    Ok(ResourceResponse::from(resource))
}

pub async fn update(db: &MongoDB, user_id: &str, id: &str, request: ResourceRequest) -> AppResult<ResourceResponse> {
    let mut resource = find(db, id).await?;
    resource.ensure_owned_by(user_id)?;
    resource.apply_update(request)?;

    let oid = parse_object_id(id, "resource")?;
    let updated = db
        .collection::<Resource>(RESOURCES)
        .find_one_and_update(
            doc! { "_id": oid },
            doc! { "$set": {
                "title": resource.title.clone(),
                "description": resource.description.clone(),
                "domain": resource.domain.clone(),
                "resourceLinks": mongodb::bson::to_bson(&resource.resource_links)?,
                "tags": resource.tags.clone(),
            } },
        )
        .return_document(ReturnDocument::After)
        .await?
        .ok_or_else(not_found)?;

    log::info!("✅ Resource updated: {}", id);
    Ok(ResourceResponse::from(updated))
}

/// Deletes the resource and its comments
pub async fn delete(db: &MongoDB, user_id: &str, id: &str) -> AppResult<()> {
    let resource = find(db, id).await?;
    resource.ensure_owned_by(user_id)?;

    let oid = parse_object_id(id, "resource")?;
    db.collection::<Resource>(RESOURCES).delete_one(doc! { "_id": oid }).await?;
    let removed_comments = db
        .collection::<Document>(COMMENTS)
        .delete_many(doc! { "resource": id })
        .await?
        .deleted_count;

    log::info!("🗑️  Resource {} deleted with {} comment(s)", id, removed_comments);
    Ok(())
}

/// Pipeline update replacing the user's rating in a single write
pub fn rating_pipeline(user_id: &str, rating: u8) -> Vec<Document> {
    vec![doc! {
        "$set": {
            "ratings": {
                "$concatArrays": [
                    {
                        "$filter": {
                            "input": { "$ifNull": ["$ratings", []] },
                            "cond": { "$ne": ["$$this.userId", user_id] }
                        }
                    },
                    [{ "userId": user_id, "rating": rating as i32 }]
                ]
            }
        }
    }]
}

pub async fn rate(db: &MongoDB, user_id: &str, id: &str, rating: i64) -> AppResult<ResourceResponse> {
    let rating = validate_rating(rating)?;
    let oid = parse_object_id(id, "resource")?;

    let updated = db
        .collection::<Resource>(RESOURCES)
        .find_one_and_update(doc! { "_id": oid }, rating_pipeline(user_id, rating))
        .return_document(ReturnDocument::After)
        .await?
        .ok_or_else(not_found)?;

    log::info!("⭐ Resource {} rated {} by {}", id, rating, user_id);
    Ok(ResourceResponse::from(updated))
}

/// Counts a view; every call increments
pub async fn record_view(db: &MongoDB, id: &str) -> AppResult<ResourceResponse> {
    let oid = parse_object_id(id, "resource")?;
    let updated = db
        .collection::<Resource>(RESOURCES)
        .find_one_and_update(doc! { "_id": oid }, doc! { "$inc": { "views": 1 } })
        .return_document(ReturnDocument::After)
        .await?
        .ok_or_else(not_found)?;
    Ok(ResourceResponse::from(updated))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_pipeline_shape() {
        let pipeline = rating_pipeline("u1", 4);
        assert_eq!(pipeline.len(), 1);

        let parts = pipeline[0]
            .get_document("$set")
            .unwrap()
            .get_document("ratings")
            .unwrap()
            .get_array("$concatArrays")
            .unwrap();
        assert_eq!(parts.len(), 2);

        let appended = parts[1].as_array().unwrap()[0].as_document().unwrap();
        assert_eq!(appended.get_str("userId").unwrap(), "u1");
        assert_eq!(appended.get_i32("rating").unwrap(), 4);
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn test_rerating_replaces_previous_rating() {
        dotenv::dotenv().ok();
        let uri = std::env::var("DATABASE_URL").unwrap_or_else(|_| "mongodb://localhost:27017/nextgenwork_test".to_string());
        let db = MongoDB::new(&uri).await.expect("MongoDB connection");

        let request = ResourceRequest {
            title: Some("Rust Book".into()),
            domain: Some("Programming".into()),
            ..Default::default()
        };
        let created = create(&db, "65f1c2a9e4b0a1b2c3d4e5f6", request).await.unwrap();
        let id = created.id.clone();

        rate(&db, "u1", &id, 2).await.unwrap();
        rate(&db, "u2", &id, 4).await.unwrap();
        let rated = rate(&db, "u1", &id, 5).await.unwrap();

        let mine: Vec<_> = rated.ratings.iter().filter(|r| r.user_id == "u1").collect();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].rating, 5);
        assert_eq!(rated.ratings.len(), 2);
        assert_eq!(rated.average_rating, 4.5);

        assert!(matches!(rate(&db, "u1", &id, 6).await, Err(AppError::BadRequest(_))));

        let oid = parse_object_id(&id, "resource").unwrap();
        db.collection::<Resource>(RESOURCES).delete_one(doc! { "_id": oid }).await.unwrap();
    }
}
