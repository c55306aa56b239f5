use std::collections::HashMap;

use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, Document};

use crate::{
    database::{MongoDB, OPPORTUNITIES, RESOURCES, USERS},
    models::{Opportunity, OpportunityResponse, ProfileResponse, PublicProfile, Resource, ResourceResponse, UpdateProfileRequest, User, UserSummary},
    services::{auth_service, opportunity_service},
    utils::{is_duplicate_key, non_blank, now_millis, parse_object_id, AppError, AppResult},
};

/// Resolves user ids to summaries in one query. Ids that are malformed or
/// no longer exist are simply absent from the map.
pub async fn summaries<'a, I>(db: &MongoDB, ids: I) -> AppResult<HashMap<String, UserSummary>>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut object_ids: Vec<ObjectId> = ids.into_iter().filter_map(|id| ObjectId::parse_str(id).ok()).collect();
    object_ids.sort();
    object_ids.dedup();

    if object_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let users: Vec<User> = db
        .collection::<User>(USERS)
        .find(doc! { "_id": { "$in": object_ids } })
        .projection(doc! { "username": 1, "email": 1, "createdAt": 1, "updatedAt": 1 })
        .await?
        .try_collect()
        .await?;

    Ok(users.iter().map(|u| (u.id_hex(), UserSummary::from(u))).collect())
}

/// Summary for `id` out of a [`summaries`] map, with a placeholder for missing users
pub fn summary_of(map: &HashMap<String, UserSummary>, id: &str) -> UserSummary {
    map.get(id).cloned().unwrap_or_else(|| UserSummary::unknown(id))
}

pub async fn find_by_id(db: &MongoDB, user_id: &str) -> AppResult<User> {
    let oid = parse_object_id(user_id, "user")?;
    db.collection::<User>(USERS)
        .find_one(doc! { "_id": oid })
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

pub async fn get_profile(db: &MongoDB, user_id: &str) -> AppResult<ProfileResponse> {
    Ok(ProfileResponse::from(find_by_id(db, user_id).await?))
}

pub async fn public_profile(db: &MongoDB, user_id: &str) -> AppResult<PublicProfile> {
    Ok(PublicProfile::from(find_by_id(db, user_id).await?))
}

/// Applies the provided non-blank fields. A changed username or email must
/// not belong to anyone else; a new password is validated and re-hashed.
pub async fn update_profile(db: &MongoDB, user_id: &str, request: UpdateProfileRequest) -> AppResult<ProfileResponse> {
    let user = find_by_id(db, user_id).await?;
    let oid = parse_object_id(user_id, "user")?;
    let collection = db.collection::<User>(USERS);

    let mut set = Document::new();

    if let Some(username) = non_blank(request.username.as_deref()) {
        if username != user.username {
            let taken = collection
                .find_one(doc! { "username": &username, "_id": { "$ne": oid } })
                .await?
                .is_some();
            if taken {
                return Err(AppError::BadRequest("Username already taken".to_string()));
            }
            set.insert("username", username);
        }
    }

    if let Some(email) = non_blank(request.email.as_deref()) {
        let email = auth_service::validate_email(&email)?;
        if email != user.email {
            let taken = collection
                .find_one(doc! { "email": &email, "_id": { "$ne": oid } })
                .await?
                .is_some();
            if taken {
                return Err(AppError::BadRequest("Email already registered".to_string()));
            }
            set.insert("email", email);
        }
    }

    if let Some(password) = request.password.filter(|p| !p.is_empty()) {
        auth_service::validate_password(&password)?;
        set.insert("password", auth_service::hash_password(password).await?);
    }

    if set.is_empty() {
        return Ok(ProfileResponse::from(user));
    }
    set.insert("updatedAt", now_millis());

    match collection.update_one(doc! { "_id": oid }, doc! { "$set": set }).await {
        Ok(_) => {}
        Err(e) if is_duplicate_key(&e) => {
            return Err(AppError::BadRequest("Username or email already in use".to_string()))
        }
        Err(e) => return Err(e.into()),
    }

    log::info!("✅ Profile updated: {}", user_id);
    get_profile(db, user_id).await
}

/// Which of the user's bookmark lists an operation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookmarkList {
    Opportunities,
    Resources,
}

impl BookmarkList {
    fn field(&self) -> &'static str {
        match self {
            BookmarkList::Opportunities => "bookmarks",
            BookmarkList::Resources => "resourceBookmarks",
        }
    }

    fn target_collection(&self) -> &'static str {
        match self {
            BookmarkList::Opportunities => OPPORTUNITIES,
            BookmarkList::Resources => RESOURCES,
        }
    }

    fn entity(&self) -> &'static str {
        match self {
            BookmarkList::Opportunities => "opportunity",
            BookmarkList::Resources => "resource",
        }
    }

    fn not_found(&self) -> AppError {
        match self {
            BookmarkList::Opportunities => AppError::NotFound("Opportunity not found".to_string()),
            BookmarkList::Resources => AppError::NotFound("Resource not found".to_string()),
        }
    }
}

/// `$addToSet` the target; returns the updated list
pub async fn add_bookmark(db: &MongoDB, user_id: &str, list: BookmarkList, target_id: &str) -> AppResult<Vec<String>> {
    let target_oid = parse_object_id(target_id, list.entity())?;
    let exists = db
        .collection::<Document>(list.target_collection())
        .find_one(doc! { "_id": target_oid })
        .projection(doc! { "_id": 1 })
        .await?
        .is_some();
    if !exists {
        return Err(list.not_found());
    }

    update_bookmarks(db, user_id, doc! { "$addToSet": { list.field(): target_oid.to_hex() } }, list).await
}

/// `$pull` the target; removing something not bookmarked is not an error
pub async fn remove_bookmark(db: &MongoDB, user_id: &str, list: BookmarkList, target_id: &str) -> AppResult<Vec<String>> {
    let target_oid = parse_object_id(target_id, list.entity())?;
    update_bookmarks(db, user_id, doc! { "$pull": { list.field(): target_oid.to_hex() } }, list).await
}

async fn update_bookmarks(db: &MongoDB, user_id: &str, update: Document, list: BookmarkList) -> AppResult<Vec<String>> {
    let oid = parse_object_id(user_id, "user")?;
    let user = db
        .collection::<User>(USERS)
        .find_one_and_update(doc! { "_id": oid }, update)
        .return_document(mongodb::options::ReturnDocument::After)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(match list {
        BookmarkList::Opportunities => user.bookmarks,
        BookmarkList::Resources => user.resource_bookmarks,
    })
}

fn object_ids(ids: &[String]) -> Vec<ObjectId> {
    ids.iter().filter_map(|id| ObjectId::parse_str(id).ok()).collect()
}

/// Bookmarked opportunities that still exist, in bookmark order
pub async fn bookmarked_opportunities(db: &MongoDB, user_id: &str) -> AppResult<Vec<OpportunityResponse>> {
    let user = find_by_id(db, user_id).await?;
    let found: Vec<Opportunity> = db
        .collection::<Opportunity>(OPPORTUNITIES)
        .find(doc! { "_id": { "$in": object_ids(&user.bookmarks) } })
        .await?
        .try_collect()
        .await?;

    let ordered = in_bookmark_order(&user.bookmarks, found, |o| o.id.map(|id| id.to_hex()));
    opportunity_service::with_posters(db, ordered).await
}

/// Bookmarked resources that still exist, in bookmark order
pub async fn bookmarked_resources(db: &MongoDB, user_id: &str) -> AppResult<Vec<ResourceResponse>> {
    let user = find_by_id(db, user_id).await?;
    let found: Vec<Resource> = db
        .collection::<Resource>(RESOURCES)
        .find(doc! { "_id": { "$in": object_ids(&user.resource_bookmarks) } })
        .await?
        .try_collect()
        .await?;

    Ok(in_bookmark_order(&user.resource_bookmarks, found, |r| r.id.map(|id| id.to_hex()))
        .into_iter()
        .map(ResourceResponse::from)
        .collect())
}

fn in_bookmark_order<T, F>(order: &[String], items: Vec<T>, id_of: F) -> Vec<T>
where
    F: Fn(&T) -> Option<String>,
{
    let mut by_id: HashMap<String, T> = items
        .into_iter()
        .filter_map(|item| id_of(&item).map(|id| (id, item)))
        .collect();
    order.iter().filter_map(|id| by_id.remove(id)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_of_falls_back_to_placeholder() {
        let mut map = HashMap::new();
        map.insert(
            "a".to_string(),
            UserSummary {
                id: "a".into(),
                username: "ana".into(),
                email: "ana@example.com".into(),
            },
        );

        assert_eq!(summary_of(&map, "a").username, "ana");
        let missing = summary_of(&map, "b");
        assert_eq!(missing.id, "b");
        assert_eq!(missing.username, "[deleted]");
    }

    #[test]
    fn test_bookmark_order_kept_and_missing_dropped() {
        let order = vec!["c".to_string(), "a".to_string(), "gone".to_string(), "b".to_string()];
        let items = vec!["a", "b", "c"];
        let ordered = in_bookmark_order(&order, items, |s| Some(s.to_string()));
        assert_eq!(ordered, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_bookmark_fields() {
        assert_eq!(BookmarkList::Opportunities.field(), "bookmarks");
        assert_eq!(BookmarkList::Resources.field(), "resourceBookmarks");
        assert_eq!(BookmarkList::Resources.target_collection(), RESOURCES);
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn test_summaries_of_unknown_ids_is_empty() {
        dotenv::dotenv().ok();
        let uri = std::env::var("DATABASE_URL").unwrap_or_else(|_| "mongodb://localhost:27017/nextgenwork_test".to_string());
        let db = MongoDB::new(&uri).await.unwrap();
        let map = summaries(&db, ["not-an-id", "65f1c2a9e4b0a1b2c3d4e5f6"]).await.unwrap();
        assert!(map.is_empty());
    }
}
