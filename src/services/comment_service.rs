use futures::TryStreamExt;
use mongodb::bson::{doc, Bson, Document};

use crate::{
    database::{MongoDB, COMMENTS},
    models::{build_threads, Comment, CommentRequest, CommentResponse, CommentTarget, CommentThread, Owned},
    services::{opportunity_service, resource_service, user_service},
    utils::{non_blank, now_millis, parse_object_id, AppError, AppResult},
};

async fn find(db: &MongoDB, comment_id: &str) -> AppResult<Comment> {
    let oid = parse_object_id(comment_id, "comment")?;
    db.collection::<Comment>(COMMENTS)
        .find_one(doc! { "_id": oid })
        .await?
        .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))
}

async fn find_sorted(db: &MongoDB, filter: Document) -> AppResult<Vec<Comment>> {
    let comments = db
        .collection::<Comment>(COMMENTS)
        .find(filter)
        .sort(doc! { "createdAt": 1 })
        .await?
        .try_collect()
        .await?;
    Ok(comments)
}

async fn with_authors(db: &MongoDB, comments: Vec<Comment>) -> AppResult<Vec<CommentResponse>> {
    let users = user_service::summaries(db, comments.iter().map(|c| c.user.as_str())).await?;
    Ok(comments
        .into_iter()
        .map(|c| {
            let user = user_service::summary_of(&users, &c.user);
            CommentResponse::new(c, user)
        })
        .collect())
}

async fn insert(db: &MongoDB, mut comment: Comment) -> AppResult<CommentResponse> {
    let result = db.collection::<Comment>(COMMENTS).insert_one(&comment).await?;
    comment.id = result.inserted_id.as_object_id();
    log::info!("💬 Comment {} added by {}", comment.id_hex(), comment.user);

    with_authors(db, vec![comment])
        .await?
        .pop()
        .ok_or_else(|| AppError::Internal("Comment lost while resolving author".to_string()))
}

async fn load_parent(db: &MongoDB, parent: Option<&str>) -> AppResult<Option<Comment>> {
    match non_blank(parent) {
        None => Ok(None),
        Some(parent_id) => match find(db, &parent_id).await {
            Ok(parent) => Ok(Some(parent)),
            Err(AppError::NotFound(_)) => Err(AppError::BadRequest("Parent comment not found".to_string())),
            Err(e) => Err(e),
        },
    }
}

pub async fn add_to_opportunity(
    db: &MongoDB,
    user_id: &str,
    opportunity_id: &str,
    request: CommentRequest,
) -> AppResult<CommentResponse> {
    opportunity_service::find(db, opportunity_id).await?;
    let parent = load_parent(db, request.parent.as_deref()).await?;
    let comment = Comment::new(
        CommentTarget::Opportunity(opportunity_id.to_string()),
        user_id,
        request.text.as_deref(),
        parent.as_ref(),
        now_millis(),
    )?;
    insert(db, comment).await
}

/// Flat list, oldest first
pub async fn list_for_opportunity(db: &MongoDB, opportunity_id: &str) -> AppResult<Vec<CommentResponse>> {
    parse_object_id(opportunity_id, "opportunity")?;
    let comments = find_sorted(db, CommentTarget::Opportunity(opportunity_id.to_string()).filter()).await?;
    with_authors(db, comments).await
}

pub async fn add_to_resource(
    db: &MongoDB,
    user_id: &str,
    resource_id: &str,
    request: CommentRequest,
) -> AppResult<CommentResponse> {
    resource_service::find(db, resource_id).await?;
    let parent = load_parent(db, request.parent.as_deref()).await?;
    let comment = Comment::new(
        CommentTarget::Resource(resource_id.to_string()),
        user_id,
        request.text.as_deref(),
        parent.as_ref(),
        now_millis(),
    )?;
    insert(db, comment).await
}

/// Top-level comments oldest first, each with its replies
pub async fn threads_for_resource(db: &MongoDB, resource_id: &str) -> AppResult<Vec<CommentThread>> {
    parse_object_id(resource_id, "resource")?;
    let target = CommentTarget::Resource(resource_id.to_string());

    let mut top_filter = target.filter();
    top_filter.insert("parent", Bson::Null);
    let mut reply_filter = target.filter();
    reply_filter.insert("parent", doc! { "$ne": Bson::Null });

    let top_level = find_sorted(db, top_filter).await?;
    let replies = find_sorted(db, reply_filter).await?;

    let mut all = top_level;
    let top_count = all.len();
    all.extend(replies);
    let mut responses = with_authors(db, all).await?;
    let replies = responses.split_off(top_count);

    Ok(build_threads(responses, replies))
}

/// Deletes the caller's comment together with its replies
pub async fn delete(db: &MongoDB, user_id: &str, comment_id: &str) -> AppResult<()> {
    let comment = find(db, comment_id).await?;
    comment.ensure_owned_by(user_id)?;

    let oid = parse_object_id(comment_id, "comment")?;
    let collection = db.collection::<Comment>(COMMENTS);
    collection.delete_one(doc! { "_id": oid }).await?;
    let replies = collection
        .delete_many(doc! { "parent": comment_id })
        .await?
        .deleted_count;

    log::info!("🗑️  Comment {} deleted with {} repl(ies)", comment_id, replies);
    Ok(())
}
