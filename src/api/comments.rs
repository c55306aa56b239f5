use actix_web::{web, HttpResponse};

use crate::{
    database::MongoDB,
    middleware::auth::Claims,
    models::{CommentRequest, CommentResponse, CommentThread},
    services::comment_service,
    utils::AppResult,
};

/// Mounted under an authenticated scope
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/resource/{id}")
            .route(web::post().to(add_resource_comment))
            .route(web::get().to(resource_threads)),
    )
    .service(
        web::resource("/{id}")
            .route(web::post().to(add_opportunity_comment))
            .route(web::get().to(opportunity_comments))
            .route(web::delete().to(delete_comment)),
    );
}

#[utoipa::path(
    post,
    path = "/api/comments/{opportunityId}",
    tag = "Comments",
    params(("opportunityId" = String, Path, description = "Opportunity id")),
    request_body = CommentRequest,
    responses(
        (status = 201, description = "Comment added", body = CommentResponse),
        (status = 400, description = "Blank text"),
        (status = 404, description = "Opportunity not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn add_opportunity_comment(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
    opportunity_id: web::Path<String>,
    request: web::Json<CommentRequest>,
) -> AppResult<HttpResponse> {
    log::info!("💬 POST /comments/{} - user: {}", opportunity_id, claims.sub);
    let comment = comment_service::add_to_opportunity(&db, &claims.sub, &opportunity_id, request.into_inner()).await?;
    Ok(HttpResponse::Created().json(comment))
}

#[utoipa::path(
    get,
    path = "/api/comments/{opportunityId}",
    tag = "Comments",
    params(("opportunityId" = String, Path, description = "Opportunity id")),
    responses(
        (status = 200, description = "Comments, oldest first", body = [CommentResponse])
    ),
    security(("bearer_auth" = []))
)]
pub async fn opportunity_comments(db: web::Data<MongoDB>, opportunity_id: web::Path<String>) -> AppResult<HttpResponse> {
    let comments = comment_service::list_for_opportunity(&db, &opportunity_id).await?;
    Ok(HttpResponse::Ok().json(comments))
}

#[utoipa::path(
    post,
    path = "/api/comments/resource/{resourceId}",
    tag = "Comments",
    params(("resourceId" = String, Path, description = "Resource id")),
    request_body = CommentRequest,
    responses(
        (status = 201, description = "Comment or reply added", body = CommentResponse),
        (status = 400, description = "Blank text or invalid parent"),
        (status = 404, description = "Resource not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn add_resource_comment(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
    resource_id: web::Path<String>,
    request: web::Json<CommentRequest>,
) -> AppResult<HttpResponse> {
    log::info!("💬 POST /comments/resource/{} - user: {}", resource_id, claims.sub);
    let comment = comment_service::add_to_resource(&db, &claims.sub, &resource_id, request.into_inner()).await?;
    Ok(HttpResponse::Created().json(comment))
}

#[utoipa::path(
    get,
    path = "/api/comments/resource/{resourceId}",
    tag = "Comments",
    params(("resourceId" = String, Path, description = "Resource id")),
    responses(
        (status = 200, description = "Top-level comments with their replies", body = [CommentThread])
    ),
    security(("bearer_auth" = []))
)]
pub async fn resource_threads(db: web::Data<MongoDB>, resource_id: web::Path<String>) -> AppResult<HttpResponse> {
    let threads = comment_service::threads_for_resource(&db, &resource_id).await?;
    Ok(HttpResponse::Ok().json(threads))
}

#[utoipa::path(
    delete,
    path = "/api/comments/{commentId}",
    tag = "Comments",
    params(("commentId" = String, Path, description = "Comment id")),
    responses(
        (status = 200, description = "Comment and its replies deleted"),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Comment not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_comment(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
    comment_id: web::Path<String>,
) -> AppResult<HttpResponse> {
    log::info!("🗑️  DELETE /comments/{} - user: {}", comment_id, claims.sub);
    comment_service::delete(&db, &claims.sub, &comment_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Comment deleted"
    })))
}
