use actix_web::{web, HttpResponse};

use crate::{
    database::MongoDB,
    middleware::auth::Claims,
    models::NotificationResponse,
    services::notification_service,
    utils::AppResult,
};

/// Mounted under an authenticated scope
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("", web::get().to(list_notifications))
        .route("/{id}/read", web::post().to(mark_read));
}

#[utoipa::path(
    get,
    path = "/api/notifications",
    tag = "Notifications",
    responses(
        (status = 200, description = "Notifications, newest first", body = [NotificationResponse])
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_notifications(db: web::Data<MongoDB>, claims: web::ReqData<Claims>) -> AppResult<HttpResponse> {
    let notifications = notification_service::list(&db, &claims.sub).await?;
    Ok(HttpResponse::Ok().json(notifications))
}

#[utoipa::path(
    post,
    path = "/api/notifications/{id}/read",
    tag = "Notifications",
    params(("id" = String, Path, description = "Notification id")),
    responses(
        (status = 200, description = "Marked as read"),
        (status = 404, description = "Notification not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn mark_read(db: web::Data<MongoDB>, claims: web::ReqData<Claims>, id: web::Path<String>) -> AppResult<HttpResponse> {
    notification_service::mark_read(&db, &id, &claims.sub).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Marked as read"
    })))
}
