use actix_files::NamedFile;
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};

use crate::{
    config::AppConfig,
    database::MongoDB,
    middleware::auth::Claims,
    models::{JobRequestResponse, MyRequestResponse},
    services::{
        request_service,
        upload_service::{self, UploadKind},
    },
    utils::AppResult,
};

/// Multipart body of a job request
#[derive(utoipa::ToSchema)]
#[allow(dead_code)]
pub struct RequestUpload {
    pub description: String,
    /// pdf, doc or docx, up to 5 MB
    #[schema(value_type = String, format = Binary)]
    pub resume: Vec<u8>,
}

/// Mounted under an authenticated scope
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/my-requests", web::get().to(my_requests))
        .route("/opportunity/{id}", web::get().to(requests_for_opportunity))
        .route("/{id}/resume", web::get().to(download_resume))
        .service(
            web::resource("/{id}")
                .route(web::post().to(create_request))
                .route(web::delete().to(delete_request)),
        );
}

#[utoipa::path(
    post,
    path = "/api/requests/{opportunityId}",
    tag = "Requests",
    params(("opportunityId" = String, Path, description = "Job id")),
    request_body(content = RequestUpload, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Request created", body = JobRequestResponse),
        (status = 400, description = "Missing resume, not a job, or already requested"),
        (status = 404, description = "Opportunity not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_request(
    db: web::Data<MongoDB>,
    config: web::Data<AppConfig>,
    claims: web::ReqData<Claims>,
    opportunity_id: web::Path<String>,
    payload: Multipart,
) -> AppResult<HttpResponse> {
    log::info!("📝 POST /requests/{} - user: {}", opportunity_id, claims.sub);

    let form = upload_service::read_multipart(payload, &[UploadKind::Resume], &config).await?;
    let request = request_service::create(&db, &claims.sub, &opportunity_id, form).await?;

    Ok(HttpResponse::Created().json(request))
}

#[utoipa::path(
    get,
    path = "/api/requests/my-requests",
    tag = "Requests",
    responses(
        (status = 200, description = "The caller's requests, newest first", body = [MyRequestResponse])
    ),
    security(("bearer_auth" = []))
)]
pub async fn my_requests(db: web::Data<MongoDB>, claims: web::ReqData<Claims>) -> AppResult<HttpResponse> {
    log::info!("📋 GET /requests/my-requests - user: {}", claims.sub);
    let requests = request_service::my_requests(&db, &claims.sub).await?;
    Ok(HttpResponse::Ok().json(requests))
}

#[utoipa::path(
    get,
    path = "/api/requests/opportunity/{id}",
    tag = "Requests",
    params(("id" = String, Path, description = "Job id")),
    responses(
        (status = 200, description = "Requests for the job", body = [JobRequestResponse]),
        (status = 403, description = "Not the poster"),
        (status = 404, description = "Opportunity not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn requests_for_opportunity(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
    id: web::Path<String>,
) -> AppResult<HttpResponse> {
    log::info!("📋 GET /requests/opportunity/{} - user: {}", id, claims.sub);
    let requests = request_service::for_opportunity(&db, &claims.sub, &id).await?;
    Ok(HttpResponse::Ok().json(requests))
}

#[utoipa::path(
    get,
    path = "/api/requests/{id}/resume",
    tag = "Requests",
    params(("id" = String, Path, description = "Request id")),
    responses(
        (status = 200, description = "The resume file"),
        (status = 403, description = "Neither the applicant nor the poster"),
        (status = 404, description = "Request or file not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn download_resume(
    db: web::Data<MongoDB>,
    config: web::Data<AppConfig>,
    claims: web::ReqData<Claims>,
    id: web::Path<String>,
) -> AppResult<NamedFile> {
    log::info!("📄 GET /requests/{}/resume - user: {}", id, claims.sub);
    let path = request_service::resume_path(&db, &config, &claims.sub, &id).await?;
    Ok(NamedFile::open_async(path).await?)
}

#[utoipa::path(
    delete,
    path = "/api/requests/{id}",
    tag = "Requests",
    params(("id" = String, Path, description = "Request id")),
    responses(
        (status = 200, description = "Request withdrawn"),
        (status = 403, description = "Not the applicant"),
        (status = 404, description = "Request not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_request(
    db: web::Data<MongoDB>,
    config: web::Data<AppConfig>,
    claims: web::ReqData<Claims>,
    id: web::Path<String>,
) -> AppResult<HttpResponse> {
    log::info!("🗑️  DELETE /requests/{} - user: {}", id, claims.sub);
    request_service::delete(&db, &config, &claims.sub, &id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Request deleted"
    })))
}
