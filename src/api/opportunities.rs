use actix_multipart::Multipart;
use actix_web::{guard, web, HttpResponse};

use crate::{
    config::AppConfig,
    database::MongoDB,
    middleware::{auth::Claims, AuthMiddleware},
    models::{OpportunityForm, OpportunityQuery, OpportunityResponse},
    services::{
        opportunity_service,
        upload_service::{self, UploadKind},
    },
    utils::AppResult,
};

const IMAGE_UPLOADS: [UploadKind; 2] = [UploadKind::Logo, UploadKind::Pic];

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("")
            .guard(guard::Get())
            .route(web::get().to(list_opportunities)),
    )
    .service(
        web::resource("")
            .wrap(AuthMiddleware)
            .route(web::post().to(create_opportunity)),
    )
    .service(
        web::resource("/{id}")
            .wrap(AuthMiddleware)
            .route(web::get().to(get_opportunity))
            .route(web::put().to(update_opportunity))
            .route(web::delete().to(delete_opportunity)),
    );
}

#[utoipa::path(
    get,
    path = "/api/opportunities",
    tag = "Opportunities",
    params(OpportunityQuery),
    responses(
        (status = 200, description = "Opportunities, newest first", body = [OpportunityResponse]),
        (status = 400, description = "Unknown type")
    )
)]
pub async fn list_opportunities(db: web::Data<MongoDB>, query: web::Query<OpportunityQuery>) -> AppResult<HttpResponse> {
    log::info!("📋 GET /opportunities - {:?}", query);
    let opportunities = opportunity_service::list(&db, &query).await?;
    Ok(HttpResponse::Ok().json(opportunities))
}

#[utoipa::path(
    post,
    path = "/api/opportunities",
    tag = "Opportunities",
    request_body(content = OpportunityForm, content_type = "multipart/form-data",
        description = "Text fields plus optional `logo` and `pic` images"),
    responses(
        (status = 201, description = "Opportunity created", body = OpportunityResponse),
        (status = 400, description = "Validation failed")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_opportunity(
    db: web::Data<MongoDB>,
    config: web::Data<AppConfig>,
    claims: web::ReqData<Claims>,
    payload: Multipart,
) -> AppResult<HttpResponse> {
    log::info!("📝 POST /opportunities - user: {}", claims.sub);

    let form = upload_service::read_multipart(payload, &IMAGE_UPLOADS, &config).await?;
    let opportunity = opportunity_service::create(&db, &claims.sub, form).await?;

    Ok(HttpResponse::Created().json(opportunity))
}

#[utoipa::path(
    get,
    path = "/api/opportunities/{id}",
    tag = "Opportunities",
    params(("id" = String, Path, description = "Opportunity id")),
    responses(
        (status = 200, description = "The opportunity", body = OpportunityResponse),
        (status = 404, description = "Opportunity not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_opportunity(db: web::Data<MongoDB>, id: web::Path<String>) -> AppResult<HttpResponse> {
    log::info!("🔍 GET /opportunities/{}", id);
    let opportunity = opportunity_service::get(&db, &id).await?;
    Ok(HttpResponse::Ok().json(opportunity))
}

#[utoipa::path(
    put,
    path = "/api/opportunities/{id}",
    tag = "Opportunities",
    params(("id" = String, Path, description = "Opportunity id")),
    request_body(content = OpportunityForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Opportunity updated", body = OpportunityResponse),
        (status = 403, description = "Not the poster"),
        (status = 404, description = "Opportunity not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_opportunity(
    db: web::Data<MongoDB>,
    config: web::Data<AppConfig>,
    claims: web::ReqData<Claims>,
    id: web::Path<String>,
    payload: Multipart,
) -> AppResult<HttpResponse> {
    log::info!("✏️  PUT /opportunities/{} - user: {}", id, claims.sub);

    let form = upload_service::read_multipart(payload, &IMAGE_UPLOADS, &config).await?;
    let opportunity = opportunity_service::update(&db, &claims.sub, &id, form).await?;

    Ok(HttpResponse::Ok().json(opportunity))
}

#[utoipa::path(
    delete,
    path = "/api/opportunities/{id}",
    tag = "Opportunities",
    params(("id" = String, Path, description = "Opportunity id")),
    responses(
        (status = 200, description = "Opportunity deleted"),
        (status = 403, description = "Not the poster"),
        (status = 404, description = "Opportunity not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_opportunity(
    db: web::Data<MongoDB>,
    config: web::Data<AppConfig>,
    claims: web::ReqData<Claims>,
    id: web::Path<String>,
) -> AppResult<HttpResponse> {
    log::info!("🗑️  DELETE /opportunities/{} - user: {}", id, claims.sub);
    opportunity_service::delete(&db, &config, &claims.sub, &id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Opportunity deleted"
    })))
}
