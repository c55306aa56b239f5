use actix_web::{guard, web, HttpResponse};

use crate::{
    database::MongoDB,
    middleware::{auth::Claims, AuthMiddleware},
    models::{RateRequest, ResourceListQuery, ResourceRequest, ResourceResponse},
    services::resource_service,
    utils::AppResult,
};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("")
            .guard(guard::Get())
            .route(web::get().to(list_resources)),
    )
    .service(
        web::resource("")
            .wrap(AuthMiddleware)
            .route(web::post().to(create_resource)),
    )
    .service(
        web::resource("/mine")
            .wrap(AuthMiddleware)
            .route(web::get().to(my_resources)),
    )
    .service(web::resource("/{id}/view").route(web::post().to(view_resource)))
    .service(
        web::resource("/{id}/rate")
            .wrap(AuthMiddleware)
            .route(web::patch().to(rate_resource)),
    )
    .service(
        web::resource("/{id}")
            .guard(guard::Get())
            .route(web::get().to(get_resource)),
    )
    .service(
        web::resource("/{id}")
            .wrap(AuthMiddleware)
            .route(web::put().to(update_resource))
            .route(web::delete().to(delete_resource)),
    );
}

#[utoipa::path(
    get,
    path = "/api/resources",
    tag = "Resources",
    params(ResourceListQuery),
    responses(
        (status = 200, description = "All resources in the requested order", body = [ResourceResponse])
    )
)]
pub async fn list_resources(db: web::Data<MongoDB>, query: web::Query<ResourceListQuery>) -> AppResult<HttpResponse> {
    let sort = query.sort.unwrap_or_default();
    log::info!("📚 GET /resources - sort: {:?}", sort);
    let resources = resource_service::list(&db, sort).await?;
    Ok(HttpResponse::Ok().json(resources))
}

#[utoipa::path(
    get,
    path = "/api/resources/mine",
    tag = "Resources",
    responses(
        (status = 200, description = "The caller's resources", body = [ResourceResponse])
    ),
    security(("bearer_auth" = []))
)]
pub async fn my_resources(db: web::Data<MongoDB>, claims: web::ReqData<Claims>) -> AppResult<HttpResponse> {
    log::info!("📚 GET /resources/mine - user: {}", claims.sub);
    let resources = resource_service::list_by_owner(&db, &claims.sub).await?;
    Ok(HttpResponse::Ok().json(resources))
}

#[utoipa::path(
    get,
    path = "/api/resources/{id}",
    tag = "Resources",
    params(("id" = String, Path, description = "Resource id")),
    responses(
        (status = 200, description = "The resource", body = ResourceResponse),
        (status = 404, description = "Resource not found")
    )
)]
pub async fn get_resource(db: web::Data<MongoDB>, id: web::Path<String>) -> AppResult<HttpResponse> {
    let resource = resource_service::find(&db, &id).await?;
    Ok(HttpResponse::Ok().json(ResourceResponse::from(resource)))
}

#[utoipa::path(
    post,
    path = "/api/resources",
    tag = "Resources",
    request_body = ResourceRequest,
    responses(
        (status = 201, description = "Resource created", body = ResourceResponse),
        (status = 400, description = "Validation failed")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_resource(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
    request: web::Json<ResourceRequest>,
) -> AppResult<HttpResponse> {
    log::info!("📝 POST /resources - user: {}", claims.sub);
    let resource = resource_service::create(&db, &claims.sub, request.into_inner()).await?;
    Ok(HttpResponse::Created().json(resource))
}

#[utoipa::path(
    put,
    path = "/api/resources/{id}",
    tag = "Resources",
    params(("id" = String, Path, description = "Resource id")),
    request_body = ResourceRequest,
    responses(
        (status = 200, description = "Resource updated", body = ResourceResponse),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Resource not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_resource(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
    id: web::Path<String>,
    request: web::Json<ResourceRequest>,
) -> AppResult<HttpResponse> {
    log::info!("✏️  PUT /resources/{} - user: {}", id, claims.sub);
    let resource = resource_service::update(&db, &claims.sub, &id, request.into_inner()).await?;
    Ok(HttpResponse::Ok().json(resource))
}

#[utoipa::path(
    delete,
    path = "/api/resources/{id}",
    tag = "Resources",
    params(("id" = String, Path, description = "Resource id")),
    responses(
        (status = 200, description = "Resource deleted"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Resource not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_resource(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
    id: web::Path<String>,
) -> AppResult<HttpResponse> {
    log::info!("🗑️  DELETE /resources/{} - user: {}", id, claims.sub);
    resource_service::delete(&db, &claims.sub, &id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Resource deleted"
    })))
}

#[utoipa::path(
    patch,
    path = "/api/resources/{id}/rate",
    tag = "Resources",
    params(("id" = String, Path, description = "Resource id")),
    request_body = RateRequest,
    responses(
        (status = 200, description = "Rating stored", body = ResourceResponse),
        (status = 400, description = "Invalid rating"),
        (status = 404, description = "Resource not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn rate_resource(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
    id: web::Path<String>,
    request: web::Json<RateRequest>,
) -> AppResult<HttpResponse> {
    log::info!("⭐ PATCH /resources/{}/rate - user: {}", id, claims.sub);
    let resource = resource_service::rate(&db, &claims.sub, &id, request.rating).await?;
    Ok(HttpResponse::Ok().json(resource))
}

#[utoipa::path(
    post,
    path = "/api/resources/{id}/view",
    tag = "Resources",
    params(("id" = String, Path, description = "Resource id")),
    responses(
        (status = 200, description = "View counted", body = ResourceResponse),
        (status = 404, description = "Resource not found")
    )
)]
pub async fn view_resource(db: web::Data<MongoDB>, id: web::Path<String>) -> AppResult<HttpResponse> {
    let resource = resource_service::record_view(&db, &id).await?;
    Ok(HttpResponse::Ok().json(resource))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test, App};

    #[actix_web::test]
    async fn test_writes_require_token() {
        let app = test::init_service(App::new().service(web::scope("/api/resources").configure(configure))).await;

        for req in [
            test::TestRequest::post().uri("/api/resources").to_request(),
            test::TestRequest::get().uri("/api/resources/mine").to_request(),
            test::TestRequest::patch().uri("/api/resources/65f1c2a9e4b0a1b2c3d4e5f6/rate").to_request(),
            test::TestRequest::put().uri("/api/resources/65f1c2a9e4b0a1b2c3d4e5f6").to_request(),
            test::TestRequest::delete().uri("/api/resources/65f1c2a9e4b0a1b2c3d4e5f6").to_request(),
        ] {
            let res = test::call_service(&app, req).await;
            assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        }
    }
}
