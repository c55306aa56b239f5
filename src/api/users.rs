use actix_web::{guard, web, HttpResponse};

use crate::{
    database::MongoDB,
    middleware::{auth::Claims, AuthMiddleware},
    models::{OpportunityResponse, ProfileResponse, PublicProfile, ResourceResponse, UpdateProfileRequest},
    services::{
        opportunity_service,
        user_service::{self, BookmarkList},
    },
    utils::AppResult,
};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/me")
            .wrap(AuthMiddleware)
            .route(web::get().to(get_me))
            .route(web::put().to(update_me)),
    )
    .service(
        web::resource("/bookmark/{id}")
            .wrap(AuthMiddleware)
            .route(web::post().to(bookmark_opportunity))
            .route(web::delete().to(unbookmark_opportunity)),
    )
    .service(
        web::resource("/bookmarks")
            .wrap(AuthMiddleware)
            .route(web::get().to(opportunity_bookmarks)),
    )
    .service(
        web::resource("/bookmark-resource/{id}")
            .wrap(AuthMiddleware)
            .route(web::post().to(bookmark_resource))
            .route(web::delete().to(unbookmark_resource)),
    )
    .service(
        web::resource("/resource-bookmarks")
            .wrap(AuthMiddleware)
            .route(web::get().to(resource_bookmarks)),
    )
    .service(
        web::resource("/my-opportunities")
            .wrap(AuthMiddleware)
            .route(web::get().to(my_opportunities)),
    )
    .service(
        web::resource("/{id}")
            .guard(guard::Get())
            .route(web::get().to(get_user)),
    );
}

fn bookmark_message(message: &str, bookmarks: Vec<String>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": message,
        "bookmarks": bookmarks
    }))
}

#[utoipa::path(
    get,
    path = "/api/users/me",
    tag = "Users",
    responses(
        (status = 200, description = "The caller's profile", body = ProfileResponse),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_me(db: web::Data<MongoDB>, claims: web::ReqData<Claims>) -> AppResult<HttpResponse> {
    let profile = user_service::get_profile(&db, &claims.sub).await?;
    Ok(HttpResponse::Ok().json(profile))
}

#[utoipa::path(
    put,
    path = "/api/users/me",
    tag = "Users",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = ProfileResponse),
        (status = 400, description = "Username or email taken, or invalid password")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_me(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
    request: web::Json<UpdateProfileRequest>,
) -> AppResult<HttpResponse> {
    log::info!("✏️  PUT /users/me - user: {}", claims.sub);
    let profile = user_service::update_profile(&db, &claims.sub, request.into_inner()).await?;
    Ok(HttpResponse::Ok().json(profile))
}

#[utoipa::path(
    post,
    path = "/api/users/bookmark/{id}",
    tag = "Users",
    params(("id" = String, Path, description = "Opportunity id")),
    responses(
        (status = 200, description = "Bookmarked"),
        (status = 404, description = "Opportunity not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn bookmark_opportunity(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
    id: web::Path<String>,
) -> AppResult<HttpResponse> {
    log::info!("🔖 POST /users/bookmark/{} - user: {}", id, claims.sub);
    let bookmarks = user_service::add_bookmark(&db, &claims.sub, BookmarkList::Opportunities, &id).await?;
    Ok(bookmark_message("Bookmarked", bookmarks))
}

#[utoipa::path(
    delete,
    path = "/api/users/bookmark/{id}",
    tag = "Users",
    params(("id" = String, Path, description = "Opportunity id")),
    responses(
        (status = 200, description = "Bookmark removed")
    ),
    security(("bearer_auth" = []))
)]
pub async fn unbookmark_opportunity(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
    id: web::Path<String>,
) -> AppResult<HttpResponse> {
    log::info!("🔖 DELETE /users/bookmark/{} - user: {}", id, claims.sub);
    let bookmarks = user_service::remove_bookmark(&db, &claims.sub, BookmarkList::Opportunities, &id).await?;
    Ok(bookmark_message("Bookmark removed", bookmarks))
}

#[utoipa::path(
    get,
    path = "/api/users/bookmarks",
    tag = "Users",
    responses(
        (status = 200, description = "Bookmarked opportunities that still exist", body = [OpportunityResponse])
    ),
    security(("bearer_auth" = []))
)]
pub async fn opportunity_bookmarks(db: web::Data<MongoDB>, claims: web::ReqData<Claims>) -> AppResult<HttpResponse> {
    let opportunities = user_service::bookmarked_opportunities(&db, &claims.sub).await?;
    Ok(HttpResponse::Ok().json(opportunities))
}

#[utoipa::path(
    post,
    path = "/api/users/bookmark-resource/{id}",
    tag = "Users",
    params(("id" = String, Path, description = "Resource id")),
    responses(
        (status = 200, description = "Resource bookmarked"),
        (status = 404, description = "Resource not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn bookmark_resource(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
    id: web::Path<String>,
) -> AppResult<HttpResponse> {
    log::info!("🔖 POST /users/bookmark-resource/{} - user: {}", id, claims.sub);
    let bookmarks = user_service::add_bookmark(&db, &claims.sub, BookmarkList::Resources, &id).await?;
    Ok(bookmark_message("Resource bookmarked", bookmarks))
}

#[utoipa::path(
    delete,
    path = "/api/users/bookmark-resource/{id}",
    tag = "Users",
    params(("id" = String, Path, description = "Resource id")),
    responses(
        (status = 200, description = "Resource bookmark removed")
    ),
    security(("bearer_auth" = []))
)]
pub async fn unbookmark_resource(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
    id: web::Path<String>,
) -> AppResult<HttpResponse> {
    log::info!("🔖 DELETE /users/bookmark-resource/{} - user: {}", id, claims.sub);
    let bookmarks = user_service::remove_bookmark(&db, &claims.sub, BookmarkList::Resources, &id).await?;
    Ok(bookmark_message("Resource bookmark removed", bookmarks))
}

#[utoipa::path(
    get,
    path = "/api/users/resource-bookmarks",
    tag = "Users",
    responses(
        (status = 200, description = "Bookmarked resources that still exist", body = [ResourceResponse])
    ),
    security(("bearer_auth" = []))
)]
pub async fn resource_bookmarks(db: web::Data<MongoDB>, claims: web::ReqData<Claims>) -> AppResult<HttpResponse> {
    let resources = user_service::bookmarked_resources(&db, &claims.sub).await?;
    Ok(HttpResponse::Ok().json(resources))
}

#[utoipa::path(
    get,
    path = "/api/users/my-opportunities",
    tag = "Users",
    responses(
        (status = 200, description = "Opportunities posted by the caller", body = [OpportunityResponse])
    ),
    security(("bearer_auth" = []))
)]
pub async fn my_opportunities(db: web::Data<MongoDB>, claims: web::ReqData<Claims>) -> AppResult<HttpResponse> {
    let opportunities = opportunity_service::list_by_poster(&db, &claims.sub).await?;
    Ok(HttpResponse::Ok().json(opportunities))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    tag = "Users",
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "Public profile", body = PublicProfile),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(db: web::Data<MongoDB>, id: web::Path<String>) -> AppResult<HttpResponse> {
    let profile = user_service::public_profile(&db, &id).await?;
    Ok(HttpResponse::Ok().json(profile))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test, App};

    #[actix_web::test]
    async fn test_account_routes_require_token() {
        let app = test::init_service(App::new().service(web::scope("/api/users").configure(configure))).await;

        for req in [
            test::TestRequest::get().uri("/api/users/me").to_request(),
            test::TestRequest::put().uri("/api/users/me").to_request(),
            test::TestRequest::get().uri("/api/users/bookmarks").to_request(),
            test::TestRequest::post().uri("/api/users/bookmark/65f1c2a9e4b0a1b2c3d4e5f6").to_request(),
            test::TestRequest::delete().uri("/api/users/bookmark-resource/65f1c2a9e4b0a1b2c3d4e5f6").to_request(),
            test::TestRequest::get().uri("/api/users/resource-bookmarks").to_request(),
            test::TestRequest::get().uri("/api/users/my-opportunities").to_request(),
        ] {
            let res = test::call_service(&app, req).await;
            assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[actix_web::test]
    async fn test_bookmark_message_shape() {
        let res = bookmark_message("Bookmarked", vec!["65f1c2a9e4b0a1b2c3d4e5f6".to_string()]);
        assert_eq!(res.status(), StatusCode::OK);
        let body = actix_web::body::to_bytes(res.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["message"], "Bookmarked");
        assert_eq!(json["bookmarks"][0], "65f1c2a9e4b0a1b2c3d4e5f6");
    }
}
