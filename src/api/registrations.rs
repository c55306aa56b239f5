use actix_web::{web, HttpResponse};

use crate::{
    config::AppConfig,
    database::MongoDB,
    middleware::auth::Claims,
    models::{OpportunityResponse, RegistrationForm, RegistrationResponse},
    services::{
        mail_service::Mailer,
        payment_service::{self, CreateOrderRequest},
        registration_service,
    },
    utils::AppResult,
};

/// Mounted under an authenticated scope
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/order", web::post().to(create_order))
        .route("/my", web::get().to(my_registrations))
        .route("/{id}/register", web::post().to(register))
        .route("/{id}/registrations", web::get().to(list_registrations));
}

#[utoipa::path(
    post,
    path = "/api/registrations/order",
    tag = "Registrations",
    request_body = CreateOrderRequest,
    responses(
        (status = 200, description = "Razorpay order"),
        (status = 400, description = "Invalid amount"),
        (status = 502, description = "Razorpay failed"),
        (status = 503, description = "Payments are not configured")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_order(
    config: web::Data<AppConfig>,
    claims: web::ReqData<Claims>,
    request: web::Json<CreateOrderRequest>,
) -> AppResult<HttpResponse> {
    log::info!("💳 POST /registrations/order - user: {}, amount: {}", claims.sub, request.amount);
    let order = payment_service::create_order(config.razorpay.as_ref(), request.amount).await?;
    Ok(HttpResponse::Ok().json(order))
}

#[utoipa::path(
    post,
    path = "/api/registrations/{id}/register",
    tag = "Registrations",
    params(("id" = String, Path, description = "Contest or webinar id")),
    request_body = RegistrationForm,
    responses(
        (status = 200, description = "Registered successfully"),
        (status = 400, description = "Already registered, or not a contest/webinar"),
        (status = 402, description = "Payment required"),
        (status = 404, description = "Opportunity not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn register(
    db: web::Data<MongoDB>,
    mailer: web::Data<dyn Mailer>,
    claims: web::ReqData<Claims>,
    id: web::Path<String>,
    form: web::Json<RegistrationForm>,
) -> AppResult<HttpResponse> {
    log::info!("📝 POST /registrations/{}/register - user: {}", id, claims.sub);

    registration_service::register(&db, mailer.into_inner(), &claims.sub, &id, form.into_inner()).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Registered successfully"
    })))
}

#[utoipa::path(
    get,
    path = "/api/registrations/my",
    tag = "Registrations",
    responses(
        (status = 200, description = "Opportunities the caller registered for", body = [OpportunityResponse])
    ),
    security(("bearer_auth" = []))
)]
pub async fn my_registrations(db: web::Data<MongoDB>, claims: web::ReqData<Claims>) -> AppResult<HttpResponse> {
    log::info!("📋 GET /registrations/my - user: {}", claims.sub);
    let opportunities = registration_service::my_registrations(&db, &claims.sub).await?;
    Ok(HttpResponse::Ok().json(opportunities))
}

#[utoipa::path(
    get,
    path = "/api/registrations/{id}/registrations",
    tag = "Registrations",
    params(("id" = String, Path, description = "Contest or webinar id")),
    responses(
        (status = 200, description = "Registrations", body = [RegistrationResponse]),
        (status = 403, description = "Not the poster"),
        (status = 404, description = "Opportunity not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_registrations(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
    id: web::Path<String>,
) -> AppResult<HttpResponse> {
    log::info!("📋 GET /registrations/{}/registrations - user: {}", id, claims.sub);
    let registrations = registration_service::list_for_opportunity(&db, &claims.sub, &id).await?;
    Ok(HttpResponse::Ok().json(registrations))
}
