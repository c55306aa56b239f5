use actix_web::{http::header, web, HttpResponse};
use serde::Deserialize;

use crate::{
    config::AppConfig,
    database::MongoDB,
    middleware::AuthMiddleware,
    services::auth_service::{self, AuthResponse, Claims, LoginRequest, RegisterRequest, VerifyTokenResponse},
    utils::{AppError, AppResult},
};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/register", web::post().to(register))
        .route("/login", web::post().to(login))
        .route("/google", web::get().to(google_auth))
        .route("/google/callback", web::get().to(google_callback))
        .service(
            web::resource("/verify")
                .wrap(AuthMiddleware)
                .route(web::get().to(verify_token)),
        );
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registration successful", body = AuthResponse),
        (status = 400, description = "Invalid request or user already exists")
    )
)]
pub async fn register(db: web::Data<MongoDB>, request: web::Json<RegisterRequest>) -> AppResult<HttpResponse> {
    let email = request.email.as_deref().unwrap_or("N/A");
    log::info!("📝 POST /auth/register - email: {}", email);

    match auth_service::register(&db, &request).await {
        Ok(response) => Ok(HttpResponse::Created().json(response)),
        Err(e) => {
            log::warn!("❌ Registration failed: {} - {}", email, e);
            Err(e)
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 400, description = "Invalid credentials")
    )
)]
pub async fn login(db: web::Data<MongoDB>, request: web::Json<LoginRequest>) -> AppResult<HttpResponse> {
    log::info!("🔐 POST /auth/login - email: {}", request.email);

    match auth_service::login(&db, &request).await {
        Ok(response) => {
            log::info!("✅ Login successful: {}", request.email);
            Ok(HttpResponse::Ok().json(response))
        }
        Err(e) => {
            log::warn!("❌ Login failed: {} - {}", request.email, e);
            Err(e)
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/auth/verify",
    tag = "Auth",
    responses(
        (status = 200, description = "Token is valid", body = VerifyTokenResponse),
        (status = 401, description = "Invalid or expired token")
    ),
    security(("bearer_auth" = []))
)]
pub async fn verify_token(claims: web::ReqData<Claims>) -> HttpResponse {
    log::info!("✓ GET /auth/verify - user: {}", claims.sub);
    let claims = claims.into_inner();

    HttpResponse::Ok().json(VerifyTokenResponse {
        valid: true,
        user_id: claims.sub,
        username: claims.username,
        email: claims.email,
        expires_at: claims.exp,
    })
}

fn redirect(location: String) -> HttpResponse {
    HttpResponse::Found()
        .append_header((header::LOCATION, location))
        .finish()
}

#[utoipa::path(
    get,
    path = "/api/auth/google",
    tag = "Auth",
    responses(
        (status = 302, description = "Redirect to Google's consent screen"),
        (status = 503, description = "Google login is not configured")
    )
)]
pub async fn google_auth(config: web::Data<AppConfig>) -> AppResult<HttpResponse> {
    log::info!("🔐 GET /auth/google - Redirecting to Google");

    let google = config
        .google
        .as_ref()
        .ok_or_else(|| AppError::Unavailable("Google login is not configured".to_string()))?;
    let (url, _state) = auth_service::google_authorize_url(google);

    Ok(redirect(url))
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub error: Option<String>,
}

/// Where the browser lands after the Google round trip
pub fn callback_location(frontend_url: &str, outcome: &AppResult<AuthResponse>) -> String {
    match outcome {
        Ok(auth) => format!(
            "{}/google-success?token={}",
            frontend_url,
            urlencoding::encode(&auth.token)
        ),
        Err(e) => format!(
            "{}/login?error={}",
            frontend_url,
            urlencoding::encode(&e.public_message())
        ),
    }
}

#[utoipa::path(
    get,
    path = "/api/auth/google/callback",
    tag = "Auth",
    params(CallbackQuery),
    responses(
        (status = 302, description = "Redirect to the frontend with a token or an error")
    )
)]
pub async fn google_callback(
    db: web::Data<MongoDB>,
    config: web::Data<AppConfig>,
    query: web::Query<CallbackQuery>,
) -> HttpResponse {
    log::info!("🔐 GET /auth/google/callback - Processing Google OAuth");

    let outcome = match (&config.google, &query.error, &query.code) {
        (None, _, _) => Err(AppError::Unavailable("Google login is not configured".to_string())),
        (_, Some(error), _) => Err(AppError::BadRequest(format!("Google login failed: {}", error))),
        (_, None, None) => Err(AppError::BadRequest("No authorization code provided".to_string())),
        (Some(google), None, Some(code)) => auth_service::handle_google_callback(&db, google, code).await,
    };

    match &outcome {
        Ok(auth) => log::info!("✅ Google login successful: {}", auth.user.email),
        Err(e) => log::error!("❌ Google login failed: {}", e),
    }

    redirect(callback_location(&config.frontend_url, &outcome))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::auth_service::AuthUser;

    #[test]
    fn test_callback_location_success() {
        let outcome = Ok(AuthResponse {
            success: true,
            token: "a.b.c".into(),
            user: AuthUser {
                id: "1".into(),
                username: "ana".into(),
                email: "ana@example.com".into(),
            },
        });
        assert_eq!(
            callback_location("http://localhost:3000", &outcome),
            "http://localhost:3000/google-success?token=a.b.c"
        );
    }

    #[test]
    fn test_callback_location_failure_hides_internals() {
        let outcome: AppResult<AuthResponse> = Err(AppError::Upstream("token endpoint said 400".into()));
        assert_eq!(
            callback_location("http://localhost:3000", &outcome),
            "http://localhost:3000/login?error=Upstream%20service%20failed"
        );
    }
}
