use crate::{
    config::GoogleConfig,
    database::{MongoDB, USERS},
    models::User,
    utils::{is_duplicate_key, non_blank, now_millis, AppError, AppResult},
};
use actix_web::web;
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use mongodb::bson::{doc, oid::ObjectId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

const MIN_PASSWORD_LEN: usize = 6;

// JWT Claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // user id (hex ObjectId)
    pub username: String,
    pub email: String,
    pub iat: usize,
    pub exp: usize,
    pub jti: String,
    pub aud: String,
    pub iss: String,
}

// Request/Response structures
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
    pub user: AuthUser,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AuthUser {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    pub email: String,
}

impl AuthResponse {
    fn for_user(user: &User) -> AppResult<Self> {
        Ok(AuthResponse {
            success: true,
            token: generate_jwt(user)?,
            user: AuthUser {
                id: user.id_hex(),
                username: user.username.clone(),
                email: user.email.clone(),
            },
        })
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct VerifyTokenResponse {
    pub valid: bool,
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub expires_at: usize,
}

fn get_jwt_secret() -> String {
    std::env::var("JWT_SECRET").unwrap_or_else(|_| "default-secret-change-me".to_string())
}

fn get_jwt_issuer() -> String {
    std::env::var("JWT_ISSUER").unwrap_or_else(|_| "opportunity-hub".to_string())
}

fn get_jwt_audience() -> String {
    std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "opportunity-hub-api".to_string())
}

fn get_jwt_expiry_days() -> i64 {
    std::env::var("JWT_EXPIRY_DAYS")
        .ok()
        .and_then(|d| d.parse().ok())
        .filter(|d: &i64| *d > 0)
        .unwrap_or(7)
}

// Generate JWT token
pub fn generate_jwt(user: &User) -> AppResult<String> {
    let now = Utc::now();
    let claims = Claims {
        sub: user.id_hex(),
        username: user.username.clone(),
        email: user.email.clone(),
        iat: now.timestamp() as usize,
        exp: (now + Duration::days(get_jwt_expiry_days())).timestamp() as usize,
        jti: Uuid::new_v4().to_string(),
        aud: get_jwt_audience(),
        iss: get_jwt_issuer(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(get_jwt_secret().as_ref()),
    )
    .map_err(|e| AppError::Internal(format!("Failed to generate token: {}", e)))
}

// Verify JWT token
pub fn verify_token(token: &str) -> AppResult<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[get_jwt_audience()]);

    let mut issuers = HashSet::new();
    issuers.insert(get_jwt_issuer());
    validation.iss = Some(issuers);

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(get_jwt_secret().as_ref()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::Unauthorized("Not authorized, token failed".to_string()))
}

/// bcrypt is CPU bound; run it off the async workers
pub async fn hash_password(password: String) -> AppResult<String> {
    web::block(move || hash(password, DEFAULT_COST))
        .await
        .map_err(|e| AppError::Internal(format!("Password hashing task failed: {}", e)))?
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

pub async fn verify_password(password: String, stored_hash: String) -> AppResult<bool> {
    web::block(move || verify(password, &stored_hash))
        .await
        .map_err(|e| AppError::Internal(format!("Password verification task failed: {}", e)))?
        .map_err(|e| AppError::Internal(format!("Password verification error: {}", e)))
}

pub fn validate_password(password: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> AppResult<String> {
    let email = email.trim().to_lowercase();
    let valid = email
        .split_once('@')
        .map(|(local, domain)| !local.is_empty() && domain.contains('.') && !domain.starts_with('.'))
        .unwrap_or(false);
    if !valid {
        return Err(AppError::BadRequest("Invalid email address".to_string()));
    }
    Ok(email)
}

// User registration
pub async fn register(db: &MongoDB, request: &RegisterRequest) -> AppResult<AuthResponse> {
    let collection = db.collection::<User>(USERS);

    let username = non_blank(request.username.as_deref())
        .ok_or_else(|| AppError::BadRequest("Username is required".to_string()))?;
    let email = validate_email(
        &non_blank(request.email.as_deref()).ok_or_else(|| AppError::BadRequest("Email is required".to_string()))?,
    )?;
    let password = request
        .password
        .clone()
        .ok_or_else(|| AppError::BadRequest("Password is required".to_string()))?;
    validate_password(&password)?;

    if collection.find_one(doc! { "email": &email }).await?.is_some() {
        return Err(AppError::BadRequest("Email already registered".to_string()));
    }
    if collection.find_one(doc! { "username": &username }).await?.is_some() {
        return Err(AppError::BadRequest("Username already taken".to_string()));
    }

    let now = now_millis();
    let mut user = User {
        id: Some(ObjectId::new()),
        username,
        email,
        password: Some(hash_password(password).await?),
        google_id: None,
        bookmarks: Vec::new(),
        resource_bookmarks: Vec::new(),
        created_at: now,
        updated_at: now,
    };

    match collection.insert_one(&user).await {
        Ok(_) => {}
        Err(e) if is_duplicate_key(&e) => {
            return Err(AppError::BadRequest("Email or username already registered".to_string()))
        }
        Err(e) => return Err(e.into()),
    }
    user.password = None;

    log::info!("✅ User registered successfully: {}", user.email);

    AuthResponse::for_user(&user)
}

// User login
pub async fn login(db: &MongoDB, request: &LoginRequest) -> AppResult<AuthResponse> {
    let collection = db.collection::<User>(USERS);
    let email = request.email.trim().to_lowercase();

    let user = collection
        .find_one(doc! { "email": &email })
        .await?
        .ok_or_else(|| AppError::BadRequest("Invalid credentials".to_string()))?;

    // Check if user has a password (not OAuth-only account)
    let stored_password = user.password.clone().ok_or_else(|| {
        AppError::BadRequest("This account uses Google login. Please sign in with Google.".to_string())
    })?;

    if !verify_password(request.password.clone(), stored_password).await? {
        return Err(AppError::BadRequest("Invalid credentials".to_string()));
    }

    AuthResponse::for_user(&user)
}

// Generate Google OAuth URL; returns (url, state)
pub fn google_authorize_url(google: &GoogleConfig) -> (String, String) {
    let state = Uuid::new_v4().to_string();

    let params = [
        ("client_id", google.client_id.as_str()),
        ("redirect_uri", google.redirect_uri.as_str()),
        ("response_type", "code"),
        ("scope", "openid email profile"),
        ("state", state.as_str()),
        ("prompt", "select_account"),
    ];

    let query_string = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    (
        format!("https://accounts.google.com/o/oauth2/v2/auth?{}", query_string),
        state,
    )
}

#[derive(Debug, Deserialize)]
struct GoogleTokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct GoogleProfile {
    id: String,
    email: String,
    #[serde(default)]
    name: Option<String>,
}

/// Lowercase alphanumeric handle from a display name or email
pub fn username_base(display_name: Option<&str>, email: &str) -> String {
    let source = display_name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| email.split('@').next().unwrap_or(email));

    let base: String = source
        .chars()
        .filter_map(|c| {
            if c.is_ascii_alphanumeric() {
                Some(c.to_ascii_lowercase())
            } else if c.is_whitespace() || c == '.' || c == '_' || c == '-' {
                Some('_')
            } else {
                None
            }
        })
        .collect::<String>()
        .trim_matches('_')
        .to_string();

    if base.is_empty() {
        "user".to_string()
    } else {
        base
    }
}

async fn unique_username(db: &MongoDB, base: &str) -> AppResult<String> {
    let collection = db.collection::<User>(USERS);
    let mut candidate = base.to_string();
    for _ in 0..5 {
        if collection.find_one(doc! { "username": &candidate }).await?.is_none() {
            return Ok(candidate);
        }
        let suffix = Uuid::new_v4().simple().to_string();
        candidate = format!("{}_{}", base, &suffix[..6]);
    }
    Ok(candidate)
}

// Handle Google OAuth callback: exchange the code, then find, link or create the user
pub async fn handle_google_callback(db: &MongoDB, google: &GoogleConfig, code: &str) -> AppResult<AuthResponse> {
    let client = reqwest::Client::new();
    let token_response = client
        .post("https://oauth2.googleapis.com/token")
        .form(&[
            ("code", code),
            ("client_id", google.client_id.as_str()),
            ("client_secret", google.client_secret.as_str()),
            ("redirect_uri", google.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ])
        .send()
        .await
        .map_err(|e| AppError::Upstream(format!("Failed to exchange code: {}", e)))?;

    if !token_response.status().is_success() {
        return Err(AppError::Upstream(format!(
            "Google rejected the authorization code ({})",
            token_response.status()
        )));
    }

    let tokens: GoogleTokenResponse = token_response
        .json()
        .await
        .map_err(|e| AppError::Upstream(format!("Failed to parse token response: {}", e)))?;

    let profile: GoogleProfile = client
        .get("https://www.googleapis.com/oauth2/v2/userinfo")
        .bearer_auth(&tokens.access_token)
        .send()
        .await
        .map_err(|e| AppError::Upstream(format!("Failed to get user info: {}", e)))?
        .json()
        .await
        .map_err(|e| AppError::Upstream(format!("Failed to parse user info: {}", e)))?;

    let collection = db.collection::<User>(USERS);
    let email = profile.email.trim().to_lowercase();

    // First try to find by googleId
    if let Some(user) = collection.find_one(doc! { "googleId": &profile.id }).await? {
        log::info!("✅ Found existing user by googleId: {}", user.id_hex());
        return AuthResponse::for_user(&user);
    }

    // Link an existing local account with the same email
    if let Some(mut user) = collection.find_one(doc! { "email": &email }).await? {
        log::info!("✅ Linking Google account to existing user: {}", user.id_hex());
        collection
            .update_one(
                doc! { "email": &email },
                doc! { "$set": { "googleId": &profile.id, "updatedAt": now_millis() } },
            )
            .await?;
        user.google_id = Some(profile.id);
        return AuthResponse::for_user(&user);
    }

    let now = now_millis();
    let user = User {
        id: Some(ObjectId::new()),
        username: unique_username(db, &username_base(profile.name.as_deref(), &email)).await?,
        email,
        password: None,
        google_id: Some(profile.id),
        bookmarks: Vec::new(),
        resource_bookmarks: Vec::new(),
        created_at: now,
        updated_at: now,
    };
    collection.insert_one(&user).await?;

    log::info!("✅ Created user from Google login: {}", user.id_hex());
    AuthResponse::for_user(&user)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: Some(ObjectId::new()),
            username: "ana".into(),
            email: "ana@example.com".into(),
            password: None,
            google_id: None,
            bookmarks: vec![],
            resource_bookmarks: vec![],
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_jwt_round_trip() {
        let user = user();
        let token = generate_jwt(&user).unwrap();
        let claims = verify_token(&token).unwrap();

        assert_eq!(claims.sub, user.id_hex());
        assert_eq!(claims.username, "ana");
        assert_eq!(claims.email, "ana@example.com");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_tampered_token_rejected() {
        let token = generate_jwt(&user()).unwrap();
        let mut tampered = token.clone();
        tampered.push('x');
        let err = verify_token(&tampered).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
        assert!(verify_token("not.a.jwt").is_err());
    }

    #[test]
    fn test_password_rules() {
        assert!(validate_password("12345").is_err());
        assert!(validate_password("123456").is_ok());
    }

    #[test]
    fn test_email_normalised_and_checked() {
        assert_eq!(validate_email(" Ana@Example.COM ").unwrap(), "ana@example.com");
        assert!(validate_email("ana").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("ana@localhost").is_err());
    }

    #[actix_web::test]
    async fn test_password_hash_and_verify() {
        let hashed = hash_password("s3cret-pass".to_string()).await.unwrap();
        assert_ne!(hashed, "s3cret-pass");
        assert!(verify_password("s3cret-pass".to_string(), hashed.clone()).await.unwrap());
        assert!(!verify_password("wrong".to_string(), hashed).await.unwrap());
    }

    #[test]
    fn test_username_base() {
        assert_eq!(username_base(Some("Ana María Silva"), "x@example.com"), "ana_mara_silva");
        assert_eq!(username_base(None, "john.doe@example.com"), "john_doe");
        assert_eq!(username_base(Some("   "), "zed@example.com"), "zed");
        assert_eq!(username_base(Some("😀"), "@example.com"), "user");
    }

    #[test]
    fn test_google_url_contains_client_and_redirect() {
        let google = GoogleConfig {
            client_id: "client-123".into(),
            client_secret: "secret".into(),
            redirect_uri: "http://localhost:5000/api/auth/google/callback".into(),
        };
        let (url, state) = google_authorize_url(&google);

        assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
        assert!(url.contains("client_id=client-123"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A5000%2Fapi%2Fauth%2Fgoogle%2Fcallback"));
        assert!(url.contains("prompt=select_account"));
        assert!(url.contains(&format!("state={}", state)));
    }
}
