use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::database::MongoDB;

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    /// `connected` or `unreachable`
    pub database: String,
    pub timestamp: i64,
}

impl HealthResponse {
    fn new(database_up: bool) -> Self {
        let (status, database) = if database_up {
            ("healthy", "connected")
        } else {
            ("degraded", "unreachable")
        };
        Self {
            status: status.to_string(),
            service: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            database: database.to_string(),
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

fn health_response(database_up: bool) -> HttpResponse {
    let body = HealthResponse::new(database_up);
    if database_up {
        HttpResponse::Ok().json(body)
    } else {
        HttpResponse::ServiceUnavailable().json(body)
    }
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service and database are up", body = HealthResponse),
        (status = 503, description = "Database is unreachable", body = HealthResponse)
    )
)]
pub async fn health_check(db: web::Data<MongoDB>) -> HttpResponse {
    let database_up = db.ping().await;
    if !database_up {
        log::warn!("⚠️  Health check: database ping failed");
    }
    health_response(database_up)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test, App};

    #[actix_web::test]
    async fn test_health_response() {
        let res = health_response(true);
        assert_eq!(res.status(), StatusCode::OK);
        let body = actix_web::body::to_bytes(res.into_body()).await.unwrap();
        let body: HealthResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(body.status, "healthy");
        assert_eq!(body.database, "connected");
        assert_eq!(body.service, "opportunity-hub");
    }

    #[actix_web::test]
    async fn test_unreachable_database_is_degraded() {
        let res = health_response(false);
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = actix_web::body::to_bytes(res.into_body()).await.unwrap();
        let body: HealthResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(body.status, "degraded");
        assert_eq!(body.database, "unreachable");
    }

    #[actix_web::test]
    #[ignore] // Requires MongoDB to be running
    async fn test_health_check() {
        dotenv::dotenv().ok();
        let uri = std::env::var("DATABASE_URL").unwrap_or_else(|_| "mongodb://localhost:27017/nextgenwork_test".to_string());
        let db = MongoDB::new(&uri).await.expect("MongoDB connection");

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(db))
                .route("/health", web::get().to(health_check)),
        )
        .await;
        let res = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
        assert!(res.status().is_success());

        let body: HealthResponse = test::read_body_json(res).await;
        assert_eq!(body.status, "healthy");
        assert_eq!(body.database, "connected");
    }
}
