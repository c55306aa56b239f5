use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use opportunity_hub::{
    api,
    config::AppConfig,
    database::MongoDB,
    middleware::{AuthMiddleware, SecurityHeaders},
    services::mail_service::{LogMailer, Mailer, SmtpMailer},
    utils::{json_config, path_config, query_config},
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();

    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("❌ Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    log::info!("🚀 Starting Opportunity Hub...");

    let db = match MongoDB::new(&config.database_url).await {
        Ok(db) => db,
        Err(e) => {
            log::error!("❌ Failed to connect to MongoDB: {}", e);
            std::process::exit(1);
        }
    };
    log::info!("✅ MongoDB connected successfully");

    let public_dir = config.public_dir();
    for dir in [public_dir.join("logos"), public_dir.join("pics"), config.resume_dir()] {
        tokio::fs::create_dir_all(&dir).await?;
    }
    log::info!("📁 Uploads stored under {}", config.upload_dir.display());

    let mailer: Arc<dyn Mailer> = match config.smtp.as_ref().map(SmtpMailer::new) {
        Some(Ok(smtp)) => Arc::new(smtp),
        Some(Err(e)) => {
            log::warn!("⚠️  SMTP unavailable, confirmation mails will only be logged: {}", e);
            Arc::new(LogMailer)
        }
        None => {
            log::warn!("⚠️  SMTP not configured, confirmation mails will only be logged");
            Arc::new(LogMailer)
        }
    };
    if config.google.is_none() {
        log::warn!("⚠️  Google sign-in disabled (GOOGLE_CLIENT_ID/SECRET not set)");
    }
    if config.razorpay.is_none() {
        log::warn!("⚠️  Payments disabled (RAZORPAY_KEY_ID/SECRET not set)");
    }

    let host = config.host.clone();
    let port = config.port;

    let db_data = web::Data::new(db);
    let config_data = web::Data::new(config);
    let mailer_data: web::Data<dyn Mailer> = web::Data::from(mailer);

    log::info!("🌐 Server starting on {}:{}", host, port);
    log::info!("📚 Swagger UI available at: http://{}:{}/swagger-ui/", host, port);
    log::info!("📄 OpenAPI spec at: http://{}:{}/api-docs/openapi.json", host, port);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&config_data.frontend_url)
            .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                actix_web::http::header::AUTHORIZATION,
                actix_web::http::header::CONTENT_TYPE,
                actix_web::http::header::ACCEPT,
            ])
            .expose_headers(vec![actix_web::http::header::CONTENT_TYPE])
            .supports_credentials()
            .max_age(3600);

        let openapi = api::swagger::ApiDoc::openapi();

        App::new()
            .app_data(db_data.clone())
            .app_data(config_data.clone())
            .app_data(mailer_data.clone())
            .app_data(json_config())
            .app_data(query_config())
            .app_data(path_config())
            .wrap(cors)
            .wrap(SecurityHeaders)
            .wrap(Logger::default())
            .service(SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", openapi))
            .route("/health", web::get().to(api::health::health_check))
            .service(actix_files::Files::new("/public", config_data.public_dir()))
            .service(web::scope("/api/auth").configure(api::auth::configure))
            .service(web::scope("/api/opportunities").configure(api::opportunities::configure))
            .service(
                web::scope("/api/registrations")
                    .wrap(AuthMiddleware)
                    .configure(api::registrations::configure),
            )
            .service(
                web::scope("/api/requests")
                    .wrap(AuthMiddleware)
                    .configure(api::requests::configure),
            )
            .service(web::scope("/api/resources").configure(api::resources::configure))
            .service(
                web::scope("/api/comments")
                    .wrap(AuthMiddleware)
                    .configure(api::comments::configure),
            )
            .service(
                web::scope("/api/notifications")
                    .wrap(AuthMiddleware)
                    .configure(api::notifications::configure),
            )
            .service(web::scope("/api/users").configure(api::users::configure))
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}
