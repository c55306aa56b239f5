use dotenv::dotenv;

use opportunity_hub::{config::AppConfig, database::MongoDB, maintenance};

#[actix_rt::main]
async fn main() {
    dotenv().ok();

    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("❌ Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let db = match MongoDB::new(&config.database_url).await {
        Ok(db) => db,
        Err(e) => {
            log::error!("❌ Failed to connect to MongoDB: {}", e);
            std::process::exit(1);
        }
    };

    match maintenance::clear_past_webinars(&db).await {
        Ok(count) => log::info!("🧹 Deleted {} past webinar(s)", count),
        Err(e) => {
            log::error!("❌ Failed to clear past webinars: {}", e);
            std::process::exit(1);
        }
    }
}
