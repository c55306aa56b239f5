use mongodb::{
    bson::doc,
    options::{ClientOptions, IndexOptions},
    Client, Collection, Database, IndexModel,
};
use std::error::Error;

pub const USERS: &str = "users";
pub const OPPORTUNITIES: &str = "opportunities";
pub const REQUESTS: &str = "requests";
pub const RESOURCES: &str = "resources";
pub const COMMENTS: &str = "comments";
pub const NOTIFICATIONS: &str = "notifications";

#[derive(Clone)]
pub struct MongoDB {
    db: Database,
}

impl MongoDB {
    pub async fn new(uri: &str) -> Result<Self, Box<dyn Error>> {
        let mut client_options = ClientOptions::parse(uri).await?;
        let db_name = database_name(&client_options);

        // Connection pool
        client_options.max_pool_size = Some(20);
        client_options.min_pool_size = Some(5);
        client_options.max_idle_time = Some(std::time::Duration::from_secs(300));

        client_options.connect_timeout = Some(std::time::Duration::from_secs(5));
        client_options.server_selection_timeout = Some(std::time::Duration::from_secs(5));

        let client = Client::with_options(client_options)?;

        let db = client.database(&db_name);

        // Test connection
        db.list_collection_names().await?;

        let mongodb = Self { db };
        mongodb.ensure_indexes().await?;

        Ok(mongodb)
    }

    /// Creates the indexes the queries rely on. The unique ones also back
    /// the one-per-user invariants.
    async fn ensure_indexes(&self) -> Result<(), Box<dyn Error>> {
        log::info!("🔧 Creating database indexes...");

        let unique = || IndexOptions::builder().unique(true).build();

        let indexes: Vec<(&str, IndexModel, &str)> = vec![
            (
                USERS,
                IndexModel::builder().keys(doc! { "email": 1 }).options(unique()).build(),
                "users(email) unique",
            ),
            (
                USERS,
                IndexModel::builder().keys(doc! { "username": 1 }).options(unique()).build(),
                "users(username) unique",
            ),
            (
                USERS,
                IndexModel::builder()
                    .keys(doc! { "googleId": 1 })
                    .options(
                        IndexOptions::builder()
                            .unique(true)
                            .partial_filter_expression(doc! { "googleId": { "$type": "string" } })
                            .build(),
                    )
                    .build(),
                "users(googleId) unique partial",
            ),
            (
                OPPORTUNITIES,
                IndexModel::builder().keys(doc! { "postedBy": 1 }).build(),
                "opportunities(postedBy)",
            ),
            (
                OPPORTUNITIES,
                IndexModel::builder().keys(doc! { "type": 1, "createdAt": -1 }).build(),
                "opportunities(type, createdAt)",
            ),
            (
                OPPORTUNITIES,
                IndexModel::builder().keys(doc! { "registrations.user": 1 }).build(),
                "opportunities(registrations.user)",
            ),
            (
                REQUESTS,
                IndexModel::builder()
                    .keys(doc! { "opportunity": 1, "requestedBy": 1 })
                    .options(unique())
                    .build(),
                "requests(opportunity, requestedBy) unique",
            ),
            (
                REQUESTS,
                IndexModel::builder().keys(doc! { "requestedBy": 1, "createdAt": -1 }).build(),
                "requests(requestedBy, createdAt)",
            ),
            (
                RESOURCES,
                IndexModel::builder().keys(doc! { "userId": 1 }).build(),
                "resources(userId)",
            ),
            (
                COMMENTS,
                IndexModel::builder().keys(doc! { "opportunity": 1, "createdAt": 1 }).build(),
                "comments(opportunity, createdAt)",
            ),
            (
                COMMENTS,
                IndexModel::builder()
                    .keys(doc! { "resource": 1, "parent": 1, "createdAt": 1 })
                    .build(),
                "comments(resource, parent, createdAt)",
            ),
            (
                NOTIFICATIONS,
                IndexModel::builder().keys(doc! { "createdAt": -1 }).build(),
                "notifications(createdAt)",
            ),
        ];

        for (collection, index, label) in indexes {
            let required = is_unique(&index);
            let collection = self.database().collection::<mongodb::bson::Document>(collection);
            match collection.create_index(index).await {
                Ok(_) => log::info!("   ✅ Index created: {}", label),
                Err(e) if required => {
                    log::error!("   ❌ Index {} not created: {}", label, e);
                    return Err(format!("unique index {} could not be created: {}", label, e).into());
                }
                Err(e) => log::warn!("   ⚠️  Index {} not created: {}", label, e),
            }
        }

        log::info!("✅ Database indexes ready");

        Ok(())
    }

    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection(name)
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub async fn ping(&self) -> bool {
        self.db.run_command(doc! { "ping": 1 }).await.is_ok()
    }
}

/// Database named in the connection string, `nextgenwork` when it names none
fn database_name(options: &ClientOptions) -> String {
    options
        .default_database
        .clone()
        .unwrap_or_else(|| "nextgenwork".to_string())
}

/// Unique indexes back one-per-user invariants, so failing to build one is fatal
fn is_unique(index: &IndexModel) -> bool {
    index
        .options
        .as_ref()
        .and_then(|options| options.unique)
        .unwrap_or(false)
}
