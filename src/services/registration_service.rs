use std::sync::Arc;

use futures::TryStreamExt;
use mongodb::bson::{self, doc};

use crate::{
    database::{MongoDB, OPPORTUNITIES},
    models::{Opportunity, OpportunityResponse, Owned, RegistrationForm, RegistrationResponse},
    services::{
        mail_service::{self, Mailer},
        opportunity_service, user_service,
    },
    utils::{now_millis, parse_object_id, AppError, AppResult},
};

/// Registers the caller for a contest or webinar and mails a confirmation.
/// Without an email in the form, the account's current email is used.
///
/// The in-memory check gives the precise error; the conditional `$push`
/// makes a concurrent duplicate lose as well.
pub async fn register(
    db: &MongoDB,
    mailer: Arc<dyn Mailer>,
    user_id: &str,
    opportunity_id: &str,
    form: RegistrationForm,
) -> AppResult<()> {
    let opportunity = opportunity_service::find(db, opportunity_id).await?;
    let user = user_service::find_by_id(db, user_id).await?;
    let registration = opportunity.new_registration(form, user_id, &user.email, now_millis())?;

    let oid = parse_object_id(opportunity_id, "opportunity")?;
    let result = db
        .collection::<Opportunity>(OPPORTUNITIES)
        .update_one(
            doc! { "_id": oid, "registrations.user": { "$ne": user_id } },
            doc! { "$push": { "registrations": bson::to_bson(&registration)? } },
        )
        .await?;

    if result.matched_count == 0 {
        return Err(AppError::BadRequest("Already registered".to_string()));
    }

    log::info!(
        "✅ {} registered for {} '{}'",
        user_id,
        opportunity.kind.as_str(),
        opportunity.title
    );

    let (subject, body) = mail_service::registration_confirmation(&registration.name, &opportunity);
    let to = registration.email;
    tokio::spawn(async move {
        match mailer.send(&to, &subject, body).await {
            Ok(()) => log::info!("📧 Confirmation mail sent to {}", to),
            Err(e) => log::warn!("⚠️  Confirmation mail to {} failed: {}", to, e),
        }
    });

    Ok(())
}

/// Opportunities the user registered for, newest first
pub async fn my_registrations(db: &MongoDB, user_id: &str) -> AppResult<Vec<OpportunityResponse>> {
    let opportunities: Vec<Opportunity> = db
        .collection::<Opportunity>(OPPORTUNITIES)
        .find(doc! { "registrations.user": user_id })
        .sort(doc! { "createdAt": -1 })
        .await?
        .try_collect()
        .await?;
    opportunity_service::with_posters(db, opportunities).await
}

/// Registrations of one opportunity; only its poster may see them
pub async fn list_for_opportunity(db: &MongoDB, user_id: &str, opportunity_id: &str) -> AppResult<Vec<RegistrationResponse>> {
    let opportunity = opportunity_service::find(db, opportunity_id).await?;
    opportunity.ensure_owned_by(user_id)?;

    let users = user_service::summaries(db, opportunity.registrations.iter().map(|r| r.user.as_str())).await?;
    Ok(opportunity
        .registrations
        .into_iter()
        .map(|r| {
            let user = user_service::summary_of(&users, &r.user);
            RegistrationResponse::new(r, user)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        database::USERS,
        models::{OpportunityForm, User},
        services::mail_service::LogMailer,
    };
    use mongodb::bson::oid::ObjectId;

    async fn test_db() -> MongoDB {
        dotenv::dotenv().ok();
        let uri = std::env::var("DATABASE_URL").unwrap_or_else(|_| "mongodb://localhost:27017/nextgenwork_test".to_string());
        MongoDB::new(&uri).await.expect("MongoDB connection")
    }

    async fn insert_user(db: &MongoDB) -> User {
        let id = ObjectId::new();
        let user = User {
            id: Some(id),
            username: format!("reg-{}", id.to_hex()),
            email: format!("{}@example.com", id.to_hex()),
            password: None,
            google_id: None,
            bookmarks: Vec::new(),
            resource_bookmarks: Vec::new(),
            created_at: 1,
            updated_at: 1,
        };
        db.collection::<User>(USERS).insert_one(&user).await.unwrap();
        user
    }

    async fn insert_webinar(db: &MongoDB, posted_by: &str) -> String {
        let form = OpportunityForm {
            kind: Some("webinar".into()),
            title: Some("RustConf".into()),
            description: Some("Talks".into()),
            domain: Some("Systems".into()),
            date: Some("2030-01-10".into()),
            speaker: Some("Ferris".into()),
            ..Default::default()
        };
        let opportunity = Opportunity::from_form(&form, posted_by, None, None, 1).unwrap();
        let result = db
            .collection::<Opportunity>(OPPORTUNITIES)
            .insert_one(&opportunity)
            .await
            .unwrap();
        result.inserted_id.as_object_id().unwrap().to_hex()
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn test_second_registration_is_rejected() {
        let db = test_db().await;
        let user = insert_user(&db).await;
        let id = insert_webinar(&db, &user.id_hex()).await;
        let mailer: Arc<dyn Mailer> = Arc::new(LogMailer);
        let form = || RegistrationForm {
            name: Some("Ana".into()),
            ..Default::default()
        };

        register(&db, mailer.clone(), &user.id_hex(), &id, form()).await.unwrap();
        let err = register(&db, mailer, &user.id_hex(), &id, form()).await.unwrap_err();
        assert_eq!(err.to_string(), "Already registered");

        let stored = opportunity_service::find(&db, &id).await.unwrap();
        assert_eq!(stored.registrations.len(), 1);
        // No email in the form: the account's stored email is used
        assert_eq!(stored.registrations[0].email, user.email);

        let oid = parse_object_id(&id, "opportunity").unwrap();
        db.collection::<Opportunity>(OPPORTUNITIES).delete_one(doc! { "_id": oid }).await.unwrap();
        db.collection::<User>(USERS).delete_one(doc! { "_id": user.id.unwrap() }).await.unwrap();
    }
}
