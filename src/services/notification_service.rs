use std::collections::HashMap;

use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId};

use crate::{
    database::{MongoDB, NOTIFICATIONS, OPPORTUNITIES, RESOURCES},
    models::{Notification, NotificationOpportunityRef, NotificationResourceRef, NotificationResponse, Opportunity, Resource},
    utils::{now_millis, parse_object_id, AppError, AppResult},
};

/// Records a notification. Failures are logged and swallowed: the action
/// that triggered it has already succeeded.
pub async fn notify(db: &MongoDB, message: String, opportunity: Option<String>, resource: Option<String>) {
    let notification = Notification::new(message, opportunity, resource, now_millis());
    match db.collection::<Notification>(NOTIFICATIONS).insert_one(&notification).await {
        Ok(_) => log::info!("🔔 Notification created: {}", notification.message),
        Err(e) => log::warn!("⚠️  Failed to create notification '{}': {}", notification.message, e),
    }
}

fn object_ids<'a>(ids: impl Iterator<Item = &'a String>) -> Vec<ObjectId> {
    let mut oids: Vec<ObjectId> = ids.filter_map(|id| ObjectId::parse_str(id).ok()).collect();
    oids.sort();
    oids.dedup();
    oids
}

/// All notifications, newest first, with the caller's read flag and
/// summaries of the opportunity/resource they point to (if still present)
pub async fn list(db: &MongoDB, viewer: &str) -> AppResult<Vec<NotificationResponse>> {
    let notifications: Vec<Notification> = db
        .collection::<Notification>(NOTIFICATIONS)
        .find(doc! {})
        .sort(doc! { "createdAt": -1 })
        .await?
        .try_collect()
        .await?;

    let opportunity_ids = object_ids(notifications.iter().filter_map(|n| n.opportunity.as_ref()));
    let resource_ids = object_ids(notifications.iter().filter_map(|n| n.resource.as_ref()));

    let mut opportunities: HashMap<String, NotificationOpportunityRef> = HashMap::new();
    if !opportunity_ids.is_empty() {
        let found: Vec<Opportunity> = db
            .collection::<Opportunity>(OPPORTUNITIES)
            .find(doc! { "_id": { "$in": opportunity_ids } })
            .await?
            .try_collect()
            .await?;
        for o in found {
            let id = o.id.map(|id| id.to_hex()).unwrap_or_default();
            opportunities.insert(
                id.clone(),
                NotificationOpportunityRef {
                    id,
                    title: o.title,
                    kind: o.kind.as_str().to_string(),
                },
            );
        }
    }

    let mut resources: HashMap<String, NotificationResourceRef> = HashMap::new();
    if !resource_ids.is_empty() {
        let found: Vec<Resource> = db
            .collection::<Resource>(RESOURCES)
            .find(doc! { "_id": { "$in": resource_ids } })
            .await?
            .try_collect()
            .await?;
        for r in found {
            let id = r.id.map(|id| id.to_hex()).unwrap_or_default();
            resources.insert(
                id.clone(),
                NotificationResourceRef {
                    id,
                    title: r.title,
                    domain: r.domain,
                },
            );
        }
    }

    Ok(notifications
        .into_iter()
        .map(|n| {
            let opportunity = n.opportunity.as_ref().and_then(|id| opportunities.get(id)).cloned();
            let resource = n.resource.as_ref().and_then(|id| resources.get(id)).cloned();
            NotificationResponse::new(n, viewer, opportunity, resource)
        })
        .collect())
}

/// Adds the caller to `readBy`; marking twice is a no-op
pub async fn mark_read(db: &MongoDB, id: &str, user_id: &str) -> AppResult<()> {
    let oid = parse_object_id(id, "notification")?;
    let result = db
        .collection::<Notification>(NOTIFICATIONS)
        .update_one(doc! { "_id": oid }, doc! { "$addToSet": { "readBy": user_id } })
        .await?;

    if result.matched_count == 0 {
        return Err(AppError::NotFound("Notification not found".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_ids_skip_invalid_and_dedupe() {
        let ids = vec![
            "65f1c2a9e4b0a1b2c3d4e5f6".to_string(),
            "bogus".to_string(),
            "65f1c2a9e4b0a1b2c3d4e5f6".to_string(),
        ];
        assert_eq!(object_ids(ids.iter()).len(), 1);
    }
}
