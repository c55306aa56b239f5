use chrono::{DateTime, Utc};
use mongodb::bson::{doc, Document};

use crate::{
    database::{MongoDB, OPPORTUNITIES},
    models::OpportunityKind,
    utils::{format_utc, AppResult},
};

/// Webinars whose date lies before `now`
fn past_webinars_filter(now: DateTime<Utc>) -> Document {
    doc! {
        "type": OpportunityKind::Webinar.as_str(),
        "date": { "$lt": format_utc(now) },
    }
}

/// Deletes webinars that already took place. Returns how many were removed.
pub async fn clear_past_webinars(db: &MongoDB) -> AppResult<u64> {
    let result = db
        .collection::<Document>(OPPORTUNITIES)
        .delete_many(past_webinars_filter(Utc::now()))
        .await?;

    Ok(result.deleted_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_filter_targets_webinars_before_now() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let filter = past_webinars_filter(now);

        assert_eq!(filter.get_str("type").unwrap(), "webinar");
        let date = filter.get_document("date").unwrap();
        assert_eq!(date.get_str("$lt").unwrap(), "2026-03-01T12:00:00Z");
    }
}
