use std::cmp::Ordering;

use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use super::Owned;
use crate::utils::{non_blank, require, AppError, AppResult};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, utoipa::ToSchema)]
pub struct ResourceLink {
    #[serde(rename = "type")]
    pub kind: String,
    pub link: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    pub user_id: String,
    pub rating: u8,
}

/// Learning resource (`resources` collection)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub domain: String,
    #[serde(default)]
    pub resource_links: Vec<ResourceLink>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub user_id: String,
    #[serde(default)]
    pub ratings: Vec<Rating>,
    #[serde(default)]
    pub views: i64,
    pub created_at: i64,
}

impl Owned for Resource {
    fn owner_id(&self) -> &str {
        &self.user_id
    }
}

pub fn validate_rating(rating: i64) -> AppResult<u8> {
    if (1..=5).contains(&rating) {
        Ok(rating as u8)
    } else {
        Err(AppError::BadRequest("Invalid rating".to_string()))
    }
}

fn clean_links(links: Vec<ResourceLink>) -> AppResult<Vec<ResourceLink>> {
    links
        .into_iter()
        .map(|l| {
            Ok(ResourceLink {
                kind: require(Some(l.kind.as_str()), "Link type")?,
                link: require(Some(l.link.as_str()), "Link")?,
            })
        })
        .collect()
}

impl Resource {
    pub fn from_request(request: ResourceRequest, user_id: &str, now: i64) -> AppResult<Self> {
        Ok(Resource {
            id: None,
            title: require(request.title.as_deref(), "Title")?,
            description: non_blank(request.description.as_deref()),
            domain: require(request.domain.as_deref(), "Domain")?,
            resource_links: clean_links(request.resource_links.unwrap_or_default())?,
            tags: request.tags.unwrap_or_default(),
            user_id: user_id.to_string(),
            ratings: Vec::new(),
            views: 0,
            created_at: now,
        })
    }

    /// Non-blank fields overwrite, the rest is kept
    pub fn apply_update(&mut self, request: ResourceRequest) -> AppResult<()> {
        let links = request.resource_links.map(clean_links).transpose()?;

        if let Some(title) = non_blank(request.title.as_deref()) {
            self.title = title;
        }
        if let Some(description) = non_blank(request.description.as_deref()) {
            self.description = Some(description);
        }
        if let Some(domain) = non_blank(request.domain.as_deref()) {
            self.domain = domain;
        }
        if let Some(links) = links {
            self.resource_links = links;
        }
        if let Some(tags) = request.tags {
            self.tags = tags;
        }
        Ok(())
    }

    pub fn average_rating(&self) -> f64 {
        if self.ratings.is_empty() {
            return 0.0;
        }
        let sum: u32 = self.ratings.iter().map(|r| r.rating as u32).sum();
        sum as f64 / self.ratings.len() as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceSort {
    #[default]
    Newest,
    TopRated,
    MostViewed,
}

/// Orders resources in place; ties fall back to newest first
pub fn sort_resources(resources: &mut [Resource], sort: ResourceSort) {
    let newest = |a: &Resource, b: &Resource| b.created_at.cmp(&a.created_at);
    match sort {
        ResourceSort::Newest => resources.sort_by(newest),
        ResourceSort::TopRated => resources.sort_by(|a, b| {
            b.average_rating()
                .partial_cmp(&a.average_rating())
                .unwrap_or(Ordering::Equal)
                .then_with(|| newest(a, b))
        }),
        ResourceSort::MostViewed => resources.sort_by(|a, b| b.views.cmp(&a.views).then_with(|| newest(a, b))),
    }
}

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ResourceListQuery {
    pub sort: Option<ResourceSort>,
}

/// Create/update body; on update every field is optional
#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub domain: Option<String>,
    pub resource_links: Option<Vec<ResourceLink>>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RateRequest {
    pub rating: i64,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResourceResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub domain: String,
    pub resource_links: Vec<ResourceLink>,
    pub tags: Vec<String>,
    pub user_id: String,
    pub ratings: Vec<Rating>,
    pub average_rating: f64,
    pub views: i64,
    pub created_at: i64,
}

impl From<Resource> for ResourceResponse {
    fn from(r: Resource) -> Self {
        ResourceResponse {
            average_rating: r.average_rating(),
            id: r.id.map(|id| id.to_hex()).unwrap_or_default(),
            title: r.title,
            description: r.description,
            domain: r.domain,
            resource_links: r.resource_links,
            tags: r.tags,
            user_id: r.user_id,
            ratings: r.ratings,
            views: r.views,
            created_at: r.created_at,
        }
    }
}
