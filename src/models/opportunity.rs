use std::collections::HashMap;

use mongodb::bson::{doc, oid::ObjectId, Document};
use serde::{Deserialize, Serialize};

use super::{Owned, UserSummary};
use crate::utils::{escape_regex, non_blank, normalize_date, require, split_tags, AppError, AppResult};

/// Discriminator of an opportunity; decides which optional fields exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OpportunityKind {
    #[default]
    Job,
    Contest,
    Webinar,
}

impl OpportunityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpportunityKind::Job => "job",
            OpportunityKind::Contest => "contest",
            OpportunityKind::Webinar => "webinar",
        }
    }

    pub fn parse(raw: &str) -> AppResult<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "job" => Ok(OpportunityKind::Job),
            "contest" => Ok(OpportunityKind::Contest),
            "webinar" => Ok(OpportunityKind::Webinar),
            other => Err(AppError::BadRequest(format!(
                "Invalid opportunity type: {}. Supported: job, contest, webinar",
                other
            ))),
        }
    }

    /// Contests and webinars take registrations, jobs take applications
    pub fn accepts_registrations(&self) -> bool {
        !matches!(self, OpportunityKind::Job)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum JobType {
    FullTime,
    PartTime,
}

impl JobType {
    pub fn parse(raw: &str) -> AppResult<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "full-time" => Ok(JobType::FullTime),
            "part-time" => Ok(JobType::PartTime),
            other => Err(AppError::BadRequest(format!(
                "Invalid job type: {}. Supported: full-time, part-time",
                other
            ))),
        }
    }
}

/// A user's sign-up for a contest or webinar, embedded in the opportunity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub user: String,
    pub name: String,
    #[serde(default)]
    pub college: Option<String>,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub mobile: Option<String>,
    #[serde(default)]
    pub payment_id: Option<String>,
    #[serde(default)]
    pub paid: bool,
    #[serde(default)]
    pub registered_at: i64,
}

/// Stored opportunity document (`opportunities` collection)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Opportunity {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    #[serde(rename = "type", default)]
    pub kind: OpportunityKind,
    pub title: String,
    pub description: String,
    pub domain: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pic: Option<String>,

    // job
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_type: Option<JobType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_info: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_deadline: Option<String>,

    // contest
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organizer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prize: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contest_date_time: Option<String>,

    // webinar
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webinar_date_time: Option<String>,

    #[serde(default)]
    pub registration_fee: f64,
    #[serde(default)]
    pub registrations: Vec<Registration>,

    pub posted_by: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Owned for Opportunity {
    fn owner_id(&self) -> &str {
        &self.posted_by
    }
}

/// Text fields of the create/update form. Everything is optional here;
/// which fields are required depends on the operation and the type.
#[derive(Debug, Default, Clone, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OpportunityForm {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub job_type: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub domain: Option<String>,
    pub tags: Option<Vec<String>>,
    pub date: Option<String>,
    pub external_link: Option<String>,
    pub salary: Option<String>,
    pub company_name: Option<String>,
    pub company_address: Option<String>,
    pub contact_info: Option<String>,
    pub application_deadline: Option<String>,
    pub organizer: Option<String>,
    pub prize: Option<String>,
    pub contest_date_time: Option<String>,
    pub speaker: Option<String>,
    pub platform: Option<String>,
    pub webinar_date_time: Option<String>,
    pub registration_fee: Option<String>,
}

impl OpportunityForm {
    /// Builds the form from multipart text parts. `tags` may come as one
    /// comma separated value or as repeated parts.
    pub fn from_fields(fields: &HashMap<String, Vec<String>>) -> Self {
        let one = |key: &str| fields.get(key).and_then(|values| values.last()).cloned();

        let tags = fields
            .get("tags")
            .or_else(|| fields.get("tags[]"))
            .map(|values| values.iter().flat_map(|v| split_tags(v)).collect::<Vec<_>>());

        OpportunityForm {
            kind: one("type"),
            job_type: one("jobType"),
            title: one("title"),
            description: one("description"),
            domain: one("domain"),
            tags,
            date: one("date"),
            external_link: one("externalLink"),
            salary: one("salary"),
            company_name: one("companyName"),
            company_address: one("companyAddress"),
            contact_info: one("contactInfo"),
            application_deadline: one("applicationDeadline"),
            organizer: one("organizer"),
            prize: one("prize"),
            contest_date_time: one("contestDateTime"),
            speaker: one("speaker"),
            platform: one("platform"),
            webinar_date_time: one("webinarDateTime"),
            registration_fee: one("registrationFee"),
        }
    }

    fn parsed_kind(&self) -> AppResult<Option<OpportunityKind>> {
        non_blank(self.kind.as_deref())
            .map(|k| OpportunityKind::parse(&k))
            .transpose()
    }
}

fn parse_fee(raw: &str) -> AppResult<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(0.0);
    }
    match raw.parse::<f64>() {
        Ok(fee) if fee.is_finite() && fee >= 0.0 => Ok(fee),
        _ => Err(AppError::BadRequest(
            "Registration fee must be a non-negative number.".to_string(),
        )),
    }
}

/// New value if provided and non-blank, otherwise the old one
fn merge(new: Option<&str>, old: Option<String>) -> Option<String> {
    non_blank(new).or(old)
}

impl Opportunity {
    /// Validates a create form and builds the document. Fields that do not
    /// belong to the chosen type are dropped.
    pub fn from_form(
        form: &OpportunityForm,
        posted_by: &str,
        logo: Option<String>,
        pic: Option<String>,
        now: i64,
    ) -> AppResult<Self> {
        let kind = form.parsed_kind()?.unwrap_or_default();

        let application_deadline = match (kind, non_blank(form.application_deadline.as_deref())) {
            (OpportunityKind::Job, None) => {
                return Err(AppError::BadRequest(
                    "Application Deadline is required for jobs.".to_string(),
                ))
            }
            (OpportunityKind::Job, Some(raw)) => Some(normalize_date(&raw, "Application Deadline")?),
            _ => None,
        };

        let job_type = match kind {
            OpportunityKind::Job => Some(JobType::parse(&require(form.job_type.as_deref(), "Job type")?)?),
            _ => None,
        };

        let date = normalize_date(&require(form.date.as_deref(), "Date")?, "Date")?;

        let registration_fee = match (kind.accepts_registrations(), form.registration_fee.as_deref()) {
            (true, Some(raw)) => parse_fee(raw)?,
            _ => 0.0,
        };

        let mut opportunity = Opportunity {
            id: None,
            kind,
            title: require(form.title.as_deref(), "Title")?,
            description: require(form.description.as_deref(), "Description")?,
            domain: require(form.domain.as_deref(), "Domain")?,
            tags: form.tags.clone().unwrap_or_default(),
            date,
            external_link: non_blank(form.external_link.as_deref()),
            logo,
            pic,
            job_type,
            salary: non_blank(form.salary.as_deref()),
            company_name: non_blank(form.company_name.as_deref()),
            company_address: non_blank(form.company_address.as_deref()),
            contact_info: non_blank(form.contact_info.as_deref()),
            application_deadline,
            organizer: non_blank(form.organizer.as_deref()),
            prize: non_blank(form.prize.as_deref()),
            contest_date_time: non_blank(form.contest_date_time.as_deref()),
            speaker: non_blank(form.speaker.as_deref()),
            platform: non_blank(form.platform.as_deref()),
            webinar_date_time: non_blank(form.webinar_date_time.as_deref()),
            registration_fee,
            registrations: Vec::new(),
            posted_by: posted_by.to_string(),
            created_at: now,
            updated_at: now,
        };
        opportunity.drop_foreign_fields();

        Ok(opportunity)
    }

    /// Partial update. The type may change; afterwards only the fields of
    /// the resulting type survive. New logo/pic paths replace the old ones.
    pub fn apply_update(
        &mut self,
        form: &OpportunityForm,
        logo: Option<String>,
        pic: Option<String>,
        now: i64,
    ) -> AppResult<()> {
        let kind = form.parsed_kind()?.unwrap_or(self.kind);

        let application_deadline = match non_blank(form.application_deadline.as_deref()) {
            Some(raw) if kind == OpportunityKind::Job => Some(normalize_date(&raw, "Application Deadline")?),
            _ => self.application_deadline.clone(),
        };
        if kind == OpportunityKind::Job && application_deadline.is_none() {
            return Err(AppError::BadRequest(
                "Application Deadline is required for jobs.".to_string(),
            ));
        }

        let job_type = match (kind, non_blank(form.job_type.as_deref())) {
            (OpportunityKind::Job, Some(raw)) => Some(JobType::parse(&raw)?),
            (OpportunityKind::Job, None) => Some(
                self.job_type
                    .ok_or_else(|| AppError::BadRequest("Job type is required.".to_string()))?,
            ),
            _ => None,
        };

        let date = match non_blank(form.date.as_deref()) {
            Some(raw) => normalize_date(&raw, "Date")?,
            None => self.date.clone(),
        };

        if kind.accepts_registrations() {
            if let Some(raw) = form.registration_fee.as_deref() {
                self.registration_fee = parse_fee(raw)?;
            }
        } else {
            self.registration_fee = 0.0;
        }

        self.kind = kind;
        self.job_type = job_type;
        self.application_deadline = application_deadline;
        self.date = date;
        self.title = merge(form.title.as_deref(), Some(self.title.clone())).unwrap_or_default();
        self.description = merge(form.description.as_deref(), Some(self.description.clone())).unwrap_or_default();
        self.domain = merge(form.domain.as_deref(), Some(self.domain.clone())).unwrap_or_default();
        if let Some(tags) = &form.tags {
            self.tags = tags.clone();
        }
        self.external_link = merge(form.external_link.as_deref(), self.external_link.take());
        self.salary = merge(form.salary.as_deref(), self.salary.take());
        self.company_name = merge(form.company_name.as_deref(), self.company_name.take());
        self.company_address = merge(form.company_address.as_deref(), self.company_address.take());
        self.contact_info = merge(form.contact_info.as_deref(), self.contact_info.take());
        self.organizer = merge(form.organizer.as_deref(), self.organizer.take());
        self.prize = merge(form.prize.as_deref(), self.prize.take());
        self.speaker = merge(form.speaker.as_deref(), self.speaker.take());
        self.platform = merge(form.platform.as_deref(), self.platform.take());
        if let Some(raw) = form.contest_date_time.as_deref() {
            self.contest_date_time = non_blank(Some(raw));
        }
        if let Some(raw) = form.webinar_date_time.as_deref() {
            self.webinar_date_time = non_blank(Some(raw));
        }
        if logo.is_some() {
            self.logo = logo;
        }
        if pic.is_some() {
            self.pic = pic;
        }

        self.drop_foreign_fields();
        self.updated_at = now;
        Ok(())
    }

    /// Clears every field that belongs to another opportunity type
    fn drop_foreign_fields(&mut self) {
        if self.kind != OpportunityKind::Job {
            self.job_type = None;
            self.salary = None;
            self.company_name = None;
            self.company_address = None;
            self.contact_info = None;
            self.application_deadline = None;
        }
        if self.kind != OpportunityKind::Contest {
            self.organizer = None;
            self.prize = None;
            self.contest_date_time = None;
        }
        if self.kind != OpportunityKind::Webinar {
            self.speaker = None;
            self.platform = None;
            self.webinar_date_time = None;
        }
        if !self.kind.accepts_registrations() {
            self.registration_fee = 0.0;
        }
    }

    pub fn is_registered(&self, user_id: &str) -> bool {
        self.registrations.iter().any(|r| r.user == user_id)
    }

    /// Builds the caller's registration from `form` after checking it may be
    /// added: contests/webinars only, one per user, and paid events need a
    /// payment reference. A paid event's registration is always marked paid.
    pub fn new_registration(
        &self,
        form: RegistrationForm,
        user_id: &str,
        fallback_email: &str,
        now: i64,
    ) -> AppResult<Registration> {
        let mut registration = form.into_registration(user_id, fallback_email, now)?;
        self.check_registration(&registration)?;
        if self.registration_fee > 0.0 {
            registration.paid = true;
        }
        Ok(registration)
    }

    fn check_registration(&self, registration: &Registration) -> AppResult<()> {
        if !self.kind.accepts_registrations() {
            return Err(AppError::BadRequest(
                "Jobs accept applications, not registrations".to_string(),
            ));
        }
        if self.is_registered(&registration.user) {
            return Err(AppError::BadRequest("Already registered".to_string()));
        }
        if self.registration_fee > 0.0 && registration.payment_id.is_none() {
            return Err(AppError::PaymentRequired(
                "Payment is required for this registration".to_string(),
            ));
        }
        Ok(())
    }
}

/// Body of `POST /registrations/{id}/register`
#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationForm {
    pub name: Option<String>,
    pub college: Option<String>,
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub payment_id: Option<String>,
    pub paid: Option<bool>,
}

impl RegistrationForm {
    /// `fallback_email` is the caller's account email, used when the form has none
    pub fn into_registration(self, user_id: &str, fallback_email: &str, now: i64) -> AppResult<Registration> {
        let payment_id = non_blank(self.payment_id.as_deref());
        Ok(Registration {
            user: user_id.to_string(),
            name: require(self.name.as_deref(), "Name")?,
            college: non_blank(self.college.as_deref()),
            email: non_blank(self.email.as_deref()).unwrap_or_else(|| fallback_email.to_string()),
            mobile: non_blank(self.mobile.as_deref()),
            paid: payment_id.is_some() && self.paid.unwrap_or(true),
            payment_id,
            registered_at: now,
        })
    }
}

/// Query string of `GET /opportunities`
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct OpportunityQuery {
    pub domain: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Type-dependent "third field": company (job), organizer (contest), speaker (webinar)
    pub company_name: Option<String>,
    pub organizer: Option<String>,
    pub speaker: Option<String>,
    pub search: Option<String>,
}

fn contains_ci(value: &str) -> Document {
    doc! { "$regex": escape_regex(value), "$options": "i" }
}

impl OpportunityQuery {
    pub fn to_filter(&self) -> AppResult<Document> {
        let kind = non_blank(self.kind.as_deref())
            .map(|k| OpportunityKind::parse(&k))
            .transpose()?;

        let mut filter = Document::new();

        if let Some(domain) = non_blank(self.domain.as_deref()) {
            filter.insert("domain", contains_ci(&domain));
        }

        if let Some(third) = non_blank(self.company_name.as_deref()) {
            match kind {
                None => {
                    filter.insert(
                        "$or",
                        vec![
                            doc! { "companyName": contains_ci(&third) },
                            doc! { "organizer": contains_ci(&third) },
                            doc! { "speaker": contains_ci(&third) },
                        ],
                    );
                }
                Some(OpportunityKind::Job) => {
                    filter.insert("companyName", contains_ci(&third));
                }
                Some(OpportunityKind::Contest) => {
                    filter.insert("organizer", contains_ci(&third));
                }
                Some(OpportunityKind::Webinar) => {
                    filter.insert("speaker", contains_ci(&third));
                }
            }
        }

        if let (Some(organizer), Some(OpportunityKind::Contest)) = (non_blank(self.organizer.as_deref()), kind) {
            filter.insert("organizer", contains_ci(&organizer));
        }
        if let (Some(speaker), Some(OpportunityKind::Webinar)) = (non_blank(self.speaker.as_deref()), kind) {
            filter.insert("speaker", contains_ci(&speaker));
        }
        if let Some(search) = non_blank(self.search.as_deref()) {
            filter.insert("title", contains_ci(&search));
        }
        if let Some(kind) = kind {
            filter.insert("type", kind.as_str());
        }

        Ok(filter)
    }
}

/// Opportunity as returned by the API, with its poster resolved
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OpportunityResponse {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: OpportunityKind,
    pub title: String,
    pub description: String,
    pub domain: String,
    pub tags: Vec<String>,
    pub date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_type: Option<JobType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_info: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_deadline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organizer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prize: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contest_date_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webinar_date_time: Option<String>,
    pub registration_fee: f64,
    pub registration_count: usize,
    pub posted_by: UserSummary,
    pub created_at: i64,
    pub updated_at: i64,
}

impl OpportunityResponse {
    pub fn new(o: Opportunity, posted_by: UserSummary) -> Self {
        OpportunityResponse {
            id: o.id.map(|id| id.to_hex()).unwrap_or_default(),
            kind: o.kind,
            title: o.title,
            description: o.description,
            domain: o.domain,
            tags: o.tags,
            date: o.date,
            external_link: o.external_link,
            logo: o.logo,
            pic: o.pic,
            job_type: o.job_type,
            salary: o.salary,
            company_name: o.company_name,
            company_address: o.company_address,
            contact_info: o.contact_info,
            application_deadline: o.application_deadline,
            organizer: o.organizer,
            prize: o.prize,
            contest_date_time: o.contest_date_time,
            speaker: o.speaker,
            platform: o.platform,
            webinar_date_time: o.webinar_date_time,
            registration_fee: o.registration_fee,
            registration_count: o.registrations.len(),
            posted_by,
            created_at: o.created_at,
            updated_at: o.updated_at,
        }
    }
}

/// One registration as shown to the opportunity owner
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationResponse {
    pub user: UserSummary,
    pub name: String,
    pub college: Option<String>,
    pub email: String,
    pub mobile: Option<String>,
    pub payment_id: Option<String>,
    pub paid: bool,
    pub registered_at: i64,
}

impl RegistrationResponse {
    pub fn new(r: Registration, user: UserSummary) -> Self {
        RegistrationResponse {
            user,
            name: r.name,
            college: r.college,
            email: r.email,
            mobile: r.mobile,
            payment_id: r.payment_id,
            paid: r.paid,
            registered_at: r.registered_at,
        }
    }
}
