use async_trait::async_trait;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials, AsyncSmtpTransport,
    AsyncTransport, Message, Tokio1Executor,
};

use crate::{
    config::SmtpConfig,
    models::{Opportunity, OpportunityKind},
    utils::{AppError, AppResult},
};

/// Outgoing mail. Shared as `web::Data<Arc<dyn Mailer>>`.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: String) -> AppResult<()>;
}

/// SMTP relay (Gmail by default) with STARTTLS
pub struct SmtpMailer {
    from: String,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> AppResult<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| AppError::Internal(format!("Invalid SMTP host '{}': {}", config.host, e)))?
            .credentials(Credentials::new(config.user.clone(), config.pass.clone()))
            .build();

        Ok(Self {
            from: config.user.clone(),
            transport,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, body: String) -> AppResult<()> {
        let message = Message::builder()
            .from(
                self.from
                    .parse()
                    .map_err(|e| AppError::Internal(format!("Invalid sender address: {}", e)))?,
            )
            .to(to
                .parse()
                .map_err(|e| AppError::BadRequest(format!("Invalid recipient address '{}': {}", to, e)))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| AppError::Internal(format!("Failed to build email: {}", e)))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| AppError::Upstream(format!("SMTP send failed: {}", e)))?;
        Ok(())
    }
}

/// Used when SMTP is not configured: mails are logged instead of sent
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, _body: String) -> AppResult<()> {
        log::info!("📧 SMTP not configured, skipping mail to {}: {}", to, subject);
        Ok(())
    }
}

fn or_na(value: Option<&str>) -> &str {
    value.unwrap_or("N/A")
}

/// Subject and body of the registration confirmation: the event's details,
/// its fee and the joining link
pub fn registration_confirmation(name: &str, opportunity: &Opportunity) -> (String, String) {
    let kind = opportunity.kind.as_str();
    let mut kind_label = kind.to_string();
    if let Some(first) = kind_label.get_mut(..1) {
        first.make_ascii_uppercase();
    }

    let mut lines = vec![
        format!("Hi {},", name),
        String::new(),
        format!("You have successfully registered for the {} \"{}\".", kind, opportunity.title),
        String::new(),
        format!("Title: {}", opportunity.title),
        format!("Type: {}", kind_label),
        format!("Date: {}", opportunity.date),
    ];
    match opportunity.kind {
        OpportunityKind::Webinar => {
            lines.push(format!("Speaker: {}", or_na(opportunity.speaker.as_deref())));
            lines.push(format!("Platform: {}", or_na(opportunity.platform.as_deref())));
            lines.push(format!("Date & Time: {}", or_na(opportunity.webinar_date_time.as_deref())));
        }
        OpportunityKind::Contest => {
            lines.push(format!("Organizer: {}", or_na(opportunity.organizer.as_deref())));
            lines.push(format!("Prize: {}", or_na(opportunity.prize.as_deref())));
            lines.push(format!("Date & Time: {}", or_na(opportunity.contest_date_time.as_deref())));
        }
        OpportunityKind::Job => {}
    }
    if opportunity.registration_fee > 0.0 {
        lines.push(format!("Registration Fee: ₹{}", opportunity.registration_fee));
    } else {
        lines.push("Registration Fee: Free".to_string());
    }
    lines.push(format!(
        "Joining/Details Link: {}",
        or_na(opportunity.external_link.as_deref())
    ));
    lines.push(String::new());
    lines.push("Thank you!".to_string());
    lines.push("NextGenWork".to_string());

    (format!("Registration Confirmation: {}", opportunity.title), lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OpportunityForm;
    use std::sync::{Arc, Mutex};

    fn event(kind: &str, fee: &str) -> Opportunity {
        let form = OpportunityForm {
            kind: Some(kind.into()),
            title: Some("RustConf".into()),
            description: Some("Talks".into()),
            domain: Some("Systems".into()),
            date: Some("2030-01-10".into()),
            speaker: Some("Ferris".into()),
            webinar_date_time: Some("Jan 10, 6pm IST".into()),
            organizer: Some("GDG".into()),
            registration_fee: Some(fee.into()),
            external_link: Some("https://meet.example.com/rust".into()),
            ..Default::default()
        };
        Opportunity::from_form(&form, "65f1c2a9e4b0a1b2c3d4e5f6", None, None, 1).unwrap()
    }

    #[test]
    fn test_webinar_confirmation_lists_details() {
        let webinar = event("webinar", "0");
        let (subject, body) = registration_confirmation("Ana", &webinar);
        assert_eq!(subject, "Registration Confirmation: RustConf");
        assert!(body.starts_with("Hi Ana,"));
        assert!(body.contains("webinar \"RustConf\""));
        assert!(body.contains("Type: Webinar"));
        assert!(body.contains(&format!("Date: {}", webinar.date)));
        assert!(body.contains("Speaker: Ferris"));
        assert!(body.contains("Platform: N/A"));
        assert!(body.contains("Date & Time: Jan 10, 6pm IST"));
        assert!(body.contains("Registration Fee: Free"));
        assert!(body.contains("Joining/Details Link: https://meet.example.com/rust"));
        assert!(!body.contains("Organizer"));
    }

    #[test]
    fn test_contest_confirmation_shows_fee() {
        let mut contest = event("contest", "199");
        contest.external_link = None;
        let (_, body) = registration_confirmation("Ana", &contest);
        assert!(body.contains("Type: Contest"));
        assert!(body.contains("Organizer: GDG"));
        assert!(body.contains("Prize: N/A"));
        assert!(body.contains("Date & Time: N/A"));
        assert!(body.contains("Registration Fee: ₹199"));
        assert!(body.contains("Joining/Details Link: N/A"));
        assert!(!body.contains("Speaker"));
    }

    struct Recorder(Mutex<Vec<String>>);

    #[async_trait]
    impl Mailer for Recorder {
        async fn send(&self, to: &str, _subject: &str, _body: String) -> AppResult<()> {
            self.0.lock().unwrap().push(to.to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_mailer_is_object_safe() {
        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        let mailer: Arc<dyn Mailer> = recorder.clone();
        mailer.send("ana@example.com", "s", "b".into()).await.unwrap();
        LogMailer.send("bob@example.com", "s", "b".into()).await.unwrap();
        assert_eq!(*recorder.0.lock().unwrap(), vec!["ana@example.com".to_string()]);
    }

    #[test]
    fn test_smtp_mailer_builds_without_connecting() {
        let config = SmtpConfig {
            host: "smtp.gmail.com".into(),
            user: "bot@example.com".into(),
            pass: "secret".into(),
        };
        assert!(SmtpMailer::new(&config).is_ok());
    }
}
