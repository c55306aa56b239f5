use std::env;
use std::path::PathBuf;

/// Google OAuth client credentials
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

/// Razorpay API key pair
#[derive(Debug, Clone)]
pub struct RazorpayConfig {
    pub key_id: String,
    pub key_secret: String,
}

/// SMTP account used for confirmation mails
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub user: String,
    pub pass: String,
}

/// Runtime configuration, read once from the environment at startup.
///
/// Optional integrations (Google, Razorpay, SMTP) are `None` when their
/// variables are missing; the matching endpoints then answer 503 and the
/// mailer only logs.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub frontend_url: String,
    pub public_base_url: String,
    pub upload_dir: PathBuf,
    pub google: Option<GoogleConfig>,
    pub razorpay: Option<RazorpayConfig>,
    pub smtp: Option<SmtpConfig>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup (the environment in production)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = var("DATABASE_URL").ok_or_else(|| "DATABASE_URL must be set".to_string())?;

        let port = match var("PORT") {
            Some(p) => p.parse::<u16>().map_err(|e| format!("Invalid PORT '{}': {}", p, e))?,
            None => 5000,
        };

        let public_base_url = var("PUBLIC_BASE_URL").unwrap_or_else(|| format!("http://localhost:{}", port));

        let google = match (var("GOOGLE_CLIENT_ID"), var("GOOGLE_CLIENT_SECRET")) {
            (Some(client_id), Some(client_secret)) => Some(GoogleConfig {
                client_id,
                client_secret,
                redirect_uri: var("GOOGLE_REDIRECT_URI")
                    .unwrap_or_else(|| format!("{}/api/auth/google/callback", public_base_url)),
            }),
            _ => None,
        };

        let razorpay = match (var("RAZORPAY_KEY_ID"), var("RAZORPAY_KEY_SECRET")) {
            (Some(key_id), Some(key_secret)) => Some(RazorpayConfig { key_id, key_secret }),
            _ => None,
        };

        let smtp = match (var("EMAIL_USER"), var("EMAIL_PASS")) {
            (Some(user), Some(pass)) => Some(SmtpConfig {
                host: var("SMTP_HOST").unwrap_or_else(|| "smtp.gmail.com".to_string()),
                user,
                pass,
            }),
            _ => None,
        };

        Ok(Self {
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            database_url,
            frontend_url: var("FRONTEND_URL")
                .unwrap_or_else(|| "http://localhost:3000".to_string())
                .trim_end_matches('/')
                .to_string(),
            public_base_url,
            upload_dir: PathBuf::from(var("UPLOAD_DIR").unwrap_or_else(|| "./storage".to_string())),
            google,
            razorpay,
            smtp,
        })
    }

    /// Directory served under `/public` (logos and pictures)
    pub fn public_dir(&self) -> PathBuf {
        self.upload_dir.join("public")
    }

    /// Directory holding resumes; never served statically
    pub fn resume_dir(&self) -> PathBuf {
        self.upload_dir.join("resumes")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_apply() {
        let config = AppConfig::from_lookup(lookup(&[("DATABASE_URL", "mongodb://localhost/hub")])).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 5000);
        assert_eq!(config.frontend_url, "http://localhost:3000");
        assert_eq!(config.public_dir(), PathBuf::from("./storage/public"));
        assert!(config.google.is_none());
        assert!(config.razorpay.is_none());
        assert!(config.smtp.is_none());
    }

    #[test]
    fn test_database_url_required() {
        assert!(AppConfig::from_lookup(lookup(&[])).is_err());
        assert!(AppConfig::from_lookup(lookup(&[("DATABASE_URL", "  ")])).is_err());
    }

    #[test]
    fn test_invalid_port_rejected() {
        let result = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "mongodb://localhost/hub"),
            ("PORT", "eighty"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn test_integrations_need_both_keys() {
        let config = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "mongodb://localhost/hub"),
            ("GOOGLE_CLIENT_ID", "id"),
            ("RAZORPAY_KEY_ID", "rzp_test"),
            ("RAZORPAY_KEY_SECRET", "secret"),
            ("EMAIL_USER", "bot@example.com"),
            ("EMAIL_PASS", "pw"),
            ("FRONTEND_URL", "https://board.example.com/"),
        ]))
        .unwrap();

        assert!(config.google.is_none());
        assert_eq!(config.razorpay.unwrap().key_id, "rzp_test");
        assert_eq!(config.smtp.unwrap().host, "smtp.gmail.com");
        assert_eq!(config.frontend_url, "https://board.example.com");
    }

    #[test]
    fn test_google_redirect_defaults_to_public_base() {
        let config = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "mongodb://localhost/hub"),
            ("PORT", "8080"),
            ("GOOGLE_CLIENT_ID", "id"),
            ("GOOGLE_CLIENT_SECRET", "secret"),
        ]))
        .unwrap();

        let google = config.google.unwrap();
        assert_eq!(google.redirect_uri, "http://localhost:8080/api/auth/google/callback");
    }
}
