use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// SMTP settings. When `host` is unset the mailer falls back to logging the
/// message instead of sending it (dev mode).
#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: Option<String>,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResetConfig {
    pub ttl_minutes: i64,
    /// Base of the link mailed to the user; the raw secret is appended as the
    /// final path segment.
    pub url_base: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    pub dir: String,
    pub max_file_size: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub smtp: SmtpConfig,
    pub reset: ResetConfig,
    pub upload: UploadConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "jobdesk".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "jobdesk-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24 * 7),
        };
        let smtp = SmtpConfig {
            host: std::env::var("SMTP_HOST").ok(),
            port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(587),
            username: std::env::var("SMTP_USERNAME").ok(),
            password: std::env::var("SMTP_PASSWORD").ok(),
            from: std::env::var("SMTP_FROM").unwrap_or_else(|_| "noreply@jobdesk.local".into()),
        };
        let reset = ResetConfig {
            ttl_minutes: std::env::var("RESET_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(30),
            url_base: std::env::var("RESET_URL_BASE")
                .unwrap_or_else(|_| "http://localhost:8080/api/v1/password/reset".into()),
        };
        let upload = UploadConfig {
            dir: std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "./public/uploads".into()),
            max_file_size: std::env::var("MAX_FILE_SIZE")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(2 * 1024 * 1024),
        };
        Ok(Self {
            database_url,
            jwt,
            smtp,
            reset,
            upload,
        })
    }
}
