use chrono::FixedOffset;
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

/// Largest accepted trend offset, in minutes either side of UTC.
const MAX_TREND_OFFSET_MINUTES: i32 = 18 * 60;

const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub admin: AdminConfig,
    pub moderation: ModerationConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .or_else(|_| env::var("PORT"))
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let log_format = match env::var("APP_LOG_FORMAT") {
            Ok(raw) => {
                LogFormat::parse(&raw).ok_or(ConfigError::InvalidLogFormat { value: raw })?
            }
            Err(_) => LogFormat::Compact,
        };

        let admin = AdminConfig {
            password: non_empty_var("ADMIN_PASSWORD"),
        };

        let notify_on_submit = match env::var("NOTIFY_ON_SUBMIT") {
            Ok(raw) => parse_flag(&raw).ok_or(ConfigError::InvalidFlag {
                name: "NOTIFY_ON_SUBMIT",
                value: raw,
            })?,
            Err(_) => false,
        };

        let sender_email = non_empty_var("EMAIL_USER");
        let smtp = match (sender_email.clone(), non_empty_var("EMAIL_PASS")) {
            (Some(username), Some(password)) => Some(SmtpConfig {
                host: non_empty_var("SMTP_HOST").unwrap_or_else(|| DEFAULT_SMTP_HOST.to_string()),
                username,
                password,
            }),
            _ => None,
        };

        let trend_offset = match env::var("TREND_UTC_OFFSET_MINUTES") {
            Ok(raw) => parse_trend_offset(&raw)?,
            Err(_) => utc_offset(),
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                format: log_format,
            },
            admin,
            moderation: ModerationConfig {
                reviewer_email: non_empty_var("REVIEWER_EMAIL"),
                sender_email,
                notify_on_submit,
                trend_offset,
                smtp,
            },
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub format: LogFormat,
}

/// Output shape for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" | "text" => Some(Self::Compact),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Shared secret gating administrator routes. `None` refuses every admin request.
#[derive(Clone, Default)]
pub struct AdminConfig {
    pub password: Option<String>,
}

impl fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminConfig")
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Reviewer notification and trend bucketing settings.
#[derive(Debug, Clone)]
pub struct ModerationConfig {
    pub reviewer_email: Option<String>,
    pub sender_email: Option<String>,
    pub notify_on_submit: bool,
    /// Offset in which a report's weekday is evaluated for trends.
    pub trend_offset: FixedOffset,
    /// Mail relay credentials. `None` leaves reviewer messages in the log outbox.
    pub smtp: Option<SmtpConfig>,
}

/// Authenticated SMTP relay used for reviewer mail.
#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            reviewer_email: None,
            sender_email: None,
            notify_on_submit: false,
            trend_offset: utc_offset(),
            smtp: None,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidFlag { name: &'static str, value: String },
    InvalidTrendOffset { value: String },
    InvalidLogFormat { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidFlag { name, value } => {
                write!(f, "{name} must be true or false, got '{value}'")
            }
            ConfigError::InvalidLogFormat { value } => {
                write!(f, "APP_LOG_FORMAT must be compact or json, got '{value}'")
            }
            ConfigError::InvalidTrendOffset { value } => write!(
                f,
                "TREND_UTC_OFFSET_MINUTES must be whole minutes within +/-{MAX_TREND_OFFSET_MINUTES}, got '{value}'"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidFlag { .. }
            | ConfigError::InvalidTrendOffset { .. }
            | ConfigError::InvalidLogFormat { .. } => None,
        }
    }
}

/// Validates a minute offset from UTC, as accepted by `TREND_UTC_OFFSET_MINUTES`.
pub fn parse_trend_offset(raw: &str) -> Result<FixedOffset, ConfigError> {
    let invalid = || ConfigError::InvalidTrendOffset {
        value: raw.to_string(),
    };
    let minutes = raw.trim().parse::<i32>().map_err(|_| invalid())?;
    if minutes.abs() > MAX_TREND_OFFSET_MINUTES {
        return Err(invalid());
    }
    FixedOffset::east_opt(minutes * 60).ok_or_else(invalid)
}

fn utc_offset() -> FixedOffset {
    use chrono::{Offset, Utc};
    Utc.fix()
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
