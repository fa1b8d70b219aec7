use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{Duration, NaiveDate, NaiveTime};

use crate::scheduling::{CalendarConfig, CalendarConfigError};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M";

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
    pub scheduling: SchedulingConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            scheduling: SchedulingConfig::from_env()?,
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

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Calendar rules, the registration gate, and optional CSV inputs.
#[derive(Debug, Clone)]
pub struct SchedulingConfig {
    pub calendar: CalendarConfig,
    /// Registrations scoring below this upstream gate never reach the scheduler.
    pub min_gate_score: u32,
    pub candidates_csv: Option<PathBuf>,
    pub interviewers_csv: Option<PathBuf>,
    pub bookings_csv: Option<PathBuf>,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            calendar: CalendarConfig::default(),
            min_gate_score: 1150,
            candidates_csv: None,
            interviewers_csv: None,
            bookings_csv: None,
        }
    }
}

impl SchedulingConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = CalendarConfig::default();

        let lunch_start = time_var("SCHEDULER_LUNCH_START", defaults.lunch_start)?;
        let lunch_minutes = number_var("SCHEDULER_LUNCH_MINUTES", 30_i64)?;
        let invalid_lunch = || ConfigError::InvalidValue {
            variable: "SCHEDULER_LUNCH_MINUTES",
            value: lunch_minutes.to_string(),
        };
        let lunch_length = Duration::try_minutes(lunch_minutes).ok_or_else(invalid_lunch)?;
        let (lunch_end, overflow) = lunch_start.overflowing_add_signed(lunch_length);
        if overflow != 0 {
            return Err(invalid_lunch());
        }

        let calendar = CalendarConfig {
            window_start: date_var("SCHEDULER_WINDOW_START", defaults.window_start)?,
            window_days: number_var("SCHEDULER_WINDOW_DAYS", defaults.window_days)?,
            day_start: time_var("SCHEDULER_DAY_START", defaults.day_start)?,
            day_end: time_var("SCHEDULER_DAY_END", defaults.day_end)?,
            lunch_start,
            lunch_end,
            slot_minutes: number_var("SCHEDULER_SLOT_MINUTES", defaults.slot_minutes)?,
            break_minutes: number_var("SCHEDULER_BREAK_MINUTES", defaults.break_minutes)?,
            break_every: number_var("SCHEDULER_BREAK_EVERY", defaults.break_every)?,
        };
        calendar.validate().map_err(ConfigError::Calendar)?;

        Ok(Self {
            calendar,
            min_gate_score: number_var("SCHEDULER_MIN_GATE_SCORE", 1150)?,
            candidates_csv: path_var("SCHEDULER_CANDIDATES_CSV"),
            interviewers_csv: path_var("SCHEDULER_INTERVIEWERS_CSV"),
            bookings_csv: path_var("SCHEDULER_BOOKINGS_CSV"),
        })
    }
}

fn raw_var(variable: &'static str) -> Option<String> {
    env::var(variable)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn number_var<T: FromStr>(variable: &'static str, default: T) -> Result<T, ConfigError> {
    match raw_var(variable) {
        None => Ok(default),
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidValue { variable, value }),
    }
}

fn time_var(variable: &'static str, default: NaiveTime) -> Result<NaiveTime, ConfigError> {
    match raw_var(variable) {
        None => Ok(default),
        Some(value) => NaiveTime::parse_from_str(&value, TIME_FORMAT)
            .map_err(|_| ConfigError::InvalidValue { variable, value }),
    }
}

fn date_var(variable: &'static str, default: NaiveDate) -> Result<NaiveDate, ConfigError> {
    match raw_var(variable) {
        None => Ok(default),
        Some(value) => NaiveDate::parse_from_str(&value, DATE_FORMAT)
            .map_err(|_| ConfigError::InvalidValue { variable, value }),
    }
}

fn path_var(variable: &'static str) -> Option<PathBuf> {
    raw_var(variable).map(PathBuf::from)
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidValue { variable: &'static str, value: String },
    Calendar(CalendarConfigError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidValue { variable, value } => {
                write!(f, "{} has an invalid value '{}'", variable, value)
            }
            ConfigError::Calendar(err) => write!(f, "invalid scheduler calendar: {}", err),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidValue { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::Calendar(err) => Some(err),
        }
    }
}
