use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

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
    pub evaluation: EvaluationSettings,
    pub verification: VerificationSettings,
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

        let approval_ratio = parse_ratio("APP_APPROVAL_RATIO", 0.6)?;
        let rejection_ratio = parse_ratio("APP_REJECTION_RATIO", 0.4)?;
        if rejection_ratio >= approval_ratio {
            return Err(ConfigError::RatioOrder {
                approval_ratio,
                rejection_ratio,
            });
        }

        let inspection_device_types = env::var("APP_INSPECTION_DEVICE_TYPES")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|value| !value.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            evaluation: EvaluationSettings {
                approval_ratio,
                rejection_ratio,
            },
            verification: VerificationSettings {
                inspection_device_types,
            },
        })
    }
}

fn parse_ratio(variable: &'static str, default: f32) -> Result<f32, ConfigError> {
    let value = match env::var(variable) {
        Ok(raw) => raw
            .trim()
            .parse::<f32>()
            .map_err(|_| ConfigError::InvalidRatio { variable })?,
        Err(_) => default,
    };

    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::InvalidRatio { variable });
    }
    Ok(value)
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
}

/// Cutoff ratios for the scoring rubric, overridable per deployment.
#[derive(Debug, Clone)]
pub struct EvaluationSettings {
    pub approval_ratio: f32,
    pub rejection_ratio: f32,
}

/// Device types that always require a physical site inspection.
#[derive(Debug, Clone, Default)]
pub struct VerificationSettings {
    pub inspection_device_types: Vec<String>,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidRatio { variable: &'static str },
    RatioOrder { approval_ratio: f32, rejection_ratio: f32 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidRatio { variable } => {
                write!(f, "{variable} must be a ratio between 0 and 1")
            }
            ConfigError::RatioOrder {
                approval_ratio,
                rejection_ratio,
            } => write!(
                f,
                "APP_REJECTION_RATIO ({rejection_ratio}) must be below APP_APPROVAL_RATIO ({approval_ratio})"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
