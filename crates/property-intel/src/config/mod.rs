use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::domain::ValidationError;
use crate::hazards::{HazardWeights, RiskThresholds};
use crate::lifecycle::DEFAULT_JOB_QUEUE_CAPACITY;

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
    pub analysis: AnalysisConfig,
    pub security: SecurityConfig,
    pub service: ServiceInfo,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let model_version =
            env::var("APP_MODEL_VERSION").unwrap_or_else(|_| DEFAULT_MODEL_VERSION.to_string());
        let max_analysis_seconds = match env::var("APP_MAX_ANALYSIS_SECONDS") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|seconds| *seconds > 0)
                .ok_or(ConfigError::InvalidAnalysisTimeout)?,
            Err(_) => DEFAULT_MAX_ANALYSIS_SECONDS,
        };
        let job_queue_capacity = match env::var("APP_JOB_QUEUE_CAPACITY") {
            Ok(raw) => raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|capacity| *capacity > 0)
                .ok_or(ConfigError::InvalidJobQueueCapacity)?,
            Err(_) => DEFAULT_JOB_QUEUE_CAPACITY,
        };
        let hazard_weights = match env::var("APP_HAZARD_WEIGHTS") {
            Ok(raw) => HazardWeights::parse(&raw)
                .map_err(|source| ConfigError::InvalidHazardWeights { source })?,
            Err(_) => HazardWeights::default(),
        };
        let risk_thresholds = match env::var("APP_RISK_THRESHOLDS") {
            Ok(raw) => RiskThresholds::parse(&raw)
                .map_err(|source| ConfigError::InvalidRiskThresholds { source })?,
            Err(_) => RiskThresholds::default(),
        };

        let bcrypt_cost = match env::var("APP_BCRYPT_COST") {
            Ok(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|cost| BCRYPT_COST_RANGE.contains(cost))
                .ok_or(ConfigError::InvalidBcryptCost)?,
            Err(_) => DEFAULT_BCRYPT_COST,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            analysis: AnalysisConfig {
                model_version,
                max_analysis_seconds,
                job_queue_capacity,
                hazard_weights,
                risk_thresholds,
            },
            security: SecurityConfig { bcrypt_cost },
            service: ServiceInfo::default(),
        })
    }
}

const DEFAULT_MODEL_VERSION: &str = "v1.0";
const DEFAULT_MAX_ANALYSIS_SECONDS: u64 = 300;
const DEFAULT_BCRYPT_COST: u32 = 12;
const BCRYPT_COST_RANGE: std::ops::RangeInclusive<u32> = 4..=31;

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

/// Policy handed to the lifecycle and hazard services.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Stamped on properties when a completed run reports no model version.
    pub model_version: String,
    /// Deadline handed to the pipeline with every job.
    pub max_analysis_seconds: u64,
    /// Pending jobs the in-process queue holds before rejecting new runs.
    pub job_queue_capacity: usize,
    pub hazard_weights: HazardWeights,
    pub risk_thresholds: RiskThresholds,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            model_version: DEFAULT_MODEL_VERSION.to_string(),
            max_analysis_seconds: DEFAULT_MAX_ANALYSIS_SECONDS,
            job_queue_capacity: DEFAULT_JOB_QUEUE_CAPACITY,
            hazard_weights: HazardWeights::default(),
            risk_thresholds: RiskThresholds::default(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SecurityConfig {
    pub bcrypt_cost: u32,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            bcrypt_cost: DEFAULT_BCRYPT_COST,
        }
    }
}

/// Identity reported by the health endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInfo {
    pub name: String,
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidAnalysisTimeout,
    InvalidJobQueueCapacity,
    InvalidHazardWeights { source: ValidationError },
    InvalidRiskThresholds { source: ValidationError },
    InvalidBcryptCost,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidAnalysisTimeout => {
                write!(f, "APP_MAX_ANALYSIS_SECONDS must be a positive integer")
            }
            ConfigError::InvalidJobQueueCapacity => {
                write!(f, "APP_JOB_QUEUE_CAPACITY must be a positive integer")
            }
            ConfigError::InvalidHazardWeights { source } => {
                write!(f, "APP_HAZARD_WEIGHTS is invalid: {source}")
            }
            ConfigError::InvalidRiskThresholds { source } => {
                write!(f, "APP_RISK_THRESHOLDS is invalid: {source}")
            }
            ConfigError::InvalidBcryptCost => {
                write!(f, "APP_BCRYPT_COST must be an integer between 4 and 31")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidHazardWeights { source }
            | ConfigError::InvalidRiskThresholds { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidAnalysisTimeout
            | ConfigError::InvalidJobQueueCapacity
            | ConfigError::InvalidBcryptCost => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hazards::{HazardKind, RiskCategory};
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for key in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "APP_MODEL_VERSION",
            "APP_MAX_ANALYSIS_SECONDS",
            "APP_JOB_QUEUE_CAPACITY",
            "APP_HAZARD_WEIGHTS",
            "APP_RISK_THRESHOLDS",
            "APP_BCRYPT_COST",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.analysis.model_version, "v1.0");
        assert_eq!(config.analysis.max_analysis_seconds, 300);
        assert_eq!(config.analysis.job_queue_capacity, 1024);
        assert_eq!(config.analysis.hazard_weights, HazardWeights::default());
        assert_eq!(config.security.bcrypt_cost, 12);
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 8000));
        reset_env();
    }

    #[test]
    fn reads_scoring_policy_from_env() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HAZARD_WEIGHTS", "flood=0.6,crime=0.4");
        env::set_var("APP_RISK_THRESHOLDS", "20,40,60");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(
            config.analysis.hazard_weights.as_map()[&HazardKind::Crime],
            0.4
        );
        assert_eq!(
            config.analysis.risk_thresholds.categorize(45.0),
            RiskCategory::High
        );
        reset_env();
    }

    #[test]
    fn rejects_unnormalized_weights_and_bad_costs() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HAZARD_WEIGHTS", "flood=0.6");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidHazardWeights { .. })
        ));

        reset_env();
        env::set_var("APP_BCRYPT_COST", "2");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidBcryptCost)
        ));
        reset_env();
    }

    #[test]
    fn job_queue_capacity_must_be_positive() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_JOB_QUEUE_CAPACITY", "64");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.analysis.job_queue_capacity, 64);

        env::set_var("APP_JOB_QUEUE_CAPACITY", "0");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidJobQueueCapacity)
        ));
        reset_env();
    }
}
