use puente_client::{Environment, LinkPolicy, StompConfig};

use super::error::ConfigError;

/// Default paper width in characters (58mm paper)
pub const DEFAULT_PAPER_WIDTH: usize = 32;

/// Default cashier ticket header
pub const DEFAULT_BUSINESS_NAME: &str = "Restaurante 'El Buen Sabor'";

/// Bridge configuration
///
/// # Environment variables
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | WEBSOCKET_URL | (required) | STOMP broker endpoint, `ws://` or `wss://` |
/// | JOB_TOPIC | /topic/print-jobs | Topic print jobs arrive on |
/// | LOG_LEVEL | info | trace, debug, info, warn, error |
/// | LOG_DIR | (unset) | Daily rolling log files go here when set |
/// | PAPER_WIDTH | 32 | Characters per line |
/// | BUSINESS_NAME | Restaurante 'El Buen Sabor' | Cashier ticket header |
/// | ENVIRONMENT | development | development or production |
///
/// ```ignore
/// WEBSOCKET_URL=ws://192.168.1.10:8080/ws puente-impresion run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub websocket_url: String,
    pub job_topic: String,
    pub log_level: String,
    pub log_dir: Option<String>,
    pub environment: Environment,
    pub printing: PrintingConfig,
}

/// Ticket layout settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintingConfig {
    pub paper_width: usize,
    pub business_name: String,
}

impl Config {
    /// Load from environment variables; only `WEBSOCKET_URL` is mandatory
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let websocket_url = lookup("WEBSOCKET_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("WEBSOCKET_URL"))?;

        if !(websocket_url.starts_with("ws://") || websocket_url.starts_with("wss://")) {
            return Err(ConfigError::Invalid {
                name: "WEBSOCKET_URL",
                value: websocket_url,
            });
        }

        Ok(Self {
            websocket_url,
            job_topic: lookup("JOB_TOPIC").unwrap_or_else(|| shared::JOB_TOPIC.into()),
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".into()),
            log_dir: lookup("LOG_DIR").filter(|v| !v.is_empty()),
            environment: lookup("ENVIRONMENT")
                .and_then(|v| v.parse().ok())
                .unwrap_or_default(),
            printing: PrintingConfig::from_lookup(&lookup)?,
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// Bridge link policy: 5 attempts, 3s apart, 15s health check
    pub fn link_policy(&self) -> LinkPolicy {
        LinkPolicy::bridge()
    }

    pub fn stomp(&self) -> StompConfig {
        StompConfig::default()
    }
}

impl PrintingConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&|key: &str| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let paper_width = match lookup("PAPER_WIDTH") {
            None => DEFAULT_PAPER_WIDTH,
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(w) if w >= 16 => w,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "PAPER_WIDTH",
                        value: raw,
                    });
                }
            },
        };

        Ok(Self {
            paper_width,
            business_name: lookup("BUSINESS_NAME")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_BUSINESS_NAME.into()),
        })
    }
}

impl Default for PrintingConfig {
    fn default() -> Self {
        Self {
            paper_width: DEFAULT_PAPER_WIDTH,
            business_name: DEFAULT_BUSINESS_NAME.into(),
        }
    }
}
