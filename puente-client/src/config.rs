//! Link and dispatch tuning

use std::str::FromStr;
use std::time::Duration;

/// Deployment environment of the POS frontend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl FromStr for Environment {
    type Err = std::convert::Infallible;

    /// Anything other than `production`/`prod` is development
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        })
    }
}

/// Reconnection policy of a broker link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkPolicy {
    /// Automatic attempts before the link gives up
    pub max_reconnect_attempts: u32,
    /// Fixed delay between automatic attempts
    pub reconnect_delay: Duration,
    /// Period of the disconnected-link health check
    pub health_check_interval: Duration,
}

impl LinkPolicy {
    /// Bridge process: 5 attempts, 3s apart, health check every 15s
    pub const fn bridge() -> Self {
        Self {
            max_reconnect_attempts: 5,
            reconnect_delay: Duration::from_secs(3),
            health_check_interval: Duration::from_secs(15),
        }
    }

    /// POS frontend: 3 attempts, health check every 30s
    pub const fn client(env: Environment) -> Self {
        let delay = match env {
            Environment::Production => Duration::from_secs(5),
            Environment::Development => Duration::from_secs(3),
        };
        Self {
            max_reconnect_attempts: 3,
            reconnect_delay: delay,
            health_check_interval: Duration::from_secs(30),
        }
    }
}

/// STOMP session settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StompConfig {
    /// Heart-beat we offer to send
    pub heartbeat_outgoing: Duration,
    /// Heart-beat we want to receive
    pub heartbeat_incoming: Duration,
    /// Bound on WebSocket handshake + CONNECTED
    pub connect_timeout: Duration,
    /// Virtual host for the CONNECT frame; the URL host when `None`
    pub virtual_host: Option<String>,
}

impl Default for StompConfig {
    fn default() -> Self {
        Self {
            heartbeat_outgoing: Duration::from_millis(4000),
            heartbeat_incoming: Duration::from_millis(4000),
            connect_timeout: Duration::from_secs(10),
            virtual_host: None,
        }
    }
}

/// Print dispatch timings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Race bound on a single publish
    pub publish_timeout: Duration,
    /// Reconnect delay when dispatching on a down link
    pub unavailable_reconnect_delay: Duration,
    /// Reconnect delay after a publish lost the connection
    pub lost_reconnect_delay: Duration,
    /// Delay of the post-publish connectivity check
    pub follow_up_check_delay: Duration,
}

impl DispatchConfig {
    /// 10s publish bound for interactive use, 30s in production
    pub const fn for_environment(env: Environment) -> Self {
        let publish_timeout = match env {
            Environment::Production => Duration::from_secs(30),
            Environment::Development => Duration::from_secs(10),
        };
        Self {
            publish_timeout,
            unavailable_reconnect_delay: Duration::from_secs(2),
            lost_reconnect_delay: Duration::from_secs(3),
            follow_up_check_delay: Duration::from_secs(1),
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self::for_environment(Environment::Development)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_parse() {
        assert_eq!("PRODUCTION".parse::<Environment>(), Ok(Environment::Production));
        assert_eq!("prod".parse::<Environment>(), Ok(Environment::Production));
        assert_eq!("staging".parse::<Environment>(), Ok(Environment::Development));
    }

    #[test]
    fn test_client_policy_delay_by_environment() {
        assert_eq!(
            LinkPolicy::client(Environment::Production).reconnect_delay,
            Duration::from_secs(5)
        );
        assert_eq!(
            LinkPolicy::client(Environment::Development).reconnect_delay,
            Duration::from_secs(3)
        );
        assert_eq!(LinkPolicy::bridge().max_reconnect_attempts, 5);
    }
}
