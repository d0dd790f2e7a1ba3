//! Process configuration.
//!
//! Parsed once at startup from flags and environment variables, then shared
//! read-only with every request.

use clap::Parser;
use std::time::Duration;

/// Default Pingdom API base URL.
pub const DEFAULT_PINGDOM_API_URL: &str = "https://api.pingdom.com/api/3.1";

/// Default timeout for outbound HTTP calls, in seconds.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Relay configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "pingdom-slack")]
#[command(about = "Relay Pingdom alerts to Slack with root cause analysis")]
#[command(version)]
pub struct Config {
    /// HTTP server port
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Slack incoming webhook URL
    #[arg(long, env = "SLACK_WEBHOOK", hide_env_values = true)]
    pub slack_webhook: Option<String>,

    /// Pingdom API bearer token
    #[arg(long, env = "PINGDOM_TOKEN", hide_env_values = true)]
    pub pingdom_token: Option<String>,

    /// Pingdom API base URL
    #[arg(long, env = "PINGDOM_API_URL", default_value = DEFAULT_PINGDOM_API_URL)]
    pub pingdom_api_url: String,

    /// Emoji shown for checks that are UP
    #[arg(long, env = "UP_ICON", default_value = ":ok:")]
    pub up_icon: String,

    /// Emoji shown for checks that are DOWN
    #[arg(long, env = "DOWN_ICON", default_value = ":warning:")]
    pub down_icon: String,

    /// Emoji shown for any other state
    #[arg(long, env = "UNKNOWN_ICON", default_value = ":ghost:")]
    pub unknown_icon: String,

    /// Timeout for each outbound HTTP call
    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value_t = DEFAULT_HTTP_TIMEOUT_SECS)]
    pub http_timeout_secs: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Slack webhook URL, treating an empty value as unset.
    pub fn slack_webhook(&self) -> Option<&str> {
        non_empty(self.slack_webhook.as_deref())
    }

    /// Pingdom API token, treating an empty value as unset.
    pub fn pingdom_token(&self) -> Option<&str> {
        non_empty(self.pingdom_token.as_deref())
    }

    /// Names of the required secrets that are missing.
    pub fn missing_secrets(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.slack_webhook().is_none() {
            missing.push("SLACK_WEBHOOK");
        }
        if self.pingdom_token().is_none() {
            missing.push("PINGDOM_TOKEN");
        }
        missing
    }

    pub fn http_timeout(&self) -> Duration {
        // A zero timeout would fail every call; fall back to the default.
        match self.http_timeout_secs {
            0 => Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            secs => Duration::from_secs(secs),
        }
    }

    pub fn icons(&self) -> StatusIcons {
        StatusIcons {
            up: self.up_icon.clone(),
            down: self.down_icon.clone(),
            unknown: self.unknown_icon.clone(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            slack_webhook: None,
            pingdom_token: None,
            pingdom_api_url: DEFAULT_PINGDOM_API_URL.to_string(),
            up_icon: ":ok:".to_string(),
            down_icon: ":warning:".to_string(),
            unknown_icon: ":ghost:".to_string(),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            verbose: false,
        }
    }
}

/// Emoji used for each check state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusIcons {
    pub up: String,
    pub down: String,
    pub unknown: String,
}

impl Default for StatusIcons {
    fn default() -> Self {
        Config::default().icons()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        let config = Config::parse_from([
            "pingdom-slack",
            "--slack-webhook",
            "https://hooks.slack.com/services/T/B/X",
            "--pingdom-token",
            "secret",
            "--down-icon",
            ":fire:",
        ]);

        assert_eq!(config.port, 8080);
        assert_eq!(config.pingdom_api_url, DEFAULT_PINGDOM_API_URL);
        assert_eq!(config.icons().down, ":fire:");
        assert_eq!(config.icons().up, ":ok:");
        assert!(config.missing_secrets().is_empty());
    }

    #[test]
    fn test_empty_secrets_are_missing() {
        let config = Config {
            slack_webhook: Some(String::new()),
            pingdom_token: Some("  ".to_string()),
            ..Config::default()
        };

        assert_eq!(config.missing_secrets(), vec!["SLACK_WEBHOOK", "PINGDOM_TOKEN"]);
    }

    #[test]
    fn test_zero_timeout_uses_default() {
        let config = Config {
            http_timeout_secs: 0,
            ..Config::default()
        };
        assert_eq!(config.http_timeout(), Duration::from_secs(10));
    }
}
