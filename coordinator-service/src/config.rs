use brewcrew_shared::clock::QuietHours;
use brewcrew_shared::transport::telegram::DEFAULT_API_URL;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{name} has an invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// How proactive notifications are delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationPolicy {
    pub quiet_hours: QuietHours,
    /// Upper bound for one recipient's delivery attempt.
    pub delivery_timeout: Duration,
    /// Minimum gap between two motivational nudges.
    pub motivation_cooldown: Duration,
}

impl Default for NotificationPolicy {
    fn default() -> Self {
        Self {
            quiet_hours: QuietHours::default(),
            delivery_timeout: Duration::from_secs(10),
            motivation_cooldown: Duration::from_secs(1200),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bot_token: String,
    pub telegram_api_url: String,
    /// Lifetime of ephemeral messages; zero keeps them forever.
    pub message_ttl: Duration,
    pub default_invite_code: Option<String>,
    pub bind_addr: String,
    /// Postgres connection string; the in-memory store is used when unset.
    pub database_url: Option<String>,
    pub policy: NotificationPolicy,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bot_token = get("BOT_TOKEN").ok_or(ConfigError::Missing("BOT_TOKEN"))?;
        let defaults = NotificationPolicy::default();

        let quiet_start = parse_or(&get, "QUIET_HOURS_START", defaults.quiet_hours.start)?;
        let quiet_end = parse_or(&get, "QUIET_HOURS_END", defaults.quiet_hours.end)?;
        for (name, hour) in [("QUIET_HOURS_START", quiet_start), ("QUIET_HOURS_END", quiet_end)] {
            if hour > 23 {
                return Err(ConfigError::Invalid {
                    name,
                    value: hour.to_string(),
                });
            }
        }

        let delivery_timeout: u64 =
            parse_or(&get, "DELIVERY_TIMEOUT", defaults.delivery_timeout.as_secs())?;
        if delivery_timeout == 0 {
            return Err(ConfigError::Invalid {
                name: "DELIVERY_TIMEOUT",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            bot_token,
            telegram_api_url: get("TELEGRAM_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            message_ttl: Duration::from_secs(parse_or(&get, "MESSAGE_TTL", 3600)?),
            default_invite_code: get("DEFAULT_INVITE_CODE").map(|c| c.trim().to_string()),
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            database_url: get("DATABASE_URL"),
            policy: NotificationPolicy {
                quiet_hours: QuietHours::new(quiet_start, quiet_end),
                delivery_timeout: Duration::from_secs(delivery_timeout),
                motivation_cooldown: Duration::from_secs(parse_or(
                    &get,
                    "MOTIVATION_COOLDOWN",
                    defaults.motivation_cooldown.as_secs(),
                )?),
            },
        })
    }
}

fn parse_or<T, G>(get: &G, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_with_only_token() {
        let config = AppConfig::from_lookup(lookup(&[("BOT_TOKEN", "abc")])).unwrap();
        assert_eq!(config.bot_token, "abc");
        assert_eq!(config.telegram_api_url, DEFAULT_API_URL);
        assert_eq!(config.message_ttl, Duration::from_secs(3600));
        assert_eq!(config.default_invite_code, None);
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.database_url, None);
        assert_eq!(config.policy, NotificationPolicy::default());
    }

    #[test]
    fn test_missing_token_is_an_error() {
        assert_eq!(
            AppConfig::from_lookup(lookup(&[])),
            Err(ConfigError::Missing("BOT_TOKEN"))
        );
        assert_eq!(
            AppConfig::from_lookup(lookup(&[("BOT_TOKEN", "  ")])),
            Err(ConfigError::Missing("BOT_TOKEN"))
        );
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("BOT_TOKEN", "abc"),
            ("MESSAGE_TTL", "0"),
            ("DEFAULT_INVITE_CODE", " WELCOME "),
            ("QUIET_HOURS_START", "22"),
            ("QUIET_HOURS_END", "6"),
            ("MOTIVATION_COOLDOWN", "60"),
            ("DELIVERY_TIMEOUT", "2"),
            ("DATABASE_URL", "postgres://brew@localhost/brewcrew"),
        ]))
        .unwrap();
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://brew@localhost/brewcrew")
        );
        assert_eq!(config.message_ttl, Duration::ZERO);
        assert_eq!(config.default_invite_code.as_deref(), Some("WELCOME"));
        assert_eq!(config.policy.quiet_hours, QuietHours::new(22, 6));
        assert_eq!(config.policy.motivation_cooldown, Duration::from_secs(60));
        assert_eq!(config.policy.delivery_timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(matches!(
            AppConfig::from_lookup(lookup(&[("BOT_TOKEN", "abc"), ("MESSAGE_TTL", "soon")])),
            Err(ConfigError::Invalid { name: "MESSAGE_TTL", .. })
        ));
        assert!(matches!(
            AppConfig::from_lookup(lookup(&[("BOT_TOKEN", "abc"), ("QUIET_HOURS_END", "24")])),
            Err(ConfigError::Invalid { name: "QUIET_HOURS_END", .. })
        ));
        assert!(matches!(
            AppConfig::from_lookup(lookup(&[("BOT_TOKEN", "abc"), ("DELIVERY_TIMEOUT", "0")])),
            Err(ConfigError::Invalid { name: "DELIVERY_TIMEOUT", .. })
        ));
    }
}
