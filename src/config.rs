//! Configuration types.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Bot configuration, read from the environment.
#[derive(Debug)]
pub struct BotConfig {
    /// Telegram bot token. Without one the bot runs on the CLI channel.
    pub telegram_token: Option<SecretString>,
    /// Telegram usernames or numeric ids allowed to talk to the bot.
    pub allowed_users: Vec<String>,
    /// Chat that receives finished records and may use the relay.
    pub operator_chat_id: Option<String>,
    /// Directory order files are written to.
    pub orders_dir: PathBuf,
    /// Directory holding gallery pictures.
    pub images_dir: PathBuf,
    /// Sessions untouched for this long are dropped. `None` keeps them.
    pub session_idle_timeout: Option<Duration>,
    /// How long a per-chat worker waits for input before it exits.
    pub worker_idle_timeout: Duration,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            telegram_token: None,
            allowed_users: vec!["*".to_string()],
            operator_chat_id: None,
            orders_dir: PathBuf::from("orders"),
            images_dir: PathBuf::from("images"),
            session_idle_timeout: None,
            worker_idle_timeout: Duration::from_secs(600), // 10 minutes
        }
    }
}

impl BotConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup. Unset and blank values fall
    /// back to defaults; malformed numbers are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let telegram_token = get("TELEGRAM_BOT_TOKEN").map(SecretString::from);

        let allowed_users = match get("TELEGRAM_ALLOWED_USERS") {
            Some(list) => list
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            None => defaults.allowed_users,
        };

        let operator_chat_id = match get("ORDER_BOT_OPERATOR_CHAT_ID") {
            Some(id) => {
                parse_number::<i64>("ORDER_BOT_OPERATOR_CHAT_ID", &id)?;
                Some(id)
            }
            None => None,
        };

        let session_idle_timeout = match get("ORDER_BOT_SESSION_IDLE_MIN") {
            Some(raw) => match parse_number::<u64>("ORDER_BOT_SESSION_IDLE_MIN", &raw)? {
                0 => None,
                minutes => Some(Duration::from_secs(minutes * 60)),
            },
            None => None,
        };

        let worker_idle_timeout = match get("ORDER_BOT_WORKER_IDLE_SECS") {
            Some(raw) => match parse_number::<u64>("ORDER_BOT_WORKER_IDLE_SECS", &raw)? {
                0 => {
                    return Err(ConfigError::InvalidValue {
                        key: "ORDER_BOT_WORKER_IDLE_SECS".into(),
                        message: "must be greater than zero".into(),
                    });
                }
                secs => Duration::from_secs(secs),
            },
            None => defaults.worker_idle_timeout,
        };

        Ok(Self {
            telegram_token,
            allowed_users,
            operator_chat_id,
            orders_dir: get("ORDER_BOT_ORDERS_DIR").map_or(defaults.orders_dir, PathBuf::from),
            images_dir: get("ORDER_BOT_IMAGES_DIR").map_or(defaults.images_dir, PathBuf::from),
            session_idle_timeout,
            worker_idle_timeout,
        })
    }
}

fn parse_number<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("{raw:?}: {e}"),
    })
}
