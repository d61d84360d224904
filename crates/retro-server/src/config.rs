//! Configuration for the retro board server.
//!
//! Defaults can be overridden via environment variables:
//!
//! - `RETRO_BIND_ADDR`           (default: "0.0.0.0")
//! - `RETRO_PORT`                (default: "10000")
//! - `RETRO_MAX_CLIENTS`         (default: "1024")
//! - `RETRO_OUTBOUND_QUEUE`      (default: "256")
//! - `RETRO_HEARTBEAT_SECS`      (default: "30", 0 disables pings)
//! - `RETRO_WRITE_TIMEOUT_SECS`  (default: "10")
//! - `RETRO_MAX_MESSAGE_BYTES`   (default: "65536")
//! - `RETRO_DUPLICATE_USERNAMES` (default: "takeover", or "reject")
//!
//! A variable that is set but does not parse is a startup error.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context};
use retro_core::DuplicateUsernamePolicy;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// IP address / interface to bind to (e.g. "0.0.0.0" or "127.0.0.1").
    pub bind_addr: String,

    /// TCP port to listen on.
    pub port: u16,

    /// Maximum number of simultaneously connected clients.
    pub max_clients: usize,

    /// Capacity of each connection's outbound event queue.
    pub outbound_queue: usize,

    /// Seconds between pings; `0` turns the heartbeat off.
    pub heartbeat_interval_secs: u64,

    /// Upper bound on a single socket write.
    pub write_timeout_secs: u64,

    /// Largest inbound text frame that is decoded; larger ones are dropped.
    pub max_message_bytes: usize,

    /// What to do when a username is already connected to the room.
    pub duplicate_usernames: DuplicateUsernamePolicy,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind_addr: "0.0.0.0".to_string(),
            port: 10000,
            max_clients: 1024,
            outbound_queue: 256,
            heartbeat_interval_secs: 30,
            write_timeout_secs: 10,
            max_message_bytes: 64 * 1024,
            duplicate_usernames: DuplicateUsernamePolicy::Takeover,
        }
    }
}

impl Config {
    /// Construct a `Config` from environment variables, falling back
    /// to the defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`Config::from_env`], reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let config = Config {
            bind_addr: lookup("RETRO_BIND_ADDR").unwrap_or(defaults.bind_addr),
            port: read_or_default(&lookup, "RETRO_PORT", defaults.port)?,
            max_clients: read_or_default(&lookup, "RETRO_MAX_CLIENTS", defaults.max_clients)?,
            outbound_queue: read_or_default(&lookup, "RETRO_OUTBOUND_QUEUE", defaults.outbound_queue)?,
            heartbeat_interval_secs: read_or_default(
                &lookup,
                "RETRO_HEARTBEAT_SECS",
                defaults.heartbeat_interval_secs,
            )?,
            write_timeout_secs: read_or_default(
                &lookup,
                "RETRO_WRITE_TIMEOUT_SECS",
                defaults.write_timeout_secs,
            )?,
            max_message_bytes: read_or_default(
                &lookup,
                "RETRO_MAX_MESSAGE_BYTES",
                defaults.max_message_bytes,
            )?,
            duplicate_usernames: read_or_default(
                &lookup,
                "RETRO_DUPLICATE_USERNAMES",
                defaults.duplicate_usernames,
            )?,
        };

        if config.outbound_queue == 0 {
            bail!("RETRO_OUTBOUND_QUEUE must be at least 1");
        }
        if config.write_timeout_secs == 0 {
            bail!("RETRO_WRITE_TIMEOUT_SECS must be at least 1");
        }

        Ok(config)
    }

    /// Convenience: `addr:port` socket string.
    pub fn socket_addr_string(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    /// `None` when pings are disabled.
    pub fn heartbeat_interval(&self) -> Option<Duration> {
        (self.heartbeat_interval_secs > 0).then(|| Duration::from_secs(self.heartbeat_interval_secs))
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }
}

fn read_or_default<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(val) => val
            .trim()
            .parse::<T>()
            .with_context(|| format!("invalid value for {key}: {val:?}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = from_pairs(&[]).unwrap();
        assert_eq!(config.socket_addr_string(), "0.0.0.0:10000");
        assert_eq!(config.max_clients, 1024);
        assert_eq!(config.outbound_queue, 256);
        assert_eq!(config.heartbeat_interval(), Some(Duration::from_secs(30)));
        assert_eq!(config.max_message_bytes, 65536);
        assert_eq!(config.duplicate_usernames, DuplicateUsernamePolicy::Takeover);
    }

    #[test]
    fn overrides_are_applied() {
        let config = from_pairs(&[
            ("RETRO_BIND_ADDR", "127.0.0.1"),
            ("RETRO_PORT", "8080"),
            ("RETRO_HEARTBEAT_SECS", "0"),
            ("RETRO_DUPLICATE_USERNAMES", "Reject"),
        ])
        .unwrap();
        assert_eq!(config.socket_addr_string(), "127.0.0.1:8080");
        assert_eq!(config.heartbeat_interval(), None);
        assert_eq!(config.duplicate_usernames, DuplicateUsernamePolicy::Reject);
    }

    #[test]
    fn bad_values_are_startup_errors() {
        let err = from_pairs(&[("RETRO_PORT", "http")]).unwrap_err();
        assert!(err.to_string().contains("RETRO_PORT"));

        assert!(from_pairs(&[("RETRO_DUPLICATE_USERNAMES", "merge")]).is_err());
        assert!(from_pairs(&[("RETRO_OUTBOUND_QUEUE", "0")]).is_err());
    }
}
