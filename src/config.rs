//! Relay configuration.
//!
//! Loaded from environment variables (after an optional `.env` file) with
//! defaults for every setting.

use std::collections::HashMap;
use std::env;

use thiserror::Error;

/// Default port when neither `BIND_ADDRESS` nor `PORT` is set.
pub const DEFAULT_PORT: u16 = 5000;

/// Default capacity of the chat server command channel.
pub const DEFAULT_COMMAND_BUFFER_SIZE: usize = 256;

/// Default capacity of each connection's outbound channel.
pub const DEFAULT_CLIENT_BUFFER_SIZE: usize = 64;

/// Rooms that exist before anyone joins when `DEFAULT_ROOMS` is unset.
pub const DEFAULT_ROOMS: &[&str] = &["interactive-session", "Room 2"];

/// Relay configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Listen address (default: "0.0.0.0:5000").
    pub bind_address: String,

    /// Capacity of the chat server command channel.
    pub command_buffer_size: usize,

    /// Capacity of each connection's outbound channel. Deliveries to a full
    /// channel are dropped.
    pub client_buffer_size: usize,

    /// Rooms created at startup (comma-separated `DEFAULT_ROOMS`).
    pub default_rooms: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid port: {0}")]
    InvalidPort(String),

    #[error("Invalid buffer size: {0}")]
    InvalidBufferSize(String),
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: format!("0.0.0.0:{DEFAULT_PORT}"),
            command_buffer_size: DEFAULT_COMMAND_BUFFER_SIZE,
            client_buffer_size: DEFAULT_CLIENT_BUFFER_SIZE,
            default_rooms: DEFAULT_ROOMS.iter().map(|r| r.to_string()).collect(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bind_address = match vars.get("BIND_ADDRESS") {
            Some(addr) => addr.clone(),
            None => {
                let port = match vars.get("PORT") {
                    Some(value) => value.parse::<u16>().map_err(|e| {
                        ConfigError::InvalidPort(format!(
                            "PORT must be a valid port number, got '{}': {}",
                            value, e
                        ))
                    })?,
                    None => DEFAULT_PORT,
                };
                format!("0.0.0.0:{port}")
            }
        };

        let command_buffer_size = parse_buffer_size(
            vars,
            "COMMAND_BUFFER_SIZE",
            DEFAULT_COMMAND_BUFFER_SIZE,
        )?;
        let client_buffer_size =
            parse_buffer_size(vars, "CLIENT_BUFFER_SIZE", DEFAULT_CLIENT_BUFFER_SIZE)?;

        // Blank entries are skipped, so an empty value seeds no rooms
        let default_rooms = match vars.get("DEFAULT_ROOMS") {
            Some(value) => value
                .split(',')
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(String::from)
                .collect(),
            None => DEFAULT_ROOMS.iter().map(|r| r.to_string()).collect(),
        };

        Ok(Self {
            bind_address,
            command_buffer_size,
            client_buffer_size,
            default_rooms,
        })
    }
}

// tokio channels panic on a zero capacity
fn parse_buffer_size(
    vars: &HashMap<String, String>,
    key: &str,
    default: usize,
) -> Result<usize, ConfigError> {
    let Some(value) = vars.get(key) else {
        return Ok(default);
    };

    match value.parse::<usize>() {
        Ok(size) if size > 0 => Ok(size),
        Ok(_) => Err(ConfigError::InvalidBufferSize(format!(
            "{key} must be greater than zero"
        ))),
        Err(e) => Err(ConfigError::InvalidBufferSize(format!(
            "{key} must be a valid integer, got '{value}': {e}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_vars(&HashMap::new()).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.bind_address, "0.0.0.0:5000");
    }

    #[test]
    fn test_port_sets_bind_address() {
        let config = Config::from_vars(&vars(&[("PORT", "9000")])).unwrap();
        assert_eq!(config.bind_address, "0.0.0.0:9000");
    }

    #[test]
    fn test_bind_address_wins_over_port() {
        let config = Config::from_vars(&vars(&[
            ("PORT", "9000"),
            ("BIND_ADDRESS", "127.0.0.1:7000"),
        ]))
        .unwrap();
        assert_eq!(config.bind_address, "127.0.0.1:7000");
    }

    #[test]
    fn test_invalid_port() {
        let result = Config::from_vars(&vars(&[("PORT", "not-a-port")]));
        assert!(matches!(result, Err(ConfigError::InvalidPort(_))));
    }

    #[test]
    fn test_zero_buffer_rejected() {
        let result = Config::from_vars(&vars(&[("CLIENT_BUFFER_SIZE", "0")]));
        assert!(matches!(result, Err(ConfigError::InvalidBufferSize(_))));
    }

    #[test]
    fn test_buffer_sizes() {
        let config = Config::from_vars(&vars(&[
            ("COMMAND_BUFFER_SIZE", "16"),
            ("CLIENT_BUFFER_SIZE", "8"),
        ]))
        .unwrap();
        assert_eq!(config.command_buffer_size, 16);
        assert_eq!(config.client_buffer_size, 8);
    }

    #[test]
    fn test_default_rooms() {
        let config = Config::from_vars(&HashMap::new()).unwrap();
        assert_eq!(config.default_rooms, vec!["interactive-session", "Room 2"]);

        let config = Config::from_vars(&vars(&[("DEFAULT_ROOMS", " lobby, ,Room 2 ")])).unwrap();
        assert_eq!(config.default_rooms, vec!["lobby", "Room 2"]);

        let config = Config::from_vars(&vars(&[("DEFAULT_ROOMS", "")])).unwrap();
        assert!(config.default_rooms.is_empty());
    }
}
