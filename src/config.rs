use std::str::FromStr;
use std::time::Duration;

use crate::error::{GameError, Result};
use crate::game::session::SessionSettings;

/// Server settings read from the environment.
#[derive(Clone, Debug, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Time control handed to every new session.
    pub session: SessionSettings,
    pub tick_interval: Duration,
    pub drain_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 8080,
            session: SessionSettings::default(),
            tick_interval: Duration::from_millis(1000),
            drain_interval: Duration::from_millis(100),
        }
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T> {
    match lookup(name) {
        Some(raw) => raw.trim().parse().map_err(|_| GameError::InvalidConfig {
            reason: format!("{} has invalid value {:?}", name, raw),
        }),
        None => Ok(default),
    }
}

fn millis(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: Duration) -> Result<Duration> {
    let ms: u64 = parse_var(lookup, name, default.as_millis() as u64)?;
    if ms == 0 {
        return Err(GameError::InvalidConfig {
            reason: format!("{} must be positive", name),
        });
    }
    Ok(Duration::from_millis(ms))
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = ServerConfig::default();

        let total_length: f64 = parse_var(&lookup, "GAME_LENGTH", defaults.session.total_length)?;
        let per_move: f64 = parse_var(&lookup, "MOVE_BONUS", defaults.session.per_move)?;
        if !(total_length > 0.0 && per_move >= 0.0) {
            return Err(GameError::InvalidConfig {
                reason: format!("time control {} + {} is not usable", total_length, per_move),
            });
        }

        Ok(ServerConfig {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_var(&lookup, "PORT", defaults.port)?,
            session: SessionSettings {
                total_length,
                per_move,
            },
            tick_interval: millis(&lookup, "TICK_INTERVAL_MS", defaults.tick_interval)?,
            drain_interval: millis(&lookup, "DRAIN_INTERVAL_MS", defaults.drain_interval)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.session.total_length, 360.0);
    }

    #[test]
    fn reads_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "9001"),
            ("GAME_LENGTH", "600"),
            ("MOVE_BONUS", "2.5"),
            ("TICK_INTERVAL_MS", "250"),
        ]))
        .unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 9001);
        assert_eq!(config.session.total_length, 600.0);
        assert_eq!(config.session.per_move, 2.5);
        assert_eq!(config.tick_interval, Duration::from_millis(250));
        assert_eq!(config.drain_interval, Duration::from_millis(100));
    }

    #[test]
    fn rejects_bad_values() {
        for vars in [
            [("PORT", "eighty")],
            [("PORT", "70000")],
            [("GAME_LENGTH", "0")],
            [("MOVE_BONUS", "-1")],
            [("DRAIN_INTERVAL_MS", "0")],
        ] {
            let err = ServerConfig::from_lookup(lookup(&vars)).unwrap_err();
            assert!(matches!(err, GameError::InvalidConfig { .. }), "{:?}", vars);
        }
    }
}
