//! Runtime configuration: defaults, then environment, then command-line flags.
use std::env;

use crate::fetch::DEFAULT_BASE_URL;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8050;

/// Settings shared by the web and terminal front-ends.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Root of the REST API, without a trailing slash.
    pub base_url: String,
    pub host: String,
    pub port: u16,
    /// Bounds offered by the id input. The transport itself does not enforce them.
    pub min_id: u32,
    pub max_id: u32,
    /// Id shown when a front-end starts.
    pub initial_id: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            min_id: 1,
            max_id: 151,
            initial_id: 7,
        }
    }
}

impl Config {
    /// Construct configuration from environment variables.
    ///
    /// Environment variables:
    /// - `POKEVIEW_BASE_URL` - API root (default: `https://pokeapi.co/api/v2`)
    /// - `POKEVIEW_HOST` - bind address for the web UI (default: `0.0.0.0`)
    /// - `POKEVIEW_PORT` - port for the web UI (default: 8050)
    /// - `POKEVIEW_MAX_ID` / `POKEMON_LIMIT` - upper id bound (default: 151)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("POKEVIEW_BASE_URL").filter(|s| !s.trim().is_empty()) {
            config.base_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(host) = lookup("POKEVIEW_HOST").filter(|s| !s.trim().is_empty()) {
            config.host = host.trim().to_string();
        }
        if let Some(port) = parse::<u16>(lookup("POKEVIEW_PORT")) {
            config.port = port;
        }
        if let Some(max) = parse::<u32>(lookup("POKEVIEW_MAX_ID"))
            .or_else(|| parse::<u32>(lookup("POKEMON_LIMIT")))
        {
            config.max_id = max.max(config.min_id);
        }
        config.initial_id = config.clamp_id(config.initial_id);

        config
    }

    /// Clamp an id into the range the front-ends offer.
    pub fn clamp_id(&self, id: u32) -> u32 {
        id.clamp(self.min_id, self.max_id)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse<T>(raw: Option<String>) -> Option<T>
where
    T: std::str::FromStr,
{
    raw?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_match_public_deployment() {
        let config = from_pairs(&[]);
        assert_eq!(config, Config::default());
        assert_eq!(config.bind_addr(), "0.0.0.0:8050");
        assert_eq!(config.base_url, "https://pokeapi.co/api/v2");
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = from_pairs(&[
            ("POKEVIEW_BASE_URL", "http://localhost:9000/api/v2/"),
            ("POKEVIEW_HOST", "127.0.0.1"),
            ("POKEVIEW_PORT", "9999"),
            ("POKEMON_LIMIT", "251"),
        ]);
        assert_eq!(config.base_url, "http://localhost:9000/api/v2");
        assert_eq!(config.bind_addr(), "127.0.0.1:9999");
        assert_eq!(config.max_id, 251);
    }

    #[test]
    fn unparsable_values_are_ignored() {
        let config = from_pairs(&[("POKEVIEW_PORT", "eighty"), ("POKEVIEW_MAX_ID", "-1")]);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.max_id, 151);
    }

    #[test]
    fn low_limit_pulls_initial_id_into_range() {
        let config = from_pairs(&[("POKEMON_LIMIT", "5")]);
        assert_eq!(config.max_id, 5);
        assert_eq!(config.initial_id, 5);
    }

    #[test]
    fn clamp_keeps_ids_in_range() {
        let config = Config::default();
        assert_eq!(config.clamp_id(0), 1);
        assert_eq!(config.clamp_id(7), 7);
        assert_eq!(config.clamp_id(500), 151);
    }
}
