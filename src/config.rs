use std::path::PathBuf;
use std::str::FromStr;

/// Server settings, read from `COACHCAL_*` environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub bind: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub password: String,
    pub max_connections: usize,
    pub compact_threshold: u64,
    pub metrics_port: Option<u16>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: 7433,
            data_dir: PathBuf::from("./data"),
            password: "coachcal".into(),
            max_connections: 256,
            compact_threshold: 1000,
            metrics_port: None,
        }
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|s| s.trim().parse().ok())
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Unset or unparsable values keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            bind: lookup("COACHCAL_BIND").unwrap_or(defaults.bind),
            port: parsed(&lookup, "COACHCAL_PORT").unwrap_or(defaults.port),
            data_dir: lookup("COACHCAL_DATA_DIR").map(PathBuf::from).unwrap_or(defaults.data_dir),
            password: lookup("COACHCAL_PASSWORD").unwrap_or(defaults.password),
            max_connections: parsed(&lookup, "COACHCAL_MAX_CONNECTIONS")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_connections),
            compact_threshold: parsed(&lookup, "COACHCAL_COMPACT_THRESHOLD").unwrap_or(defaults.compact_threshold),
            metrics_port: parsed(&lookup, "COACHCAL_METRICS_PORT"),
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = Config::from_lookup(|_| None);
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.listen_addr(), "0.0.0.0:7433");
        assert!(cfg.metrics_port.is_none());
    }

    #[test]
    fn reads_every_variable() {
        let cfg = Config::from_lookup(lookup_from(&[
            ("COACHCAL_BIND", "127.0.0.1"),
            ("COACHCAL_PORT", "9000"),
            ("COACHCAL_DATA_DIR", "/var/lib/coachcal"),
            ("COACHCAL_PASSWORD", "hunter2"),
            ("COACHCAL_MAX_CONNECTIONS", "16"),
            ("COACHCAL_COMPACT_THRESHOLD", "50"),
            ("COACHCAL_METRICS_PORT", "9100"),
        ]));
        assert_eq!(cfg.listen_addr(), "127.0.0.1:9000");
        assert_eq!(cfg.data_dir, PathBuf::from("/var/lib/coachcal"));
        assert_eq!(cfg.password, "hunter2");
        assert_eq!(cfg.max_connections, 16);
        assert_eq!(cfg.compact_threshold, 50);
        assert_eq!(cfg.metrics_port, Some(9100));
    }

    #[test]
    fn bad_numbers_fall_back() {
        let cfg = Config::from_lookup(lookup_from(&[
            ("COACHCAL_PORT", "not-a-port"),
            ("COACHCAL_MAX_CONNECTIONS", "0"),
            ("COACHCAL_METRICS_PORT", "70000"),
        ]));
        assert_eq!(cfg.port, 7433);
        assert_eq!(cfg.max_connections, 256);
        assert_eq!(cfg.metrics_port, None);
    }
}
