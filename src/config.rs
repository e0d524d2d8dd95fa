use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default = "default_listen")]
    pub listen: String,
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,
    #[serde(default = "default_service_manager_command")]
    pub service_manager_command: Vec<String>,
    #[serde(default)]
    pub system: SystemConfig,
    #[serde(default)]
    pub pihole: PiholeConfig,
    #[serde(default)]
    pub pivpn: PivpnConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SystemConfig {
    #[serde(default = "default_temperature_paths")]
    pub temperature_paths: Vec<PathBuf>,
    #[serde(default = "default_uptime_path")]
    pub uptime_path: PathBuf,
    #[serde(default = "default_disk_mount")]
    pub disk_mount: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PiholeConfig {
    #[serde(default = "default_pihole_units")]
    pub units: Vec<String>,
    #[serde(default = "default_pihole_status_command")]
    pub status_command: Vec<String>,
    #[serde(default = "default_pihole_stat_keys")]
    pub stat_keys: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PivpnConfig {
    #[serde(default = "default_pivpn_units")]
    pub units: Vec<String>,
    #[serde(default = "default_pivpn_clients_command")]
    pub clients_command: Vec<String>,
    #[serde(default = "default_pivpn_header_lines")]
    pub header_lines: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            interval_secs: default_interval_secs(),
            command_timeout_secs: default_command_timeout_secs(),
            service_manager_command: default_service_manager_command(),
            system: SystemConfig::default(),
            pihole: PiholeConfig::default(),
            pivpn: PivpnConfig::default(),
        }
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            temperature_paths: default_temperature_paths(),
            uptime_path: default_uptime_path(),
            disk_mount: default_disk_mount(),
        }
    }
}

impl Default for PiholeConfig {
    fn default() -> Self {
        Self {
            units: default_pihole_units(),
            status_command: default_pihole_status_command(),
            stat_keys: default_pihole_stat_keys(),
        }
    }
}

impl Default for PivpnConfig {
    fn default() -> Self {
        Self {
            units: default_pivpn_units(),
            clients_command: default_pivpn_clients_command(),
            header_lines: default_pivpn_header_lines(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read monitor config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("monitor config {origin} is not valid YAML: {source}")]
    Parse {
        origin: String,
        source: serde_yaml::Error,
    },
    #[error("invalid configuration: {0}")]
    Validation(String),
}

impl Config {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(text) => Self::from_yaml(&text, &path.display().to_string()),
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    // `origin` names the document in errors.
    pub fn from_yaml(text: &str, origin: &str) -> Result<Self, ConfigError> {
        let cfg: Config = serde_yaml::from_str(text).map_err(|source| ConfigError::Parse {
            origin: origin.to_string(),
            source,
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.listen.trim().is_empty() {
            return Err(ConfigError::Validation("listen is required".to_string()));
        }
        if SocketAddr::from_str(&self.listen).is_err() {
            return Err(ConfigError::Validation(
                "listen must be a valid host:port address".to_string(),
            ));
        }
        if self.interval_secs < 1 {
            return Err(ConfigError::Validation(
                "interval_secs must be >= 1".to_string(),
            ));
        }
        if self.command_timeout_secs < 1 {
            return Err(ConfigError::Validation(
                "command_timeout_secs must be >= 1".to_string(),
            ));
        }

        validate_command("service_manager_command", &self.service_manager_command)?;
        validate_command("pihole.status_command", &self.pihole.status_command)?;
        validate_command("pivpn.clients_command", &self.pivpn.clients_command)?;

        for key in &self.pihole.stat_keys {
            if key == "service_ok" {
                return Err(ConfigError::Validation(
                    "pihole.stat_keys must not contain 'service_ok'".to_string(),
                ));
            }
            if !is_metric_name(key) {
                return Err(ConfigError::Validation(format!(
                    "pihole.stat_keys entry '{key}' must match [a-zA-Z_][a-zA-Z0-9_]*"
                )));
            }
        }

        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        SocketAddr::from_str(&self.listen).map_err(|err| {
            ConfigError::Validation(format!("listen '{}' is not an address: {err}", self.listen))
        })
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub fn example_yaml() -> &'static str {
        include_str!("../config.yaml.example")
    }
}

fn validate_command(field: &str, argv: &[String]) -> Result<(), ConfigError> {
    match argv.first() {
        Some(program) if !program.trim().is_empty() => Ok(()),
        _ => Err(ConfigError::Validation(format!(
            "{field} must name a program"
        ))),
    }
}

fn is_metric_name(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn default_listen() -> String {
    "0.0.0.0:8081".to_string()
}

const fn default_interval_secs() -> u64 {
    10
}

const fn default_command_timeout_secs() -> u64 {
    5
}

fn default_service_manager_command() -> Vec<String> {
    vec!["systemctl".to_string(), "is-active".to_string()]
}

fn default_temperature_paths() -> Vec<PathBuf> {
    vec![
        PathBuf::from("/sys/class/thermal/thermal_zone0/temp"),
        PathBuf::from("/sys/class/hwmon/hwmon0/temp1_input"),
    ]
}

fn default_uptime_path() -> PathBuf {
    PathBuf::from("/proc/uptime")
}

fn default_disk_mount() -> PathBuf {
    PathBuf::from("/")
}

fn default_pihole_units() -> Vec<String> {
    vec!["pihole-FTL.service".to_string()]
}

fn default_pihole_status_command() -> Vec<String> {
    vec!["pihole".to_string(), "-c".to_string(), "-j".to_string()]
}

fn default_pihole_stat_keys() -> Vec<String> {
    [
        "dns_queries_today",
        "ads_blocked_today",
        "ads_percentage_today",
        "domains_being_blocked",
    ]
    .iter()
    .map(|k| k.to_string())
    .collect()
}

fn default_pivpn_units() -> Vec<String> {
    [
        "wg-quick@wg0.service",
        "openvpn.service",
        "openvpn-server@server.service",
    ]
    .iter()
    .map(|u| u.to_string())
    .collect()
}

fn default_pivpn_clients_command() -> Vec<String> {
    vec!["pivpn".to_string(), "-c".to_string()]
}

const fn default_pivpn_header_lines() -> usize {
    3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn example_yaml_matches_defaults() {
        let parsed = Config::from_yaml(Config::example_yaml(), "example").expect("example is valid");
        let defaults = Config::default();

        assert_eq!(parsed.listen, defaults.listen);
        assert_eq!(parsed.interval_secs, defaults.interval_secs);
        assert_eq!(parsed.command_timeout_secs, defaults.command_timeout_secs);
        assert_eq!(parsed.service_manager_command, defaults.service_manager_command);
        assert_eq!(parsed.system.temperature_paths, defaults.system.temperature_paths);
        assert_eq!(parsed.pihole.stat_keys, defaults.pihole.stat_keys);
        assert_eq!(parsed.pivpn.units, defaults.pivpn.units);
        assert_eq!(parsed.pivpn.header_lines, 3);
    }

    #[test]
    fn empty_document_uses_defaults() {
        let cfg = Config::from_yaml("{}", "inline").expect("defaults are valid");
        assert_eq!(cfg.interval(), Duration::from_secs(10));
        assert_eq!(cfg.command_timeout(), Duration::from_secs(5));
        assert_eq!(cfg.listen_addr().unwrap().port(), 8081);
    }

    #[test]
    fn rejects_bad_listen_and_zero_interval() {
        let mut cfg = Config::default();
        cfg.listen = "not-an-address".to_string();
        assert!(matches!(cfg.validate(), Err(ConfigError::Validation(_))));

        let mut cfg = Config::default();
        cfg.interval_secs = 0;
        assert!(matches!(cfg.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn rejects_stat_keys_that_are_not_metric_names() {
        let mut cfg = Config::default();
        cfg.pihole.stat_keys.push("ads blocked".to_string());
        assert!(cfg.validate().is_err());

        cfg.pihole.stat_keys = vec!["9lives".to_string()];
        assert!(cfg.validate().is_err());

        cfg.pihole.stat_keys = vec!["_ok_9".to_string()];
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_empty_command() {
        let mut cfg = Config::default();
        cfg.pivpn.clients_command = vec![];
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = Config::load_from_file("/definitely/not/here.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        assert!(err.to_string().contains("/definitely/not/here.yaml"));
    }

    #[test]
    fn parse_and_validation_errors_from_yaml() {
        let err = Config::from_yaml("interval_secs: [oops", "pimonitord.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("pimonitord.yaml"));

        let err = Config::from_yaml("interval_secs: 0", "pimonitord.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }
}
