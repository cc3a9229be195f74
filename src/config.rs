use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};

/// Settings shared by all checks. Layered as defaults, then the YAML file,
/// then `CHECK_WG_*` environment variables; command-line flags win over
/// all of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub handshake: HandshakeConfig,

    /// Deadline for one reverse-DNS lookup.
    #[serde(default = "default_dns_timeout", with = "humantime_serde")]
    pub dns_timeout: Duration,

    /// Annotate peers with reverse-DNS hostnames.
    #[serde(default)]
    pub resolve: bool,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandshakeConfig {
    #[serde(default = "default_warn", with = "humantime_serde")]
    pub warn: Duration,
    #[serde(default = "default_crit", with = "humantime_serde")]
    pub crit: Duration,
}

fn default_warn() -> Duration {
    Duration::from_secs(5 * 60)
}

fn default_crit() -> Duration {
    Duration::from_secs(15 * 60)
}

fn default_dns_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            warn: default_warn(),
            crit: default_crit(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            handshake: HandshakeConfig::default(),
            dns_timeout: default_dns_timeout(),
            resolve: false,
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// `~/.config/check_wg/config.yaml`, if a config directory exists.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("check_wg").join("config.yaml"))
    }
}

/// Load configuration. An explicit `path` must exist; the default path is
/// skipped when missing.
pub fn load(path: Option<&Path>) -> Result<Config> {
    let mut figment = Figment::from(Serialized::defaults(Config::default()));

    match path {
        Some(path) => {
            if !path.is_file() {
                bail!("config file {} not found", path.display());
            }
            figment = figment.merge(Yaml::file(path));
        }
        None => {
            if let Some(path) = Config::default_path() {
                figment = figment.merge(Yaml::file(path));
            }
        }
    }

    figment
        .merge(Env::prefixed("CHECK_WG_").split("__"))
        .extract()
        .context("loading configuration")
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    fn load_in_jail(path: Option<&Path>) -> figment::error::Result<Config> {
        load(path).map_err(|e| format!("{e:#}").into())
    }

    #[test]
    fn defaults() {
        Jail::expect_with(|jail| {
            let dir = jail.directory().display().to_string();
            jail.set_env("XDG_CONFIG_HOME", dir);
            let config = load_in_jail(None)?;
            assert_eq!(config, Config::default());
            assert_eq!(config.handshake.warn, Duration::from_secs(300));
            assert_eq!(config.handshake.crit, Duration::from_secs(900));
            assert_eq!(config.dns_timeout, Duration::from_secs(10));
            Ok(())
        });
    }

    #[test]
    fn file_then_env() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "check.yaml",
                "handshake:\n  warn: 2m\n  crit: 10m\nresolve: true\n",
            )?;
            jail.set_env("CHECK_WG_HANDSHAKE__CRIT", "20m");
            jail.set_env("CHECK_WG_LOG_LEVEL", "debug");

            let config = load_in_jail(Some(Path::new("check.yaml")))?;
            assert_eq!(config.handshake.warn, Duration::from_secs(120));
            assert_eq!(config.handshake.crit, Duration::from_secs(1200));
            assert!(config.resolve);
            assert_eq!(config.log_level, "debug");
            assert_eq!(config.dns_timeout, Duration::from_secs(10));
            Ok(())
        });
    }

    #[test]
    fn default_path_file_is_read() {
        Jail::expect_with(|jail| {
            let dir = jail.directory().display().to_string();
            jail.set_env("XDG_CONFIG_HOME", dir);
            std::fs::create_dir_all(jail.directory().join("check_wg"))
                .map_err(|e| e.to_string())?;
            jail.create_file("check_wg/config.yaml", "dns_timeout: 3s\n")?;

            let config = load_in_jail(None)?;
            assert_eq!(config.dns_timeout, Duration::from_secs(3));
            Ok(())
        });
    }

    #[test]
    fn explicit_missing_file_fails() {
        Jail::expect_with(|_| {
            let err = load(Some(Path::new("nope.yaml"))).unwrap_err();
            assert!(err.to_string().contains("not found"));
            Ok(())
        });
    }

    #[test]
    fn bad_duration_fails() {
        Jail::expect_with(|jail| {
            jail.create_file("check.yaml", "handshake:\n  warn: soon\n")?;
            assert!(load(Some(Path::new("check.yaml"))).is_err());
            Ok(())
        });
    }
}
