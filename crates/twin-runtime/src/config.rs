//! `twin.toml` configuration loading.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use smol_str::SmolStr;

use crate::error::TwinError;

pub const CONFIG_FILE: &str = "twin.toml";
pub const DEFAULT_IDE_LISTEN: &str = "127.0.0.1:6000";
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, PartialEq)]
pub struct TwinConfig {
    pub ide: IdeConfig,
    pub api: ApiConfig,
    pub simulation: SimulationConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdeConfig {
    pub listen: SmolStr,
    /// Holds the `svg/` and `scripts/` resource folders.
    pub resources: PathBuf,
    /// Where generated documents are written.
    pub output: PathBuf,
    pub examples: PathBuf,
    pub log_level: SmolStr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub listen: SmolStr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationConfig {
    pub enabled: bool,
    pub interval: Duration,
    /// Sensor API base URL; the local mock generator is used when unset.
    pub api_url: Option<SmolStr>,
}

impl Default for TwinConfig {
    fn default() -> Self {
        TwinToml::default()
            .into_config(Path::new("."))
            .unwrap_or_else(|_| unreachable!("built-in defaults are valid"))
    }
}

impl TwinConfig {
    /// Load a config file. Relative paths are resolved against the file's directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TwinError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| {
            TwinError::InvalidConfig(format!("{}: {err}", path.display()).into())
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_toml_str(&text, base)
            .map_err(|err| TwinError::InvalidConfig(format!("{}: {err}", path.display()).into()))
    }

    /// Like [`TwinConfig::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, TwinError> {
        let path = path.as_ref();
        if path.is_file() {
            Self::load(path)
        } else {
            let base = path.parent().unwrap_or_else(|| Path::new("."));
            TwinToml::default().into_config(base)
        }
    }

    pub fn from_toml_str(text: &str, base: &Path) -> Result<Self, TwinError> {
        let raw: TwinToml =
            toml::from_str(text).map_err(|err| TwinError::InvalidConfig(err.to_string().into()))?;
        raw.into_config(base)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TwinToml {
    ide: Option<IdeSection>,
    api: Option<ApiSection>,
    simulation: Option<SimulationSection>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct IdeSection {
    listen: Option<String>,
    resources: Option<String>,
    output: Option<String>,
    examples: Option<String>,
    log_level: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ApiSection {
    listen: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SimulationSection {
    enabled: Option<bool>,
    interval_ms: Option<u64>,
    api_url: Option<String>,
}

fn check_listen(section: &str, listen: &str) -> Result<SmolStr, TwinError> {
    let trimmed = listen.trim();
    match trimmed.rsplit_once(':') {
        Some((_, port)) if port.parse::<u16>().is_ok() => Ok(SmolStr::new(trimmed)),
        _ => Err(TwinError::InvalidConfig(
            format!("invalid {section}.listen '{listen}'").into(),
        )),
    }
}

fn resolve(base: &Path, value: Option<String>, default: &str) -> PathBuf {
    let path = PathBuf::from(value.unwrap_or_else(|| default.to_string()));
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

impl TwinToml {
    fn into_config(self, base: &Path) -> Result<TwinConfig, TwinError> {
        let ide = self.ide.unwrap_or_default();
        let api = self.api.unwrap_or_default();
        let simulation = self.simulation.unwrap_or_default();

        let log_level = ide
            .log_level
            .unwrap_or_else(|| "info".into())
            .trim()
            .to_ascii_lowercase();
        if !LOG_LEVELS.contains(&log_level.as_str()) {
            return Err(TwinError::InvalidConfig(
                format!("invalid ide.log_level '{log_level}'").into(),
            ));
        }

        let interval_ms = simulation.interval_ms.unwrap_or(3000);
        if interval_ms == 0 {
            return Err(TwinError::InvalidConfig(
                "simulation.interval_ms must be greater than zero".into(),
            ));
        }
        let api_url = match simulation.api_url {
            Some(url) if url.starts_with("http://") || url.starts_with("https://") => {
                Some(SmolStr::new(url.trim_end_matches('/')))
            }
            Some(url) => {
                return Err(TwinError::InvalidConfig(
                    format!("invalid simulation.api_url '{url}'").into(),
                ))
            }
            None => None,
        };

        Ok(TwinConfig {
            ide: IdeConfig {
                listen: check_listen(
                    "ide",
                    ide.listen.as_deref().unwrap_or(DEFAULT_IDE_LISTEN),
                )?,
                resources: resolve(base, ide.resources, "resources"),
                output: resolve(base, ide.output, "public"),
                examples: resolve(base, ide.examples, "resources/examples"),
                log_level: SmolStr::new(log_level),
            },
            api: ApiConfig {
                listen: check_listen(
                    "api",
                    api.listen
                        .as_deref()
                        .unwrap_or(crate::api::DEFAULT_API_LISTEN),
                )?,
            },
            simulation: SimulationConfig {
                enabled: simulation.enabled.unwrap_or(false),
                interval: Duration::from_millis(interval_ms),
                api_url,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = TwinConfig::from_toml_str("", Path::new("/srv/twin")).expect("config");
        assert_eq!(config.ide.listen, DEFAULT_IDE_LISTEN);
        assert_eq!(config.ide.resources, PathBuf::from("/srv/twin/resources"));
        assert_eq!(config.ide.output, PathBuf::from("/srv/twin/public"));
        assert_eq!(config.ide.log_level, "info");
        assert_eq!(config.api.listen, "127.0.0.1:5011");
        assert_eq!(config.simulation.interval, Duration::from_millis(3000));
        assert!(!config.simulation.enabled);
        assert_eq!(config.simulation.api_url, None);
    }

    #[test]
    fn sections_override_defaults() {
        let text = r#"
[ide]
listen = "0.0.0.0:7000"
resources = "/data/res"
log_level = "DEBUG"

[simulation]
enabled = true
interval_ms = 500
api_url = "http://127.0.0.1:5011/"
"#;
        let config = TwinConfig::from_toml_str(text, Path::new("/srv")).expect("config");
        assert_eq!(config.ide.listen, "0.0.0.0:7000");
        assert_eq!(config.ide.resources, PathBuf::from("/data/res"));
        assert_eq!(config.ide.log_level, "debug");
        assert!(config.simulation.enabled);
        assert_eq!(config.simulation.interval, Duration::from_millis(500));
        assert_eq!(
            config.simulation.api_url.as_deref(),
            Some("http://127.0.0.1:5011")
        );
    }

    #[test]
    fn invalid_values_are_rejected() {
        for text in [
            "[ide]\nlog_level = \"loud\"",
            "[simulation]\ninterval_ms = 0",
            "[simulation]\napi_url = \"ftp://x\"",
            "[api]\nlisten = \"nowhere\"",
            "[ide]\nunknown = 1",
        ] {
            let err = TwinConfig::from_toml_str(text, Path::new(".")).expect_err(text);
            assert!(matches!(err, TwinError::InvalidConfig(_)), "{text}: {err}");
        }
    }
}
