use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use camino::Utf8PathBuf;
use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::domain::ExportFormat;
use crate::error::OverviewError;
use crate::linkahead::ConnectionConfig;
use crate::synthetic::SyntheticSpec;

pub const CONFIG_FILE_NAME: &str = "aba-overview.json";
pub const DEFAULT_TIMEOUT_SECS: u64 = 1000;

pub const ENV_URL: &str = "LINKAHEAD_URL";
pub const ENV_USERNAME: &str = "LINKAHEAD_USERNAME";
pub const ENV_PASSWORD: &str = "LINKAHEAD_PASSWORD";
pub const ENV_PROXY: &str = "LINKAHEAD_PROXY";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub linkahead: LinkaheadSection,
    #[serde(default)]
    pub synthetic: Option<SyntheticSpec>,
    #[serde(default)]
    pub export: Option<ExportSection>,
}

#[derive(Clone, Default, Deserialize, Serialize)]
pub struct LinkaheadSection {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub ssl_insecure: Option<bool>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub proxy: Option<String>,
}

impl fmt::Debug for LinkaheadSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkaheadSection")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("ssl_insecure", &self.ssl_insecure)
            .field("timeout_secs", &self.timeout_secs)
            .field("proxy", &self.proxy)
            .finish()
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ExportSection {
    #[serde(default)]
    pub dir: Option<String>,
    #[serde(default)]
    pub format: Option<ExportFormat>,
}

#[derive(Debug, Clone)]
pub struct ExportSettings {
    pub dir: Option<Utf8PathBuf>,
    pub format: ExportFormat,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub linkahead: LinkaheadSection,
    pub synthetic: SyntheticSpec,
    pub export: ExportSettings,
}

impl ResolvedConfig {
    pub fn connection(&self) -> Result<ConnectionConfig, OverviewError> {
        self.connection_with_env(|name| std::env::var(name).ok())
    }

    // Credentials are only checked here, so snapshot runs work without a password.
    pub fn connection_with_env<F>(&self, env: F) -> Result<ConnectionConfig, OverviewError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let section = &self.linkahead;
        let lookup = |value: &Option<String>, name: &str| {
            value
                .clone()
                .or_else(|| env(name))
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let url = lookup(&section.url, ENV_URL)
            .ok_or_else(|| OverviewError::InvalidConfig("linkahead.url is required".to_string()))?;
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(OverviewError::InvalidConfig(format!(
                "linkahead.url must be an http(s) URL: {url}"
            )));
        }
        let username = lookup(&section.username, ENV_USERNAME).ok_or_else(|| {
            OverviewError::InvalidConfig("linkahead.username is required".to_string())
        })?;
        let password = section
            .password
            .clone()
            .or_else(|| env(ENV_PASSWORD))
            .filter(|value| !value.is_empty())
            .ok_or(OverviewError::MissingCredential)?;

        Ok(ConnectionConfig {
            url: url.trim_end_matches('/').to_string(),
            username,
            password,
            ssl_insecure: section.ssl_insecure.unwrap_or(true),
            timeout: Duration::from_secs(section.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            proxy: lookup(&section.proxy, ENV_PROXY),
        })
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, OverviewError> {
        Self::resolve_optional(path)?.ok_or(OverviewError::MissingConfig)
    }

    /// Like [`ConfigLoader::resolve`], but `Ok(None)` when no path is given and no file is found.
    pub fn resolve_optional(path: Option<&str>) -> Result<Option<ResolvedConfig>, OverviewError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => match Self::locate() {
                Some(path) => path,
                None => return Ok(None),
            },
        };

        let content = fs::read_to_string(&config_path)
            .map_err(|_| OverviewError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| OverviewError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config).map(Some)
    }

    pub fn locate() -> Option<PathBuf> {
        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            return Some(local);
        }
        BaseDirs::new()
            .map(|dirs| dirs.config_dir().join("aba-overview").join(CONFIG_FILE_NAME))
            .filter(|path| path.exists())
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, OverviewError> {
        let schema_version = config.schema_version.unwrap_or(1);
        if schema_version != 1 {
            return Err(OverviewError::InvalidConfig(format!(
                "unsupported schema_version {schema_version}"
            )));
        }

        let export = config.export.unwrap_or_default();
        let export = ExportSettings {
            dir: export.dir.map(Utf8PathBuf::from),
            format: export.format.unwrap_or(ExportFormat::Xlsx),
        };

        Ok(ResolvedConfig {
            schema_version,
            linkahead: config.linkahead,
            synthetic: config.synthetic.unwrap_or_default(),
            export,
        })
    }
}
