// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use doit_app::{CommitStyle, Features};
use doit_client::{Client, Credentials};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const APP_NAME: &str = "doit";
const CONFIG_VERSION: i64 = 1;
const DEFAULT_TIMEOUT: &str = "10s";
const DEFAULT_PROTOCOL: &str = "http";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    pub server: Server,
    #[serde(default)]
    pub ui: Ui,
    #[serde(default)]
    pub log: Log,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Server {
    pub protocol: Option<String>,
    pub url: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub timeout: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Ui {
    pub tags: Option<bool>,
    pub notes: Option<bool>,
    pub commit: Option<CommitStyle>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Log {
    pub path: Option<String>,
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("DOIT_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set DOIT_CONFIG_PATH to the config file")
        })?;
        Ok(config_root.join(APP_NAME).join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            bail!(
                "config file {} does not exist; run `doit --print-example-config > {}` and fill in [server]",
                path.display(),
                path.display()
            );
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} is not versioned. Add `version = 1` and put connection settings under [server]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        let protocol = self.protocol();
        if !matches!(protocol, "http" | "https") {
            bail!(
                "server.protocol in {} must be http or https, got {:?}",
                path.display(),
                protocol
            );
        }

        if self.server.url.trim().is_empty() {
            bail!("server.url in {} must not be empty", path.display());
        }
        if self.server.url.contains("://") {
            bail!(
                "server.url in {} should be a host name only; put the scheme in server.protocol",
                path.display()
            );
        }

        if self.server.username.trim().is_empty() {
            bail!("server.username in {} must not be empty", path.display());
        }

        let timeout = self.timeout()?;
        if timeout.is_zero() {
            bail!(
                "server.timeout in {} must be positive, got {}",
                path.display(),
                self.server.timeout.as_deref().unwrap_or(DEFAULT_TIMEOUT)
            );
        }

        Ok(())
    }

    pub fn protocol(&self) -> &str {
        self.server.protocol.as_deref().unwrap_or(DEFAULT_PROTOCOL)
    }

    pub fn timeout(&self) -> Result<Duration> {
        parse_duration(self.server.timeout.as_deref().unwrap_or(DEFAULT_TIMEOUT))
    }

    pub fn features(&self) -> Features {
        Features {
            tags: self.ui.tags.unwrap_or(false),
            notes: self.ui.notes.unwrap_or(false),
            commit: self.ui.commit.unwrap_or_default(),
        }
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(&self.server.username, &self.server.password)
    }

    pub fn client(&self) -> Result<Client> {
        Client::from_parts(
            self.protocol(),
            &self.server.url,
            self.server.port,
            self.credentials(),
            self.features().schema(),
            self.timeout()?,
        )
    }

    /// Explicit `[log].path`, else the platform cache dir. `None` disables
    /// logging.
    pub fn log_path(&self) -> Option<PathBuf> {
        match &self.log.path {
            Some(path) => Some(PathBuf::from(path)),
            None => dirs::cache_dir().map(|root| root.join(APP_NAME).join("doit.log")),
        }
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# doit config\n# Place this file at: {}\n\nversion = 1\n\n[server]\nprotocol = \"{}\"\nurl = \"localhost\"\nport = 8080\nusername = \"me\"\npassword = \"secret\"\ntimeout = \"{}\"\n\n[ui]\n# Tagged server: four-field records plus the tag prompts\ntags = false\n# Server supports /newnote, /getnote and /deletenote\nnotes = false\n# selection: y marks every selected row done; toggle: to the cursor row\ncommit = \"{}\"\n\n[log]\n# Optional. Default is the platform cache dir (for example ~/.cache/doit/doit.log)\n# path = \"/absolute/path/to/doit.log\"\n",
            path.display(),
            DEFAULT_PROTOCOL,
            DEFAULT_TIMEOUT,
            CommitStyle::default().as_str(),
        )
    }
}

fn parse_duration(raw: &str) -> Result<Duration> {
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        let secs = mins
            .checked_mul(60)
            .with_context(|| format!("timeout duration {raw:?} is too large"))?;
        return Ok(Duration::from_secs(secs));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 500ms or 10s)")
}
