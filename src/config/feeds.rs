// src/config/feeds.rs
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::feed::fetch::DEFAULT_RELAY_BASE;
use crate::feed::mirrors::{default_hosts, parse_host_list};

pub const DEFAULT_FEEDS_CONFIG_PATH: &str = "config/feeds.toml";
pub const DEFAULT_HANDLE: &str = "envy_fgc";
pub const DEFAULT_CHANNEL_ID: &str = "UC4GVzh8HVrrtYEkgVskWTsg";

pub const ENV_FEEDS_CONFIG_PATH: &str = "FEEDS_CONFIG_PATH";
pub const ENV_HANDLE: &str = "TWITTER_HANDLE";
pub const ENV_MIRROR_HOSTS: &str = "NITTER_HOSTS";
pub const ENV_CHANNEL_ID: &str = "YOUTUBE_CHANNEL_ID";
pub const ENV_API_KEY: &str = "YOUTUBE_API_KEY";
pub const ENV_RELAY_BASE: &str = "READER_RELAY_BASE";

/// Identifiers the pipelines read. Read-only once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedsConfig {
    /// Empty disables the microblog source.
    pub handle: String,
    pub mirror_hosts: Vec<String>,
    /// Empty disables the video source.
    pub channel_id: String,
    pub api_key: Option<String>,
    /// Empty disables the relay fallback.
    pub relay_base: String,
}

impl Default for FeedsConfig {
    fn default() -> Self {
        Self {
            handle: DEFAULT_HANDLE.to_string(),
            mirror_hosts: default_hosts(),
            channel_id: DEFAULT_CHANNEL_ID.to_string(),
            api_key: None,
            relay_base: DEFAULT_RELAY_BASE.to_string(),
        }
    }
}

/// Optional TOML layer. Every key may be omitted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedsFile {
    pub handle: Option<String>,
    /// Either a list or a comma-separated string.
    pub mirror_hosts: Option<HostList>,
    pub channel_id: Option<String>,
    pub api_key: Option<String>,
    pub relay_base: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum HostList {
    List(Vec<String>),
    Csv(String),
}

impl HostList {
    fn hosts(&self) -> Vec<String> {
        match self {
            HostList::List(v) => parse_host_list(&v.join(",")),
            HostList::Csv(s) => parse_host_list(s),
        }
    }
}

impl FeedsFile {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("parsing feeds toml")
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading feeds config from {}", path.display()))?;
        Self::from_toml_str(&data)
    }
}

impl FeedsConfig {
    /// Layer `file` then `var` (environment lookup) over the defaults.
    /// A variable that is set but empty clears the value; that is how a
    /// source is switched off.
    pub fn from_sources<F>(file: Option<FeedsFile>, var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(f) = file {
            if let Some(h) = f.handle {
                cfg.handle = h;
            }
            if let Some(list) = f.mirror_hosts {
                cfg.mirror_hosts = list.hosts();
            }
            if let Some(c) = f.channel_id {
                cfg.channel_id = c;
            }
            if f.api_key.is_some() {
                cfg.api_key = f.api_key;
            }
            if let Some(r) = f.relay_base {
                cfg.relay_base = r;
            }
        }

        if let Some(h) = var(ENV_HANDLE) {
            cfg.handle = h;
        }
        if let Some(list) = var(ENV_MIRROR_HOSTS) {
            cfg.mirror_hosts = parse_host_list(&list);
        }
        if let Some(c) = var(ENV_CHANNEL_ID) {
            cfg.channel_id = c;
        }
        if let Some(k) = var(ENV_API_KEY) {
            cfg.api_key = Some(k);
        }
        if let Some(r) = var(ENV_RELAY_BASE) {
            cfg.relay_base = r;
        }

        cfg.handle = cfg.handle.trim().trim_start_matches('@').to_string();
        cfg.channel_id = cfg.channel_id.trim().to_string();
        cfg.api_key = cfg
            .api_key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());
        cfg.relay_base = cfg.relay_base.trim().to_string();
        cfg
    }

    /// Load using env var + fallbacks:
    /// 1) file at $FEEDS_CONFIG_PATH (must exist when set)
    /// 2) config/feeds.toml when present
    /// 3) process environment on top
    pub fn from_env() -> Result<Self> {
        let file = match std::env::var(ENV_FEEDS_CONFIG_PATH) {
            Ok(p) => Some(FeedsFile::load_from_file(PathBuf::from(p))?),
            Err(_) => {
                let p = PathBuf::from(DEFAULT_FEEDS_CONFIG_PATH);
                if p.exists() {
                    Some(FeedsFile::load_from_file(&p)?)
                } else {
                    None
                }
            }
        };
        Ok(Self::from_sources(file, |k| std::env::var(k).ok()))
    }
}
