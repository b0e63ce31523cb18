// Copyright 2026 Phonedex Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use serde::Deserialize;
use serde::Serialize;

const APP_DIR: &str = "phonedex";
const CONFIG_FILE: &str = "phonedex.toml";

/// Which dataset backend serves searches. Chosen once per process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Rest,
    Index,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Rest => f.write_str("rest"),
            BackendKind::Index => f.write_str("index"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub app_id: String,
    pub api_key: String,
    pub index_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

impl IndexConfig {
    pub fn host(&self) -> String {
        match &self.host {
            Some(host) => host.trim_end_matches('/').to_string(),
            None => format!("https://{}-dsn.algolia.net", self.app_id.to_lowercase()),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.app_id.is_empty() && !self.api_key.is_empty() && !self.index_name.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_url: String,
    pub backend: BackendKind,
    pub page_limit: usize,
    pub max_limit: usize,
    pub timeout_secs: u64,
    pub user_agent: String,
    pub comparison_path: PathBuf,
    pub comparison_cap: usize,
    pub index: IndexConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000".to_string(),
            backend: BackendKind::Rest,
            page_limit: 20,
            max_limit: 100,
            timeout_secs: 30,
            user_agent: format!("phonedex/{}", env!("CARGO_PKG_VERSION")),
            comparison_path: PathBuf::from("comparison.json"),
            comparison_cap: 5,
            index: IndexConfig::default(),
        }
    }
}

impl Config {
    pub fn api_base(&self) -> &str {
        self.api_url.trim_end_matches('/')
    }

    /// Requested page size, clamped into `1..=max_limit`.
    pub fn clamp_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.page_limit)
            .clamp(1, self.max_limit.max(1))
    }
}

#[derive(Debug, Clone)]
pub struct ConfigCtx {
    pub dir: PathBuf,
    pub config: Config,
}

impl ConfigCtx {
    pub fn load() -> Result<Self> {
        let dir = app_config_dir()
            .ok_or_else(|| anyhow::anyhow!("config dir unavailable; set HOME or XDG_CONFIG_HOME"))?;
        let config = load_global_config()?;
        Ok(Self { dir, config })
    }

    pub fn comparison_path(&self) -> PathBuf {
        if self.config.comparison_path.is_absolute() {
            self.config.comparison_path.clone()
        } else {
            self.dir.join(&self.config.comparison_path)
        }
    }
}

fn config_dir() -> Option<PathBuf> {
    if cfg!(target_os = "windows") {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return Some(PathBuf::from(appdata));
        }
        if let Ok(profile) = std::env::var("USERPROFILE") {
            return Some(PathBuf::from(profile).join("AppData").join("Roaming"));
        }
        return None;
    }

    if cfg!(target_os = "macos") {
        let home = std::env::var("HOME").ok()?;
        return Some(
            PathBuf::from(home)
                .join("Library")
                .join("Application Support"),
        );
    }

    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg));
    }
    let home = std::env::var("HOME").ok()?;
    Some(PathBuf::from(home).join(".config"))
}

pub fn app_config_dir() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join(APP_DIR))
}

pub fn global_config_path() -> Option<PathBuf> {
    app_config_dir().map(|dir| dir.join(CONFIG_FILE))
}

pub fn load_global_config() -> Result<Config> {
    let Some(path) = global_config_path() else {
        return Ok(Config::default());
    };
    if !path.exists() {
        return Ok(Config::default());
    }
    read_config(&path)
}

pub fn read_config(path: &Path) -> Result<Config> {
    let text = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let mut config: Config = toml::from_str(&text).context("parse phonedex.toml")?;
    if config.max_limit == 0 {
        config.max_limit = Config::default().max_limit;
    }
    config.page_limit = config.page_limit.clamp(1, config.max_limit);
    if config.comparison_cap == 0 {
        log::warn!("comparison_cap must be at least 1; using the default");
        config.comparison_cap = Config::default().comparison_cap;
    }
    Ok(config)
}

pub fn write_config(path: &Path, config: &Config) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create dir {}", parent.display()))?;
    }
    let text = toml::to_string_pretty(config).context("serialize config")?;
    std::fs::write(path, text).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}
