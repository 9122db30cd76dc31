use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use pixa_store::StoreConfig;
use serde::{Deserialize, Serialize};

/// File name of the config inside a data directory.
pub const CONFIG_FILE: &str = "pixa.toml";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PixaConfig {
    /// Data directory holding `blobs/` and `catalog.json`.
    pub root: PathBuf,
    /// Default log filter when `RUST_LOG` is unset.
    pub log_level: String,
    /// Per-operation deadline; 0 disables it.
    pub operation_timeout_ms: u64,
    /// Row limit for `pixa ls` when `--limit` is not given.
    pub default_list_limit: usize,
}

impl Default for PixaConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(".pixa"),
            log_level: "warn".into(),
            operation_timeout_ms: 30_000,
            default_list_limit: 50,
        }
    }
}

impl PixaConfig {
    /// Resolve the config: an explicit file, else `<root>/pixa.toml` if it
    /// exists, else defaults. A `--root` flag always wins over the file.
    pub fn load(explicit: Option<&Path>, root: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::read(path)?,
            None => {
                let root = root
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| Self::default().root);
                let candidate = root.join(CONFIG_FILE);
                if candidate.is_file() {
                    Self::read(&candidate)?
                } else {
                    Self::default()
                }
            }
        };
        if let Some(root) = root {
            config.root = root.to_path_buf();
        }
        Ok(config)
    }

    pub fn read(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn to_toml(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn blobs_dir(&self) -> PathBuf {
        self.root.join("blobs")
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.root.join("catalog.json")
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            operation_timeout: (self.operation_timeout_ms > 0)
                .then(|| Duration::from_millis(self.operation_timeout_ms)),
            ..StoreConfig::default()
        }
    }
}
