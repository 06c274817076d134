//! Settings file for the diagnostics extension
//!
//! ```toml
//! enabled = true
//! wadcfg_path = "wadcfg.xml"
//!
//! [storage]
//! account_name = "mystorage"
//! account_key = "..."
//! endpoints = ["https://mystorage.blob.example", "https://mystorage.queue.example", "https://mystorage.table.example"]
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};

use super::constants::ACCOUNT_KEY_ENV_VAR;
use crate::extensions::DiagnosticsExtensionBuilder;
use crate::types::Result;
use crate::xml::parse_document;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiagnosticsSettings {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// WadCfg file, relative to the settings file
    pub wadcfg_path: Option<PathBuf>,
    pub storage: Option<StorageSettings>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageSettings {
    pub account_name: String,
    pub account_key: Option<String>,
    pub endpoints: Option<Vec<String>>,
}

fn default_enabled() -> bool {
    true
}

/// Load settings from a TOML file
pub fn load_settings(path: &Path) -> Result<DiagnosticsSettings> {
    debug!("Reading diagnostics settings from {:?}", path);
    let text = fs::read_to_string(path)?;
    let settings: DiagnosticsSettings = toml::from_str(&text)?;
    info!("Loaded diagnostics settings from {:?}", path);
    Ok(settings)
}

impl DiagnosticsSettings {
    /// Read the WadCfg file and validate everything into a builder
    ///
    /// `base_dir` resolves a relative `wadcfg_path`. The account key falls back
    /// to the `VMDIAG_STORAGE_ACCOUNT_KEY` environment variable.
    pub fn into_builder(self, base_dir: &Path) -> Result<DiagnosticsExtensionBuilder> {
        let key_from_env = std::env::var(ACCOUNT_KEY_ENV_VAR).ok();
        self.into_builder_with_key(base_dir, key_from_env)
    }

    fn into_builder_with_key(
        self,
        base_dir: &Path,
        fallback_key: Option<String>,
    ) -> Result<DiagnosticsExtensionBuilder> {
        if !self.enabled {
            return Ok(DiagnosticsExtensionBuilder::disabled());
        }

        let wad_cfg = match &self.wadcfg_path {
            Some(path) => {
                let path = base_dir.join(path);
                debug!("Loading WadCfg from {:?}", path);
                Some(parse_document(&fs::read_to_string(&path)?)?)
            }
            None => None,
        };

        let storage = self.storage.as_ref();
        let account_key = storage
            .and_then(|s| s.account_key.clone())
            .or(fallback_key);
        let endpoints: Option<Vec<&str>> = storage
            .and_then(|s| s.endpoints.as_ref())
            .map(|list| list.iter().map(String::as_str).collect());

        DiagnosticsExtensionBuilder::from_fields(
            storage.map(|s| s.account_name.as_str()),
            account_key.as_deref(),
            endpoints.as_deref(),
            wad_cfg,
            true,
        )
    }
}
