use crate::error::{FwGateError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file looked up in the search root when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "fwgate.toml";

pub const DEFAULT_MANIFEST_PATH: &str = "common/fw/firmware-version.h";

pub const DEFAULT_UPDATER_NAME: &str = if cfg!(target_os = "windows") {
    "rs-fw-update.exe"
} else {
    "rs-fw-update"
};

/// Run configuration, read from `fwgate.toml` and overridden by CLI flags
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Firmware version header, relative to the search root unless absolute
    pub manifest_path: PathBuf,
    /// File name of the update tool searched for below the root
    pub updater_name: String,
    /// Product line masks of devices this run applies to (`D400*`, `L500*`)
    pub supported_product_lines: Vec<String>,
    /// Seconds the update tool may run before it is killed
    pub timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            manifest_path: PathBuf::from(DEFAULT_MANIFEST_PATH),
            updater_name: DEFAULT_UPDATER_NAME.to_string(),
            supported_product_lines: vec!["L500*".to_string(), "D400*".to_string()],
            timeout_secs: None,
        }
    }
}

impl Config {
    /// Load `explicit` if given, else `<root>/fwgate.toml` if present, else defaults
    pub fn load(root: &Path, explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => {
                if !path.is_file() {
                    return Err(FwGateError::Config(format!(
                        "Config file '{}' not found",
                        path.display()
                    )));
                }
                path.to_path_buf()
            }
            None => {
                let candidate = root.join(DEFAULT_CONFIG_FILE);
                if !candidate.is_file() {
                    return Ok(Self::default());
                }
                candidate
            }
        };

        let content = fs::read_to_string(&path).map_err(|e| {
            FwGateError::Config(format!("Failed to read '{}': {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.updater_name.trim().is_empty() {
            return Err(FwGateError::Config("updater_name must not be empty".into()));
        }
        if self.updater_name.contains(['/', '\\']) {
            return Err(FwGateError::Config(format!(
                "updater_name '{}' must be a file name, not a path",
                self.updater_name
            )));
        }
        if self.timeout_secs == Some(0) {
            return Err(FwGateError::Config("timeout_secs must be positive".into()));
        }
        Ok(())
    }

    pub fn manifest_path(&self, root: &Path) -> PathBuf {
        root.join(&self.manifest_path)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}
