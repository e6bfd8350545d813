use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FwGateError {
    #[error("Project validation failed: {0}")]
    ProjectValidation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Expected to find a file containing FW versions at {path}, but the file was not found")]
    ManifestNotFound { path: String },

    #[error("Could not find the update tool file ({name})")]
    UpdaterNotFound { name: String },

    #[error("No FW version found in {manifest} for product line {product_line}")]
    BundledVersionMissing {
        product_line: String,
        manifest: String,
    },

    #[error("Could not find image file {image} for {product_line} device with FW version: {version}")]
    ImageNotFound {
        image: String,
        product_line: String,
        version: String,
    },

    #[error("Either the device FW ({current}) or the bundled FW ({bundled}) was of an invalid format")]
    FormatMismatch { current: String, bundled: String },

    #[error("Invalid FW version '{input}': expected dot-separated non-negative integers")]
    InvalidVersion { input: String },

    #[error("Invalid product line '{input}': expected at least two characters")]
    InvalidProductLine { input: String },

    #[error("Expected 1 device, got {found}")]
    DeviceCount { found: usize },

    #[error("Updater execution failed: {0}")]
    Updater(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
}

/// Broad failure categories reported by a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    LookupMiss,
    FormatMismatch,
    DeviceCount,
    Subprocess,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::LookupMiss => "lookup miss",
            ErrorKind::FormatMismatch => "format mismatch",
            ErrorKind::DeviceCount => "device count",
            ErrorKind::Subprocess => "subprocess failure",
            ErrorKind::Internal => "internal",
        };
        f.write_str(label)
    }
}

impl FwGateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FwGateError::ProjectValidation(_)
            | FwGateError::Config(_)
            | FwGateError::ManifestNotFound { .. }
            | FwGateError::UpdaterNotFound { .. }
            | FwGateError::Toml(_) => ErrorKind::Configuration,
            FwGateError::BundledVersionMissing { .. } | FwGateError::ImageNotFound { .. } => {
                ErrorKind::LookupMiss
            }
            FwGateError::FormatMismatch { .. }
            | FwGateError::InvalidVersion { .. }
            | FwGateError::InvalidProductLine { .. } => ErrorKind::FormatMismatch,
            FwGateError::DeviceCount { .. } => ErrorKind::DeviceCount,
            FwGateError::Updater(_) => ErrorKind::Subprocess,
            FwGateError::Io(_) | FwGateError::Json(_) | FwGateError::Regex(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Every failure is fatal for the run.
    pub fn exit_code(&self) -> i32 {
        1
    }
}

pub type Result<T> = std::result::Result<T, FwGateError>;
