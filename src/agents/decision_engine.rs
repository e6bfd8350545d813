use crate::agents::device::DeviceInfo;
use crate::agents::file_resolver::FileResolver;
use crate::error::{FwGateError, Result};
use crate::firmware::{ManifestReader, ProductLine, VersionComparator};
use crate::utils::verbose_enabled;
use serde::Serialize;
use std::ffi::OsString;
use std::path::PathBuf;

/// Inputs the engine needs besides the device itself
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Header listing the bundled firmware versions
    pub manifest_path: PathBuf,
    /// Directory searched for the updater tool and firmware images
    pub search_root: PathBuf,
    /// File name of the updater tool
    pub updater_name: String,
}

/// Environment checks that must pass before any device is queried
#[derive(Debug, Clone)]
pub struct Preflight {
    pub updater: PathBuf,
}

/// Updater invocation resolved for a GO decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdatePlan {
    pub updater: PathBuf,
    pub image: PathBuf,
}

impl UpdatePlan {
    /// Arguments passed to the updater tool
    pub fn args(&self) -> Vec<OsString> {
        vec![OsString::from("-f"), self.image.clone().into_os_string()]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateDecision {
    pub product_line: String,
    pub device_version: String,
    pub bundled_version: String,
    pub should_update: bool,
    /// Expected image file name, only set when an update is needed
    pub image_name: Option<String>,
    pub plan: Option<UpdatePlan>,
}

impl UpdateDecision {
    pub fn is_up_to_date(&self) -> bool {
        !self.should_update
    }
}

/// UpdateDecisionEngine decides whether the attached device needs the bundled
/// firmware and, if so, which files the updater must be given.
pub struct UpdateDecisionEngine {
    config: EngineConfig,
    resolver: FileResolver,
    manifest: ManifestReader,
}

impl UpdateDecisionEngine {
    pub fn new(config: EngineConfig) -> Self {
        let resolver = FileResolver::new(&config.search_root);
        Self {
            config,
            resolver,
            manifest: ManifestReader::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Check the manifest exists and locate the updater tool
    pub fn preflight(&self) -> Result<Preflight> {
        if !self.config.manifest_path.is_file() {
            return Err(FwGateError::ManifestNotFound {
                path: self.config.manifest_path.display().to_string(),
            });
        }

        let updater = self.locate(&self.config.updater_name)?.ok_or_else(|| {
            FwGateError::UpdaterNotFound {
                name: self.config.updater_name.clone(),
            }
        })?;

        if verbose_enabled() {
            eprintln!("[VERBOSE] Update tool: {}", updater.display());
        }

        Ok(Preflight { updater })
    }

    /// Compare the device firmware with the bundled one and resolve the image on GO
    pub fn decide(&self, preflight: &Preflight, device: &DeviceInfo) -> Result<UpdateDecision> {
        let product_line = ProductLine::parse(&device.product_line)?;
        let family_prefix = product_line.family_prefix();

        let bundled_version = self
            .manifest
            .lookup_bundled_version(&self.config.manifest_path, family_prefix)?
            .ok_or_else(|| FwGateError::BundledVersionMissing {
                product_line: product_line.to_string(),
                manifest: self.config.manifest_path.display().to_string(),
            })?;

        if verbose_enabled() {
            eprintln!(
                "[VERBOSE] Bundled FW for family {}: {}",
                family_prefix, bundled_version
            );
        }

        let device_version = device.firmware_version.trim().to_string();
        let should_update = VersionComparator::is_newer_str(&device_version, &bundled_version)?;

        if !should_update {
            return Ok(UpdateDecision {
                product_line: product_line.to_string(),
                device_version,
                bundled_version,
                should_update,
                image_name: None,
                plan: None,
            });
        }

        let image_name = product_line.image_name(&bundled_version);
        let image = self
            .locate(&image_name)?
            .ok_or_else(|| FwGateError::ImageNotFound {
                image: image_name.clone(),
                product_line: product_line.to_string(),
                version: bundled_version.clone(),
            })?;

        Ok(UpdateDecision {
            product_line: product_line.to_string(),
            device_version,
            bundled_version,
            should_update,
            image_name: Some(image_name),
            plan: Some(UpdatePlan {
                updater: preflight.updater.clone(),
                image,
            }),
        })
    }

    /// Every file below the search root whose last path component is `name`
    pub fn candidates(&self, name: &str) -> Result<Vec<String>> {
        let pattern = FileResolver::anchored_name(name)?;
        Ok(self.resolver.find_all(&pattern).collect())
    }

    fn locate(&self, name: &str) -> Result<Option<PathBuf>> {
        let pattern = FileResolver::anchored_name(name)?;
        Ok(self.resolver.find_one(&pattern))
    }
}
