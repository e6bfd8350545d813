use crate::error::{FwGateError, Result};
use crate::firmware::ProductLine;
use crate::utils::verbose_enabled;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Information reported by an attached device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceInfo {
    #[serde(default)]
    pub serial: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    pub firmware_version: String,
    pub product_line: String,
}

impl DeviceInfo {
    pub fn new(firmware_version: impl Into<String>, product_line: impl Into<String>) -> Self {
        Self {
            serial: None,
            name: None,
            firmware_version: firmware_version.into(),
            product_line: product_line.into(),
        }
    }

    pub fn display_name(&self) -> String {
        match (&self.name, &self.serial) {
            (Some(name), Some(serial)) => format!("{} ({})", name, serial),
            (Some(name), None) => name.clone(),
            (None, Some(serial)) => format!("{} ({})", self.product_line, serial),
            (None, None) => self.product_line.clone(),
        }
    }
}

/// Source of the devices currently attached to the host
pub trait DeviceProvider {
    fn query(&self) -> Result<Vec<DeviceInfo>>;
}

/// A single device described on the command line
pub struct FixedDevice {
    device: DeviceInfo,
}

impl FixedDevice {
    pub fn new(device: DeviceInfo) -> Self {
        Self { device }
    }
}

impl DeviceProvider for FixedDevice {
    fn query(&self) -> Result<Vec<DeviceInfo>> {
        Ok(vec![self.device.clone()])
    }
}

/// JSON inventory written by the test harness, an array of [`DeviceInfo`]
pub struct DeviceInventory {
    path: PathBuf,
}

impl DeviceInventory {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl DeviceProvider for DeviceInventory {
    fn query(&self) -> Result<Vec<DeviceInfo>> {
        let content = fs::read_to_string(&self.path).map_err(|e| {
            FwGateError::Config(format!(
                "Failed to read device inventory '{}': {}",
                self.path.display(),
                e
            ))
        })?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Query the provider and return the only attached device of a supported
/// product line. An empty mask list accepts every device.
pub fn select_single_device(
    provider: &dyn DeviceProvider,
    supported_masks: &[String],
) -> Result<DeviceInfo> {
    let mut devices: Vec<DeviceInfo> = provider
        .query()?
        .into_iter()
        .filter(|device| {
            let supported = is_supported(device, supported_masks);
            if !supported && verbose_enabled() {
                eprintln!(
                    "[VERBOSE] Ignoring unsupported device {}",
                    device.display_name()
                );
            }
            supported
        })
        .collect();

    if devices.len() != 1 {
        return Err(FwGateError::DeviceCount {
            found: devices.len(),
        });
    }

    Ok(devices.remove(0))
}

fn is_supported(device: &DeviceInfo, masks: &[String]) -> bool {
    if masks.is_empty() {
        return true;
    }
    match ProductLine::parse(&device.product_line) {
        Ok(line) => masks.iter().any(|mask| line.matches_mask(mask)),
        Err(_) => false,
    }
}
