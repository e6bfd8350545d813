use crate::error::{FwGateError, Result};
use std::cmp::Ordering;
use std::fmt;

/// Firmware version made of dot-separated numeric components, e.g. `5.13.0.50`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwareVersion {
    pub original: String,
    pub components: Vec<u32>,
}

impl FirmwareVersion {
    pub fn parse(version: &str) -> Result<Self> {
        let trimmed = version.trim();
        let mut components = Vec::new();

        for part in trimmed.split('.') {
            let number = part.parse::<u32>().map_err(|_| FwGateError::InvalidVersion {
                input: version.to_string(),
            })?;
            components.push(number);
        }

        Ok(FirmwareVersion {
            original: trimmed.to_string(),
            components,
        })
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// Component-wise comparison, most significant first.
    ///
    /// Versions with a different number of components are not comparable;
    /// no implicit zero padding is applied.
    pub fn compare(&self, other: &Self) -> Result<Ordering> {
        if self.component_count() != other.component_count() {
            return Err(FwGateError::FormatMismatch {
                current: self.original.clone(),
                bundled: other.original.clone(),
            });
        }

        for (a, b) in self.components.iter().zip(other.components.iter()) {
            match a.cmp(b) {
                Ordering::Equal => continue,
                other => return Ok(other),
            }
        }
        Ok(Ordering::Equal)
    }
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

pub struct VersionComparator;

impl VersionComparator {
    /// Check if `candidate` is strictly newer than `current`
    pub fn is_newer(current: &FirmwareVersion, candidate: &FirmwareVersion) -> Result<bool> {
        Ok(current.compare(candidate)? == Ordering::Less)
    }

    /// Same as [`VersionComparator::is_newer`] on raw version strings.
    pub fn is_newer_str(current: &str, candidate: &str) -> Result<bool> {
        // component counts are checked before the numbers are parsed
        if current.trim().split('.').count() != candidate.trim().split('.').count() {
            return Err(FwGateError::FormatMismatch {
                current: current.to_string(),
                bundled: candidate.to_string(),
            });
        }
        Self::is_newer(
            &FirmwareVersion::parse(current)?,
            &FirmwareVersion::parse(candidate)?,
        )
    }
}
