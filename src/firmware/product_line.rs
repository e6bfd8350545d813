use crate::error::{FwGateError, Result};
use std::fmt;

/// Device family identifier as reported by the device, e.g. `D400` or `L500`.
///
/// Only the first two characters select the manifest entry and image name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductLine(String);

impl ProductLine {
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.chars().count() < 2 {
            return Err(FwGateError::InvalidProductLine {
                input: input.to_string(),
            });
        }
        Ok(ProductLine(trimmed.to_string()))
    }

    /// Two-character family code, e.g. `D4` for `D400`
    pub fn family_prefix(&self) -> &str {
        let end = self
            .0
            .char_indices()
            .nth(2)
            .map(|(idx, _)| idx)
            .unwrap_or(self.0.len());
        &self.0[..end]
    }

    /// File name of the firmware image shipped for this family at `version`
    pub fn image_name(&self, version: &str) -> String {
        format!("{}XX_FW_Image-{}.bin", self.family_prefix(), version)
    }

    /// Device masks are either exact names or a prefix followed by `*`.
    pub fn matches_mask(&self, mask: &str) -> bool {
        match mask.strip_suffix('*') {
            Some(prefix) => self.0.starts_with(prefix),
            None => self.0 == mask,
        }
    }
}

impl fmt::Display for ProductLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
