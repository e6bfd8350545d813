use crate::error::{FwGateError, Result};
use std::fs;
use std::path::Path;

const DEFINE_DIRECTIVE: &str = "#define";

/// ManifestReader extracts bundled firmware versions from a header such as
/// `common/fw/firmware-version.h`:
///
/// ```text
/// #define D4XX_RECOMMENDED_FIRMWARE_VERSION "5.13.0.50"
/// #define L5XX_RECOMMENDED_FIRMWARE_VERSION "1.5.8.1"
/// ```
pub struct ManifestReader;

impl ManifestReader {
    pub fn new() -> Self {
        Self
    }

    /// Read the manifest and return the version of the first `#define` whose
    /// macro name contains `family_prefix`.
    pub fn lookup_bundled_version<P: AsRef<Path>>(
        &self,
        manifest_path: P,
        family_prefix: &str,
    ) -> Result<Option<String>> {
        let manifest_path = manifest_path.as_ref();
        if !manifest_path.is_file() {
            return Err(FwGateError::ManifestNotFound {
                path: manifest_path.display().to_string(),
            });
        }

        let content = fs::read_to_string(manifest_path)?;
        Ok(self.parse_bundled_version(&content, family_prefix))
    }

    pub fn parse_bundled_version(&self, content: &str, family_prefix: &str) -> Option<String> {
        content
            .lines()
            .filter_map(Self::parse_define)
            .find(|(name, _)| name.contains(family_prefix))
            .map(|(_, version)| version.to_string())
    }

    /// Split a `#define NAME "value"` line into its name and unquoted value
    fn parse_define(line: &str) -> Option<(&str, &str)> {
        let mut words = line.split_whitespace();
        if words.next()? != DEFINE_DIRECTIVE {
            return None;
        }
        let name = words.next()?;
        let value = words.next()?;
        let value = value.strip_prefix('"').unwrap_or(value);
        let value = value.strip_suffix('"').unwrap_or(value);
        Some((name, value))
    }
}

impl Default for ManifestReader {
    fn default() -> Self {
        Self::new()
    }
}
