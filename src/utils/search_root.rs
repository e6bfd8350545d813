use crate::error::{FwGateError, Result};
use std::path::{Path, PathBuf};

/// Kernel pseudo-filesystems; walking them never ends or yields garbage.
const PSEUDO_FILESYSTEMS: &[&str] = &["/proc", "/sys", "/dev"];

/// Make the search root absolute and check it is a walkable directory.
///
/// Symlinks are not resolved, so artifact paths keep the layout the build
/// tree was given with and stay free of `\\?\` prefixes on Windows.
pub fn resolve_search_root(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    let root = std::path::absolute(path).map_err(|e| {
        FwGateError::ProjectValidation(format!("Invalid search root '{}': {e}", path.display()))
    })?;

    if !root.is_dir() {
        return Err(FwGateError::ProjectValidation(format!(
            "Search root '{}' is not a directory",
            root.display()
        )));
    }

    if let Some(fs) = PSEUDO_FILESYSTEMS
        .iter()
        .find(|fs| root.starts_with(Path::new(fs)))
    {
        return Err(FwGateError::ProjectValidation(format!(
            "Search root '{}' is inside {}",
            root.display(),
            fs
        )));
    }

    Ok(root)
}
