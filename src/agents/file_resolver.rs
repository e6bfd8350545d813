use crate::error::Result;
use crate::utils::verbose_enabled;
use regex::Regex;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// FileResolver locates build artifacts (updater tool, firmware images) below a root.
///
/// Paths are reported relative to the root with `/` separators on every
/// platform so that patterns stay portable. The walk visits directory entries
/// in file-name order, which makes "last match wins" deterministic.
pub struct FileResolver {
    root: PathBuf,
}

impl FileResolver {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Lazily yield every file below the root as a relative, `/`-separated path
    pub fn files(&self) -> impl Iterator<Item = String> + '_ {
        WalkDir::new(&self.root)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    if verbose_enabled() {
                        eprintln!("[VERBOSE] Skipping unreadable entry: {}", e);
                    }
                    None
                }
            })
            // symlinks to files count as files, symlinks to directories do not
            .filter(|entry| entry.path().is_file())
            .map(|entry| self.relative_name(entry.path()))
    }

    /// Lazily yield relative paths whose text matches `pattern` anywhere
    pub fn find_all<'a>(&'a self, pattern: &'a Regex) -> impl Iterator<Item = String> + 'a {
        self.files().filter(move |name| pattern.is_match(name))
    }

    /// Return the last match in walk order, joined onto the root
    pub fn find_one(&self, pattern: &Regex) -> Option<PathBuf> {
        let mut matches = 0usize;
        let mut chosen = None;
        for name in self.find_all(pattern) {
            matches += 1;
            chosen = Some(name);
        }

        if matches > 1 && verbose_enabled() {
            eprintln!(
                "[VERBOSE] {} files match '{}', using the last one",
                matches,
                pattern.as_str()
            );
        }

        chosen.map(|name| self.root.join(name))
    }

    /// Pattern matching `name` as a whole trailing path component,
    /// so `rs-fw-update` matches `build/rs-fw-update` but not `build/not-rs-fw-update`
    pub fn anchored_name(name: &str) -> Result<Regex> {
        Ok(Regex::new(&format!("(^|/){}$", regex::escape(name)))?)
    }

    fn relative_name(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }
}
