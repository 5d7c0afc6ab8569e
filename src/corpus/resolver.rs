// Path specifier expansion: explicit files, glob patterns, directories + glob.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::PrepError;

const GLOB_CHARS: [char; 3] = ['*', '?', '['];

/// Expands path specifiers into concrete file lists.
#[derive(Debug, Clone)]
pub struct PathResolver {
    dir_glob: String,
}

impl Default for PathResolver {
    fn default() -> Self {
        Self::new("*")
    }
}

impl PathResolver {
    /// `dir_glob` is applied to every specifier that names a directory.
    pub fn new(dir_glob: impl Into<String>) -> Self {
        Self {
            dir_glob: dir_glob.into(),
        }
    }

    /// Resolve all specifiers into a deduplicated list of regular files.
    ///
    /// Matches of one specifier are sorted; specifier order is kept. A
    /// specifier matching nothing only warns, but an empty overall result
    /// is an input error.
    pub fn resolve<P: AsRef<Path>>(&self, specs: &[P]) -> crate::error::Result<Vec<PathBuf>> {
        let mut seen = HashSet::new();
        let mut files = Vec::new();
        for spec in specs {
            let spec = spec.as_ref();
            let matched = self.resolve_one(spec)?;
            if matched.is_empty() {
                warn!(spec = %spec.display(), "path specifier matched no files");
            }
            for path in matched {
                if seen.insert(path.clone()) {
                    files.push(path);
                }
            }
        }

        if files.is_empty() {
            return Err(PrepError::input(format!(
                "no files found for {}",
                specs
                    .iter()
                    .map(|s| s.as_ref().display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }
        debug!(count = files.len(), "resolved input files");
        Ok(files)
    }

    /// Resolve one specifier. Never fails on an empty match.
    pub fn resolve_one(&self, spec: &Path) -> crate::error::Result<Vec<PathBuf>> {
        if spec.is_dir() {
            let dir = glob::Pattern::escape(&spec.to_string_lossy());
            let pattern = format!("{}/{}", dir.trim_end_matches('/'), self.dir_glob);
            return expand_glob(&pattern);
        }

        let text = spec.to_string_lossy();
        if text.contains(GLOB_CHARS) {
            return expand_glob(&text);
        }

        if spec.is_file() {
            Ok(vec![spec.to_path_buf()])
        } else {
            Ok(Vec::new())
        }
    }
}

fn expand_glob(pattern: &str) -> crate::error::Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for entry in glob::glob(pattern)? {
        match entry {
            Ok(path) if path.is_file() => out.push(path),
            Ok(_) => {}
            Err(e) => warn!(pattern, "skipping unreadable path: {e}"),
        }
    }
    out.sort();
    Ok(out)
}
