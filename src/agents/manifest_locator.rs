use crate::error::{OdcError, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const MANIFEST_FILE_NAME: &str = "package.json";

/// ManifestLocatorAgent finds the package.json a run operates on
pub struct ManifestLocatorAgent {
    start: PathBuf,
}

impl ManifestLocatorAgent {
    /// `input` is either a manifest file or a directory to search upward
    /// from. Relative inputs are resolved against `working_dir`; without an
    /// input the search starts at `working_dir`.
    pub fn new<P: AsRef<Path>>(input: Option<&Path>, working_dir: P) -> Self {
        let working_dir = working_dir.as_ref();
        let start = match input {
            Some(path) => working_dir.join(path),
            None => working_dir.to_path_buf(),
        };
        Self { start }
    }

    pub fn locate(&self) -> Result<PathBuf> {
        let not_found = || OdcError::ManifestNotFound {
            start: self.start.clone(),
        };

        let start = self.start.canonicalize().map_err(|_| not_found())?;
        if start.is_file() {
            debug!(path = %start.display(), "using explicit manifest");
            return Ok(start);
        }

        for dir in start.ancestors() {
            let candidate = dir.join(MANIFEST_FILE_NAME);
            if candidate.is_file() {
                debug!(path = %candidate.display(), "found manifest");
                return Ok(candidate);
            }
        }

        Err(not_found())
    }
}
