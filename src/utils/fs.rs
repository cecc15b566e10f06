use crate::error::{OdcError, Result};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Replace `path` with `contents` via a sibling temp file and a rename, so
/// readers see either the old file or the new one and never a partial write.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let write_error = |source| OdcError::Write {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(dir).map_err(write_error)?;
    file.write_all(contents).map_err(write_error)?;
    file.as_file().sync_all().map_err(write_error)?;

    if let Ok(metadata) = fs::metadata(path) {
        file.as_file()
            .set_permissions(metadata.permissions())
            .map_err(write_error)?;
    }

    file.persist(path).map_err(|e| write_error(e.error))?;
    Ok(())
}
