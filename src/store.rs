use crate::Result;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Whole-file JSON writer. Readers see either the previous snapshot or the
/// new one, never a partial write.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
    pretty: bool,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>, pretty: bool) -> Self {
        Self {
            path: path.into(),
            pretty,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn persist<T: Serialize>(&self, document: &T) -> Result<()> {
        let body = crate::output::to_json(document, self.pretty)?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        // Same directory as the target so the final rename never crosses filesystems.
        let mut file = NamedTempFile::new_in(&dir)?;
        file.write_all(body.as_bytes())?;
        file.write_all(b"\n")?;
        file.as_file().sync_all()?;
        file.persist(&self.path).map_err(|e| e.error)?;

        tracing::debug!("Wrote {} bytes to {}", body.len() + 1, self.path.display());
        Ok(())
    }
}
