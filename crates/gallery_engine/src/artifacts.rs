use std::path::{Path, PathBuf};

use crate::filename::artifact_filename;
use crate::persist::{AtomicFileWriter, PersistError};
use crate::placeholder::placeholder_png;

/// Where capture images live: `{output_dir}/{subdir}/demo_<id>.png`.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    writer: AtomicFileWriter,
    subdir: String,
}

impl ArtifactStore {
    pub fn new(output_dir: &Path, subdir: impl Into<String>) -> Self {
        let subdir = subdir.into();
        Self {
            writer: AtomicFileWriter::new(output_dir.join(&subdir)),
            subdir,
        }
    }

    /// Path of an item's image relative to the output directory.
    pub fn relative_path(&self, item_id: &str) -> String {
        format!("{}/{}", self.subdir, artifact_filename(item_id))
    }

    pub fn absolute_path(&self, item_id: &str) -> PathBuf {
        self.writer.dir().join(artifact_filename(item_id))
    }

    pub fn write_image(&self, item_id: &str, png: &[u8]) -> Result<String, PersistError> {
        self.writer.write_bytes(&artifact_filename(item_id), png)?;
        Ok(self.relative_path(item_id))
    }

    pub fn write_placeholder(&self, item_id: &str) -> Result<String, PersistError> {
        let png = placeholder_png().map_err(|e| PersistError::Encode(e.to_string()))?;
        self.write_image(item_id, &png)
    }
}
