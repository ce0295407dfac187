use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use tempfile::NamedTempFile;

use crate::scene::{SceneCatalog, SceneError};

/// JSON document holding all scenes. Writes go to a temporary file in the same
/// directory which then atomically replaces the document.
#[derive(Debug, Clone)]
pub struct SceneRepository {
    path: PathBuf,
}

impl SceneRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing document is an empty catalog.
    #[tracing::instrument(skip(self), fields(path = %self.path.display()))]
    pub fn load(&self) -> Result<SceneCatalog, SceneError> {
        if !self.path.exists() {
            tracing::info!("Scene storage not found, starting without scenes");
            return Ok(SceneCatalog::default());
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read scenes from {}", self.path.display()))
            .map_err(SceneError::StorageCorrupt)?;

        let catalog: SceneCatalog = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse scenes from {}", self.path.display()))
            .map_err(SceneError::StorageCorrupt)?;

        tracing::info!(
            "Loaded {} scenes ({} retired ids)",
            catalog.scenes.len(),
            catalog.retired_ids.len()
        );

        Ok(catalog)
    }

    #[tracing::instrument(skip_all, fields(path = %self.path.display(), scenes = catalog.scenes.len()))]
    pub fn save(&self, catalog: &SceneCatalog) -> anyhow::Result<()> {
        let dir = self.directory();
        fs::create_dir_all(&dir).with_context(|| format!("Failed to create directory {}", dir.display()))?;

        let json = serde_json::to_vec_pretty(catalog).context("Failed to serialize scenes")?;

        let mut temp = NamedTempFile::new_in(&dir)
            .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
        temp.write_all(&json).context("Failed to write scenes to temp file")?;
        temp.as_file().sync_all().context("Failed to flush scenes temp file")?;

        temp.persist(&self.path)
            .map_err(|e| e.error)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;

        tracing::debug!("Scenes saved");

        Ok(())
    }

    /// Moves an unreadable document aside so the next save does not destroy it.
    pub fn quarantine(&self) -> anyhow::Result<PathBuf> {
        let mut target = self.path.clone().into_os_string();
        target.push(".corrupt");
        let target = PathBuf::from(target);

        fs::rename(&self.path, &target)
            .with_context(|| format!("Failed to move {} to {}", self.path.display(), target.display()))?;

        Ok(target)
    }

    fn directory(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}
