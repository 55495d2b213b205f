use crate::error::FetchError;
use std::path::{Component, Path, PathBuf};

/// Append-only on-disk copy of fetched bodies, keyed by asset name.
///
/// Asset names embed a content hash, so an existing entry is never rewritten.
#[derive(Debug, Clone)]
pub struct BlobStore {
    dir: PathBuf,
}

impl BlobStore {
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, FetchError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, name: &str) -> Result<PathBuf, FetchError> {
        validate_asset_name(name)?;
        Ok(self.dir.join(name))
    }

    /// Write `body` unless an entry already exists. Returns whether it wrote.
    pub async fn store(&self, name: &str, body: &str) -> Result<bool, FetchError> {
        let path = self.path_for(name)?;
        if tokio::fs::try_exists(&path).await? {
            return Ok(false);
        }

        let tmp = self.dir.join(format!(".{name}.tmp"));
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(true)
    }

    pub async fn load(&self, name: &str) -> Result<Option<String>, FetchError> {
        let path = self.path_for(name)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(body) => Ok(Some(body)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

/// Asset names must be exactly one plain path component.
fn validate_asset_name(name: &str) -> Result<(), FetchError> {
    let invalid = || FetchError::InvalidName(name.to_string());
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(part)), None) if part == name && !name.starts_with('.') => Ok(()),
        _ => Err(invalid()),
    }
}
