use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::NamedTempFile;

use super::{DocumentKey, Sink};

/// Writes documents into a local directory shared with the viewer.
///
/// Reports land flat in the root as `<cluster>-<file_name>.json`, which is
/// what the viewer scans for. The index and snapshots go under `<cluster>/`.
#[derive(Debug, Clone)]
pub struct FilesystemSink {
    root: PathBuf,
    cluster_name: String,
}

impl FilesystemSink {
    pub fn new(root: impl Into<PathBuf>, cluster_name: &str) -> Self {
        Self {
            root: root.into(),
            cluster_name: cluster_name.to_string(),
        }
    }

    pub fn file_path(&self, key: &DocumentKey) -> PathBuf {
        match key {
            DocumentKey::Report { file_name } => self
                .root
                .join(format!("{}-{}.json", self.cluster_name, file_name)),
            DocumentKey::Index => self.root.join(&self.cluster_name).join("index.json"),
            DocumentKey::Snapshot { timestamp } => self
                .root
                .join(&self.cluster_name)
                .join("snapshots")
                .join(format!("{}-metadata.json", timestamp)),
        }
    }

    async fn replace(&self, destination: PathBuf, contents: Contents) -> crate::Result<()> {
        tokio::task::spawn_blocking(move || replace_blocking(&destination, contents))
            .await
            .map_err(|e| crate::Error::Internal(format!("filesystem write task failed: {}", e)))?
    }
}

enum Contents {
    File(PathBuf),
    Bytes(Vec<u8>),
}

/// Stages next to the destination and renames over it, so readers never see
/// a half-written file.
fn replace_blocking(destination: &Path, contents: Contents) -> crate::Result<()> {
    let parent = destination.parent().ok_or_else(|| {
        crate::Error::Sink(format!("invalid output path {}", destination.display()))
    })?;
    std::fs::create_dir_all(parent)?;

    let mut staged = NamedTempFile::new_in(parent)?;
    match contents {
        Contents::File(source) => {
            let mut input = File::open(source)?;
            std::io::copy(&mut input, staged.as_file_mut())?;
        }
        Contents::Bytes(bytes) => staged.write_all(&bytes)?,
    }
    staged.as_file().sync_all()?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        staged
            .as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o644))?;
    }

    staged.persist(destination).map_err(|e| e.error)?;
    Ok(())
}

#[async_trait]
impl Sink for FilesystemSink {
    fn name(&self) -> &str {
        "filesystem"
    }

    fn location(&self, key: &DocumentKey) -> String {
        self.file_path(key).display().to_string()
    }

    async fn write_file(&self, key: &DocumentKey, source: &Path) -> crate::Result<()> {
        self.replace(self.file_path(key), Contents::File(source.to_path_buf())).await
    }

    async fn write_bytes(&self, key: &DocumentKey, bytes: Vec<u8>) -> crate::Result<()> {
        self.replace(self.file_path(key), Contents::Bytes(bytes)).await
    }
}
