//! File staging and delivery handoff.
//!
//! A [`FileStager`] writes artifacts into `<static_root>/protected/`, a
//! directory shared with the edge proxy. Each artifact gets a fresh
//! `<uuid>.txt` name and is opened create-new, so concurrent callers never
//! collide and nothing is ever overwritten.
//!
//! [`StagedFile::deliver`] consumes the staged value (`staged -> delivered`
//! happens once). In [`DeliveryMode::Direct`] the file stays owner-readable
//! and the application streams it. In [`DeliveryMode::ProxyHandoff`] the file
//! is made world-readable and only an internal redirect location is handed
//! back; the bytes are never read by the application again.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tokio::io::{AsyncWrite, AsyncWriteExt};
use uuid::Uuid;

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Subdirectory of the static root holding staged files.
pub const STAGING_SUBDIR: &str = "protected";

/// Internal location the proxy maps onto [`STAGING_SUBDIR`].
pub const PROXY_LOCATION: &str = "/protected";

/// Suffix appended to generated file names.
pub const STAGED_FILE_SUFFIX: &str = ".txt";

/// Owner read/write only; the application process serves the file itself.
pub const DIRECT_FILE_MODE: u32 = 0o600;

/// Readable by the proxy, which runs as a different user.
pub const HANDOFF_FILE_MODE: u32 = 0o644;

/// Attempts at finding an unused name before giving up.
const MAX_NAME_ATTEMPTS: usize = 3;

// ---------------------------------------------------------------------------
// Delivery mode
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    Direct,
    ProxyHandoff,
}

impl DeliveryMode {
    /// Production deployments sit behind the proxy; everything else serves
    /// files directly.
    pub fn from_production_flag(production: bool) -> Self {
        if production {
            DeliveryMode::ProxyHandoff
        } else {
            DeliveryMode::Direct
        }
    }

    pub fn file_mode(self) -> u32 {
        match self {
            DeliveryMode::Direct => DIRECT_FILE_MODE,
            DeliveryMode::ProxyHandoff => HANDOFF_FILE_MODE,
        }
    }
}

// ---------------------------------------------------------------------------
// Stager
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct FileStager {
    dir: PathBuf,
    mode: DeliveryMode,
}

impl FileStager {
    pub fn new(static_root: impl AsRef<Path>, mode: DeliveryMode) -> Self {
        Self {
            dir: static_root.as_ref().join(STAGING_SUBDIR),
            mode,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn mode(&self) -> DeliveryMode {
        self.mode
    }

    /// Write `content` to a new uniquely named file in the staging directory,
    /// creating the directory if needed.
    pub async fn stage(&self, content: &[u8]) -> Result<StagedFile, CoreError> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let (file, path, file_name) = self.create_unique().await?;
        write_or_discard(file, &path, content).await?;

        tracing::debug!(
            path = %path.display(),
            bytes = content.len(),
            "Staged file written",
        );

        Ok(StagedFile {
            path,
            file_name,
            len: content.len() as u64,
            mode: self.mode,
        })
    }

    async fn create_unique(&self) -> Result<(tokio::fs::File, PathBuf, String), CoreError> {
        for _ in 0..MAX_NAME_ATTEMPTS {
            let file_name = format!("{}{STAGED_FILE_SUFFIX}", Uuid::new_v4().simple());
            let path = self.dir.join(&file_name);

            let mut options = tokio::fs::OpenOptions::new();
            options.write(true).create_new(true);
            #[cfg(unix)]
            options.mode(DIRECT_FILE_MODE);

            match options.open(&path).await {
                Ok(file) => return Ok((file, path, file_name)),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(CoreError::Staging(e)),
            }
        }

        Err(CoreError::Staging(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            "could not find an unused staging file name",
        )))
    }

    /// Delete regular files in the staging directory last modified at least
    /// `ttl` ago. Returns how many were removed. A missing directory counts
    /// as empty.
    pub async fn sweep_older_than(&self, ttl: Duration) -> Result<usize, CoreError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(CoreError::Staging(e)),
        };

        let now = SystemTime::now();
        let mut removed = 0;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            match remove_if_expired(&entry, now, ttl).await {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    tracing::debug!(path = %path.display(), "Staged file vanished during sweep");
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping staged file");
                }
            }
        }

        Ok(removed)
    }
}

// ---------------------------------------------------------------------------
// Staged file
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
    file_name: String,
    len: u64,
    mode: DeliveryMode,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn mode(&self) -> DeliveryMode {
        self.mode
    }

    /// Hand the file over for delivery. Under proxy handoff the file is
    /// re-permissioned so the proxy can read it.
    pub async fn deliver(self) -> Result<Delivery, CoreError> {
        let content_disposition = format!("attachment; filename={}", self.file_name);

        match self.mode {
            DeliveryMode::Direct => Ok(Delivery::Direct {
                path: self.path,
                len: self.len,
                content_disposition,
            }),
            DeliveryMode::ProxyHandoff => {
                set_file_mode(&self.path, self.mode.file_mode()).await?;
                Ok(Delivery::ProxyHandoff {
                    redirect_uri: format!("{PROXY_LOCATION}/{}", self.file_name),
                    len: self.len,
                    content_disposition,
                })
            }
        }
    }
}

/// A delivered artifact: what the serving layer needs to build a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Stream the bytes at `path`.
    Direct {
        path: PathBuf,
        len: u64,
        content_disposition: String,
    },
    /// Let the proxy serve `redirect_uri`.
    ProxyHandoff {
        redirect_uri: String,
        len: u64,
        content_disposition: String,
    },
}

impl Delivery {
    pub fn len(&self) -> u64 {
        match self {
            Delivery::Direct { len, .. } | Delivery::ProxyHandoff { len, .. } => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn content_disposition(&self) -> &str {
        match self {
            Delivery::Direct {
                content_disposition,
                ..
            }
            | Delivery::ProxyHandoff {
                content_disposition,
                ..
            } => content_disposition,
        }
    }
}

/// Write and flush `content`; on failure remove the partial file at `path`.
async fn write_or_discard<W>(mut writer: W, path: &Path, content: &[u8]) -> Result<(), CoreError>
where
    W: AsyncWrite + Unpin,
{
    let written = async {
        writer.write_all(content).await?;
        writer.flush().await
    }
    .await;

    if let Err(e) = written {
        drop(writer);
        if let Err(remove_err) = tokio::fs::remove_file(path).await {
            tracing::warn!(
                path = %path.display(),
                error = %remove_err,
                "Could not remove partially staged file",
            );
        }
        return Err(CoreError::Staging(e));
    }
    Ok(())
}

/// Delete `entry` if it is a regular file last modified at least `ttl`
/// before `now`.
async fn remove_if_expired(
    entry: &tokio::fs::DirEntry,
    now: SystemTime,
    ttl: Duration,
) -> std::io::Result<bool> {
    let metadata = entry.metadata().await?;
    if !metadata.is_file() {
        return Ok(false);
    }
    let age = now
        .duration_since(metadata.modified()?)
        .unwrap_or(Duration::ZERO);
    if age < ttl {
        return Ok(false);
    }
    tokio::fs::remove_file(entry.path()).await?;
    Ok(true)
}

#[cfg(unix)]
async fn set_file_mode(path: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).await
}

#[cfg(not(unix))]
async fn set_file_mode(_path: &Path, _mode: u32) -> std::io::Result<()> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
