//! File saving: turn a streaming URL into a local file.

use futures::StreamExt;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::config::{Config, FileCollisionAction};
use crate::error::{Error, Result};
use crate::utils::{get_unique_path, sanitize_file_name};

/// Abstraction over saving a remote resource under a file name, enabling testability.
#[async_trait::async_trait]
pub trait FileSaver: Send + Sync {
    /// Save the resource at `url` as `name`, returning where it ended up
    async fn save(&self, url: &str, name: &str) -> Result<PathBuf>;
}

/// Production [`FileSaver`] that streams over HTTP into the download directory.
///
/// Data is written to `<name>.part` and renamed once the body is complete, so a
/// failed transfer never leaves a truncated file under the final name.
pub struct HttpFileSaver {
    http: reqwest::Client,
    download_dir: PathBuf,
    file_collision: FileCollisionAction,
}

impl HttpFileSaver {
    /// Create a saver writing into `config.download.download_dir`
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.api.request_timeout)
            .user_agent(concat!("qingting-dl/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            download_dir: config.download.download_dir.clone(),
            file_collision: config.download.file_collision,
        })
    }

    /// Pick the output path and, unless overwriting, claim it with an empty file
    /// so concurrent saves of equally named episodes cannot pick the same path.
    async fn reserve_path(&self, name: &str) -> Result<PathBuf> {
        let desired = self.download_dir.join(sanitize_file_name(name));

        loop {
            let path = get_unique_path(&desired, self.file_collision)?;
            if self.file_collision == FileCollisionAction::Overwrite {
                return Ok(path);
            }

            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(_) => return Ok(path),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    if self.file_collision == FileCollisionAction::Skip {
                        return Err(Error::FileCollision { path });
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn stream_to(&self, url: &str, part_path: &Path) -> Result<u64> {
        let response = self.http.get(url).send().await?.error_for_status()?;
        let mut stream = response.bytes_stream();
        let mut file = tokio::fs::File::create(part_path).await?;
        let mut written = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        Ok(written)
    }
}

#[async_trait::async_trait]
impl FileSaver for HttpFileSaver {
    async fn save(&self, url: &str, name: &str) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.download_dir)
            .await
            .map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create download directory '{}': {}",
                        self.download_dir.display(),
                        e
                    ),
                ))
            })?;

        let path = self.reserve_path(name).await?;
        // Armed until the rename succeeds, including when this future is dropped
        let guard = PartialFiles {
            part: part_path(&path),
            reserved: (self.file_collision != FileCollisionAction::Overwrite)
                .then(|| path.clone()),
            completed: false,
        };

        let bytes = self.stream_to(url, &guard.part).await?;
        tokio::fs::rename(&guard.part, &path).await?;
        guard.disarm();

        debug!(path = %path.display(), bytes, "Saved file");
        Ok(path)
    }
}

/// Path of the in-progress download for `path`: the same name with `.part` appended.
fn part_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

/// Removes the `.part` file and releases a reserved name when dropped.
///
/// Cleanup runs synchronously so it also happens when a cancelled save future
/// is dropped mid-transfer.
struct PartialFiles {
    part: PathBuf,
    reserved: Option<PathBuf>,
    completed: bool,
}

impl PartialFiles {
    fn disarm(mut self) {
        self.completed = true;
    }
}

impl Drop for PartialFiles {
    fn drop(&mut self) {
        if self.completed {
            return;
        }
        match std::fs::remove_file(&self.part) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
                warn!(path = %self.part.display(), error = %e, "Failed to remove partial file");
            }
            _ => {}
        }
        if let Some(reserved) = &self.reserved {
            std::fs::remove_file(reserved).ok();
        }
    }
}
