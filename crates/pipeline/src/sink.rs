//! Delivery sinks for generated artifacts.
//!
//! A sink accepts one fully-buffered byte payload and persists it,
//! returning the location to record. Two implementations: a local
//! directory and an FTP upload into a dated directory tree.

use std::io::Cursor;
use std::path::PathBuf;

use async_trait::async_trait;
use suppaftp::types::FileType;
use suppaftp::FtpStream;

/// Errors from artifact delivery.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("FTP error: {0}")]
    Ftp(#[from] suppaftp::FtpError),

    #[error("Upload task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// A capability that persists one artifact payload somewhere.
///
/// `fallback_name` is the filename reported by the generation server;
/// a sink may override it with a name fixed at construction time.
/// Returns the stored location (a path or public URL) for recording.
#[async_trait]
pub trait ArtifactSink: Send + Sync {
    async fn store(&self, fallback_name: &str, bytes: &[u8]) -> Result<String, SinkError>;
}

// ---------------------------------------------------------------------------
// Local directory sink
// ---------------------------------------------------------------------------

/// Writes artifacts into a local directory, creating it if missing.
pub struct LocalDirSink {
    dir: PathBuf,
    file_name: Option<String>,
}

impl LocalDirSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            file_name: None,
        }
    }

    /// Store under a fixed filename instead of the server-reported one.
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }
}

#[async_trait]
impl ArtifactSink for LocalDirSink {
    async fn store(&self, fallback_name: &str, bytes: &[u8]) -> Result<String, SinkError> {
        let name = self.file_name.as_deref().unwrap_or(fallback_name);
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(name);
        tokio::fs::write(&path, bytes).await?;
        tracing::info!(path = %path.display(), size = bytes.len(), "Artifact written to disk");
        Ok(path.to_string_lossy().into_owned())
    }
}

// ---------------------------------------------------------------------------
// FTP upload sink
// ---------------------------------------------------------------------------

/// Connection settings for the FTP server.
#[derive(Debug, Clone)]
pub struct FtpSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    /// Directory under which dated folders are created, e.g. `/ftp/images`.
    pub base_dir: String,
    /// Prefix substituted for `base_dir` in the recorded location,
    /// e.g. `/images`.
    pub public_prefix: String,
}

/// Uploads artifacts to an FTP server under `<base_dir>/<folder>/`.
///
/// Missing path segments are created one at a time on the way down.
/// The whole payload is buffered in memory before transfer; the store
/// runs on the blocking thread pool since the FTP session is
/// synchronous.
pub struct FtpSink {
    settings: FtpSettings,
    /// Dated directory segment, e.g. `2024/03`.
    folder: String,
    file_name: Option<String>,
}

impl FtpSink {
    pub fn new(settings: FtpSettings, folder: impl Into<String>) -> Self {
        Self {
            settings,
            folder: folder.into(),
            file_name: None,
        }
    }

    /// Upload under a fixed filename instead of the server-reported one.
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }
}

#[async_trait]
impl ArtifactSink for FtpSink {
    async fn store(&self, fallback_name: &str, bytes: &[u8]) -> Result<String, SinkError> {
        let name = self
            .file_name
            .clone()
            .unwrap_or_else(|| fallback_name.to_string());
        let remote_dir = join_path(&self.settings.base_dir, &self.folder);
        let remote_path = join_path(&remote_dir, &name);
        let location = join_path(&join_path(&self.settings.public_prefix, &self.folder), &name);

        let settings = self.settings.clone();
        let payload = bytes.to_vec();
        let upload_path = remote_path.clone();
        tokio::task::spawn_blocking(move || -> Result<(), SinkError> {
            let mut ftp = FtpStream::connect((settings.host.as_str(), settings.port))?;
            ftp.login(&settings.user, &settings.password)?;
            ensure_directory(&mut ftp, &remote_dir)?;
            ftp.transfer_type(FileType::Binary)?;
            ftp.put_file(&upload_path, &mut Cursor::new(payload))?;
            ftp.quit()?;
            Ok(())
        })
        .await??;

        tracing::info!(path = %remote_path, size = bytes.len(), "Artifact uploaded to FTP");
        Ok(location)
    }
}

/// Walk an absolute path segment by segment, creating each directory
/// that a CWD probe shows to be missing.
fn ensure_directory(ftp: &mut FtpStream, path: &str) -> Result<(), SinkError> {
    let mut current = String::new();
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        current.push('/');
        current.push_str(segment);
        if ftp.cwd(&current).is_err() {
            tracing::debug!(dir = %current, "Creating missing FTP directory");
            ftp.mkdir(&current)?;
        }
    }
    Ok(())
}

/// Join path segments with exactly one `/` between them.
fn join_path(base: &str, rest: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        rest.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn local_sink_writes_bytes_under_server_name() {
        let dir = tempfile::tempdir().unwrap();
        let sink = LocalDirSink::new(dir.path());

        let location = sink.store("img_001.png", b"payload").await.unwrap();

        assert_eq!(
            location,
            dir.path().join("img_001.png").to_string_lossy().into_owned()
        );
        assert_eq!(std::fs::read(dir.path().join("img_001.png")).unwrap(), b"payload");
    }

    #[tokio::test]
    async fn local_sink_honors_fixed_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let sink = LocalDirSink::new(dir.path()).with_file_name("Cats_Big_Day_Part_2.jpg");

        sink.store("img_001.png", b"payload").await.unwrap();

        assert!(dir.path().join("Cats_Big_Day_Part_2.jpg").exists());
        assert!(!dir.path().join("img_001.png").exists());
    }

    #[tokio::test]
    async fn local_sink_creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let sink = LocalDirSink::new(&nested);

        sink.store("x.png", b"1").await.unwrap();

        assert!(nested.join("x.png").exists());
    }

    #[tokio::test]
    async fn local_sink_is_idempotent_in_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let sink = LocalDirSink::new(dir.path());

        sink.store("x.png", b"same bytes").await.unwrap();
        sink.store("x.png", b"same bytes").await.unwrap();

        assert_eq!(std::fs::read(dir.path().join("x.png")).unwrap(), b"same bytes");
    }

    #[test]
    fn join_path_normalizes_slashes() {
        assert_eq!(join_path("/ftp/images/", "/2024/03"), "/ftp/images/2024/03");
        assert_eq!(join_path("/images", "2024/03"), "/images/2024/03");
    }

    #[test]
    fn ftp_locations_use_the_public_prefix() {
        let sink = FtpSink::new(
            FtpSettings {
                host: "localhost".to_string(),
                port: 21,
                user: "user".to_string(),
                password: "password".to_string(),
                base_dir: "/ftp/images".to_string(),
                public_prefix: "/images".to_string(),
            },
            "2024/03",
        )
        .with_file_name("Cats_Big_Day_Part_2.jpg");

        let remote_dir = join_path(&sink.settings.base_dir, &sink.folder);
        let location = join_path(
            &join_path(&sink.settings.public_prefix, &sink.folder),
            sink.file_name.as_deref().unwrap(),
        );
        assert_eq!(remote_dir, "/ftp/images/2024/03");
        assert_eq!(location, "/images/2024/03/Cats_Big_Day_Part_2.jpg");
    }
}
