//! Downloading one track into the workspace.
//!
//! A [`Track`] asks the media source for the best rendition of its kind and
//! drains the resulting byte stream into a file. A track that fails never
//! leaves a partial file behind.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tubemux_source::{MediaKind, MediaSource, QualitySelector, Variant};

/// Why a track could not be downloaded.
#[derive(Debug, thiserror::Error)]
pub enum AcquireError {
    /// Resolving or opening the remote stream failed.
    #[error(transparent)]
    Source(#[from] tubemux_source::Error),

    /// The remote stream broke mid-transfer.
    #[error("read failed after {bytes} bytes: {source}")]
    Read {
        bytes: u64,
        #[source]
        source: io::Error,
    },

    /// The destination file could not be created or written.
    #[error("write to {} failed: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Track files are write-once.
    #[error("destination {} already exists", .0.display())]
    DestinationExists(PathBuf),
}

/// Where a track is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TrackState {
    #[default]
    Pending,
    Streaming,
    Complete,
    Failed(String),
}

impl TrackState {
    /// Complete or failed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TrackState::Complete | TrackState::Failed(_))
    }
}

impl fmt::Display for TrackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackState::Pending => f.write_str("pending"),
            TrackState::Streaming => f.write_str("streaming"),
            TrackState::Complete => f.write_str("complete"),
            TrackState::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// One media component downloaded into the workspace.
#[derive(Debug)]
pub struct Track {
    selector: QualitySelector,
    path: PathBuf,
    state: TrackState,
    variant: Option<Variant>,
    bytes_written: u64,
}

impl Track {
    /// Create a pending track that will be written to `path`.
    pub fn new(selector: QualitySelector, path: impl Into<PathBuf>) -> Self {
        Self {
            selector,
            path: path.into(),
            state: TrackState::Pending,
            variant: None,
            bytes_written: 0,
        }
    }

    /// The highest-quality video track.
    pub fn video(path: impl Into<PathBuf>) -> Self {
        Self::new(QualitySelector::HighestVideo, path)
    }

    /// The highest-quality audio track.
    pub fn audio(path: impl Into<PathBuf>) -> Self {
        Self::new(QualitySelector::HighestAudio, path)
    }

    pub fn kind(&self) -> MediaKind {
        self.selector.kind()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> &TrackState {
        &self.state
    }

    pub fn is_complete(&self) -> bool {
        self.state == TrackState::Complete
    }

    /// The rendition picked for this track, once resolved.
    pub fn variant(&self) -> Option<&Variant> {
        self.variant.as_ref()
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Download the track from `source`.
    ///
    /// On success the file at [`Track::path`] holds the full stream. On
    /// failure the partially written file has already been deleted when
    /// this returns.
    pub async fn acquire(
        &mut self,
        source: &dyn MediaSource,
        source_id: &str,
    ) -> Result<u64, AcquireError> {
        match self.transfer(source, source_id).await {
            Ok(bytes) => {
                self.state = TrackState::Complete;
                tracing::info!(track = %self.kind(), bytes, "track complete");
                Ok(bytes)
            }
            Err(e) => {
                self.state = TrackState::Failed(e.to_string());
                tracing::warn!(track = %self.kind(), "track failed: {e}");
                Err(e)
            }
        }
    }

    async fn transfer(
        &mut self,
        source: &dyn MediaSource,
        source_id: &str,
    ) -> Result<u64, AcquireError> {
        if self.path.exists() {
            return Err(AcquireError::DestinationExists(self.path.clone()));
        }

        let (variant, mut stream) = source.open_best(source_id, self.selector).await?;
        self.variant = Some(variant);

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
            .await
            .map_err(|e| match e.kind() {
                io::ErrorKind::AlreadyExists => AcquireError::DestinationExists(self.path.clone()),
                _ => AcquireError::Write {
                    path: self.path.clone(),
                    source: e,
                },
            })?;

        self.state = TrackState::Streaming;
        tracing::debug!(track = %self.kind(), "streaming into {:?}", self.path);

        let result = async {
            while let Some(chunk) = stream.next().await {
                let chunk = chunk.map_err(|source| AcquireError::Read {
                    bytes: self.bytes_written,
                    source,
                })?;
                file.write_all(&chunk).await.map_err(|source| AcquireError::Write {
                    path: self.path.clone(),
                    source,
                })?;
                self.bytes_written += chunk.len() as u64;
            }
            file.flush().await.map_err(|source| AcquireError::Write {
                path: self.path.clone(),
                source,
            })
        }
        .await;

        drop(file);
        drop(stream);

        match result {
            Ok(()) => Ok(self.bytes_written),
            Err(e) => {
                self.discard();
                Err(e)
            }
        }
    }

    /// Delete this track's file if it exists.
    pub fn discard(&self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(track = %self.kind(), "removed {:?}", self.path),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(track = %self.kind(), "failed to remove {:?}: {e}", self.path),
        }
    }
}

/// Download the rendition picked by `selector` into `destination`.
///
/// `destination` must not exist yet. See [`Track::acquire`].
pub async fn acquire(
    source: &dyn MediaSource,
    source_id: &str,
    selector: QualitySelector,
    destination: &Path,
) -> Result<u64, AcquireError> {
    Track::new(selector, destination).acquire(source, source_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use tubemux_source::{ByteStream, Quality, StreamCatalog};

    /// Serves fixed chunks, optionally failing after them.
    struct ChunkSource {
        chunks: Vec<&'static str>,
        fail_after: bool,
    }

    #[async_trait]
    impl MediaSource for ChunkSource {
        async fn resolve_streams(&self, _source_id: &str) -> tubemux_source::Result<StreamCatalog> {
            Ok(StreamCatalog {
                video: vec![Variant::new(
                    "v",
                    MediaKind::Video,
                    Quality::video(720, 2000),
                    "mem://v",
                )],
                audio: vec![Variant::new("a", MediaKind::Audio, Quality::audio(128), "mem://a")],
            })
        }

        async fn open(&self, _variant: &Variant) -> tubemux_source::Result<ByteStream> {
            let mut items: Vec<io::Result<Bytes>> = self
                .chunks
                .iter()
                .copied()
                .map(|c| Ok(Bytes::from_static(c.as_bytes())))
                .collect();
            if self.fail_after {
                items.push(Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")));
            }
            Ok(Box::pin(futures::stream::iter(items)))
        }
    }

    #[tokio::test]
    async fn writes_all_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let source = ChunkSource {
            chunks: vec!["hello ", "world"],
            fail_after: false,
        };

        let mut track = Track::video(dir.path().join("video.stream"));
        assert_eq!(track.state(), &TrackState::Pending);
        let bytes = track.acquire(&source, "id").await.unwrap();

        assert_eq!(bytes, 11);
        assert!(track.is_complete());
        assert_eq!(track.variant().unwrap().id, "v");
        assert_eq!(std::fs::read(track.path()).unwrap(), b"hello world");
    }

    #[tokio::test]
    async fn read_error_removes_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = ChunkSource {
            chunks: vec!["partial"],
            fail_after: true,
        };

        let mut track = Track::audio(dir.path().join("audio.stream"));
        let err = track.acquire(&source, "id").await.unwrap_err();

        assert!(matches!(err, AcquireError::Read { bytes: 7, .. }));
        assert!(matches!(track.state(), TrackState::Failed(_)));
        assert!(track.state().is_terminal());
        assert!(!track.path().exists());
    }

    #[tokio::test]
    async fn existing_destination_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("video.stream");
        std::fs::write(&dest, b"keep me").unwrap();
        let source = ChunkSource {
            chunks: vec!["new"],
            fail_after: false,
        };

        let err = acquire(&source, "id", QualitySelector::HighestVideo, &dest)
            .await
            .unwrap_err();

        assert!(matches!(err, AcquireError::DestinationExists(_)));
        assert_eq!(std::fs::read(&dest).unwrap(), b"keep me");
    }

    #[tokio::test]
    async fn write_error_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let source = ChunkSource {
            chunks: vec!["data"],
            fail_after: false,
        };
        let dest = dir.path().join("missing-dir/video.stream");

        let err = acquire(&source, "id", QualitySelector::HighestVideo, &dest)
            .await
            .unwrap_err();
        assert!(matches!(err, AcquireError::Write { .. }));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn source_error_creates_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("audio.stream");

        struct Empty;
        #[async_trait]
        impl MediaSource for Empty {
            async fn resolve_streams(&self, _: &str) -> tubemux_source::Result<StreamCatalog> {
                Ok(StreamCatalog::default())
            }
            async fn open(&self, _: &Variant) -> tubemux_source::Result<ByteStream> {
                unreachable!("nothing to open")
            }
        }

        let err = acquire(&Empty, "id", QualitySelector::HighestAudio, &dest)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AcquireError::Source(tubemux_source::Error::NoVariant(MediaKind::Audio))
        ));
        assert!(!dest.exists());
    }

    #[test]
    fn discard_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let track = Track::video(dir.path().join("video.stream"));
        std::fs::write(track.path(), b"x").unwrap();
        track.discard();
        track.discard();
        assert!(!track.path().exists());
    }
}
