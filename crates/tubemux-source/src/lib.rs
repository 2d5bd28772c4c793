//! # tubemux-source
//!
//! Turns a source identifier (usually a URL) into downloadable renditions
//! and opens byte streams for them.
//!
//! - [`MediaSource`] is the seam the download pipeline talks to.
//! - [`StreamCatalog::select`] implements the quality policy: the rendition
//!   with the highest resolution/bitrate for its media kind wins.
//! - [`YtDlpSource`] is the production source: metadata from `yt-dlp -J`,
//!   bytes over HTTP.

mod error;
pub mod variant;
pub mod ytdlp;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

pub use error::{Error, Result};
pub use variant::{MediaKind, Quality, QualitySelector, StreamCatalog, Variant};
pub use ytdlp::YtDlpSource;

/// A readable, non-restartable stream of media bytes.
pub type ByteStream = BoxStream<'static, std::io::Result<Bytes>>;

/// A capability that can enumerate and open the renditions of a media item.
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// List the video and audio renditions available for `source_id`.
    async fn resolve_streams(&self, source_id: &str) -> Result<StreamCatalog>;

    /// Open a byte stream for one rendition.
    async fn open(&self, variant: &Variant) -> Result<ByteStream>;

    /// Resolve, pick the best rendition for `selector`, and open it.
    async fn open_best(
        &self,
        source_id: &str,
        selector: QualitySelector,
    ) -> Result<(Variant, ByteStream)> {
        let catalog = self.resolve_streams(source_id).await?;
        let variant = catalog.select(selector)?.clone();
        tracing::info!(
            selector = %selector,
            variant = %variant.id,
            height = ?variant.quality.height,
            kbps = ?variant.quality.bitrate_kbps,
            "selected variant"
        );
        let stream = self.open(&variant).await?;
        Ok((variant, stream))
    }
}
