//! [`MediaSource`] backed by yt-dlp metadata and plain HTTP downloads.
//!
//! `yt-dlp -J` lists every rendition of an item together with a direct URL;
//! the chosen rendition is then fetched with reqwest so the bytes can be
//! streamed straight into the workspace.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use futures::TryStreamExt;
use serde::Deserialize;
use tokio::sync::Mutex;
use tubemux_av::tools::{ToolRegistry, YT_DLP};
use tubemux_av::ToolCommand;

use crate::variant::{MediaKind, Quality, StreamCatalog, Variant};
use crate::{ByteStream, Error, MediaSource, Result};

/// Default limit for one metadata lookup.
pub const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Deserialize)]
struct YtDlpInfo {
    #[serde(default)]
    formats: Vec<YtDlpFormat>,
}

#[derive(Debug, Deserialize)]
struct YtDlpFormat {
    #[serde(default)]
    format_id: String,
    url: Option<String>,
    ext: Option<String>,
    protocol: Option<String>,
    vcodec: Option<String>,
    acodec: Option<String>,
    height: Option<u32>,
    tbr: Option<f64>,
    vbr: Option<f64>,
    abr: Option<f64>,
    #[serde(default)]
    http_headers: HashMap<String, String>,
}

fn has_codec(codec: &Option<String>) -> bool {
    matches!(codec.as_deref(), Some(c) if c != "none")
}

fn kbps(value: Option<f64>) -> Option<u32> {
    value.filter(|v| v.is_finite() && *v > 0.0).map(|v| v.round() as u32)
}

impl YtDlpFormat {
    /// Only single-request HTTP(S) renditions can be fetched directly.
    fn is_direct(&self) -> bool {
        matches!(self.protocol.as_deref(), None | Some("http") | Some("https"))
    }

    fn into_variant(self) -> Option<Variant> {
        if !self.is_direct() {
            return None;
        }
        let url = self.url?;

        let (kind, quality) = if has_codec(&self.vcodec) {
            let quality = Quality {
                height: self.height,
                bitrate_kbps: kbps(self.vbr.or(self.tbr)),
            };
            (MediaKind::Video, quality)
        } else if has_codec(&self.acodec) {
            let quality = Quality {
                height: None,
                bitrate_kbps: kbps(self.abr.or(self.tbr)),
            };
            (MediaKind::Audio, quality)
        } else {
            return None;
        };

        Some(Variant {
            id: self.format_id,
            kind,
            quality,
            url,
            extension: self.ext,
            headers: self.http_headers,
        })
    }
}

/// Parse the JSON printed by `yt-dlp -J` into a catalog.
pub fn parse_catalog(json: &str) -> serde_json::Result<StreamCatalog> {
    let info: YtDlpInfo = serde_json::from_str(json)?;
    let mut catalog = StreamCatalog::default();

    for variant in info.formats.into_iter().filter_map(YtDlpFormat::into_variant) {
        match variant.kind {
            MediaKind::Video => catalog.video.push(variant),
            MediaKind::Audio => catalog.audio.push(variant),
        }
    }

    Ok(catalog)
}

/// Media source resolving items through yt-dlp.
#[derive(Debug)]
pub struct YtDlpSource {
    ytdlp: PathBuf,
    timeout: Duration,
    client: reqwest::Client,
    catalogs: Mutex<HashMap<String, StreamCatalog>>,
}

impl YtDlpSource {
    /// Create a source running the given yt-dlp binary.
    pub fn new(ytdlp: impl Into<PathBuf>) -> Self {
        Self {
            ytdlp: ytdlp.into(),
            timeout: DEFAULT_RESOLVE_TIMEOUT,
            client: reqwest::Client::new(),
            catalogs: Mutex::new(HashMap::new()),
        }
    }

    /// Create a source using the yt-dlp found by the registry.
    pub fn from_registry(tools: &ToolRegistry) -> Result<Self> {
        let path = tools
            .require(YT_DLP)
            .map_err(|_| Error::ToolNotFound(YT_DLP.to_string()))?;
        Ok(Self::new(path))
    }

    /// Limit how long one metadata lookup may take.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Send this user agent with every stream request.
    pub fn with_user_agent(mut self, user_agent: &str) -> Result<Self> {
        self.client = reqwest::Client::builder().user_agent(user_agent).build()?;
        Ok(self)
    }

    async fn lookup(&self, source_id: &str) -> Result<StreamCatalog> {
        tracing::debug!("resolving {source_id} with {:?}", self.ytdlp);

        let output = ToolCommand::new(self.ytdlp.clone())
            .args(["-J", "--no-playlist", "--no-warnings", "--"])
            .arg(source_id)
            .timeout(self.timeout)
            .execute()
            .await
            .map_err(|e| Error::resolve(source_id, e.to_string()))?;

        let catalog = parse_catalog(&output.stdout)
            .map_err(|e| Error::resolve(source_id, format!("invalid {YT_DLP} output: {e}")))?;

        tracing::info!(
            "{source_id}: {} video and {} audio variants",
            catalog.video.len(),
            catalog.audio.len()
        );
        Ok(catalog)
    }
}

#[async_trait]
impl MediaSource for YtDlpSource {
    async fn resolve_streams(&self, source_id: &str) -> Result<StreamCatalog> {
        // Held across the lookup so concurrent tracks share one yt-dlp run.
        let mut catalogs = self.catalogs.lock().await;
        if let Some(catalog) = catalogs.get(source_id) {
            return Ok(catalog.clone());
        }

        let catalog = self.lookup(source_id).await?;
        catalogs.insert(source_id.to_string(), catalog.clone());
        Ok(catalog)
    }

    async fn open(&self, variant: &Variant) -> Result<ByteStream> {
        tracing::debug!("opening {} variant {}", variant.kind, variant.id);

        let mut request = self.client.get(&variant.url);
        for (name, value) in &variant.headers {
            request = request.header(name, value);
        }

        let response = request.send().await?.error_for_status()?;
        let stream = response
            .bytes_stream()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e));
        Ok(Box::pin(stream))
    }
}
