//! Renditions of a media item and the policy that picks the best one.

use std::collections::HashMap;
use std::fmt;

use crate::{Error, Result};

/// Kind of elementary stream a variant carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Video,
    Audio,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Video => f.write_str("video"),
            MediaKind::Audio => f.write_str("audio"),
        }
    }
}

/// Which rendition a track asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QualitySelector {
    HighestVideo,
    HighestAudio,
}

impl QualitySelector {
    /// The media kind this selector picks from.
    pub fn kind(&self) -> MediaKind {
        match self {
            QualitySelector::HighestVideo => MediaKind::Video,
            QualitySelector::HighestAudio => MediaKind::Audio,
        }
    }
}

impl fmt::Display for QualitySelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QualitySelector::HighestVideo => f.write_str("highest-video"),
            QualitySelector::HighestAudio => f.write_str("highest-audio"),
        }
    }
}

/// Quality metrics reported for a rendition. Unknown metrics rank lowest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Quality {
    /// Frame height in pixels (video only).
    pub height: Option<u32>,
    /// Total bitrate in kbit/s.
    pub bitrate_kbps: Option<u32>,
}

impl Quality {
    pub fn video(height: u32, bitrate_kbps: u32) -> Self {
        Self {
            height: Some(height),
            bitrate_kbps: Some(bitrate_kbps),
        }
    }

    pub fn audio(bitrate_kbps: u32) -> Self {
        Self {
            height: None,
            bitrate_kbps: Some(bitrate_kbps),
        }
    }

    /// Ranking key for the given kind: resolution then bitrate for video,
    /// bitrate alone for audio.
    fn rank(&self, kind: MediaKind) -> (Option<u32>, Option<u32>) {
        match kind {
            MediaKind::Video => (self.height, self.bitrate_kbps),
            MediaKind::Audio => (None, self.bitrate_kbps),
        }
    }
}

/// One downloadable rendition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    /// Source-specific identifier (yt-dlp `format_id`).
    pub id: String,
    pub kind: MediaKind,
    pub quality: Quality,
    /// Where the bytes come from.
    pub url: String,
    /// File extension of the rendition's container, e.g. `mp4` or `webm`.
    pub extension: Option<String>,
    /// Extra request headers the source requires.
    pub headers: HashMap<String, String>,
}

impl Variant {
    pub fn new(
        id: impl Into<String>,
        kind: MediaKind,
        quality: Quality,
        url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            quality,
            url: url.into(),
            extension: None,
            headers: HashMap::new(),
        }
    }

    pub fn with_extension(mut self, ext: impl Into<String>) -> Self {
        self.extension = Some(ext.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// All renditions a source offers, split by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamCatalog {
    pub video: Vec<Variant>,
    pub audio: Vec<Variant>,
}

impl StreamCatalog {
    /// Variants of one kind, in enumeration order.
    pub fn variants(&self, kind: MediaKind) -> &[Variant] {
        match kind {
            MediaKind::Video => &self.video,
            MediaKind::Audio => &self.audio,
        }
    }

    /// Pick the best variant for a selector.
    ///
    /// The highest-ranked variant wins regardless of enumeration order; on a
    /// tie the one listed first is kept.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoVariant`] when the source has no rendition of the
    /// selector's kind.
    pub fn select(&self, selector: QualitySelector) -> Result<&Variant> {
        let kind = selector.kind();
        self.variants(kind)
            .iter()
            .fold(None::<&Variant>, |best, candidate| match best {
                Some(b) if candidate.quality.rank(kind) <= b.quality.rank(kind) => Some(b),
                _ => Some(candidate),
            })
            .ok_or(Error::NoVariant(kind))
    }
}
