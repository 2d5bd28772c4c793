//! Shared test harness for pipeline integration tests.
//!
//! Provides [`ScriptedSource`], an in-memory [`MediaSource`] whose streams
//! succeed or fail on demand, and [`RecordingMuxer`], a [`Muxer`] that
//! records every job and writes a small marker file instead of running
//! ffmpeg.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;

use tubemux::{OutputTarget, Pipeline};
use tubemux_av::{MergeDestination, MergeJob, Muxer};
use tubemux_source::{ByteStream, MediaKind, MediaSource, Quality, StreamCatalog, Variant};

/// How a scripted stream behaves once opened.
#[derive(Debug, Clone)]
pub enum StreamScript {
    /// Yield these chunks, then end cleanly.
    Chunks(Vec<&'static str>),
    /// Fail to open at all.
    OpenFails,
    /// Yield these chunks, then fail.
    FailsAfter(Vec<&'static str>),
}

pub struct ScriptedSource {
    catalog: StreamCatalog,
    video: StreamScript,
    audio: StreamScript,
    pub resolve_calls: AtomicUsize,
    pub opened: Mutex<Vec<String>>,
}

impl ScriptedSource {
    pub fn new(video: StreamScript, audio: StreamScript) -> Self {
        Self::with_catalog(default_catalog(), video, audio)
    }

    pub fn with_catalog(catalog: StreamCatalog, video: StreamScript, audio: StreamScript) -> Self {
        Self {
            catalog,
            video,
            audio,
            resolve_calls: AtomicUsize::new(0),
            opened: Mutex::new(Vec::new()),
        }
    }

    /// Both tracks succeed.
    pub fn healthy() -> Self {
        Self::new(
            StreamScript::Chunks(vec!["video-", "payload"]),
            StreamScript::Chunks(vec!["audio-payload"]),
        )
    }

    pub fn resolve_count(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }

    pub fn opened_ids(&self) -> Vec<String> {
        let mut ids = self.opened.lock().clone();
        ids.sort();
        ids
    }
}

pub fn default_catalog() -> StreamCatalog {
    StreamCatalog {
        video: vec![Variant::new("720", MediaKind::Video, Quality::video(720, 2500), "mem://720")],
        audio: vec![Variant::new("128", MediaKind::Audio, Quality::audio(128), "mem://128")],
    }
}

fn stream_of(chunks: &[&'static str], fail: bool) -> ByteStream {
    let mut items: Vec<std::io::Result<Bytes>> = chunks
        .iter()
        .copied()
        .map(|c| Ok(Bytes::from_static(c.as_bytes())))
        .collect();
    if fail {
        items.push(Err(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "connection reset by peer",
        )));
    }
    Box::pin(futures::stream::iter(items))
}

#[async_trait]
impl MediaSource for ScriptedSource {
    async fn resolve_streams(&self, _source_id: &str) -> tubemux_source::Result<StreamCatalog> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.catalog.clone())
    }

    async fn open(&self, variant: &Variant) -> tubemux_source::Result<ByteStream> {
        self.opened.lock().push(variant.id.clone());

        let script = match variant.kind {
            MediaKind::Video => &self.video,
            MediaKind::Audio => &self.audio,
        };
        match script {
            StreamScript::Chunks(chunks) => Ok(stream_of(chunks, false)),
            StreamScript::FailsAfter(chunks) => Ok(stream_of(chunks, true)),
            StreamScript::OpenFails => Err(tubemux_source::Error::resolve(
                variant.url.clone(),
                "stream unavailable",
            )),
        }
    }
}

/// Muxer that records jobs and writes `<format>:<video bytes>+<audio bytes>`
/// to file destinations.
#[derive(Default)]
pub struct RecordingMuxer {
    pub jobs: Mutex<Vec<MergeJob>>,
    pub fail: bool,
}

impl RecordingMuxer {
    pub fn failing() -> Self {
        Self {
            jobs: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn job_count(&self) -> usize {
        self.jobs.lock().len()
    }
}

#[async_trait]
impl Muxer for RecordingMuxer {
    async fn merge(&self, job: &MergeJob) -> tubemux_av::Result<()> {
        self.jobs.lock().push(job.clone());
        job.validate_inputs()?;

        if let MergeDestination::File(path) = &job.destination {
            // A real transcoder may leave a partial file behind on failure.
            let video = std::fs::read_to_string(&job.video)?;
            let audio = std::fs::read_to_string(&job.audio)?;
            std::fs::write(path, format!("{}:{}+{}", job.format, video, audio))?;
        }

        if self.fail {
            return Err(tubemux_av::Error::merge(
                "ffmpeg exited with exit status: 1",
                vec!["Conversion failed!".to_string()],
            ));
        }
        Ok(())
    }
}

pub fn pipeline(
    source: &Arc<ScriptedSource>,
    muxer: &Arc<RecordingMuxer>,
    temp_root: &Path,
) -> Pipeline {
    Pipeline::new(source.clone(), muxer.clone()).with_temp_root(Some(temp_root.to_path_buf()))
}

pub fn file_target(path: PathBuf) -> OutputTarget {
    OutputTarget::resolve(Some(&path), false).expect("valid output path")
}

/// Number of entries directly inside `dir`.
pub fn entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}
