#![allow(dead_code)]

//! Scripted decode backend shared by the integration tests.
//!
//! The pool and preview service only see the capability traits, so a
//! deterministic in-memory source is enough to exercise every lifecycle
//! path without real media files or codecs.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use anisub::error::PreviewError;
use anisub::media::{FrameSource, MediaOpener, VideoFrame};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    Seek(i64),
    Read(i64),
}

pub type OpJournal = Arc<Mutex<Vec<(String, Op)>>>;

/// Opener producing synthetic videos of a fixed duration and frame size.
/// Counts opens so tests can tell a cache hit from a fresh open; paths
/// containing `missing` refuse to open.
pub struct ScriptedOpener {
    pub frame_width: u32,
    pub frame_height: u32,
    pub duration_ms: i64,
    pub op_delay: Option<Duration>,
    opens: AtomicUsize,
    journal: OpJournal,
}

impl ScriptedOpener {
    pub fn new(frame_width: u32, frame_height: u32, duration_ms: i64) -> Self {
        Self {
            frame_width,
            frame_height,
            duration_ms,
            op_delay: None,
            opens: AtomicUsize::new(0),
            journal: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_op_delay(mut self, delay: Duration) -> Self {
        self.op_delay = Some(delay);
        self
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn journal(&self) -> OpJournal {
        Arc::clone(&self.journal)
    }
}

impl MediaOpener for ScriptedOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn FrameSource>, PreviewError> {
        if path.to_string_lossy().contains("missing") {
            return Err(PreviewError::MediaMissing {
                path: path.to_path_buf(),
            });
        }
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedSource {
            label: path.to_string_lossy().into_owned(),
            position_ms: 0,
            duration_ms: self.duration_ms,
            width: self.frame_width,
            height: self.frame_height,
            journal: Arc::clone(&self.journal),
            op_delay: self.op_delay,
        }))
    }
}

pub struct ScriptedSource {
    label: String,
    position_ms: i64,
    duration_ms: i64,
    width: u32,
    height: u32,
    journal: OpJournal,
    op_delay: Option<Duration>,
}

impl FrameSource for ScriptedSource {
    fn seek_to_ms(&mut self, position_ms: i64) -> Result<(), PreviewError> {
        self.journal
            .lock()
            .push((self.label.clone(), Op::Seek(position_ms)));
        if let Some(delay) = self.op_delay {
            std::thread::sleep(delay);
        }
        self.position_ms = position_ms;
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<VideoFrame>, PreviewError> {
        self.journal
            .lock()
            .push((self.label.clone(), Op::Read(self.position_ms)));
        if self.position_ms > self.duration_ms {
            return Ok(None);
        }
        let shade = ((self.position_ms / 1000) % 256) as u8;
        Ok(Some(VideoFrame::solid(
            self.width,
            self.height,
            [shade, 255 - shade, 128],
        )))
    }
}
