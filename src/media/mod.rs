//! Decode capability interface.
//!
//! The pool and preview service only know these traits: open a file, seek
//! to a millisecond offset, decode the next frame. [`ffmpeg`] is the
//! production backend; tests inject scripted implementations.

pub mod ffmpeg;

use std::path::Path;

use crate::error::PreviewError;

/// One decoded frame as tightly packed RGB24 (no row padding).
#[derive(Clone)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl VideoFrame {
    /// Fills a frame with a single color. Handy for tests and synthetic
    /// sources; the production backend never uses it.
    pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let mut data = Vec::with_capacity((width * height * 3) as usize);
        for _ in 0..width * height {
            data.extend_from_slice(&rgb);
        }
        Self {
            width,
            height,
            data,
        }
    }
}

/// An open, stateful decode context bound to one media file.
///
/// Callers must not interleave `seek_to_ms` and `next_frame` from different
/// threads; the pool's per-handle lock provides that exclusion.
pub trait FrameSource: Send {
    /// Positions the stream so the next decode produces the frame at or
    /// after `position_ms`.
    fn seek_to_ms(&mut self, position_ms: i64) -> Result<(), PreviewError>;

    /// Decodes the next frame. `Ok(None)` means the stream has no further
    /// decodable frame (end of stream).
    fn next_frame(&mut self) -> Result<Option<VideoFrame>, PreviewError>;
}

/// Opens media files into [`FrameSource`]s.
pub trait MediaOpener: Send + Sync {
    fn open(&self, path: &Path) -> Result<Box<dyn FrameSource>, PreviewError>;
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted decode backend for unit tests.

    use std::path::Path;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;

    use super::{FrameSource, MediaOpener, VideoFrame};
    use crate::error::PreviewError;

    /// Journal of raw seek/read operations, shared across all sources an
    /// opener produces. Lets tests assert that seek+read pairs never
    /// interleave across concurrent callers.
    pub type OpJournal = Arc<Mutex<Vec<(String, Op)>>>;

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub enum Op {
        Seek(i64),
        Read(i64),
    }

    pub struct FakeOpener {
        pub frame_width: u32,
        pub frame_height: u32,
        pub duration_ms: i64,
        pub opens: AtomicUsize,
        pub journal: OpJournal,
        /// Widens the race window between a seek and its read.
        pub op_delay: Option<std::time::Duration>,
    }

    impl FakeOpener {
        pub fn new(frame_width: u32, frame_height: u32, duration_ms: i64) -> Self {
            Self {
                frame_width,
                frame_height,
                duration_ms,
                opens: AtomicUsize::new(0),
                journal: Arc::new(Mutex::new(Vec::new())),
                op_delay: None,
            }
        }

        pub fn open_count(&self) -> usize {
            self.opens.load(Ordering::SeqCst)
        }
    }

    impl MediaOpener for FakeOpener {
        fn open(&self, path: &Path) -> Result<Box<dyn FrameSource>, PreviewError> {
            if path.as_os_str().to_string_lossy().contains("missing") {
                return Err(PreviewError::MediaMissing {
                    path: path.to_path_buf(),
                });
            }
            self.opens.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeSource {
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

    pub struct FakeSource {
        label: String,
        position_ms: i64,
        duration_ms: i64,
        width: u32,
        height: u32,
        journal: OpJournal,
        op_delay: Option<std::time::Duration>,
    }

    impl FrameSource for FakeSource {
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
            // Color encodes the seek position so cross-talk is detectable
            // even after lossy JPEG encoding.
            let shade = ((self.position_ms / 1000) % 256) as u8;
            Ok(Some(VideoFrame::solid(
                self.width,
                self.height,
                [shade, 255 - shade, 128],
            )))
        }
    }
}
