//! ffmpeg-next backend for the decode capability interface.
//!
//! One [`FfmpegSource`] owns the demuxer, the codec context and a lazily
//! rebuilt RGB24 scaler for a single file, and stays open across seeks.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Once;

use ffmpeg_next as ffmpeg;
use ffmpeg_next::format::{self, Pixel};
use ffmpeg_next::media::Type;
use ffmpeg_next::software::scaling;

use super::{FrameSource, MediaOpener, VideoFrame};
use crate::error::PreviewError;

static FFMPEG_INIT: Once = Once::new();

/// Production opener backed by libavformat/libavcodec.
pub struct FfmpegOpener;

impl FfmpegOpener {
    pub fn new() -> Self {
        FFMPEG_INIT.call_once(|| {
            let _ = ffmpeg::init();
            // Keep libav's per-frame warnings out of stderr.
            ffmpeg::util::log::set_level(ffmpeg::util::log::Level::Error);
        });
        Self
    }
}

impl Default for FfmpegOpener {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaOpener for FfmpegOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn FrameSource>, PreviewError> {
        match std::fs::metadata(path) {
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(PreviewError::MediaMissing {
                    path: path.to_path_buf(),
                });
            }
            Err(err) => {
                return Err(PreviewError::MediaOpen {
                    path: path.to_path_buf(),
                    reason: err.to_string(),
                });
            }
            Ok(_) => {}
        }

        let open_err = |reason: String| PreviewError::MediaOpen {
            path: path.to_path_buf(),
            reason,
        };

        let ictx = format::input(&path).map_err(|e| open_err(e.to_string()))?;
        let (stream_index, parameters) = {
            let stream = ictx
                .streams()
                .best(Type::Video)
                .ok_or_else(|| open_err("no video stream".into()))?;
            (stream.index(), stream.parameters())
        };
        let decoder = ffmpeg::codec::context::Context::from_parameters(parameters)
            .and_then(|context| context.decoder().video())
            .map_err(|e| open_err(e.to_string()))?;

        log::debug!(
            target: "anisub::media",
            "opened {} ({}x{}, stream {})",
            path.display(),
            decoder.width(),
            decoder.height(),
            stream_index
        );

        Ok(Box::new(FfmpegSource {
            path: path.to_path_buf(),
            ictx,
            decoder,
            stream_index,
            scaler: None,
            at_eof: false,
        }))
    }
}

struct FfmpegSource {
    path: PathBuf,
    ictx: format::context::Input,
    decoder: ffmpeg::decoder::Video,
    stream_index: usize,
    scaler: Option<Rgb24Scaler>,
    at_eof: bool,
}

// The AV contexts hold raw pointers, so ffmpeg-next leaves Send unimplemented.
// Every FfmpegSource lives inside a pool handle whose mutex guarantees
// exclusive access; the contexts are never touched from two threads at once.
unsafe impl Send for FfmpegSource {}

/// Scaler plus the source descriptor it was built for; rebuilt when the
/// stream changes pixel format or geometry mid-file.
struct Rgb24Scaler {
    context: scaling::Context,
    src: (Pixel, u32, u32),
}

impl FrameSource for FfmpegSource {
    fn seek_to_ms(&mut self, position_ms: i64) -> Result<(), PreviewError> {
        let position_ms = position_ms.max(0);
        // Input::seek takes AV_TIME_BASE units (microseconds).
        let timestamp = position_ms.saturating_mul(1_000);
        self.ictx.seek(timestamp, ..timestamp).map_err(|err| {
            log::debug!(
                target: "anisub::media",
                "seek to {} ms failed for {}: {}",
                position_ms,
                self.path.display(),
                err
            );
            PreviewError::FrameNotFound {
                timestamp_ms: position_ms,
            }
        })?;
        self.decoder.flush();
        self.at_eof = false;
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<VideoFrame>, PreviewError> {
        let mut decoded = ffmpeg::frame::Video::empty();
        loop {
            if self.decoder.receive_frame(&mut decoded).is_ok() {
                return self.scale_to_rgb(&decoded).map(Some);
            }
            if self.at_eof {
                return Ok(None);
            }
            match self.next_video_packet() {
                Some(packet) => {
                    // A packet from a damaged region is skipped; the loop
                    // keeps draining until a frame decodes or the stream
                    // runs out.
                    let _ = self.decoder.send_packet(&packet);
                }
                None => {
                    self.at_eof = true;
                    let _ = self.decoder.send_eof();
                }
            }
        }
    }
}

impl FfmpegSource {
    fn next_video_packet(&mut self) -> Option<ffmpeg::Packet> {
        let wanted = self.stream_index;
        for (stream, packet) in self.ictx.packets() {
            if stream.index() == wanted {
                return Some(packet);
            }
        }
        None
    }

    fn scale_to_rgb(&mut self, frame: &ffmpeg::frame::Video) -> Result<VideoFrame, PreviewError> {
        let src = (frame.format(), frame.width(), frame.height());
        if self.scaler.as_ref().map(|s| s.src) != Some(src) {
            let context = scaling::Context::get(
                src.0,
                src.1,
                src.2,
                Pixel::RGB24,
                src.1,
                src.2,
                scaling::Flags::AREA,
            )
            .map_err(|e| PreviewError::Internal(format!("scaler setup: {e}")))?;
            self.scaler = Some(Rgb24Scaler { context, src });
        }
        let Some(scaler) = self.scaler.as_mut() else {
            return Err(PreviewError::Internal("scaler unavailable".into()));
        };

        let mut rgb = ffmpeg::frame::Video::empty();
        scaler
            .context
            .run(frame, &mut rgb)
            .map_err(|e| PreviewError::Internal(format!("pixel conversion: {e}")))?;
        Ok(pack_rgb24(&rgb))
    }
}

/// Copies a scaled frame into a tightly packed buffer, dropping the row
/// padding libav appends to each stride.
fn pack_rgb24(frame: &ffmpeg::frame::Video) -> VideoFrame {
    let width = frame.width();
    let height = frame.height();
    let data = frame.data(0);
    let stride = frame.stride(0);
    let row_bytes = width as usize * 3;

    let mut packed = Vec::with_capacity(row_bytes * height as usize);
    for y in 0..height as usize {
        let start = y * stride;
        packed.extend_from_slice(&data[start..start + row_bytes]);
    }
    VideoFrame {
        width,
        height,
        data: packed,
    }
}
