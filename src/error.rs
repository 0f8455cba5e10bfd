//! Error types surfaced to the HTTP boundary. None of these are retried
//! internally; the browser's next mouse-move is the retry.

use std::path::PathBuf;

/// Failures along the scrub-preview pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PreviewError {
    #[error("media source not found: {}", path.display())]
    MediaMissing { path: PathBuf },

    #[error("cannot open media {}: {reason}", path.display())]
    MediaOpen { path: PathBuf, reason: String },

    #[error("no decodable frame at {timestamp_ms} ms")]
    FrameNotFound { timestamp_ms: i64 },

    #[error("preview rendering failed: {0}")]
    Internal(String),
}

impl PreviewError {
    /// True for the outcomes a client can fix by asking for something else
    /// (missing file, timestamp past the end). Everything else is a server
    /// failure.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            PreviewError::MediaMissing { .. } | PreviewError::FrameNotFound { .. }
        )
    }
}

/// Failure to map a (show, episode, quality) request onto a playable file.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("no playable source for {episode} under {}", folder.display())]
    NotFound { folder: PathBuf, episode: String },
}
