//! Resolution-variant resolution with silent fallback.
//!
//! Variants are pre-encoded copies of an episode living in quality-named
//! subfolders (`Show/480p/ep01.mkv`). A missing variant degrades to the
//! original file instead of failing playback; only a missing original is an
//! error.

use std::path::{Path, PathBuf};

use crate::error::ResolveError;

/// Quality tags scanned for variant subdirectories, lowest first.
pub const QUALITY_LADDER: [&str; 5] = ["240p", "360p", "480p", "720p", "1080p"];

/// Sentinel requesting the untranscoded source file.
pub const ORIGINAL_QUALITY: &str = "original";

pub struct ResolutionResolver {
    root: PathBuf,
}

impl ResolutionResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Picks the physical file to stream for `requested_quality`.
    ///
    /// Candidates are probed in order: the quality subfolder (unless the
    /// original was requested), then the original. First existing file
    /// wins.
    pub fn resolve(
        &self,
        folder: &str,
        episode: &str,
        requested_quality: &str,
    ) -> Result<PathBuf, ResolveError> {
        let show = self.root.join(folder);
        for (rank, candidate) in self.candidates(&show, episode, requested_quality) {
            if candidate.is_file() {
                if rank > 0 {
                    log::debug!(
                        target: "anisub::resolve",
                        "no {requested_quality} variant for {episode}, serving original"
                    );
                }
                return Ok(candidate);
            }
        }
        Err(ResolveError::NotFound {
            folder: show,
            episode: episode.to_string(),
        })
    }

    fn candidates(
        &self,
        show: &Path,
        episode: &str,
        requested_quality: &str,
    ) -> Vec<(usize, PathBuf)> {
        if requested_quality == ORIGINAL_QUALITY {
            vec![(0, show.join(episode))]
        } else {
            vec![
                (0, show.join(requested_quality).join(episode)),
                (1, show.join(episode)),
            ]
        }
    }

    /// Quality tags that exist as subdirectories of the show folder, in
    /// ladder order. Populates the player's quality selector.
    pub fn available_qualities(&self, folder: &str) -> Vec<&'static str> {
        let show = self.root.join(folder);
        QUALITY_LADDER
            .iter()
            .copied()
            .filter(|quality| show.join(quality).is_dir())
            .collect()
    }
}
