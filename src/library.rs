//! Library scanning: show folders, episode files, poster sidecars.

use std::io;
use std::path::{Component, Path, PathBuf};

/// Episode file extensions, compared case-insensitively.
pub const VIDEO_EXTENSIONS: [&str; 3] = ["mkv", "mp4", "webm"];

/// Poster sidecar extensions, probed in this order.
pub const POSTER_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

/// Read-only view over the on-disk library: one folder per show, episode
/// files and an optional `poster.*` inside each.
pub struct Library {
    root: PathBuf,
}

impl Library {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Joins a request-supplied folder name onto the root. `None` when the
    /// segment is unsafe or the folder does not exist.
    pub fn show_dir(&self, folder: &str) -> Option<PathBuf> {
        if !is_safe_segment(folder) {
            return None;
        }
        let dir = self.root.join(folder);
        dir.is_dir().then_some(dir)
    }

    /// Sorted show folder names.
    pub fn list_shows(&self) -> io::Result<Vec<String>> {
        let mut shows = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Ok(name) = entry.file_name().into_string() {
                shows.push(name);
            }
        }
        shows.sort();
        Ok(shows)
    }

    /// Sorted episode filenames inside a show folder. Quality subfolders
    /// are not descended into; variants never appear as episodes.
    pub fn list_episodes(&self, folder: &str) -> io::Result<Vec<String>> {
        let dir = self
            .show_dir(folder)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "show folder not found"))?;
        let mut episodes = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if has_video_extension(&name) {
                episodes.push(name);
            }
        }
        episodes.sort();
        Ok(episodes)
    }

    /// Filename of the show's poster sidecar, if one exists.
    pub fn find_poster(&self, folder: &str) -> Option<String> {
        let dir = self.show_dir(folder)?;
        POSTER_EXTENSIONS.iter().find_map(|ext| {
            let name = format!("poster.{ext}");
            dir.join(&name).is_file().then_some(name)
        })
    }
}

fn has_video_extension(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            let ext = ext.to_ascii_lowercase();
            VIDEO_EXTENSIONS.contains(&ext.as_str())
        })
}

/// True when a request-supplied path segment is exactly one normal
/// component. Rejects empty strings, `..`, absolute paths and separators.
pub fn is_safe_segment(segment: &str) -> bool {
    if segment.is_empty() {
        return false;
    }
    let mut components = Path::new(segment).components();
    matches!(components.next(), Some(Component::Normal(_))) && components.next().is_none()
}
