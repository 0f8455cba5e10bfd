//! Bounded pool of open decoder handles, keyed by source file.
//!
//! A scrub gesture fires dozens of preview requests per second against the
//! same file. The pool keeps up to `capacity` decode contexts open and
//! evicts in strict insertion order (FIFO, not LRU) when a new file needs a
//! slot.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::error::PreviewError;
use crate::media::{FrameSource, MediaOpener};

/// Default number of simultaneously open decode contexts.
pub const DEFAULT_POOL_CAPACITY: usize = 6;

/// Canonical identity of a source media file. Equality is plain path
/// equality; callers build keys from an already-resolved library root, so
/// no extra normalization happens here.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct VideoKey(PathBuf);

impl VideoKey {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

/// One open decode context bound to a [`VideoKey`].
///
/// The context is exclusively owned here; everyone else goes through the
/// pool's `Arc<Mutex<DecoderHandle>>`, which serializes seek+read per file.
pub struct DecoderHandle {
    key: VideoKey,
    source: Box<dyn FrameSource>,
    last_used: Instant,
}

impl std::fmt::Debug for DecoderHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecoderHandle")
            .field("key", &self.key)
            .field("last_used", &self.last_used)
            .finish_non_exhaustive()
    }
}

impl DecoderHandle {
    pub fn key(&self) -> &VideoKey {
        &self.key
    }

    pub fn source(&mut self) -> &mut dyn FrameSource {
        self.source.as_mut()
    }

    /// Records activity. Diagnostics only; the eviction policy never
    /// reads this.
    pub fn touch(&mut self) {
        self.last_used = Instant::now();
    }

    pub fn idle(&self) -> std::time::Duration {
        self.last_used.elapsed()
    }
}

pub type SharedHandle = Arc<Mutex<DecoderHandle>>;

pub struct HandlePool {
    opener: Arc<dyn MediaOpener>,
    capacity: usize,
    inner: Mutex<PoolInner>,
}

#[derive(Default)]
struct PoolInner {
    handles: HashMap<VideoKey, SharedHandle>,
    /// Front = oldest insertion. Hits never reorder it.
    order: VecDeque<VideoKey>,
}

impl HandlePool {
    pub fn new(opener: Arc<dyn MediaOpener>, capacity: usize) -> Self {
        Self {
            opener,
            capacity: capacity.max(1),
            inner: Mutex::new(PoolInner::default()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of currently open handles.
    pub fn resident_count(&self) -> usize {
        self.inner.lock().handles.len()
    }

    pub fn is_resident(&self, key: &VideoKey) -> bool {
        self.inner.lock().handles.contains_key(key)
    }

    /// Returns the handle for `key`, opening the file on a miss and
    /// evicting the oldest-inserted entry when the pool is full.
    ///
    /// A failed open leaves the pool untouched. A successful miss closes at
    /// most one other file (the evicted entry) as a side effect.
    pub fn acquire(&self, key: &VideoKey) -> Result<SharedHandle, PreviewError> {
        if let Some(handle) = self.inner.lock().handles.get(key) {
            log::trace!(target: "anisub::pool", "hit for {}", key.path().display());
            return Ok(Arc::clone(handle));
        }

        // Opening demuxes container headers; it must not run under the
        // membership lock.
        let source = self.opener.open(key.path())?;
        let fresh: SharedHandle = Arc::new(Mutex::new(DecoderHandle {
            key: key.clone(),
            source,
            last_used: Instant::now(),
        }));

        let evicted = {
            let mut inner = self.inner.lock();
            if let Some(existing) = inner.handles.get(key) {
                // Another worker opened the same file while we did. Theirs
                // is resident; ours closes when `fresh` drops.
                log::debug!(
                    target: "anisub::pool",
                    "discarding duplicate open for {}",
                    key.path().display()
                );
                return Ok(Arc::clone(existing));
            }

            let evicted = if inner.handles.len() >= self.capacity {
                match inner.order.pop_front() {
                    Some(oldest) => inner.handles.remove(&oldest),
                    None => None,
                }
            } else {
                None
            };

            inner.order.push_back(key.clone());
            inner.handles.insert(key.clone(), Arc::clone(&fresh));
            evicted
        };

        if let Some(handle) = evicted {
            // Dropping the pool's reference outside the membership lock. If
            // a request is still decoding on this handle, its clone keeps
            // the context alive until that operation finishes; the native
            // resource is never released mid-operation.
            match handle.try_lock() {
                Some(guard) => log::debug!(
                    target: "anisub::pool",
                    "evicted {} after {:.1}s idle",
                    guard.key().path().display(),
                    guard.idle().as_secs_f64()
                ),
                None => log::debug!(
                    target: "anisub::pool",
                    "evicted a busy handle; context closes when its last user finishes"
                ),
            }
        }

        log::debug!(target: "anisub::pool", "opened {}", key.path().display());
        Ok(fresh)
    }

    /// Closes every resident handle. Shutdown only; mid-life callers rely
    /// on eviction.
    pub fn release_all(&self) {
        let mut inner = self.inner.lock();
        let count = inner.handles.len();
        inner.order.clear();
        inner.handles.clear();
        if count > 0 {
            log::info!(target: "anisub::pool", "released {count} decoder handle(s)");
        }
    }
}
