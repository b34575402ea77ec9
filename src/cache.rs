use std::{
    fs,
    path::{Path, PathBuf},
    sync::{
        Arc, Condvar, Mutex, OnceLock,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::Instant,
};

use directories::ProjectDirs;

use crate::{
    atlas,
    codec::{self, Validator},
    descriptor::MaskDescriptor,
    mask::CachedMask,
};

/// Cap for cache records, applied to both reads and writes.
pub const MAX_CACHE_SIZE: u64 = 5 * 1024 * 1024;

const IMAGE_MASK_DARKEN_ALPHA: u8 = 32;
const CACHE_FILE_NAME: &str = "mask";

/// One-shot publication cell for a mask shared across the process.
///
/// The slot is written exactly once. Reads are lock-free once published; the
/// mutex/condvar pair is only touched during the pre-ready window. A cell
/// lives for the process lifetime, there is no teardown.
pub struct MaskCache {
    slot: OnceLock<Arc<CachedMask>>,
    started: AtomicBool,
    lock: Mutex<()>,
    signal: Condvar,
}

impl MaskCache {
    pub const fn new() -> Self {
        Self {
            slot: OnceLock::new(),
            started: AtomicBool::new(false),
            lock: Mutex::new(()),
            signal: Condvar::new(),
        }
    }

    /// Take-once guard for starting the background work: true for exactly
    /// one caller over the cell's lifetime.
    pub fn begin(&self) -> bool {
        !self.started.swap(true, Ordering::AcqRel)
    }

    /// Non-blocking read of the published mask.
    pub fn try_get(&self) -> Option<Arc<CachedMask>> {
        self.slot.get().cloned()
    }

    /// Publish the finished mask and wake every blocked reader.
    pub fn publish(&self, mask: CachedMask) {
        assert!(
            self.slot.set(Arc::new(mask)).is_ok(),
            "mask published twice"
        );
        // Taking the lock orders the publication against readers that have
        // re-checked the slot and are about to wait.
        drop(self.lock.lock().unwrap_or_else(|e| e.into_inner()));
        self.signal.notify_all();
    }

    /// Blocking read: returns immediately once published, otherwise parks
    /// the calling thread until the publish signal.
    pub fn wait(&self) -> Arc<CachedMask> {
        if let Some(mask) = self.try_get() {
            return mask;
        }
        let mut guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        loop {
            if let Some(mask) = self.try_get() {
                return mask;
            }
            guard = self
                .signal
                .wait(guard)
                .unwrap_or_else(|e| e.into_inner());
        }
    }
}

impl Default for MaskCache {
    fn default() -> Self {
        Self::new()
    }
}

static DEFAULT_MASK: MaskCache = MaskCache::new();
static DEFAULT_IMAGE_MASK: OnceLock<Arc<CachedMask>> = OnceLock::new();

fn default_cache_path() -> Option<PathBuf> {
    let dirs = ProjectDirs::from("com", "veil", "veil")?;
    Some(dirs.cache_dir().join(CACHE_FILE_NAME))
}

/// Read and decode a mask record, rejecting files over the size cap. Any
/// failure is indistinguishable from "no cache exists".
pub fn read_mask_file(path: &Path, validator: Option<&Validator>) -> Option<CachedMask> {
    let metadata = fs::metadata(path).ok()?;
    if metadata.len() > MAX_CACHE_SIZE {
        return None;
    }
    let bytes = fs::read(path).ok()?;
    codec::deserialize(&bytes, validator)
}

/// Persist a mask record, creating the parent directory. I/O failures and
/// records over the size cap are skipped; the caller proceeds in memory.
pub fn write_mask_file(path: &Path, mask: &CachedMask) {
    let Some(folder) = path.parent() else {
        return;
    };
    if let Err(error) = fs::create_dir_all(folder) {
        tracing::debug!(%error, "skipping mask cache write");
        return;
    }
    let bytes = match codec::serialize(mask) {
        Ok(bytes) => bytes,
        Err(error) => {
            tracing::debug!(%error, "skipping mask cache write");
            return;
        }
    };
    if bytes.len() as u64 > MAX_CACHE_SIZE {
        tracing::debug!(len = bytes.len(), "mask cache record exceeds size cap");
        return;
    }
    if let Err(error) = fs::write(path, &bytes) {
        tracing::debug!(%error, "skipping mask cache write");
    }
}

/// Start building the process-wide default mask in the background. The
/// first call spawns the worker; every later call is a no-op.
pub fn prepare_default_mask() {
    if !DEFAULT_MASK.begin() {
        return;
    }
    thread::spawn(|| {
        let descriptor = MaskDescriptor::default_mask();
        let validator = Validator {
            frame_duration: descriptor.frame_duration,
            frames_count: descriptor.frames_count,
            canvas_size: descriptor.canvas_size,
        };

        let cached = default_cache_path()
            .and_then(|path| read_mask_file(&path, Some(&validator)));
        let fresh = cached.is_none();
        let mask = match cached {
            Some(mask) => {
                tracing::debug!("default mask loaded from cache");
                mask
            }
            None => {
                let started = Instant::now();
                let mask = atlas::generate(&descriptor);
                tracing::debug!(
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "default mask generated"
                );
                mask
            }
        };

        DEFAULT_MASK.publish(mask);

        // Persist after publication so readers are never held up by I/O.
        if fresh {
            if let (Some(path), Some(mask)) = (default_cache_path(), DEFAULT_MASK.try_get()) {
                write_mask_file(&path, &mask);
            }
        }
    });
}

/// The process-wide default mask. Blocks until the background generation
/// finishes; lock-free afterwards.
pub fn default_mask() -> Arc<CachedMask> {
    prepare_default_mask();
    DEFAULT_MASK.wait()
}

/// The default obscured-image overlay: the default mask over a translucent
/// black layer. Computed lazily once per process.
pub fn default_image_mask() -> Arc<CachedMask> {
    DEFAULT_IMAGE_MASK
        .get_or_init(|| Arc::new(default_mask().darkened(IMAGE_MASK_DARKEN_ALPHA)))
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::Raster;

    fn tiny_mask() -> CachedMask {
        CachedMask::new(Raster::new(8, 4), 2, 33, 4)
    }

    #[test]
    fn try_get_is_empty_until_published() {
        let cache = MaskCache::new();
        assert!(cache.try_get().is_none());
        cache.publish(tiny_mask());
        assert!(cache.try_get().is_some());
    }

    #[test]
    fn wait_returns_the_published_instance() {
        let cache = MaskCache::new();
        cache.publish(tiny_mask());
        let a = cache.wait();
        let b = cache.wait();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn begin_is_take_once() {
        let cache = MaskCache::new();
        assert!(cache.begin());
        assert!(!cache.begin());
        assert!(!cache.begin());
    }

    #[test]
    #[should_panic(expected = "published twice")]
    fn double_publish_is_a_bug() {
        let cache = MaskCache::new();
        cache.publish(tiny_mask());
        cache.publish(tiny_mask());
    }
}
