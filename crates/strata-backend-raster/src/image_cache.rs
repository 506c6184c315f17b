//! Decoded image cache
//!
//! Decoding the same asset for every render is the dominant cost of image
//! layers, so decoded pixmaps are cached by a blake3 hash of the encoded
//! bytes. The cache is bounded by memory and evicts the least recently used
//! entry first.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use strata_core::DrawError;
use tiny_skia::{IntSize, Pixmap};
use tracing::debug;

/// Content hash of encoded image bytes
pub type ContentHash = [u8; 32];

#[derive(Debug, Clone)]
struct CachedImage {
    pixmap: Arc<Pixmap>,
    last_accessed: Instant,
    access_count: u64,
}

impl CachedImage {
    fn new(pixmap: Arc<Pixmap>) -> Self {
        Self {
            pixmap,
            last_accessed: Instant::now(),
            access_count: 0,
        }
    }

    fn touch(&mut self) {
        self.last_accessed = Instant::now();
        self.access_count += 1;
    }

    fn memory_size(&self) -> usize {
        self.pixmap.data().len() + std::mem::size_of::<Self>()
    }
}

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub lookups: u64,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub insertions: u64,
}

impl CacheStats {
    /// Hit rate (0.0 - 1.0)
    pub fn hit_rate(&self) -> f64 {
        if self.lookups == 0 {
            0.0
        } else {
            self.hits as f64 / self.lookups as f64
        }
    }
}

#[derive(Debug, Default)]
struct Entries {
    images: HashMap<ContentHash, CachedImage>,
    size_bytes: usize,
    stats: CacheStats,
}

impl Entries {
    fn evict_one(&mut self) {
        let lru = self
            .images
            .iter()
            .min_by_key(|(_, e)| e.last_accessed)
            .map(|(hash, _)| *hash);

        if let Some(entry) = lru.and_then(|hash| self.images.remove(&hash)) {
            self.size_bytes = self.size_bytes.saturating_sub(entry.memory_size());
            self.stats.evictions += 1;
        }
    }
}

/// Memory-bounded LRU cache of decoded images, shared across surfaces
#[derive(Debug)]
pub struct ImageCache {
    entries: Mutex<Entries>,
    max_size_bytes: usize,
}

impl ImageCache {
    pub fn new(max_size_bytes: usize) -> Self {
        Self {
            entries: Mutex::new(Entries::default()),
            max_size_bytes,
        }
    }

    /// Decoded pixmap for `encoded`, decoding on a miss
    pub fn get_or_decode(&self, encoded: &[u8]) -> Result<Arc<Pixmap>, DrawError> {
        let hash = *blake3::hash(encoded).as_bytes();

        if let Some(pixmap) = self.get(&hash) {
            return Ok(pixmap);
        }

        // Decode outside the lock; concurrent misses on the same asset both
        // decode and the second insert replaces the first.
        let pixmap = Arc::new(decode(encoded)?);
        self.insert(hash, Arc::clone(&pixmap));
        Ok(pixmap)
    }

    pub fn get(&self, hash: &ContentHash) -> Option<Arc<Pixmap>> {
        let mut entries = self.entries.lock();
        entries.stats.lookups += 1;

        match entries.images.get_mut(hash) {
            Some(entry) => {
                entry.touch();
                let pixmap = Arc::clone(&entry.pixmap);
                entries.stats.hits += 1;
                Some(pixmap)
            }
            None => {
                entries.stats.misses += 1;
                None
            }
        }
    }

    pub fn insert(&self, hash: ContentHash, pixmap: Arc<Pixmap>) {
        let entry = CachedImage::new(pixmap);
        let entry_size = entry.memory_size();
        if entry_size > self.max_size_bytes {
            debug!(
                bytes = entry_size,
                limit = self.max_size_bytes,
                "Image larger than cache, not caching"
            );
            return;
        }

        let mut entries = self.entries.lock();
        if let Some(old) = entries.images.remove(&hash) {
            entries.size_bytes = entries.size_bytes.saturating_sub(old.memory_size());
        }
        while entries.size_bytes + entry_size > self.max_size_bytes && !entries.images.is_empty() {
            entries.evict_one();
        }

        entries.size_bytes += entry_size;
        entries.images.insert(hash, entry);
        entries.stats.insertions += 1;
    }

    pub fn stats(&self) -> CacheStats {
        self.entries.lock().stats.clone()
    }
}

#[cfg(test)]
impl ImageCache {
    fn contains(&self, hash: &ContentHash) -> bool {
        self.entries.lock().images.contains_key(hash)
    }

    fn size_bytes(&self) -> usize {
        self.entries.lock().size_bytes
    }

    fn len(&self) -> usize {
        self.entries.lock().images.len()
    }

    fn is_empty(&self) -> bool {
        self.entries.lock().images.is_empty()
    }
}

/// Decode PNG or JPEG bytes into a premultiplied pixmap
pub fn decode(encoded: &[u8]) -> Result<Pixmap, DrawError> {
    let rgba = image::load_from_memory(encoded)
        .map_err(|e| DrawError::ImageDecode(e.to_string()))?
        .to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut data = rgba.into_raw();
    for px in data.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a < 255 {
            for c in &mut px[..3] {
                *c = ((*c as u16 * a + 127) / 255) as u8;
            }
        }
    }

    let size = IntSize::from_wh(width, height)
        .ok_or_else(|| DrawError::ImageDecode(format!("empty image {width}x{height}")))?;
    Pixmap::from_vec(data, size)
        .ok_or_else(|| DrawError::Allocation(format!("image pixmap {width}x{height}")))
}
