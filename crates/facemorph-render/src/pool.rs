use std::collections::BTreeMap;

use facemorph_image::ImageSize;

use crate::backend::SurfaceId;
use crate::error::RenderError;

/// Bytes held by one pixel of a surface, RGBA `f32`.
pub const SURFACE_BYTES_PER_PIXEL: usize = 4 * std::mem::size_of::<f32>();

#[derive(Clone, Copy, Debug)]
struct PoolEntry {
    size: ImageSize,
    ref_count: usize,
    // logical time of the last release, used for eviction order
    released_at: u64,
}

impl PoolEntry {
    fn bytes(&self) -> usize {
        self.size.area() * SURFACE_BYTES_PER_PIXEL
    }
}

/// Result of [`SurfacePool::acquire`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Acquired {
    /// the surface handed out
    pub id: SurfaceId,
    /// whether an idle surface was reused, otherwise the caller must allocate storage
    pub reused: bool,
}

/// Bookkeeping for pooled offscreen surfaces.
///
/// Surfaces are reference counted. A surface whose count drops to zero stays cached
/// for reuse by a later request of the same size. Whenever the memory held by all
/// cached surfaces exceeds the cap, idle surfaces are evicted, least recently
/// released first. Referenced surfaces are never evicted, so the pool may run over
/// its cap while they are in use.
///
/// The pool only tracks handles; the backend owns the pixel storage and frees it for
/// every id the pool reports as evicted.
#[derive(Debug)]
pub struct SurfacePool {
    entries: BTreeMap<SurfaceId, PoolEntry>,
    next_id: u32,
    clock: u64,
    max_bytes: usize,
}

impl SurfacePool {
    /// Create a pool capped at `max_mb` megabytes of idle and active surfaces.
    pub fn new(max_mb: usize) -> Self {
        Self {
            entries: BTreeMap::new(),
            next_id: 0,
            clock: 0,
            max_bytes: max_mb * 1024 * 1024,
        }
    }

    /// The memory cap in bytes.
    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Memory held by every cached surface, referenced or not.
    pub fn total_bytes(&self) -> usize {
        self.entries.values().map(PoolEntry::bytes).sum()
    }

    /// Number of cached surfaces.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the pool holds no surface.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Current reference count of a surface, `None` if it is not in the pool.
    pub fn ref_count(&self, id: SurfaceId) -> Option<usize> {
        self.entries.get(&id).map(|e| e.ref_count)
    }

    /// Size of a surface, `None` if it is not in the pool.
    pub fn size(&self, id: SurfaceId) -> Option<ImageSize> {
        self.entries.get(&id).map(|e| e.size)
    }

    /// Hand out a surface of `size` with a reference count of one.
    ///
    /// The most recently released idle surface of the same size is reused when there
    /// is one, otherwise a new handle is registered.
    pub fn acquire(&mut self, size: ImageSize) -> Acquired {
        let idle = self
            .entries
            .iter()
            .filter(|(_, e)| e.ref_count == 0 && e.size == size)
            .max_by_key(|(_, e)| e.released_at)
            .map(|(id, _)| *id);

        if let Some(id) = idle {
            if let Some(entry) = self.entries.get_mut(&id) {
                entry.ref_count = 1;
            }
            return Acquired { id, reused: true };
        }

        let id = SurfaceId::new(self.next_id);
        self.next_id += 1;
        self.entries.insert(
            id,
            PoolEntry {
                size,
                ref_count: 1,
                released_at: 0,
            },
        );
        Acquired { id, reused: false }
    }

    /// Add a reference to an acquired surface.
    pub fn retain(&mut self, id: SurfaceId) -> Result<(), RenderError> {
        let entry = self
            .entries
            .get_mut(&id)
            .ok_or(RenderError::UnknownSurface(id))?;
        if entry.ref_count == 0 {
            return Err(RenderError::SurfaceNotAcquired(id));
        }
        entry.ref_count += 1;
        Ok(())
    }

    /// Drop a reference to a surface and trim the pool.
    ///
    /// Returns the surfaces evicted by the trim.
    pub fn release(&mut self, id: SurfaceId) -> Result<Vec<SurfaceId>, RenderError> {
        let entry = self
            .entries
            .get_mut(&id)
            .ok_or(RenderError::UnknownSurface(id))?;
        if entry.ref_count == 0 {
            return Err(RenderError::SurfaceNotAcquired(id));
        }
        entry.ref_count -= 1;
        if entry.ref_count == 0 {
            self.clock += 1;
            entry.released_at = self.clock;
        }
        Ok(self.trim())
    }

    /// Evict idle surfaces, least recently released first, until the pool fits its cap.
    pub fn trim(&mut self) -> Vec<SurfaceId> {
        let mut total = self.total_bytes();
        if total <= self.max_bytes {
            return Vec::new();
        }

        let mut idle: Vec<(SurfaceId, PoolEntry)> = self
            .entries
            .iter()
            .filter(|(_, e)| e.ref_count == 0)
            .map(|(id, e)| (*id, *e))
            .collect();
        idle.sort_by_key(|(_, e)| e.released_at);

        let mut evicted = Vec::new();
        for (id, entry) in idle {
            if total <= self.max_bytes {
                break;
            }
            self.entries.remove(&id);
            total -= entry.bytes();
            evicted.push(id);
        }

        if !evicted.is_empty() {
            log::debug!(
                "surface pool evicted {} surfaces, {} bytes cached",
                evicted.len(),
                total
            );
        }

        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 256x256 RGBA f32 is exactly one megabyte
    const ONE_MB: ImageSize = ImageSize {
        width: 256,
        height: 256,
    };

    #[test]
    fn acquire_reuses_idle_surface_of_same_size() -> Result<(), RenderError> {
        let mut pool = SurfacePool::new(50);
        let a = pool.acquire(ONE_MB);
        assert!(!a.reused);
        pool.release(a.id)?;

        let b = pool.acquire(ONE_MB);
        assert!(b.reused);
        assert_eq!(a.id, b.id);

        let c = pool.acquire([16, 16].into());
        assert!(!c.reused);
        assert_ne!(c.id, b.id);
        assert_eq!(pool.len(), 2);
        Ok(())
    }

    #[test]
    fn ref_counting() -> Result<(), RenderError> {
        let mut pool = SurfacePool::new(50);
        let a = pool.acquire(ONE_MB);
        pool.retain(a.id)?;
        assert_eq!(pool.ref_count(a.id), Some(2));

        pool.release(a.id)?;
        // still referenced, so not handed out again
        assert_ne!(pool.acquire(ONE_MB).id, a.id);

        pool.release(a.id)?;
        assert_eq!(pool.ref_count(a.id), Some(0));
        assert_eq!(
            pool.release(a.id),
            Err(RenderError::SurfaceNotAcquired(a.id))
        );
        assert_eq!(pool.retain(a.id), Err(RenderError::SurfaceNotAcquired(a.id)));
        assert_eq!(
            pool.release(SurfaceId::new(99)),
            Err(RenderError::UnknownSurface(SurfaceId::new(99)))
        );
        Ok(())
    }

    #[test]
    fn eviction_is_least_recently_released_first() -> Result<(), RenderError> {
        let mut pool = SurfacePool::new(2);
        let a = pool.acquire(ONE_MB).id;
        let b = pool.acquire(ONE_MB).id;
        let c = pool.acquire(ONE_MB).id;
        assert_eq!(pool.total_bytes(), 3 * 1024 * 1024);

        // over the cap but everything is referenced
        assert!(pool.trim().is_empty());

        assert_eq!(pool.release(b)?, vec![b]);
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.ref_count(b), None);

        let evicted = pool.release(a)?;
        assert!(evicted.is_empty());
        pool.release(c)?;
        assert_eq!(pool.len(), 2);

        // a cap of zero evicts every idle surface, oldest first
        let mut pool = SurfacePool::new(0);
        let ids: Vec<SurfaceId> = (0..3).map(|_| pool.acquire(ONE_MB).id).collect();
        let mut evicted = Vec::new();
        for id in [ids[2], ids[0], ids[1]] {
            evicted.extend(pool.release(id)?);
        }
        assert_eq!(evicted, vec![ids[2], ids[0], ids[1]]);
        assert!(pool.is_empty());
        Ok(())
    }

    #[test]
    fn trim_keeps_most_recent() -> Result<(), RenderError> {
        let mut pool = SurfacePool::new(2);
        let ids: Vec<SurfaceId> = (0..4).map(|_| pool.acquire(ONE_MB).id).collect();
        // release order 3, 1, 0, 2; pool goes to 2MB once two are gone
        let mut evicted = Vec::new();
        for i in [3, 1, 0, 2] {
            evicted.extend(pool.release(ids[i])?);
        }
        assert_eq!(evicted, vec![ids[3], ids[1]]);
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.ref_count(ids[0]), Some(0));
        assert_eq!(pool.ref_count(ids[2]), Some(0));
        assert_eq!(pool.total_bytes(), pool.max_bytes());
        Ok(())
    }
}
