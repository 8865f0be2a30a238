//! Reusable capture buffers shared across protection cycles.

use super::source::PixelBuffer;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const DEFAULT_POOL_SIZE: usize = 8;

/// Counters describing pool usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Buffers currently parked in the pool
    pub retained: usize,
    /// Buffers handed out and not yet returned
    pub in_use: usize,
    /// Buffers allocated over the pool's lifetime
    pub allocated: usize,
}

struct PoolInner {
    capacity: usize,
    free: Mutex<Vec<PixelBuffer>>,
    in_use: AtomicUsize,
    allocated: AtomicUsize,
}

/// A bounded pool of [`PixelBuffer`]s.
///
/// Acquiring from an empty pool allocates instead of failing. The returned
/// guard gives the buffer back when dropped; at most `capacity` buffers are
/// retained, extras are freed.
#[derive(Clone)]
pub struct BufferPool {
    inner: Arc<PoolInner>,
}

impl BufferPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                capacity: capacity.max(1),
                free: Mutex::new(Vec::with_capacity(capacity)),
                in_use: AtomicUsize::new(0),
                allocated: AtomicUsize::new(0),
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    pub fn acquire(&self) -> PooledBuffer {
        let recycled = match self.inner.free.lock() {
            Ok(mut free) => free.pop(),
            Err(poisoned) => poisoned.into_inner().pop(),
        };
        let buffer = recycled.unwrap_or_else(|| {
            self.inner.allocated.fetch_add(1, Ordering::Relaxed);
            tracing::trace!("[BufferPool] Pool empty, allocating new capture buffer");
            PixelBuffer::default()
        });
        self.inner.in_use.fetch_add(1, Ordering::Relaxed);
        PooledBuffer {
            buffer,
            pool: Arc::clone(&self.inner),
        }
    }

    pub fn stats(&self) -> PoolStats {
        let retained = match self.inner.free.lock() {
            Ok(free) => free.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        };
        PoolStats {
            retained,
            in_use: self.inner.in_use.load(Ordering::Relaxed),
            allocated: self.inner.allocated.load(Ordering::Relaxed),
        }
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_SIZE)
    }
}

/// A buffer on loan from a [`BufferPool`].
pub struct PooledBuffer {
    buffer: PixelBuffer,
    pool: Arc<PoolInner>,
}

impl Deref for PooledBuffer {
    type Target = PixelBuffer;

    fn deref(&self) -> &PixelBuffer {
        &self.buffer
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut PixelBuffer {
        &mut self.buffer
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        self.pool.in_use.fetch_sub(1, Ordering::Relaxed);
        let buffer = std::mem::take(&mut self.buffer);
        let mut free = match self.pool.free.lock() {
            Ok(free) => free,
            Err(poisoned) => poisoned.into_inner(),
        };
        if free.len() < self.pool.capacity {
            free.push(buffer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_allocates_when_empty_and_reuses_after_drop() {
        let pool = BufferPool::new(2);
        {
            let mut a = pool.acquire();
            a.reset(4, 4);
            assert_eq!(pool.stats().in_use, 1);
        }
        let stats = pool.stats();
        assert_eq!(stats.retained, 1);
        assert_eq!(stats.in_use, 0);
        assert_eq!(stats.allocated, 1);

        let b = pool.acquire();
        assert_eq!(b.rgba.len(), 64, "recycled buffer keeps its contents");
        assert_eq!(pool.stats().allocated, 1);
    }

    #[test]
    fn test_pool_never_retains_more_than_capacity() {
        let pool = BufferPool::new(2);
        let held: Vec<_> = (0..5).map(|_| pool.acquire()).collect();
        assert_eq!(pool.stats().in_use, 5);
        drop(held);

        let stats = pool.stats();
        assert_eq!(stats.retained, 2);
        assert_eq!(stats.in_use, 0);
        assert_eq!(stats.allocated, 5);
    }

    #[test]
    fn test_buffer_returned_on_early_exit() {
        fn fails(pool: &BufferPool) -> Result<(), String> {
            let _buffer = pool.acquire();
            Err("scorer failed".to_string())
        }

        let pool = BufferPool::default();
        assert!(fails(&pool).is_err());
        assert_eq!(pool.stats().in_use, 0);
        assert_eq!(pool.stats().retained, 1);
    }
}
