//! # Buffer Pool
//!
//! Pool of fixed-size packet buffers, so encoding a message does not allocate
//! once the pool is warm.
//!
//! Every buffer handed out is exactly `buffer_size` bytes long. Buffers go
//! back to the pool on drop, up to the pool's configured size; extras are
//! freed.
//!
//! ## Usage
//! ```rust
//! use overlay_wire::utils::buffer_pool::BufferPool;
//!
//! let pool = BufferPool::new(4, 1500);
//! let mut buffer = pool.acquire();
//! assert_eq!(buffer.len(), 1500);
//! buffer[0] = 0x2a;
//! drop(buffer);
//! assert_eq!(pool.available(), 4);
//! ```

use std::sync::{Arc, Mutex};

/// A pooled packet buffer that returns itself to the pool when dropped
pub struct PooledBuffer {
    buffer: Vec<u8>,
    pool: Arc<Mutex<Vec<Vec<u8>>>>,
    max_pooled: usize,
}

impl PooledBuffer {
    /// Take the underlying buffer out of the pool's reach
    pub fn into_inner(mut self) -> Vec<u8> {
        std::mem::take(&mut self.buffer)
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        if let Ok(mut pool) = self.pool.lock() {
            if pool.len() < self.max_pooled {
                pool.push(std::mem::take(&mut self.buffer));
            }
        }
    }
}

impl std::ops::Deref for PooledBuffer {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.buffer
    }
}

impl std::ops::DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.buffer
    }
}

/// Thread-safe pool of equally sized packet buffers
#[derive(Debug, Clone)]
pub struct BufferPool {
    pool: Arc<Mutex<Vec<Vec<u8>>>>,
    pool_size: usize,
    buffer_size: usize,
}

impl BufferPool {
    /// Create a pool holding `pool_size` buffers of `buffer_size` bytes
    pub fn new(pool_size: usize, buffer_size: usize) -> Self {
        let pool = (0..pool_size).map(|_| vec![0u8; buffer_size]).collect();

        Self {
            pool: Arc::new(Mutex::new(pool)),
            pool_size,
            buffer_size,
        }
    }

    /// Acquire a buffer from the pool (or allocate a new one if pool is empty)
    pub fn acquire(&self) -> PooledBuffer {
        let buffer = self
            .pool
            .lock()
            .ok()
            .and_then(|mut pool| pool.pop())
            .unwrap_or_else(|| vec![0u8; self.buffer_size]);

        PooledBuffer {
            buffer,
            pool: Arc::clone(&self.pool),
            max_pooled: self.pool_size,
        }
    }

    /// Get the current number of available buffers in the pool
    pub fn available(&self) -> usize {
        self.pool.lock().map(|p| p.len()).unwrap_or(0)
    }

    /// Length of every buffer handed out
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_pool_basic() {
        let pool = BufferPool::new(10, 64);
        assert_eq!(pool.available(), 10);

        let mut buf = pool.acquire();
        assert_eq!(pool.available(), 9);
        assert_eq!(buf.len(), 64);

        buf[0] = 42;
        assert_eq!(buf[0], 42);

        drop(buf);
        assert_eq!(pool.available(), 10);
    }

    #[test]
    fn test_buffer_pool_empty_allocates() {
        let pool = BufferPool::new(1, 32);
        let _buf1 = pool.acquire();
        let buf2 = pool.acquire();
        assert_eq!(buf2.len(), 32);
        assert_eq!(pool.available(), 0);
    }

    #[test]
    fn test_pool_does_not_grow_past_size() {
        let pool = BufferPool::new(1, 16);
        let first = pool.acquire();
        let second = pool.acquire();
        drop(first);
        drop(second);
        assert_eq!(pool.available(), 1);
    }

    #[test]
    fn test_into_inner_detaches() {
        let pool = BufferPool::new(1, 8);
        let inner = pool.acquire().into_inner();
        assert_eq!(inner.len(), 8);
        assert_eq!(pool.available(), 0);
    }

    #[test]
    fn test_clones_share_storage() {
        let pool = BufferPool::new(2, 8);
        let clone = pool.clone();
        let _buf = clone.acquire();
        assert_eq!(pool.available(), 1);
    }
}
