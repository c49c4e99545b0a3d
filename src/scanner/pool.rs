//! Reusable scratch objects for streaming reads.
//!
//! Fingerprinting and byte comparison both read files through fixed-size
//! buffers. A [`Pool`] hands those buffers out behind a [`Pooled`] guard,
//! which puts the object back when dropped, so early returns and `?` never
//! leak a buffer.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex};

/// Default scratch buffer size (32 KiB).
pub const DEFAULT_BUFFER_SIZE: usize = 32 * 1024;

type Factory<T> = dyn Fn() -> T + Send + Sync;

struct Inner<T> {
    free: Mutex<Vec<T>>,
    factory: Box<Factory<T>>,
}

/// A thread-safe pool of reusable objects.
///
/// Cloning a pool is cheap and yields a handle to the same free list.
pub struct Pool<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Pool<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("available", &self.available())
            .finish()
    }
}

impl<T> Pool<T> {
    /// Create a pool that builds new objects with `factory` when empty.
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(Inner {
                free: Mutex::new(Vec::new()),
                factory: Box::new(factory),
            }),
        }
    }

    /// Take an object from the pool, creating one if none is free.
    pub fn acquire(&self) -> Pooled<T> {
        let reused = self
            .inner
            .free
            .lock()
            .map(|mut free| free.pop())
            .unwrap_or(None);
        let value = reused.unwrap_or_else(|| (self.inner.factory)());
        Pooled {
            value: Some(value),
            inner: Arc::clone(&self.inner),
        }
    }

    /// Number of idle objects waiting for reuse.
    #[must_use]
    pub fn available(&self) -> usize {
        self.inner.free.lock().map(|free| free.len()).unwrap_or(0)
    }
}

/// An object on loan from a [`Pool`].
///
/// Returned to the pool on drop.
pub struct Pooled<T> {
    value: Option<T>,
    inner: Arc<Inner<T>>,
}

impl<T> Deref for Pooled<T> {
    type Target = T;

    fn deref(&self) -> &T {
        // Only `drop` takes the value.
        self.value.as_ref().unwrap_or_else(|| unreachable!())
    }
}

impl<T> DerefMut for Pooled<T> {
    fn deref_mut(&mut self) -> &mut T {
        self.value.as_mut().unwrap_or_else(|| unreachable!())
    }
}

impl<T> Drop for Pooled<T> {
    fn drop(&mut self) {
        if let Some(value) = self.value.take() {
            // A poisoned lock just means the object is discarded.
            if let Ok(mut free) = self.inner.free.lock() {
                free.push(value);
            }
        }
    }
}

/// Pool of zero-filled byte buffers of one fixed size.
#[derive(Debug, Clone)]
pub struct BufferPool {
    pool: Pool<Vec<u8>>,
    buffer_size: usize,
}

impl BufferPool {
    /// Create a pool of buffers of `buffer_size` bytes (at least 1).
    #[must_use]
    pub fn new(buffer_size: usize) -> Self {
        let buffer_size = buffer_size.max(1);
        Self {
            pool: Pool::new(move || vec![0u8; buffer_size]),
            buffer_size,
        }
    }

    /// Borrow a buffer.
    pub fn acquire(&self) -> Pooled<Vec<u8>> {
        self.pool.acquire()
    }

    /// Size of every buffer handed out.
    #[must_use]
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Number of idle buffers.
    #[must_use]
    pub fn available(&self) -> usize {
        self.pool.available()
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_SIZE)
    }
}
