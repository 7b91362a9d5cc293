//! Generic bounded pool

use crossbeam::queue::ArrayQueue;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

/// Capacity used when a pool is created with a size of zero.
pub const DEFAULT_POOL_SIZE: usize = 100;

type Factory<T> = Arc<dyn Fn() -> T + Send + Sync>;

/// Lock-free bounded pool of `T`.
///
/// Cloning is cheap and shares the underlying storage.
pub struct ObjectPool<T> {
    available: Arc<ArrayQueue<T>>,
    factory: Factory<T>,
}

impl<T> ObjectPool<T> {
    /// Create a pool of `capacity` objects, pre-filled from `factory`.
    pub fn new<F>(capacity: usize, factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        let capacity = if capacity == 0 {
            DEFAULT_POOL_SIZE
        } else {
            capacity
        };

        let available = ArrayQueue::new(capacity);
        for _ in 0..capacity {
            let _ = available.push(factory());
        }

        Self {
            available: Arc::new(available),
            factory: Arc::new(factory),
        }
    }

    /// Create a new, unpooled object with this pool's factory.
    pub fn create(&self) -> T {
        (self.factory)()
    }

    /// Take an idle object, or create one when the pool is empty.
    pub fn get(&self) -> T {
        self.available.pop().unwrap_or_else(|| self.create())
    }

    /// Return an object. Dropped when the pool is already full.
    pub fn put(&self, item: T) {
        let _ = self.available.push(item);
    }

    /// Take an object that goes back to the pool when the guard drops.
    pub fn pooled(&self) -> Pooled<'_, T> {
        Pooled {
            pool: self,
            item: Some(self.get()),
        }
    }

    /// Number of idle objects currently held.
    pub fn available(&self) -> usize {
        self.available.len()
    }

    pub fn capacity(&self) -> usize {
        self.available.capacity()
    }
}

impl<T> Clone for ObjectPool<T> {
    fn clone(&self) -> Self {
        Self {
            available: Arc::clone(&self.available),
            factory: Arc::clone(&self.factory),
        }
    }
}

impl<T> fmt::Debug for ObjectPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectPool")
            .field("available", &self.available())
            .field("capacity", &self.capacity())
            .finish()
    }
}

/// RAII handle returned by [`ObjectPool::pooled`].
pub struct Pooled<'a, T> {
    pool: &'a ObjectPool<T>,
    item: Option<T>,
}

impl<T> Pooled<'_, T> {
    /// Keep the object instead of returning it to the pool.
    pub fn detach(mut self) -> T {
        match self.item.take() {
            Some(item) => item,
            None => self.pool.create(),
        }
    }
}

impl<T> Deref for Pooled<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // Only `detach` and `drop` take the item, both consume the guard.
        self.item.as_ref().unwrap_or_else(|| unreachable!())
    }
}

impl<T> DerefMut for Pooled<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.item.as_mut().unwrap_or_else(|| unreachable!())
    }
}

impl<T> Drop for Pooled<'_, T> {
    fn drop(&mut self) {
        if let Some(item) = self.item.take() {
            self.pool.put(item);
        }
    }
}
