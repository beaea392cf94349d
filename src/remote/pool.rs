// vcblob: versioned blob store over git and GitLab
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Fixed-size pool of reusable resources.
//!
//! ```text
//! acquire() --> flume (bounded, prefilled) --> PoolGuard
//!                     ^                          |
//!                     +------ Drop returns ------+
//! ```
//!
//! `acquire` waits while every item is checked out, capping concurrent
//! requests at the pool size.

use std::ops::{Deref, DerefMut};

use crate::error::{StoreError, StoreResult};

/// A bounded set of items handed out one caller at a time.
#[derive(Debug)]
pub struct ResourcePool<T> {
    sender: flume::Sender<T>,
    receiver: flume::Receiver<T>,
    capacity: usize,
}

impl<T> ResourcePool<T> {
    /// Pool holding exactly `items`.
    pub fn new(items: Vec<T>) -> Self {
        let capacity = items.len();
        let (sender, receiver) = flume::bounded(capacity.max(1));
        for item in items {
            // Capacity matches the item count, so this never blocks.
            let _ = sender.try_send(item);
        }
        Self {
            sender,
            receiver,
            capacity,
        }
    }

    /// Pool of `size` items built by `make`.
    ///
    /// # Errors
    ///
    /// Returns the first error `make` returns.
    pub fn filled<E>(size: usize, mut make: impl FnMut() -> Result<T, E>) -> Result<Self, E> {
        let items = (0..size).map(|_| make()).collect::<Result<Vec<_>, E>>()?;
        Ok(Self::new(items))
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Items not checked out right now.
    #[must_use]
    pub fn available(&self) -> usize {
        self.receiver.len()
    }

    /// Wait for a free item.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Other` if the pool is empty by construction.
    pub async fn acquire(&self) -> StoreResult<PoolGuard<'_, T>> {
        if self.capacity == 0 {
            return Err(StoreError::Other("resource pool has no items".into()));
        }
        let item = self
            .receiver
            .recv_async()
            .await
            .map_err(|_| StoreError::Other("resource pool closed".into()))?;
        Ok(PoolGuard {
            item: Some(item),
            pool: self,
        })
    }
}

/// An item checked out of a [`ResourcePool`]; returned on drop.
#[derive(Debug)]
pub struct PoolGuard<'a, T> {
    item: Option<T>,
    pool: &'a ResourcePool<T>,
}

impl<T> Deref for PoolGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // Only `drop` takes the item out.
        match self.item.as_ref() {
            Some(item) => item,
            None => unreachable!("pool item taken before drop"),
        }
    }
}

impl<T> DerefMut for PoolGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        match self.item.as_mut() {
            Some(item) => item,
            None => unreachable!("pool item taken before drop"),
        }
    }
}

impl<T> Drop for PoolGuard<'_, T> {
    fn drop(&mut self) {
        if let Some(item) = self.item.take() {
            let _ = self.pool.sender.try_send(item);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ResourcePool;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_guard_returns_item_on_drop() {
        let pool = ResourcePool::new(vec![1, 2]);
        assert_eq!(pool.available(), 2);
        {
            let first = pool.acquire().await.unwrap();
            assert_eq!(*first, 1);
            assert_eq!(pool.available(), 1);
        }
        assert_eq!(pool.available(), 2);
    }

    #[tokio::test]
    async fn test_filled_propagates_error() {
        let mut made = 0;
        let result = ResourcePool::<u8>::filled(3, || {
            made += 1;
            if made == 2 { Err("boom") } else { Ok(0) }
        });
        assert_eq!(result.unwrap_err(), "boom");
    }

    #[tokio::test]
    async fn test_empty_pool_errors() {
        let pool = ResourcePool::<u8>::new(Vec::new());
        assert!(pool.acquire().await.is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_capped_at_capacity() {
        let pool = Arc::new(ResourcePool::filled(2, || Ok::<_, ()>(())).unwrap());
        let in_use = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let pool = Arc::clone(&pool);
                let in_use = Arc::clone(&in_use);
                let max_seen = Arc::clone(&max_seen);
                tokio::spawn(async move {
                    let _guard = pool.acquire().await.unwrap();
                    let now = in_use.fetch_add(1, Ordering::SeqCst) + 1;
                    max_seen.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    in_use.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();

        for task in tasks {
            task.await.unwrap();
        }
        assert!(max_seen.load(Ordering::SeqCst) <= 2);
        assert_eq!(pool.available(), 2);
    }
}
