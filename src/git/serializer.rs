// vcblob: versioned blob store over git and GitLab
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Single-worker FIFO job queue.
//!
//! ```text
//! submitter A --\                       +--> done A
//! submitter B ---+--> flume (FIFO) --> worker thread --> done B
//! submitter C --/      one job at a time +--> done C
//! ```
//!
//! Handles opened on the same location share one serializer through a
//! process-wide registry, so their jobs are totally ordered against each
//! other.
//! A panicking job does not stop the worker; its submitter gets
//! `SerializerError::JobAbandoned`.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError, Weak};
use std::thread;

use tracing::{debug, error, trace};

use crate::error::{SerializerError, StoreResult};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Admits one job at a time and reports each job's result to its submitter.
#[derive(Debug)]
pub struct JobSerializer {
    name: String,
    sender: flume::Sender<Job>,
}

impl JobSerializer {
    /// Start a serializer whose worker thread is named `name`.
    ///
    /// # Errors
    ///
    /// Returns `SerializerError::SpawnFailed` if the worker thread cannot be
    /// started.
    pub fn new(name: impl Into<String>) -> Result<Self, SerializerError> {
        let name = name.into();
        let (sender, receiver) = flume::unbounded::<Job>();

        let worker_name = name.clone();
        thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                trace!(worker = %worker_name, "job worker started");
                for job in receiver.iter() {
                    if catch_unwind(AssertUnwindSafe(job)).is_err() {
                        error!(worker = %worker_name, "job panicked");
                    }
                }
                trace!(worker = %worker_name, "job worker stopped");
            })
            .map_err(SerializerError::SpawnFailed)?;

        Ok(Self { name, sender })
    }

    /// Start a serializer ready to be shared between repository handles.
    ///
    /// # Errors
    ///
    /// See [`Self::new`].
    pub fn shared(name: impl Into<String>) -> Result<Arc<Self>, SerializerError> {
        Self::new(name).map(Arc::new)
    }

    /// Serializer of every live handle on `location`, started on first use.
    ///
    /// Locations are compared after resolving symlinks and relative parts,
    /// so two spellings of one directory share a worker. The registry holds
    /// weak references; the worker stops once the last handle drops.
    ///
    /// # Errors
    ///
    /// See [`Self::new`].
    pub fn for_location(
        name: impl Into<String>,
        location: &Path,
    ) -> Result<Arc<Self>, SerializerError> {
        static REGISTRY: OnceLock<Mutex<HashMap<PathBuf, Weak<JobSerializer>>>> =
            OnceLock::new();

        let key = registry_key(location);
        let mut registry = REGISTRY
            .get_or_init(Mutex::default)
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = registry.get(&key).and_then(Weak::upgrade) {
            trace!(location = %key.display(), "sharing job serializer");
            return Ok(existing);
        }

        let serializer = Self::shared(name)?;
        registry.retain(|_, weak| weak.strong_count() > 0);
        registry.insert(key, Arc::downgrade(&serializer));
        Ok(serializer)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    fn enqueue<T, F>(&self, label: &str, job: F) -> StoreResult<flume::Receiver<T>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (done_tx, done_rx) = flume::bounded(1);
        let job_label = label.to_string();
        let wrapped: Job = Box::new(move || {
            debug!(job = %job_label, "job started");
            let result = job();
            debug!(job = %job_label, "job finished");
            let _ = done_tx.send(result);
        });
        trace!(worker = %self.name(), job = %label, "job queued");
        self.sender
            .send(wrapped)
            .map_err(|_| SerializerError::WorkerGone)?;
        Ok(done_rx)
    }

    /// Run `job` on the worker and wait for its result without blocking the
    /// async runtime.
    ///
    /// # Errors
    ///
    /// Returns a `SerializerError` if the worker is gone or the job panicked.
    pub async fn submit<T, F>(&self, label: &str, job: F) -> StoreResult<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let done = self.enqueue(label, job)?;
        done.recv_async()
            .await
            .map_err(|_| SerializerError::JobAbandoned(label.to_string()).into())
    }
}

/// Canonical form of `location`, which may not exist yet.
///
/// The deepest existing ancestor is canonicalized and the missing tail is
/// appended unchanged.
fn registry_key(location: &Path) -> PathBuf {
    let absolute = std::path::absolute(location).unwrap_or_else(|_| location.to_path_buf());
    for ancestor in absolute.ancestors() {
        if let Ok(resolved) = ancestor.canonicalize() {
            return match absolute.strip_prefix(ancestor) {
                Ok(tail) if !tail.as_os_str().is_empty() => resolved.join(tail),
                _ => resolved,
            };
        }
    }
    absolute
}

#[cfg(test)]
mod tests {
    use super::JobSerializer;
    use crate::error::{SerializerError, StoreError};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[tokio::test]
    async fn test_submit_returns_job_result() {
        let serializer = JobSerializer::new("test-serializer").unwrap();
        assert_eq!(serializer.name(), "test-serializer");
        let value = serializer.submit("answer", || 6 * 7).await.unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_jobs_never_overlap() {
        let serializer = JobSerializer::shared("test-serializer").unwrap();
        let running = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let serializer = Arc::clone(&serializer);
                let running = Arc::clone(&running);
                let max_seen = Arc::clone(&max_seen);
                tokio::spawn(async move {
                    serializer
                        .submit(&format!("job-{i}"), move || {
                            let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                            max_seen.fetch_max(now, Ordering::SeqCst);
                            std::thread::sleep(Duration::from_millis(5));
                            running.fetch_sub(1, Ordering::SeqCst);
                        })
                        .await
                        .unwrap();
                })
            })
            .collect();

        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_same_location_shares_one_serializer() {
        let dir = tempfile::tempdir().unwrap();
        let location = dir.path().join("repo");

        let first = JobSerializer::for_location("test-serializer", &location).unwrap();
        let second =
            JobSerializer::for_location("test-serializer", &dir.path().join(".").join("repo"))
                .unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        std::fs::create_dir(&location).unwrap();
        let after_create = JobSerializer::for_location("test-serializer", &location).unwrap();
        assert!(Arc::ptr_eq(&first, &after_create));

        let other =
            JobSerializer::for_location("test-serializer", &dir.path().join("other")).unwrap();
        assert!(!Arc::ptr_eq(&first, &other));
    }

    #[test]
    fn test_registry_releases_dropped_serializer() {
        let dir = tempfile::tempdir().unwrap();
        let location = dir.path().join("repo");

        let first = JobSerializer::for_location("test-serializer", &location).unwrap();
        let weak = Arc::downgrade(&first);
        drop(first);
        assert!(weak.upgrade().is_none());

        let second = JobSerializer::for_location("test-serializer", &location).unwrap();
        assert_eq!(Arc::strong_count(&second), 1);
    }

    #[tokio::test]
    async fn test_submit_preserves_admission_order() {
        let serializer = JobSerializer::new("test-serializer").unwrap();
        let order = Arc::new(Mutex::new(Vec::new()));

        for i in 0..5 {
            let order = Arc::clone(&order);
            serializer
                .submit(&format!("job-{i}"), move || order.lock().unwrap().push(i))
                .await
                .unwrap();
        }
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_panicking_job_does_not_stop_worker() {
        let serializer = JobSerializer::new("test-serializer").unwrap();

        let err = serializer
            .submit("boom", || -> u8 { panic!("job failure") })
            .await
            .unwrap_err();
        match err {
            StoreError::Serializer(boxed) => {
                assert!(matches!(*boxed, SerializerError::JobAbandoned(ref label) if label == "boom"));
            }
            other => panic!("expected serializer error, got {other:?}"),
        }

        let value = serializer.submit("after", || 7).await.unwrap();
        assert_eq!(value, 7);
    }
}
