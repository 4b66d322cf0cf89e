use log::{ debug, info, warn };
use std::collections::HashMap;
use std::path::{ Path, PathBuf };
use std::sync::{ Arc, Mutex, MutexGuard };
use std::time::Duration;
use tokio::sync::{ watch, Notify };
use uuid::Uuid;

pub const MIN_AUDIO_TTL_SECS: u64 = 300;
pub const MAX_AUDIO_TTL_SECS: u64 = 600;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupStatus {
    Pending,
    Deleted,
    Failed(String),
    Cancelled,
}

struct Job {
    status: watch::Sender<CleanupStatus>,
    cancel: Notify,
}

/// Observer and cancel switch for one scheduled deletion.
#[derive(Clone)]
pub struct CleanupHandle {
    id: Uuid,
    path: PathBuf,
    job: Arc<Job>,
}

impl CleanupHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn status(&self) -> CleanupStatus {
        self.job.status.borrow().clone()
    }

    /// Stops a pending deletion. Returns false when the job already settled.
    pub fn cancel(&self) -> bool {
        if self.status() != CleanupStatus::Pending {
            return false;
        }
        self.job.cancel.notify_one();
        true
    }

    /// Resolves once the job leaves `Pending`.
    pub async fn wait(&self) -> CleanupStatus {
        let mut rx = self.job.status.subscribe();
        let settled = match rx.wait_for(|s| *s != CleanupStatus::Pending).await {
            Ok(status) => status.clone(),
            Err(_) => self.status(),
        };
        settled
    }
}

/// Deletes files after a fixed delay on the tokio timer. Jobs are tracked
/// until they settle so they can be listed or cancelled by id.
#[derive(Clone)]
pub struct CleanupScheduler {
    delay: Duration,
    jobs: Arc<Mutex<HashMap<Uuid, CleanupHandle>>>,
}

impl CleanupScheduler {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            jobs: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    fn jobs(&self) -> MutexGuard<'_, HashMap<Uuid, CleanupHandle>> {
        self.jobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn schedule(&self, path: impl Into<PathBuf>) -> CleanupHandle {
        self.schedule_after(path, self.delay)
    }

    pub fn schedule_after(&self, path: impl Into<PathBuf>, delay: Duration) -> CleanupHandle {
        let (status, _) = watch::channel(CleanupStatus::Pending);
        let handle = CleanupHandle {
            id: Uuid::new_v4(),
            path: path.into(),
            job: Arc::new(Job { status, cancel: Notify::new() }),
        };
        self.jobs().insert(handle.id, handle.clone());
        debug!("Scheduled deletion of {} in {:?}", handle.path.display(), delay);

        let deadline = tokio::time::Instant::now() + delay;
        let task_handle = handle.clone();
        let jobs = Arc::clone(&self.jobs);
        tokio::spawn(async move {
            let outcome =
                tokio::select! {
                _ = tokio::time::sleep_until(deadline) => {
                    match tokio::fs::remove_file(&task_handle.path).await {
                        Ok(()) => {
                            info!("Deleted expired audio file {}", task_handle.path.display());
                            CleanupStatus::Deleted
                        }
                        Err(e) => {
                            warn!("Failed to delete {}: {}", task_handle.path.display(), e);
                            CleanupStatus::Failed(e.to_string())
                        }
                    }
                }
                _ = task_handle.job.cancel.notified() => {
                    debug!("Cancelled deletion of {}", task_handle.path.display());
                    CleanupStatus::Cancelled
                }
            };
            jobs.lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .remove(&task_handle.id);
            task_handle.job.status.send_replace(outcome);
        });

        handle
    }

    pub fn pending(&self) -> usize {
        self.jobs().len()
    }

    /// Handles of every job that has not settled yet.
    pub fn handles(&self) -> Vec<CleanupHandle> {
        self.jobs().values().cloned().collect()
    }

    pub fn get(&self, id: &Uuid) -> Option<CleanupHandle> {
        self.jobs().get(id).cloned()
    }

    pub fn cancel(&self, id: &Uuid) -> bool {
        match self.get(id) {
            Some(handle) => handle.cancel(),
            None => false,
        }
    }
}
