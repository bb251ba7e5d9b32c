use crate::domain::entities::job::Job;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use tracing::error;

pub type JobsCallback = Arc<dyn Fn(&[Job]) + Send + Sync>;

/// Observers of the manager's job list. A panicking callback is logged and skipped.
#[derive(Default)]
pub struct SubscriberRegistry {
    next_id: AtomicU64,
    callbacks: Mutex<Vec<(u64, JobsCallback)>>,
}

impl SubscriberRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn subscribe<F>(self: &Arc<Self>, callback: F) -> Subscription
    where
        F: Fn(&[Job]) + Send + Sync + 'static,
    {
        let callback: JobsCallback = Arc::new(callback);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.callbacks
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push((id, callback));
        Subscription {
            id,
            registry: Arc::downgrade(self),
        }
    }

    pub fn callback(&self, id: u64) -> Option<JobsCallback> {
        self.callbacks
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .iter()
            .find(|(existing, _)| *existing == id)
            .map(|(_, callback)| callback.clone())
    }

    fn remove(&self, id: u64) {
        self.callbacks
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .retain(|(existing, _)| *existing != id);
    }

    pub fn len(&self) -> usize {
        self.callbacks
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.callbacks
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clear();
    }

    /// Deliver `jobs` to every subscriber, outside the registry lock.
    pub fn publish(&self, jobs: &[Job]) {
        let callbacks: Vec<(u64, JobsCallback)> = self
            .callbacks
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone();
        for (id, callback) in callbacks {
            Self::deliver(id, &callback, jobs);
        }
    }

    /// Deliver to one subscriber only.
    pub fn deliver(id: u64, callback: &JobsCallback, jobs: &[Job]) {
        if catch_unwind(AssertUnwindSafe(|| callback(jobs))).is_err() {
            error!(subscriber_id = id, "subscriber_panicked");
        }
    }
}

/// Handle returned by `subscribe`; dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    registry: Weak<SubscriberRegistry>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }
}
