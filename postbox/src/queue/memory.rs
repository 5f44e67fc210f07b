//! # In-memory queue
//!
//! Reference implementation of the [`DeliveryQueue`] contract. Jobs
//! are kept in a delay-ordered map behind an async mutex; consumers
//! sleep until the earliest eligible time and are woken on every
//! enqueue, removal and close.

use std::{
    collections::BTreeMap,
    sync::atomic::{AtomicBool, AtomicU64, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use tokio::{
    sync::{Mutex, Notify},
    time::{self, Instant},
};
use tracing::debug;

use super::{DeliveryQueue, Error, Job, JobPayload, Result};

/// In-memory delivery queue.
#[derive(Debug, Default)]
pub struct MemoryQueue {
    jobs: Mutex<BTreeMap<(Instant, u64), Job>>,
    seq: AtomicU64,
    closed: AtomicBool,
    notify: Notify,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeliveryQueue for MemoryQueue {
    async fn enqueue(&self, payload: JobPayload, delay: Option<Duration>) -> Result<Job> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::EnqueueClosedQueueError);
        }

        let job = Job {
            id: uuid::Uuid::new_v4().to_string(),
            payload,
        };

        let eligible_at = Instant::now() + delay.unwrap_or_default();
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);

        debug!(id = %job.id, kind = job.payload.kind(), "enqueueing job");

        self.jobs
            .lock()
            .await
            .insert((eligible_at, seq), job.clone());
        self.notify.notify_one();

        Ok(job)
    }

    async fn find_job(&self, id: &str) -> Result<Option<Job>> {
        let jobs = self.jobs.lock().await;
        Ok(jobs.values().find(|job| job.id == id).cloned())
    }

    async fn remove(&self, id: &str) -> Result<()> {
        let mut jobs = self.jobs.lock().await;
        let key = jobs
            .iter()
            .find(|(_, job)| job.id == id)
            .map(|(key, _)| *key)
            .ok_or_else(|| Error::JobNotFoundError(id.to_owned()))?;

        jobs.remove(&key);
        drop(jobs);

        self.notify.notify_one();
        Ok(())
    }

    async fn next_job(&self) -> Option<Job> {
        loop {
            // Register for wakeups before inspecting the map, so an
            // enqueue between the check and the await cannot be
            // missed.
            let notified = self.notify.notified();

            if self.closed.load(Ordering::SeqCst) {
                return None;
            }

            let wait = {
                let mut jobs = self.jobs.lock().await;
                let now = Instant::now();

                let due = jobs
                    .keys()
                    .next()
                    .filter(|(eligible_at, _)| *eligible_at <= now)
                    .copied();

                if let Some(key) = due {
                    if let Some(job) = jobs.remove(&key) {
                        return Some(job);
                    }
                }

                jobs.keys()
                    .next()
                    .map(|(eligible_at, _)| eligible_at.saturating_duration_since(now))
            };

            match wait {
                Some(duration) => {
                    tokio::select! {
                        _ = notified => (),
                        _ = time::sleep(duration) => (),
                    }
                }
                None => notified.await,
            }
        }
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.jobs.lock().await.clear();
        self.notify.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unsnooze(message_id: &str) -> JobPayload {
        JobPayload::Unsnooze {
            user_id: "u1".into(),
            message_id: message_id.into(),
        }
    }

    #[tokio::test]
    async fn next_job_yields_immediate_job() {
        let queue = MemoryQueue::new();
        let job = queue.enqueue(unsnooze("m1"), None).await.unwrap();

        let next = queue.next_job().await.unwrap();
        assert_eq!(next.id, job.id);
    }

    #[tokio::test]
    async fn next_job_respects_delay() {
        let queue = MemoryQueue::new();
        queue
            .enqueue(unsnooze("m1"), Some(Duration::from_millis(50)))
            .await
            .unwrap();

        let start = Instant::now();
        queue.next_job().await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn remove_before_consumption() {
        let queue = MemoryQueue::new();
        let job = queue
            .enqueue(unsnooze("m1"), Some(Duration::from_secs(60)))
            .await
            .unwrap();

        queue.remove(&job.id).await.unwrap();
        assert!(queue.find_job(&job.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn remove_consumed_job_fails() {
        let queue = MemoryQueue::new();
        let job = queue.enqueue(unsnooze("m1"), None).await.unwrap();
        queue.next_job().await.unwrap();

        assert!(matches!(
            queue.remove(&job.id).await,
            Err(Error::JobNotFoundError(_))
        ));
    }

    #[tokio::test]
    async fn delayed_jobs_come_out_in_eligibility_order() {
        let queue = MemoryQueue::new();
        queue
            .enqueue(unsnooze("later"), Some(Duration::from_millis(80)))
            .await
            .unwrap();
        queue
            .enqueue(unsnooze("sooner"), Some(Duration::from_millis(20)))
            .await
            .unwrap();

        let first = queue.next_job().await.unwrap();
        match first.payload {
            JobPayload::Unsnooze { message_id, .. } => assert_eq!(message_id, "sooner"),
            payload => panic!("unexpected payload: {payload:?}"),
        }
    }

    #[tokio::test]
    async fn close_releases_consumers() {
        let queue = std::sync::Arc::new(MemoryQueue::new());

        let consumer = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.next_job().await })
        };

        // Give the consumer a chance to park first.
        time::sleep(Duration::from_millis(10)).await;
        queue.close().await;

        assert!(consumer.await.unwrap().is_none());
    }
}
