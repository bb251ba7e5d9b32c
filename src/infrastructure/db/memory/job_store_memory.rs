use crate::domain::entities::job::Job;
use crate::domain::value_objects::timestamps::Timestamp;
use crate::domain::workflows::state_machine::TransitionError;
use crate::infrastructure::db::dto::JobRow;
use crate::infrastructure::db::stores::job_store::{JobRepositoryError, JobStore};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use time::OffsetDateTime;

/// Process-local job table; every operation runs under one lock, so claims are atomic.
///
/// Row changes go through the [`Job`] entity, so only state-machine edges are ever written.
#[derive(Default)]
pub struct JobStoreMemory {
    rows: Mutex<HashMap<uuid::Uuid, JobRow>>,
}

impl JobStoreMemory {
    pub fn new() -> Self {
        Self::default()
    }

    fn rows(&self) -> MutexGuard<'_, HashMap<uuid::Uuid, JobRow>> {
        self.rows.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn owned_mut<'a>(
        rows: &'a mut HashMap<uuid::Uuid, JobRow>,
        job_id: uuid::Uuid,
        user_id: uuid::Uuid,
    ) -> Result<&'a mut JobRow, JobRepositoryError> {
        rows.get_mut(&job_id)
            .filter(|row| row.user_id == user_id)
            .ok_or(JobRepositoryError::NotFound)
    }
}

/// Run one entity transition against a stored row; a refused edge is a conflict.
fn transition(
    row: &mut JobRow,
    apply: impl FnOnce(&mut Job) -> Result<(), TransitionError>,
) -> Result<(), JobRepositoryError> {
    let mut job = row.clone().into_job()?;
    apply(&mut job).map_err(|_| JobRepositoryError::Conflict)?;
    *row = JobRow::from_job(&job);
    Ok(())
}

fn is_claimable(row: &JobRow, now: OffsetDateTime, stalled_before: OffsetDateTime) -> bool {
    let Ok(job) = row.clone().into_job() else {
        return false;
    };
    let now = Timestamp::from(now);
    let threshold = Timestamp::from(stalled_before).elapsed_since(now);
    job.is_due(now) || job.is_stalled(now, threshold)
}

#[async_trait]
impl JobStore for JobStoreMemory {
    async fn get(&self, job_id: uuid::Uuid) -> Result<Option<JobRow>, JobRepositoryError> {
        Ok(self.rows().get(&job_id).cloned())
    }

    async fn get_for_user(
        &self,
        job_id: uuid::Uuid,
        user_id: uuid::Uuid,
    ) -> Result<Option<JobRow>, JobRepositoryError> {
        Ok(self
            .rows()
            .get(&job_id)
            .filter(|row| row.user_id == user_id)
            .cloned())
    }

    async fn insert(&self, row: &JobRow) -> Result<JobRow, JobRepositoryError> {
        let mut rows = self.rows();
        if rows.contains_key(&row.id) {
            return Err(JobRepositoryError::Conflict);
        }
        rows.insert(row.id, row.clone());
        Ok(row.clone())
    }

    async fn delete(&self, job_id: uuid::Uuid) -> Result<(), JobRepositoryError> {
        self.rows()
            .remove(&job_id)
            .map(|_| ())
            .ok_or(JobRepositoryError::NotFound)
    }

    async fn list_for_user(
        &self,
        user_id: uuid::Uuid,
        limit: u32,
    ) -> Result<Vec<JobRow>, JobRepositoryError> {
        let mut owned: Vec<JobRow> = self
            .rows()
            .values()
            .filter(|row| row.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        owned.truncate(limit as usize);
        Ok(owned)
    }

    async fn claim_next(
        &self,
        now: OffsetDateTime,
        stalled_before: OffsetDateTime,
    ) -> Result<Option<JobRow>, JobRepositoryError> {
        let mut rows = self.rows();
        let next_id = rows
            .values()
            .filter(|row| is_claimable(row, now, stalled_before))
            .min_by(|a, b| {
                a.priority
                    .cmp(&b.priority)
                    .then(a.created_at.cmp(&b.created_at))
            })
            .map(|row| row.id);

        let Some(row) = next_id.and_then(|id| rows.get_mut(&id)) else {
            return Ok(None);
        };
        transition(row, |job| job.claim(Timestamp::from(now)))?;
        Ok(Some(row.clone()))
    }

    async fn heartbeat(
        &self,
        job_id: uuid::Uuid,
        claim_token: i32,
        at: OffsetDateTime,
    ) -> Result<bool, JobRepositoryError> {
        let mut rows = self.rows();
        match rows.get_mut(&job_id) {
            Some(row) if row.status == "processing" && row.processing_attempts == claim_token => {
                row.last_heartbeat_at = Some(at);
                row.updated_at = at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn finish(
        &self,
        finished: &JobRow,
        claim_token: i32,
    ) -> Result<Option<JobRow>, JobRepositoryError> {
        let mut rows = self.rows();
        let Some(row) = rows.get_mut(&finished.id) else {
            return Ok(None);
        };
        if row.status != "processing" || row.processing_attempts != claim_token {
            return Ok(None);
        }
        row.status = finished.status.clone();
        row.result = finished.result.clone();
        row.error_message = finished.error_message.clone();
        row.error_details = finished.error_details.clone();
        row.retry_count = finished.retry_count;
        row.completed_at = finished.completed_at;
        row.available_at = finished.available_at;
        row.last_heartbeat_at = finished.last_heartbeat_at;
        row.updated_at = finished.updated_at;
        Ok(Some(row.clone()))
    }

    async fn retry_owned(
        &self,
        job_id: uuid::Uuid,
        user_id: uuid::Uuid,
        now: OffsetDateTime,
    ) -> Result<JobRow, JobRepositoryError> {
        let mut rows = self.rows();
        let row = Self::owned_mut(&mut rows, job_id, user_id)?;
        transition(row, |job| job.reset_for_retry(Timestamp::from(now)))?;
        Ok(row.clone())
    }

    async fn cancel_owned(
        &self,
        job_id: uuid::Uuid,
        user_id: uuid::Uuid,
        now: OffsetDateTime,
    ) -> Result<JobRow, JobRepositoryError> {
        let mut rows = self.rows();
        let row = Self::owned_mut(&mut rows, job_id, user_id)?;
        transition(row, |job| job.cancel(Timestamp::from(now)))?;
        Ok(row.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::JobStoreMemory;
    use crate::infrastructure::db::dto::JobRow;
    use crate::infrastructure::db::stores::job_store::{JobRepositoryError, JobStore};
    use serde_json::json;
    use std::sync::Arc;
    use time::{Duration, OffsetDateTime};

    fn pending_row(user_id: uuid::Uuid, priority: i32, created_at: OffsetDateTime) -> JobRow {
        JobRow {
            id: uuid::Uuid::new_v4(),
            user_id,
            story_id: None,
            job_type: "story_generation".to_string(),
            parameters: json!({ "topic": "otters", "level": "A2" }),
            status: "pending".to_string(),
            priority,
            result: None,
            error_message: None,
            error_details: None,
            retry_count: 0,
            max_retries: 3,
            processing_attempts: 0,
            abandoned_count: 0,
            created_at,
            updated_at: created_at,
            started_at: None,
            completed_at: None,
            estimated_completion_at: None,
            last_heartbeat_at: None,
            available_at: None,
        }
    }

    #[tokio::test]
    async fn given_mixed_priorities_when_claim_next_should_pick_lowest_priority_then_oldest() {
        let store = JobStoreMemory::new();
        let user = uuid::Uuid::new_v4();
        let t0 = OffsetDateTime::now_utc();
        let late_urgent = pending_row(user, 0, t0 + Duration::seconds(2));
        let early_urgent = pending_row(user, 0, t0 + Duration::seconds(1));
        let early_lazy = pending_row(user, 5, t0);
        for row in [&late_urgent, &early_urgent, &early_lazy] {
            store.insert(row).await.unwrap();
        }

        let claimed = store.claim_next(t0, t0).await.unwrap().unwrap();

        assert_eq!(claimed.id, early_urgent.id);
        assert_eq!(claimed.status, "processing");
        assert_eq!(claimed.processing_attempts, 1);
        assert_eq!(claimed.started_at, Some(t0));
    }

    #[tokio::test]
    async fn given_deferred_job_when_claim_before_available_at_should_skip_it() {
        let store = JobStoreMemory::new();
        let now = OffsetDateTime::now_utc();
        let mut row = pending_row(uuid::Uuid::new_v4(), 0, now);
        row.available_at = Some(now + Duration::seconds(12));
        store.insert(&row).await.unwrap();

        assert!(store.claim_next(now, now).await.unwrap().is_none());
        let later = now + Duration::seconds(12);
        assert!(store.claim_next(later, later).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn given_concurrent_claims_when_one_job_is_eligible_should_hand_it_out_once() {
        let store = Arc::new(JobStoreMemory::new());
        let now = OffsetDateTime::now_utc();
        store
            .insert(&pending_row(uuid::Uuid::new_v4(), 0, now))
            .await
            .unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.claim_next(now, now).await.unwrap() })
            })
            .collect();
        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap().is_some() {
                winners += 1;
            }
        }

        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn given_stale_heartbeat_when_claim_next_should_reclaim_processing_job() {
        let store = JobStoreMemory::new();
        let t0 = OffsetDateTime::now_utc();
        store
            .insert(&pending_row(uuid::Uuid::new_v4(), 0, t0))
            .await
            .unwrap();
        let first = store.claim_next(t0, t0).await.unwrap().unwrap();

        let fresh = store
            .claim_next(t0 + Duration::minutes(1), t0 - Duration::minutes(4))
            .await
            .unwrap();
        let later = t0 + Duration::minutes(6);
        let reclaimed = store
            .claim_next(later, later - Duration::minutes(5))
            .await
            .unwrap()
            .unwrap();

        assert!(fresh.is_none());
        assert_eq!(reclaimed.id, first.id);
        assert_eq!(reclaimed.processing_attempts, 2);
        assert_eq!(reclaimed.started_at, Some(t0));
    }

    #[tokio::test]
    async fn given_stale_claim_token_when_finish_and_heartbeat_should_be_refused() {
        let store = JobStoreMemory::new();
        let now = OffsetDateTime::now_utc();
        store
            .insert(&pending_row(uuid::Uuid::new_v4(), 0, now))
            .await
            .unwrap();
        let claimed = store.claim_next(now, now).await.unwrap().unwrap();
        let mut done = claimed.clone();
        done.status = "completed".to_string();

        assert!(!store.heartbeat(claimed.id, 7, now).await.unwrap());
        assert!(store.finish(&done, 7).await.unwrap().is_none());
        assert!(store.finish(&done, 1).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn given_foreign_or_completed_job_when_cancel_owned_should_reject() {
        let store = JobStoreMemory::new();
        let owner = uuid::Uuid::new_v4();
        let now = OffsetDateTime::now_utc();
        let mut done = pending_row(owner, 0, now);
        done.status = "completed".to_string();
        let pending = pending_row(owner, 0, now);
        store.insert(&done).await.unwrap();
        store.insert(&pending).await.unwrap();

        let foreign = store.cancel_owned(pending.id, uuid::Uuid::new_v4(), now).await;
        let wrong_state = store.cancel_owned(done.id, owner, now).await;

        assert_eq!(foreign.unwrap_err(), JobRepositoryError::NotFound);
        assert_eq!(wrong_state.unwrap_err(), JobRepositoryError::Conflict);
        assert_eq!(
            store.get(pending.id).await.unwrap().unwrap().status,
            "pending"
        );
    }

    #[tokio::test]
    async fn given_many_jobs_when_list_for_user_should_return_newest_first_within_limit() {
        let store = JobStoreMemory::new();
        let user = uuid::Uuid::new_v4();
        let t0 = OffsetDateTime::now_utc();
        for i in 0..5 {
            store
                .insert(&pending_row(user, 0, t0 + Duration::seconds(i)))
                .await
                .unwrap();
        }
        store
            .insert(&pending_row(uuid::Uuid::new_v4(), 0, t0))
            .await
            .unwrap();

        let rows = store.list_for_user(user, 3).await.unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].created_at, t0 + Duration::seconds(4));
        assert!(rows.iter().all(|r| r.user_id == user));
    }
}
