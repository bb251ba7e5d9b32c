use crate::infrastructure::db::dto::JobRow;
use crate::infrastructure::db::postgres::PostgresDatabase;
use crate::infrastructure::db::stores::job_store::{JobRepositoryError, JobStore};
use async_trait::async_trait;
use sqlx::PgConnection;
use time::OffsetDateTime;

macro_rules! job_columns {
    () => {
        "id,
        user_id,
        story_id,
        job_type,
        parameters,
        status,
        priority,
        result,
        error_message,
        error_details,
        retry_count,
        max_retries,
        processing_attempts,
        abandoned_count,
        created_at,
        updated_at,
        started_at,
        completed_at,
        estimated_completion_at,
        last_heartbeat_at,
        available_at"
    };
}

#[derive(Clone)]
pub struct JobStorePostgres {
    db: std::sync::Arc<PostgresDatabase>,
}

impl JobStorePostgres {
    /// Build a Postgres-backed job store.
    pub fn new(db: std::sync::Arc<PostgresDatabase>) -> Self {
        Self { db }
    }

    async fn get_impl_conn(
        conn: &mut PgConnection,
        job_id: uuid::Uuid,
    ) -> Result<Option<JobRow>, JobRepositoryError> {
        let row = sqlx::query_as::<_, JobRow>(concat!(
            "SELECT ",
            job_columns!(),
            " FROM jobs WHERE id = $1"
        ))
        .bind(job_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|_| JobRepositoryError::StorageUnavailable)?;

        Ok(row)
    }

    async fn get_for_user_impl_conn(
        conn: &mut PgConnection,
        job_id: uuid::Uuid,
        user_id: uuid::Uuid,
    ) -> Result<Option<JobRow>, JobRepositoryError> {
        let row = sqlx::query_as::<_, JobRow>(concat!(
            "SELECT ",
            job_columns!(),
            " FROM jobs WHERE id = $1 AND user_id = $2"
        ))
        .bind(job_id)
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|_| JobRepositoryError::StorageUnavailable)?;

        Ok(row)
    }

    async fn insert_impl_conn(
        conn: &mut PgConnection,
        row: &JobRow,
    ) -> Result<JobRow, JobRepositoryError> {
        let stored = sqlx::query_as::<_, JobRow>(concat!(
            "INSERT INTO jobs (",
            job_columns!(),
            ")
            VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18,$19,$20,$21)
            RETURNING ",
            job_columns!()
        ))
        .bind(row.id)
        .bind(row.user_id)
        .bind(row.story_id)
        .bind(&row.job_type)
        .bind(&row.parameters)
        .bind(&row.status)
        .bind(row.priority)
        .bind(&row.result)
        .bind(&row.error_message)
        .bind(&row.error_details)
        .bind(row.retry_count)
        .bind(row.max_retries)
        .bind(row.processing_attempts)
        .bind(row.abandoned_count)
        .bind(row.created_at)
        .bind(row.updated_at)
        .bind(row.started_at)
        .bind(row.completed_at)
        .bind(row.estimated_completion_at)
        .bind(row.last_heartbeat_at)
        .bind(row.available_at)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => JobRepositoryError::Conflict,
            sqlx::Error::Database(db) if db.is_check_violation() => {
                JobRepositoryError::InvalidInput
            }
            _ => JobRepositoryError::StorageUnavailable,
        })?;

        Ok(stored)
    }

    async fn delete_impl_conn(
        conn: &mut PgConnection,
        job_id: uuid::Uuid,
    ) -> Result<(), JobRepositoryError> {
        let result = sqlx::query("DELETE FROM jobs WHERE id = $1")
            .bind(job_id)
            .execute(&mut *conn)
            .await
            .map_err(|_| JobRepositoryError::StorageUnavailable)?;

        if result.rows_affected() == 0 {
            return Err(JobRepositoryError::NotFound);
        }
        Ok(())
    }

    async fn list_for_user_impl_conn(
        conn: &mut PgConnection,
        user_id: uuid::Uuid,
        limit: u32,
    ) -> Result<Vec<JobRow>, JobRepositoryError> {
        let rows = sqlx::query_as::<_, JobRow>(concat!(
            "SELECT ",
            job_columns!(),
            " FROM jobs
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2"
        ))
        .bind(user_id)
        .bind(i64::from(limit))
        .fetch_all(&mut *conn)
        .await
        .map_err(|_| JobRepositoryError::StorageUnavailable)?;

        Ok(rows)
    }

    async fn claim_next_impl_conn(
        conn: &mut PgConnection,
        now: OffsetDateTime,
        stalled_before: OffsetDateTime,
    ) -> Result<Option<JobRow>, JobRepositoryError> {
        // SKIP LOCKED makes a concurrent claimer move past the row instead of waiting on it.
        let row = sqlx::query_as::<_, JobRow>(concat!(
            "WITH next_job AS (
                SELECT id
                FROM jobs
                WHERE (status = 'pending' AND (available_at IS NULL OR available_at <= $1))
                   OR (status = 'processing' AND last_heartbeat_at < $2)
                ORDER BY priority ASC, created_at ASC
                FOR UPDATE SKIP LOCKED
                LIMIT 1
            )
            UPDATE jobs
            SET status = 'processing',
                started_at = COALESCE(started_at, $1),
                last_heartbeat_at = $1,
                processing_attempts = processing_attempts + 1,
                abandoned_count = abandoned_count
                    + CASE WHEN status = 'processing' THEN 1 ELSE 0 END,
                available_at = NULL,
                updated_at = $1
            WHERE id IN (SELECT id FROM next_job)
            RETURNING ",
            job_columns!()
        ))
        .bind(now)
        .bind(stalled_before)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|_| JobRepositoryError::StorageUnavailable)?;

        Ok(row)
    }

    async fn heartbeat_impl_conn(
        conn: &mut PgConnection,
        job_id: uuid::Uuid,
        claim_token: i32,
        at: OffsetDateTime,
    ) -> Result<bool, JobRepositoryError> {
        let result = sqlx::query(
            "UPDATE jobs
            SET last_heartbeat_at = $3,
                updated_at = $3
            WHERE id = $1
              AND status = 'processing'
              AND processing_attempts = $2",
        )
        .bind(job_id)
        .bind(claim_token)
        .bind(at)
        .execute(&mut *conn)
        .await
        .map_err(|_| JobRepositoryError::StorageUnavailable)?;

        Ok(result.rows_affected() == 1)
    }

    async fn finish_impl_conn(
        conn: &mut PgConnection,
        row: &JobRow,
        claim_token: i32,
    ) -> Result<Option<JobRow>, JobRepositoryError> {
        let stored = sqlx::query_as::<_, JobRow>(concat!(
            "UPDATE jobs SET
                status = $3,
                result = $4,
                error_message = $5,
                error_details = $6,
                retry_count = $7,
                completed_at = $8,
                available_at = $9,
                last_heartbeat_at = $10,
                updated_at = $11
            WHERE id = $1
              AND status = 'processing'
              AND processing_attempts = $2
            RETURNING ",
            job_columns!()
        ))
        .bind(row.id)
        .bind(claim_token)
        .bind(&row.status)
        .bind(&row.result)
        .bind(&row.error_message)
        .bind(&row.error_details)
        .bind(row.retry_count)
        .bind(row.completed_at)
        .bind(row.available_at)
        .bind(row.last_heartbeat_at)
        .bind(row.updated_at)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|_| JobRepositoryError::StorageUnavailable)?;

        Ok(stored)
    }

    async fn retry_owned_impl_conn(
        conn: &mut PgConnection,
        job_id: uuid::Uuid,
        user_id: uuid::Uuid,
        now: OffsetDateTime,
    ) -> Result<JobRow, JobRepositoryError> {
        let stored = sqlx::query_as::<_, JobRow>(concat!(
            "UPDATE jobs SET
                status = 'pending',
                retry_count = 0,
                abandoned_count = 0,
                result = NULL,
                error_message = NULL,
                error_details = NULL,
                completed_at = NULL,
                available_at = NULL,
                updated_at = $3
            WHERE id = $1
              AND user_id = $2
              AND status = 'failed'
            RETURNING ",
            job_columns!()
        ))
        .bind(job_id)
        .bind(user_id)
        .bind(now)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|_| JobRepositoryError::StorageUnavailable)?;

        match stored {
            Some(row) => Ok(row),
            None => Self::explain_miss(conn, job_id, user_id).await,
        }
    }

    async fn cancel_owned_impl_conn(
        conn: &mut PgConnection,
        job_id: uuid::Uuid,
        user_id: uuid::Uuid,
        now: OffsetDateTime,
    ) -> Result<JobRow, JobRepositoryError> {
        let stored = sqlx::query_as::<_, JobRow>(concat!(
            "UPDATE jobs SET
                status = 'cancelled',
                updated_at = $3
            WHERE id = $1
              AND user_id = $2
              AND status IN ('pending', 'processing')
            RETURNING ",
            job_columns!()
        ))
        .bind(job_id)
        .bind(user_id)
        .bind(now)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|_| JobRepositoryError::StorageUnavailable)?;

        match stored {
            Some(row) => Ok(row),
            None => Self::explain_miss(conn, job_id, user_id).await,
        }
    }

    /// A guarded user update matched nothing: the job is foreign or in the wrong state.
    async fn explain_miss(
        conn: &mut PgConnection,
        job_id: uuid::Uuid,
        user_id: uuid::Uuid,
    ) -> Result<JobRow, JobRepositoryError> {
        match Self::get_for_user_impl_conn(conn, job_id, user_id).await? {
            Some(_) => Err(JobRepositoryError::Conflict),
            None => Err(JobRepositoryError::NotFound),
        }
    }
}

#[async_trait]
impl JobStore for JobStorePostgres {
    async fn get(&self, job_id: uuid::Uuid) -> Result<Option<JobRow>, JobRepositoryError> {
        self.db
            .with_conn(move |conn| Box::pin(Self::get_impl_conn(conn, job_id)))
            .await
    }

    async fn get_for_user(
        &self,
        job_id: uuid::Uuid,
        user_id: uuid::Uuid,
    ) -> Result<Option<JobRow>, JobRepositoryError> {
        self.db
            .with_conn(move |conn| Box::pin(Self::get_for_user_impl_conn(conn, job_id, user_id)))
            .await
    }

    async fn insert(&self, row: &JobRow) -> Result<JobRow, JobRepositoryError> {
        let row = row.clone();
        self.db
            .with_conn(move |conn| {
                let row = row;
                Box::pin(async move { Self::insert_impl_conn(conn, &row).await })
            })
            .await
    }

    async fn delete(&self, job_id: uuid::Uuid) -> Result<(), JobRepositoryError> {
        self.db
            .with_conn(move |conn| Box::pin(Self::delete_impl_conn(conn, job_id)))
            .await
    }

    async fn list_for_user(
        &self,
        user_id: uuid::Uuid,
        limit: u32,
    ) -> Result<Vec<JobRow>, JobRepositoryError> {
        self.db
            .with_conn(move |conn| Box::pin(Self::list_for_user_impl_conn(conn, user_id, limit)))
            .await
    }

    async fn claim_next(
        &self,
        now: OffsetDateTime,
        stalled_before: OffsetDateTime,
    ) -> Result<Option<JobRow>, JobRepositoryError> {
        self.db
            .with_conn(move |conn| Box::pin(Self::claim_next_impl_conn(conn, now, stalled_before)))
            .await
    }

    async fn heartbeat(
        &self,
        job_id: uuid::Uuid,
        claim_token: i32,
        at: OffsetDateTime,
    ) -> Result<bool, JobRepositoryError> {
        self.db
            .with_conn(move |conn| {
                Box::pin(Self::heartbeat_impl_conn(conn, job_id, claim_token, at))
            })
            .await
    }

    async fn finish(
        &self,
        row: &JobRow,
        claim_token: i32,
    ) -> Result<Option<JobRow>, JobRepositoryError> {
        let row = row.clone();
        self.db
            .with_conn(move |conn| {
                let row = row;
                Box::pin(async move { Self::finish_impl_conn(conn, &row, claim_token).await })
            })
            .await
    }

    async fn retry_owned(
        &self,
        job_id: uuid::Uuid,
        user_id: uuid::Uuid,
        now: OffsetDateTime,
    ) -> Result<JobRow, JobRepositoryError> {
        self.db
            .with_conn(move |conn| {
                Box::pin(Self::retry_owned_impl_conn(conn, job_id, user_id, now))
            })
            .await
    }

    async fn cancel_owned(
        &self,
        job_id: uuid::Uuid,
        user_id: uuid::Uuid,
        now: OffsetDateTime,
    ) -> Result<JobRow, JobRepositoryError> {
        self.db
            .with_conn(move |conn| {
                Box::pin(Self::cancel_owned_impl_conn(conn, job_id, user_id, now))
            })
            .await
    }
}
