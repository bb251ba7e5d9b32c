use crate::domain::value_objects::ids::JobId;
use time::Duration;

/// Backoff and retry budget for jobs that hit transient producer failures.
///
/// The budget is copied onto each job at creation (`max_retries`); the delays
/// apply only to failures without a provider hint.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Zero means the first transient failure is final.
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter_ms: u64,
}

impl RetryPolicy {
    /// Return the next backoff delay for a given retry attempt.
    ///
    /// `attempt` is the retry number starting at 1 for the first retry.
    pub fn next_delay(&self, attempt: u32, jitter_seed: u64) -> Duration {
        // Step 1: Compute the exponential delay (2^(attempt-1)).
        let attempt = attempt.max(1);
        let raw = self
            .base_delay_ms
            .saturating_mul(2_u64.saturating_pow(attempt - 1));

        // Step 2: Cap at the max delay to avoid unbounded backoff.
        let capped = raw.min(self.max_delay_ms);

        // Step 3: Optionally add a bounded jitter to spread retries.
        if self.jitter_ms == 0 {
            return Duration::milliseconds(capped as i64);
        }

        let jitter = jitter_seed % self.jitter_ms;
        Duration::milliseconds((capped + jitter) as i64)
    }

    /// Delay before `job_id` may run again after its `retry_count`-th transient failure.
    ///
    /// Jitter is seeded from the job id so concurrent failures spread out but a
    /// given job's schedule is reproducible.
    pub fn backoff_for(&self, job_id: JobId, retry_count: u32) -> Duration {
        let seed = (job_id.0.as_u128() as u64) ^ u64::from(retry_count);
        self.next_delay(retry_count, seed)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
            jitter_ms: 250,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::RetryPolicy;
    use crate::domain::value_objects::ids::JobId;
    use time::Duration;

    #[test]
    fn given_first_retry_when_next_delay_called_should_use_base_delay() {
        let policy = RetryPolicy::default();
        let delay = policy.next_delay(1, 0);
        assert_eq!(delay.whole_milliseconds(), 1_000);
    }

    #[test]
    fn given_third_retry_when_next_delay_called_should_double_twice() {
        let policy = RetryPolicy::default();
        let delay = policy.next_delay(3, 0);
        assert_eq!(delay.whole_milliseconds(), 4_000);
    }

    #[test]
    fn given_large_retry_when_next_delay_called_should_cap_at_max() {
        let policy = RetryPolicy::default();
        let delay = policy.next_delay(10, 0);
        assert_eq!(delay.whole_milliseconds(), 30_000);
    }

    #[test]
    fn given_jitter_seed_when_next_delay_called_should_stay_within_jitter_bound() {
        let policy = RetryPolicy::default();
        let delay = policy.next_delay(1, 1_000_003);
        assert!(delay.whole_milliseconds() >= 1_000);
        assert!(delay.whole_milliseconds() < 1_250);
    }

    #[test]
    fn given_same_job_and_count_when_backoff_for_should_be_reproducible() {
        let policy = RetryPolicy::default();
        let job_id = JobId::new();

        let first = policy.backoff_for(job_id, 2);

        assert_eq!(first, policy.backoff_for(job_id, 2));
        assert!(first >= Duration::seconds(2));
        assert!(first < Duration::milliseconds(2_250));
    }
}
