pub mod cancel_job;
pub mod claim_next_job;
pub mod create_job;
pub mod get_job;
pub mod heartbeat_job;
pub mod issue_api_key;
pub mod list_jobs;
pub mod retry_job;
pub mod run_worker_once;
pub mod worker_loop;
pub mod worker_tick;
