pub mod job_catalog;
pub mod retry_policy;
pub mod state_machine;
