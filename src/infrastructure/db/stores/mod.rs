pub mod api_key_store;
pub mod job_store;
