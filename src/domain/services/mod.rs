pub mod content_producer;
pub mod job_validator;
