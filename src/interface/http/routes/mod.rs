pub mod health;
pub mod job;
pub mod metrics;
pub mod ready;
pub mod worker;
