pub mod api_key_repository;
pub mod factory;
pub mod job_repository;

pub use factory::Repositories;
