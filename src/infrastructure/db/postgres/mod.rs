pub mod api_key_store_postgres;
mod database;
pub mod job_store_postgres;

pub use database::PostgresDatabase;
