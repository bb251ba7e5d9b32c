pub mod api_key_store_memory;
pub mod job_store_memory;

pub use api_key_store_memory::ApiKeyStoreMemory;
pub use job_store_memory::JobStoreMemory;
