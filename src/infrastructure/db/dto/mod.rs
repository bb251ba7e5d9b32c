pub mod api_key;
pub mod job;

pub use api_key::ApiKeyRow;
pub use job::JobRow;
