//! Client-side job queue: a local mirror of the caller's jobs kept in sync by polling.

pub mod change_source;
pub mod gateway;
pub mod http_gateway;
pub mod local_cache;
pub mod notifier;
pub mod queue_manager;
pub mod subscribers;

pub use change_source::{ChangeSource, IntervalSource, NotifySource};
pub use gateway::{GatewayError, InProcessGateway, JobGateway};
pub use http_gateway::HttpJobGateway;
pub use local_cache::{CacheError, FileCache, LocalCache, MemoryCache};
pub use notifier::{JobNotifier, TracingNotifier};
pub use queue_manager::{JobQueueManager, ManagerConfig, PollOutcome, QueueManagerError};
pub use subscribers::Subscription;
