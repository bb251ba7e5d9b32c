pub mod http;
pub mod scripted;

pub use http::{HttpContentProducer, HttpProducerConfig};
pub use scripted::ScriptedProducer;
