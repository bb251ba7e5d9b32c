use crate::domain::value_objects::parameters::{StoryLength, StoryLevel};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::Duration;

/// Outcome classification for a failed producer call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProducerError {
    /// Worth trying again later; `retry_after` carries the provider's hint, if any.
    #[error("transient producer failure: {message}")]
    Transient {
        message: String,
        retry_after: Option<Duration>,
    },
    #[error("terminal producer failure: {reason}")]
    Terminal { reason: String },
}

impl ProducerError {
    pub fn transient(message: impl Into<String>) -> Self {
        ProducerError::Transient {
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn rate_limited(message: impl Into<String>, retry_after: Duration) -> Self {
        ProducerError::Transient {
            message: message.into(),
            retry_after: Some(retry_after),
        }
    }

    pub fn terminal(reason: impl Into<String>) -> Self {
        ProducerError::Terminal {
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ProducerError::Transient {
                retry_after: Some(_),
                ..
            } => "rate_limited",
            ProducerError::Transient { .. } => "transient",
            ProducerError::Terminal { .. } => "terminal",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryRequest {
    pub topic: String,
    pub level: StoryLevel,
    pub length: StoryLength,
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedStory {
    pub title: String,
    pub segments: Vec<String>,
    #[serde(default)]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeechRequest {
    pub text: String,
    pub voice: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedAudio {
    pub bytes: Vec<u8>,
    pub sample_rate: u32,
    pub mime_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRequest {
    pub prompt: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

#[async_trait]
pub trait StoryProducer: Send + Sync {
    async fn generate_story(&self, request: &StoryRequest) -> Result<GeneratedStory, ProducerError>;
}

#[async_trait]
pub trait SpeechProducer: Send + Sync {
    async fn synthesize(&self, request: &SpeechRequest) -> Result<SynthesizedAudio, ProducerError>;
}

#[async_trait]
pub trait ImageProducer: Send + Sync {
    async fn generate_image(&self, request: &ImageRequest) -> Result<GeneratedImage, ProducerError>;
}
