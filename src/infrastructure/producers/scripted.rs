use crate::domain::services::content_producer::{
    GeneratedImage, GeneratedStory, ImageProducer, ImageRequest, ProducerError, SpeechProducer,
    SpeechRequest, StoryProducer, StoryRequest, SynthesizedAudio,
};
use crate::domain::value_objects::parameters::StoryLength;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];

/// Offline producer that returns canned content.
///
/// Failures queued with [`ScriptedProducer::push_failure`] are returned first,
/// one per call, which makes rate limits and outages reproducible.
#[derive(Default)]
pub struct ScriptedProducer {
    failures: Mutex<VecDeque<ProducerError>>,
    calls: AtomicU32,
    latency: Option<Duration>,
}

impl ScriptedProducer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call sleeps this long (on tokio's clock) before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn push_failure(&self, error: ProducerError) {
        self.failures
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push_back(error);
    }

    /// Number of producer calls made so far, failed ones included.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    async fn next_call(&self) -> Result<(), ProducerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let queued = self
            .failures
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .pop_front();
        match queued {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl StoryProducer for ScriptedProducer {
    async fn generate_story(
        &self,
        request: &StoryRequest,
    ) -> Result<GeneratedStory, ProducerError> {
        self.next_call().await?;
        let segments = match request.length {
            StoryLength::Short => 2,
            StoryLength::Medium => 4,
            StoryLength::Long => 8,
        };
        Ok(GeneratedStory {
            title: format!("A story about {}", request.topic),
            segments: (1..=segments)
                .map(|i| {
                    format!(
                        "Part {i} of a {} story about {}.",
                        request.level.as_str(),
                        request.topic
                    )
                })
                .collect(),
            summary: None,
        })
    }
}

#[async_trait]
impl SpeechProducer for ScriptedProducer {
    async fn synthesize(&self, request: &SpeechRequest) -> Result<SynthesizedAudio, ProducerError> {
        self.next_call().await?;
        // 16-bit silence, one sample per character of input.
        Ok(SynthesizedAudio {
            bytes: vec![0; request.text.chars().count() * 2],
            sample_rate: 24_000,
            mime_type: "audio/pcm".to_string(),
        })
    }
}

#[async_trait]
impl ImageProducer for ScriptedProducer {
    async fn generate_image(
        &self,
        _request: &ImageRequest,
    ) -> Result<GeneratedImage, ProducerError> {
        self.next_call().await?;
        Ok(GeneratedImage {
            bytes: PNG_SIGNATURE.to_vec(),
            mime_type: "image/png".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::parameters::StoryLevel;

    fn request() -> StoryRequest {
        StoryRequest {
            topic: "otters".to_string(),
            level: StoryLevel::A2,
            length: StoryLength::Short,
            language: None,
        }
    }

    #[tokio::test]
    async fn given_queued_failure_when_called_twice_should_fail_then_succeed() {
        let producer = ScriptedProducer::new();
        producer.push_failure(ProducerError::transient("boom"));

        let first = producer.generate_story(&request()).await;
        let second = producer.generate_story(&request()).await;

        assert_eq!(first, Err(ProducerError::transient("boom")));
        assert_eq!(second.unwrap().segments.len(), 2);
        assert_eq!(producer.calls(), 2);
    }
}
