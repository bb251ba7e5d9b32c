use crate::application::handlers::{JobHandler, mismatched};
use crate::domain::entities::job::{Job, JobType};
use crate::domain::services::content_producer::{ProducerError, SpeechProducer, SpeechRequest};
use crate::domain::value_objects::parameters::JobParameters;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Value, json};
use std::sync::Arc;

pub struct AudioGenerationHandler {
    producer: Arc<dyn SpeechProducer>,
}

impl AudioGenerationHandler {
    pub fn new(producer: Arc<dyn SpeechProducer>) -> Self {
        Self { producer }
    }
}

#[async_trait]
impl JobHandler for AudioGenerationHandler {
    fn job_type(&self) -> JobType {
        JobType::AudioGeneration
    }

    async fn execute(&self, _job: &Job, parameters: JobParameters) -> Result<Value, ProducerError> {
        let JobParameters::Audio(params) = parameters else {
            return Err(mismatched(self.job_type()));
        };

        let audio = self
            .producer
            .synthesize(&SpeechRequest {
                text: params.text,
                voice: params.voice,
            })
            .await?;
        if audio.bytes.is_empty() {
            return Err(ProducerError::terminal("speech provider returned no audio"));
        }

        Ok(json!({
            "story_id": params.story_id,
            "segment_index": params.segment_index,
            "mime_type": audio.mime_type,
            "sample_rate": audio.sample_rate,
            "byte_length": audio.bytes.len(),
            "audio_base64": STANDARD.encode(&audio.bytes),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::job::NewJob;
    use crate::domain::services::content_producer::SynthesizedAudio;
    use crate::domain::services::job_validator::JobValidator;
    use crate::domain::value_objects::ids::{JobId, StoryId, UserId};
    use crate::domain::value_objects::timestamps::Timestamp;

    struct SilentSpeech;

    #[async_trait]
    impl SpeechProducer for SilentSpeech {
        async fn synthesize(
            &self,
            _request: &SpeechRequest,
        ) -> Result<SynthesizedAudio, ProducerError> {
            Ok(SynthesizedAudio {
                bytes: Vec::new(),
                sample_rate: 24_000,
                mime_type: "audio/pcm".to_string(),
            })
        }
    }

    fn audio_job(parameters: Value) -> Job {
        Job::new(
            JobId::new(),
            NewJob {
                user_id: UserId::new(),
                story_id: None,
                job_type: JobType::AudioGeneration,
                parameters,
                priority: 0,
                max_retries: 3,
                estimated_completion_at: None,
            },
            Timestamp::now_utc(),
        )
    }

    #[tokio::test]
    async fn given_empty_audio_from_provider_when_executed_should_fail_terminally() {
        let handler = AudioGenerationHandler::new(Arc::new(SilentSpeech));
        let parameters = json!({ "story_id": StoryId::new().to_string(), "text": "Hello" });
        let typed = JobValidator::validate(JobType::AudioGeneration, &parameters).unwrap();

        let result = handler.execute(&audio_job(parameters), typed).await;

        assert!(matches!(result, Err(ProducerError::Terminal { .. })));
    }

    #[tokio::test]
    async fn given_story_parameters_when_executed_by_audio_handler_should_reject() {
        let handler = AudioGenerationHandler::new(Arc::new(SilentSpeech));
        let parameters = json!({ "topic": "otters", "level": "A1" });
        let typed = JobValidator::validate(JobType::StoryGeneration, &parameters).unwrap();

        let result = handler.execute(&audio_job(parameters), typed).await;

        assert!(matches!(result, Err(ProducerError::Terminal { .. })));
    }
}
