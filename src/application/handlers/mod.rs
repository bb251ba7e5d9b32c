pub mod audio;
pub mod image;
pub mod story;

use crate::domain::entities::job::{Job, JobType};
use crate::domain::services::content_producer::{
    ImageProducer, ProducerError, SpeechProducer, StoryProducer,
};
use crate::domain::services::job_validator::{JobValidator, ValidationError};
use crate::domain::value_objects::parameters::JobParameters;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

pub use audio::AudioGenerationHandler;
pub use image::ImageGenerationHandler;
pub use story::StoryGenerationHandler;

/// Executes one job type against its content producer.
#[async_trait]
pub trait JobHandler: Send + Sync {
    fn job_type(&self) -> JobType;

    /// Re-check stored parameters before any provider call.
    fn validate(&self, parameters: &Value) -> Result<JobParameters, ValidationError> {
        JobValidator::validate(self.job_type(), parameters)
    }

    /// Produce the job's result payload.
    async fn execute(&self, job: &Job, parameters: JobParameters) -> Result<Value, ProducerError>;
}

/// Dispatches jobs to the handler registered for their type.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<JobType, Arc<dyn JobHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the three generation handlers wired to the given producers.
    pub fn with_producers(
        story: Arc<dyn StoryProducer>,
        speech: Arc<dyn SpeechProducer>,
        image: Arc<dyn ImageProducer>,
    ) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(StoryGenerationHandler::new(story)));
        registry.register(Arc::new(AudioGenerationHandler::new(speech)));
        registry.register(Arc::new(ImageGenerationHandler::new(image)));
        registry
    }

    pub fn register(&mut self, handler: Arc<dyn JobHandler>) {
        let job_type = handler.job_type();
        info!(job_type = job_type.as_str(), "job_handler_registered");
        self.handlers.insert(job_type, handler);
    }

    pub fn has_handler(&self, job_type: JobType) -> bool {
        self.handlers.contains_key(&job_type)
    }

    /// Validate and execute `job`; parameter problems surface as terminal errors.
    pub async fn dispatch(&self, job: &Job) -> Result<Value, ProducerError> {
        let handler = self.handlers.get(&job.job_type).ok_or_else(|| {
            ProducerError::terminal(format!(
                "no handler registered for job type `{}`",
                job.job_type.as_str()
            ))
        })?;

        let parameters = handler
            .validate(&job.parameters)
            .map_err(|e| ProducerError::terminal(format!("invalid parameters: {e}")))?;

        handler.execute(job, parameters).await
    }
}

/// Handlers only ever receive parameters that passed their own validation.
fn mismatched(job_type: JobType) -> ProducerError {
    ProducerError::terminal(format!(
        "parameters do not match job type `{}`",
        job_type.as_str()
    ))
}
