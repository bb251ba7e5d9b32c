use crate::application::handlers::{JobHandler, mismatched};
use crate::domain::entities::job::{Job, JobType};
use crate::domain::services::content_producer::{ImageProducer, ImageRequest, ProducerError};
use crate::domain::value_objects::parameters::JobParameters;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Value, json};
use std::sync::Arc;

pub struct ImageGenerationHandler {
    producer: Arc<dyn ImageProducer>,
}

impl ImageGenerationHandler {
    pub fn new(producer: Arc<dyn ImageProducer>) -> Self {
        Self { producer }
    }
}

#[async_trait]
impl JobHandler for ImageGenerationHandler {
    fn job_type(&self) -> JobType {
        JobType::ImageGeneration
    }

    async fn execute(&self, _job: &Job, parameters: JobParameters) -> Result<Value, ProducerError> {
        let JobParameters::Image(params) = parameters else {
            return Err(mismatched(self.job_type()));
        };

        let prompt = params.prompt.unwrap_or_else(|| {
            format!(
                "Illustration for segment {} of story {}",
                params.segment_index, params.story_id
            )
        });
        let image = self
            .producer
            .generate_image(&ImageRequest { prompt })
            .await?;
        if image.bytes.is_empty() {
            return Err(ProducerError::terminal("image provider returned no image"));
        }

        Ok(json!({
            "story_id": params.story_id,
            "segment_index": params.segment_index,
            "mime_type": image.mime_type,
            "image_base64": STANDARD.encode(&image.bytes),
        }))
    }
}
