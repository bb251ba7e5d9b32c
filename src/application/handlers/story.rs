use crate::application::handlers::{JobHandler, mismatched};
use crate::domain::entities::job::{Job, JobType};
use crate::domain::services::content_producer::{ProducerError, StoryProducer, StoryRequest};
use crate::domain::value_objects::parameters::JobParameters;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;

pub struct StoryGenerationHandler {
    producer: Arc<dyn StoryProducer>,
}

impl StoryGenerationHandler {
    pub fn new(producer: Arc<dyn StoryProducer>) -> Self {
        Self { producer }
    }
}

#[async_trait]
impl JobHandler for StoryGenerationHandler {
    fn job_type(&self) -> JobType {
        JobType::StoryGeneration
    }

    async fn execute(&self, _job: &Job, parameters: JobParameters) -> Result<Value, ProducerError> {
        let JobParameters::Story(params) = parameters else {
            return Err(mismatched(self.job_type()));
        };

        let request = StoryRequest {
            topic: params.topic,
            level: params.level,
            length: params.length,
            language: params.language,
        };
        let story = self.producer.generate_story(&request).await?;

        Ok(json!({
            "title": story.title,
            "segments": story.segments,
            "summary": story.summary,
            "level": request.level.as_str(),
            "length": request.length.as_str(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::job::NewJob;
    use crate::domain::services::job_validator::JobValidator;
    use crate::domain::value_objects::ids::{JobId, UserId};
    use crate::domain::value_objects::timestamps::Timestamp;
    use crate::infrastructure::producers::ScriptedProducer;

    #[tokio::test]
    async fn given_story_parameters_when_executed_should_return_title_and_segments() {
        let handler = StoryGenerationHandler::new(Arc::new(ScriptedProducer::new()));
        let parameters = json!({ "topic": "otters", "level": "B2", "length": "short" });
        let job = Job::new(
            JobId::new(),
            NewJob {
                user_id: UserId::new(),
                story_id: None,
                job_type: JobType::StoryGeneration,
                parameters: parameters.clone(),
                priority: 0,
                max_retries: 3,
                estimated_completion_at: None,
            },
            Timestamp::now_utc(),
        );
        let typed = JobValidator::validate(JobType::StoryGeneration, &parameters).unwrap();

        let result = handler.execute(&job, typed).await.unwrap();

        assert_eq!(result["title"], "A story about otters");
        assert_eq!(result["segments"].as_array().unwrap().len(), 2);
        assert_eq!(result["level"], "B2");
    }
}
