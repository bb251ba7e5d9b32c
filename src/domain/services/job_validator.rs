use crate::domain::entities::job::JobType;
use crate::domain::value_objects::ids::StoryId;
use crate::domain::value_objects::parameters::{
    AudioParameters, ImageParameters, JobParameters, StoryLength, StoryLevel, StoryParameters,
};
use serde_json::{Map, Value};
use thiserror::Error;

/// Longest accepted story topic, in characters.
pub const MAX_TOPIC_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("unknown job type `{0}`")]
    UnknownJobType(String),
    #[error("parameters must be a JSON object")]
    NotAnObject,
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("field `{field}` is invalid: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// Per-type admission checks on job parameters.
///
/// Pure and synchronous: the creation path runs it before anything is stored
/// and the worker runs it again before calling a producer.
pub struct JobValidator;

impl JobValidator {
    /// Validate a raw `job_type` string together with its parameters.
    pub fn validate_raw(
        job_type: &str,
        parameters: &Value,
    ) -> Result<(JobType, JobParameters), ValidationError> {
        let parsed = JobType::parse(job_type)
            .ok_or_else(|| ValidationError::UnknownJobType(job_type.to_string()))?;
        let params = Self::validate(parsed, parameters)?;
        Ok((parsed, params))
    }

    pub fn validate(
        job_type: JobType,
        parameters: &Value,
    ) -> Result<JobParameters, ValidationError> {
        let object = parameters.as_object().ok_or(ValidationError::NotAnObject)?;
        match job_type {
            JobType::StoryGeneration => Self::story(object).map(JobParameters::Story),
            JobType::AudioGeneration => Self::audio(object).map(JobParameters::Audio),
            JobType::ImageGeneration => Self::image(object).map(JobParameters::Image),
        }
    }

    fn story(object: &Map<String, Value>) -> Result<StoryParameters, ValidationError> {
        let topic = required_text(object, "topic")?;
        if topic.chars().count() > MAX_TOPIC_CHARS {
            return Err(invalid(
                "topic",
                format!("must be at most {MAX_TOPIC_CHARS} characters"),
            ));
        }

        let level = required_str(object, "level")?;
        let level = StoryLevel::parse(level)
            .ok_or_else(|| invalid("level", "must be one of A1, A2, B1, B2, C1, C2"))?;

        let length = match optional_str(object, "length")? {
            Some(raw) => StoryLength::parse(raw)
                .ok_or_else(|| invalid("length", "must be one of short, medium, long"))?,
            None => StoryLength::default(),
        };

        Ok(StoryParameters {
            topic,
            level,
            length,
            language: optional_str(object, "language")?.map(str::to_string),
        })
    }

    fn audio(object: &Map<String, Value>) -> Result<AudioParameters, ValidationError> {
        Ok(AudioParameters {
            story_id: required_story_id(object)?,
            text: required_text(object, "text")?,
            voice: optional_str(object, "voice")?.map(str::to_string),
            segment_index: optional_index(object, "segment_index")?,
        })
    }

    fn image(object: &Map<String, Value>) -> Result<ImageParameters, ValidationError> {
        let segment_index = optional_index(object, "segment_index")?
            .ok_or(ValidationError::MissingField("segment_index"))?;
        Ok(ImageParameters {
            story_id: required_story_id(object)?,
            segment_index,
            prompt: optional_str(object, "prompt")?.map(str::to_string),
        })
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ValidationError {
    ValidationError::InvalidField {
        field,
        reason: reason.into(),
    }
}

fn optional_str<'a>(
    object: &'a Map<String, Value>,
    field: &'static str,
) -> Result<Option<&'a str>, ValidationError> {
    match object.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(invalid(field, "must be a string")),
    }
}

fn required_str<'a>(
    object: &'a Map<String, Value>,
    field: &'static str,
) -> Result<&'a str, ValidationError> {
    optional_str(object, field)?.ok_or(ValidationError::MissingField(field))
}

fn required_text(
    object: &Map<String, Value>,
    field: &'static str,
) -> Result<String, ValidationError> {
    let value = required_str(object, field)?.trim();
    if value.is_empty() {
        return Err(invalid(field, "must not be empty"));
    }
    Ok(value.to_string())
}

fn required_story_id(object: &Map<String, Value>) -> Result<StoryId, ValidationError> {
    required_str(object, "story_id")?
        .parse()
        .map_err(|_| invalid("story_id", "must be a UUID"))
}

fn optional_index(
    object: &Map<String, Value>,
    field: &'static str,
) -> Result<Option<u32>, ValidationError> {
    match object.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .map(Some)
            .ok_or_else(|| invalid(field, "must be a non-negative integer")),
        Some(_) => Err(invalid(field, "must be a non-negative integer")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn given_valid_story_parameters_when_validated_should_default_length_to_medium() {
        let params = json!({ "topic": "A lighthouse keeper", "level": "B1" });

        let result = JobValidator::validate(JobType::StoryGeneration, &params).unwrap();

        let JobParameters::Story(story) = result else {
            panic!("expected story parameters");
        };
        assert_eq!(story.topic, "A lighthouse keeper");
        assert_eq!(story.level, StoryLevel::B1);
        assert_eq!(story.length, StoryLength::Medium);
        assert_eq!(story.language, None);
    }

    #[test]
    fn given_blank_topic_when_validated_should_reject() {
        let params = json!({ "topic": "   ", "level": "A1" });

        let result = JobValidator::validate(JobType::StoryGeneration, &params);

        assert!(matches!(
            result,
            Err(ValidationError::InvalidField { field: "topic", .. })
        ));
    }

    #[test]
    fn given_overlong_topic_when_validated_should_reject() {
        let params = json!({ "topic": "x".repeat(MAX_TOPIC_CHARS + 1), "level": "A1" });

        let result = JobValidator::validate(JobType::StoryGeneration, &params);

        assert!(matches!(
            result,
            Err(ValidationError::InvalidField { field: "topic", .. })
        ));
    }

    #[test]
    fn given_unknown_level_when_validated_should_reject() {
        let params = json!({ "topic": "Dragons", "level": "D1" });

        let result = JobValidator::validate(JobType::StoryGeneration, &params);

        assert!(matches!(
            result,
            Err(ValidationError::InvalidField { field: "level", .. })
        ));
    }

    #[test]
    fn given_audio_without_story_id_when_validated_should_report_missing_field() {
        let params = json!({ "text": "Once upon a time" });

        let result = JobValidator::validate(JobType::AudioGeneration, &params);

        assert_eq!(result, Err(ValidationError::MissingField("story_id")));
    }

    #[test]
    fn given_audio_with_bad_story_id_when_validated_should_reject() {
        let params = json!({ "story_id": "story-1", "text": "Once upon a time" });

        let result = JobValidator::validate(JobType::AudioGeneration, &params);

        assert!(matches!(
            result,
            Err(ValidationError::InvalidField { field: "story_id", .. })
        ));
    }

    #[test]
    fn given_image_with_negative_segment_when_validated_should_reject() {
        let params = json!({ "story_id": StoryId::new().to_string(), "segment_index": -1 });

        let result = JobValidator::validate(JobType::ImageGeneration, &params);

        assert!(matches!(
            result,
            Err(ValidationError::InvalidField {
                field: "segment_index",
                ..
            })
        ));
    }

    #[test]
    fn given_valid_image_parameters_when_validated_should_expose_story_id() {
        let story_id = StoryId::new();
        let params = json!({ "story_id": story_id.to_string(), "segment_index": 2 });

        let result = JobValidator::validate(JobType::ImageGeneration, &params).unwrap();

        assert_eq!(result.story_id(), Some(story_id));
    }

    #[test]
    fn given_non_object_parameters_when_validated_should_reject() {
        let result = JobValidator::validate(JobType::StoryGeneration, &json!(["topic"]));

        assert_eq!(result, Err(ValidationError::NotAnObject));
    }

    #[test]
    fn given_unknown_job_type_when_validated_raw_should_reject() {
        let result = JobValidator::validate_raw("video_generation", &json!({}));

        assert_eq!(
            result,
            Err(ValidationError::UnknownJobType("video_generation".to_string()))
        );
    }
}
