use crate::domain::entities::job::JobType;
use crate::domain::value_objects::timestamps::Timestamp;
use time::Duration;

/// Static scheduling facts about each job type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobProfile {
    /// Rough producer latency, used for the estimate shown to the user.
    pub estimated_duration: Duration,
    /// Minimum gap between two jobs of this type on the worker.
    pub default_spacing: Duration,
}

pub struct JobCatalog;

impl JobCatalog {
    pub fn profile(job_type: JobType) -> JobProfile {
        match job_type {
            JobType::StoryGeneration => JobProfile {
                estimated_duration: Duration::seconds(45),
                default_spacing: Duration::seconds(1),
            },
            JobType::AudioGeneration => JobProfile {
                estimated_duration: Duration::seconds(60),
                default_spacing: Duration::seconds(3),
            },
            JobType::ImageGeneration => JobProfile {
                estimated_duration: Duration::seconds(90),
                default_spacing: Duration::seconds(10),
            },
        }
    }

    pub fn estimated_completion(job_type: JobType, from: Timestamp) -> Timestamp {
        from.plus(Self::profile(job_type).estimated_duration)
    }
}
