use crate::domain::entities::job::JobStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    Forbidden { from: JobStatus, to: JobStatus },
}

pub struct JobStateMachine;

impl JobStateMachine {
    pub fn can_transition(from: JobStatus, to: JobStatus) -> bool {
        matches!(
            (from, to),
            (JobStatus::Pending, JobStatus::Processing)
                | (JobStatus::Pending, JobStatus::Cancelled)
                | (JobStatus::Processing, JobStatus::Completed)
                | (JobStatus::Processing, JobStatus::Failed)
                | (JobStatus::Processing, JobStatus::Pending)
                | (JobStatus::Processing, JobStatus::Cancelled)
                | (JobStatus::Failed, JobStatus::Pending)
        )
    }

    pub fn transition(from: JobStatus, to: JobStatus) -> Result<JobStatus, TransitionError> {
        if Self::can_transition(from, to) {
            return Ok(to);
        }

        Err(TransitionError::Forbidden { from, to })
    }
}
