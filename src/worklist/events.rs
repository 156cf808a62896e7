use serde::{Deserialize, Serialize};

use crate::job::{JobId, JobView};

/// Per-batch tally. `dropped` counts jobs deleted before their result came back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub converted: usize,
    pub failed: usize,
    pub dropped: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum WorklistEvent {
    #[serde(rename_all = "camelCase")]
    Admitted { jobs: Vec<JobId> },

    #[serde(rename_all = "camelCase")]
    TargetSet { job_id: JobId, format: String },

    #[serde(rename_all = "camelCase")]
    Deleted { job_id: JobId },

    SelectionRequired,

    #[serde(rename_all = "camelCase")]
    BatchStarted { jobs: Vec<JobId> },

    JobUpdated(JobView),

    BatchFinished(BatchReport),
}

impl WorklistEvent {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
