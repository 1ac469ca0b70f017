//! Pairing job — pollable record of an asynchronous pairing attempt.

use serde::{Deserialize, Serialize};

use crate::id::{DeviceId, JobId};
use crate::time::{Timestamp, now};

/// Lifecycle of a pairing job. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobStatus {
    Pending,
    InProgress,
    Success,
    Failed,
}

impl JobStatus {
    #[must_use]
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => f.write_str("pending"),
            Self::InProgress => f.write_str("in-progress"),
            Self::Success => f.write_str("success"),
            Self::Failed => f.write_str("failed"),
        }
    }
}

/// Snapshot of one pairing job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairingJob {
    pub job_id: JobId,
    pub status: JobStatus,
    pub device_id: Option<DeviceId>,
    pub error: Option<String>,
    /// Diagnostic detail (full error chain) for failed jobs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub started_at: Timestamp,
    pub finished_at: Option<Timestamp>,
}

impl PairingJob {
    /// A new job in the `pending` state.
    #[must_use]
    pub fn pending(job_id: JobId) -> Self {
        Self {
            job_id,
            status: JobStatus::Pending,
            device_id: None,
            error: None,
            detail: None,
            started_at: now(),
            finished_at: None,
        }
    }

    /// Move to `in-progress` unless the job already advanced further.
    pub fn start(&mut self) {
        if self.status == JobStatus::Pending {
            self.status = JobStatus::InProgress;
        }
    }

    /// Record a successful outcome. Ignored once the job finished.
    pub fn succeed(&mut self, device_id: DeviceId) {
        if !self.status.is_finished() {
            self.status = JobStatus::Success;
            self.device_id = Some(device_id);
        }
    }

    /// Record a failure. Ignored once the job finished.
    pub fn fail(&mut self, error: impl Into<String>, detail: impl Into<String>) {
        if !self.status.is_finished() {
            self.status = JobStatus::Failed;
            self.error = Some(error.into());
            self.detail = Some(detail.into());
        }
    }

    /// Stamp the finish time; the first stamp wins.
    pub fn finish(&mut self) {
        if self.finished_at.is_none() {
            self.finished_at = Some(now());
        }
    }
}
