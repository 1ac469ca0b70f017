//! Pairing job tracker — run pairings in the background and poll them.
//!
//! Each job is two tasks: the work itself, and a supervisor that awaits it
//! and records the outcome. The supervisor always stamps `finished_at`, even
//! when the work panicked or was aborted.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use omnihub_domain::device::Device;
use omnihub_domain::error::{NotFoundError, OmniHubError};
use omnihub_domain::id::JobId;
use omnihub_domain::pairing_job::PairingJob;
use tokio::task::AbortHandle;

type JobTable = Arc<Mutex<HashMap<JobId, PairingJob>>>;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Default)]
pub struct PairingJobTracker {
    jobs: JobTable,
    tasks: Mutex<Vec<AbortHandle>>,
}

impl PairingJobTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `work` and return its job id without waiting.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn start<F>(&self, work: F) -> JobId
    where
        F: Future<Output = Result<Device, OmniHubError>> + Send + 'static,
    {
        let job_id = JobId::new();
        lock(&self.jobs).insert(job_id, PairingJob::pending(job_id));

        let jobs = self.jobs.clone();
        let worker = tokio::spawn(async move {
            with_job(&jobs, job_id, PairingJob::start);
            work.await
        });

        let abort = worker.abort_handle();
        let jobs = self.jobs.clone();
        tokio::spawn(async move {
            let outcome = worker.await;
            with_job(&jobs, job_id, |job| {
                match outcome {
                    Ok(Ok(device)) => {
                        tracing::info!(%job_id, device_id = %device.id, "pairing job succeeded");
                        job.succeed(device.id);
                    }
                    Ok(Err(err)) => {
                        tracing::error!(%job_id, error = %err, "pairing job failed");
                        job.fail(err.to_string(), format!("{err:?}"));
                    }
                    Err(join) if join.is_cancelled() => {
                        job.fail("pairing job cancelled", join.to_string());
                    }
                    Err(join) => {
                        tracing::error!(%job_id, error = %join, "pairing job panicked");
                        job.fail("pairing job panicked", join.to_string());
                    }
                }
                job.finish();
            });
        });

        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        tasks.retain(|task| !task.is_finished());
        tasks.push(abort);
        tracing::debug!(%job_id, "pairing job scheduled");
        job_id
    }

    /// Snapshot of one job.
    ///
    /// # Errors
    ///
    /// Returns [`OmniHubError::NotFound`] for unknown ids.
    pub fn status(&self, job_id: JobId) -> Result<PairingJob, OmniHubError> {
        lock(&self.jobs).get(&job_id).cloned().ok_or_else(|| {
            NotFoundError {
                entity: "PairingJob",
                id: job_id.to_string(),
            }
            .into()
        })
    }

    /// Poll until the job finished.
    ///
    /// # Errors
    ///
    /// Returns [`OmniHubError::NotFound`] for unknown ids.
    pub async fn wait(&self, job_id: JobId) -> Result<PairingJob, OmniHubError> {
        loop {
            let job = self.status(job_id)?;
            if job.status.is_finished() && job.finished_at.is_some() {
                return Ok(job);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Abort outstanding work and mark unfinished jobs as failed.
    pub fn shutdown(&self) {
        for task in self
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
        {
            task.abort();
        }
        for job in lock(&self.jobs).values_mut() {
            if !job.status.is_finished() {
                job.fail("pairing job cancelled", "tracker shut down");
                job.finish();
            }
        }
    }
}

fn lock(jobs: &JobTable) -> std::sync::MutexGuard<'_, HashMap<JobId, PairingJob>> {
    jobs.lock().unwrap_or_else(PoisonError::into_inner)
}

fn with_job(jobs: &JobTable, job_id: JobId, apply: impl FnOnce(&mut PairingJob)) {
    if let Some(job) = lock(jobs).get_mut(&job_id) {
        apply(job);
    }
}
