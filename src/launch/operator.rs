//! # Job Operator
//!
//! Name-based launch surface over a [`JobRegistry`] and a [`JobLauncher`].
//! Jobs may be run to completion inline or spawned onto the tokio runtime;
//! the number of jobs executing at once is bounded by a semaphore.

use super::converter::parameters_from_pairs;
use super::{JobLauncher, JobRegistry};
use crate::config::BatchConfig;
use crate::error::{BatchError, BatchResult};
use crate::models::{JobExecution, JobParameters};
use crate::repository::JobRepository;
use crate::step::StopSignal;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{info, instrument};
use uuid::Uuid;

pub struct JobOperator {
    registry: Arc<JobRegistry>,
    launcher: JobLauncher,
    permits: Arc<Semaphore>,
    active: Arc<DashMap<Uuid, (String, StopSignal)>>,
}

impl JobOperator {
    pub fn new(
        registry: Arc<JobRegistry>,
        repository: Arc<dyn JobRepository>,
        max_concurrent_jobs: usize,
    ) -> Self {
        Self {
            registry,
            launcher: JobLauncher::new(repository),
            permits: Arc::new(Semaphore::new(max_concurrent_jobs.max(1))),
            active: Arc::new(DashMap::new()),
        }
    }

    pub fn from_config(
        config: &BatchConfig,
        registry: Arc<JobRegistry>,
        repository: Arc<dyn JobRepository>,
    ) -> Self {
        Self::new(registry, repository, config.max_concurrent_jobs)
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    pub fn launcher(&self) -> &JobLauncher {
        &self.launcher
    }

    /// Convert textual parameters (`value[,type[,identifying]]`) for `job_name`
    pub fn parse_parameters(
        &self,
        job_name: &str,
        parameters: &HashMap<String, String>,
    ) -> BatchResult<JobParameters> {
        parameters_from_pairs(parameters).map_err(|source| BatchError::InvalidParameters {
            job_name: job_name.to_string(),
            source,
        })
    }

    /// Launch a registered job by name and wait for it to finish
    #[instrument(skip(self, parameters))]
    pub async fn start(
        &self,
        job_name: &str,
        parameters: &HashMap<String, String>,
    ) -> BatchResult<JobExecution> {
        let parameters = self.parse_parameters(job_name, parameters)?;
        self.run(job_name, parameters).await
    }

    /// Launch a registered job with already typed parameters
    pub async fn run(&self, job_name: &str, parameters: JobParameters) -> BatchResult<JobExecution> {
        let handle = self.start_with_parameters(job_name, parameters)?;
        handle.wait().await
    }

    /// Spawn a registered job and return immediately
    pub fn start_async(
        &self,
        job_name: &str,
        parameters: &HashMap<String, String>,
    ) -> BatchResult<JobExecutionHandle> {
        let parameters = self.parse_parameters(job_name, parameters)?;
        self.start_with_parameters(job_name, parameters)
    }

    pub fn start_with_parameters(
        &self,
        job_name: &str,
        parameters: JobParameters,
    ) -> BatchResult<JobExecutionHandle> {
        let job = self.registry.get(job_name)?;
        let launcher = self.launcher.clone();
        let permits = self.permits.clone();
        let active = self.active.clone();
        let stop_signal = StopSignal::new();
        let ticket = Uuid::new_v4();
        active.insert(ticket, (job_name.to_string(), stop_signal.clone()));

        let signal = stop_signal.clone();
        let task = tokio::spawn(async move {
            let result = match permits.acquire_owned().await {
                Ok(_permit) => launcher.run_with_signal(&job, parameters, signal).await,
                Err(closed) => Err(BatchError::Join(closed.to_string())),
            };
            active.remove(&ticket);
            result
        });

        Ok(JobExecutionHandle {
            job_name: job_name.to_string(),
            stop_signal,
            task,
        })
    }

    /// Ask every job started through this operator to stop
    pub fn stop_all(&self) -> usize {
        let mut stopped = 0;
        for entry in self.active.iter() {
            let (job_name, signal) = entry.value();
            info!(job_name = %job_name, "Requesting stop");
            signal.request_stop();
            stopped += 1;
        }
        stopped
    }

    /// Number of jobs started through this operator that have not finished
    pub fn active_jobs(&self) -> usize {
        self.active.len()
    }
}

impl std::fmt::Debug for JobOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobOperator")
            .field("jobs", &self.registry.job_names())
            .field("available_permits", &self.permits.available_permits())
            .field("active", &self.active.len())
            .finish()
    }
}

/// A job running in the background
#[derive(Debug)]
pub struct JobExecutionHandle {
    job_name: String,
    stop_signal: StopSignal,
    task: JoinHandle<BatchResult<JobExecution>>,
}

impl JobExecutionHandle {
    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    /// Request a cooperative stop; the job ends STOPPED at the next boundary
    pub fn stop(&self) {
        self.stop_signal.request_stop();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub async fn wait(self) -> BatchResult<JobExecution> {
        self.task
            .await
            .map_err(|error| BatchError::Join(error.to_string()))?
    }
}
