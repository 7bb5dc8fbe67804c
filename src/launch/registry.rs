use crate::error::{BatchError, BatchResult, ConfigurationError};
use crate::job::Job;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::info;

/// Jobs available to a [`JobOperator`](super::JobOperator), by name
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: DashMap<String, Arc<Job>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, job: Job) -> Result<Arc<Job>, ConfigurationError> {
        let name = job.name().to_string();
        let job = Arc::new(job);
        match self.jobs.entry(name.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(ConfigurationError::Invalid(
                format!("a job named '{name}' is already registered"),
            )),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(job.clone());
                info!(job_name = %name, "Registered job");
                Ok(job)
            }
        }
    }

    pub fn get(&self, name: &str) -> BatchResult<Arc<Job>> {
        self.jobs
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| BatchError::NoSuchJob(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.jobs.contains_key(name)
    }

    /// Registered job names, sorted
    pub fn job_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.jobs.iter().map(|entry| entry.key().clone()).collect();
        names.sort();
        names
    }
}
