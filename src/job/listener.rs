use crate::models::JobExecution;
use tracing::info;

/// Callbacks around a whole job execution. `after_job` runs once the final
/// status is known, whether the job completed, failed or stopped.
pub trait JobExecutionListener: Send + Sync {
    fn before_job(&self, job_execution: &mut JobExecution) {
        let _ = job_execution;
    }

    fn after_job(&self, job_execution: &mut JobExecution) {
        let _ = job_execution;
    }
}

/// Logs job start and end with the final status
#[derive(Debug, Clone, Default)]
pub struct LoggingJobListener;

impl JobExecutionListener for LoggingJobListener {
    fn before_job(&self, job_execution: &mut JobExecution) {
        info!(
            job_name = %job_execution.job_name(),
            parameters = %job_execution.parameters,
            "Job has been started"
        );
    }

    fn after_job(&self, job_execution: &mut JobExecution) {
        info!(
            job_name = %job_execution.job_name(),
            status = %job_execution.status(),
            exit_status = %job_execution.exit_status,
            steps = ?job_execution.step_names(),
            "Job has ended"
        );
    }
}
