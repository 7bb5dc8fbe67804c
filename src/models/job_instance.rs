use super::JobParameters;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of a job run: job name plus identifying parameters.
///
/// Relaunching a job with the same identifying parameters targets the same
/// instance; the parameters stored here never change after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobInstance {
    pub instance_id: Uuid,
    pub job_name: String,
    identifying_parameters: JobParameters,
}

impl JobInstance {
    pub fn new(job_name: impl Into<String>, parameters: &JobParameters) -> Self {
        Self {
            instance_id: Uuid::new_v4(),
            job_name: job_name.into(),
            identifying_parameters: parameters.identifying_parameters(),
        }
    }

    pub fn identifying_parameters(&self) -> &JobParameters {
        &self.identifying_parameters
    }

    /// Whether `parameters` launched under `job_name` resolve to this instance
    pub fn matches(&self, job_name: &str, parameters: &JobParameters) -> bool {
        self.job_name == job_name && self.identifying_parameters.same_identity(parameters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{JobParametersBuilder, ParameterValue};

    #[test]
    fn test_instance_keeps_only_identifying_parameters() {
        let params = JobParametersBuilder::new()
            .add_string("name", "a")
            .add_non_identifying("debug", ParameterValue::Long(1))
            .build();

        let instance = JobInstance::new("job1", &params);
        assert_eq!(instance.identifying_parameters().len(), 1);
        assert!(instance.matches("job1", &params));
        assert!(!instance.matches("job2", &params));
    }

    #[test]
    fn test_values_containing_separators_stay_distinct() {
        let packed = JobParametersBuilder::new()
            .add_string("a", "x(string);b=y")
            .build();
        let split = JobParametersBuilder::new()
            .add_string("a", "x")
            .add_string("b", "y")
            .build();

        let instance = JobInstance::new("j", &packed);
        assert!(instance.matches("j", &packed));
        assert!(!instance.matches("j", &split));
    }
}
