//! Job parameter validation, run before any instance lookup or step execution.

use crate::error::ValidationError;
use crate::models::JobParameters;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::warn;

pub trait JobParametersValidator: Send + Sync {
    fn validate(&self, parameters: &JobParameters) -> Result<(), ValidationError>;
}

/// Checks that required keys are present and non-blank.
///
/// When optional keys are declared, keys that are neither required nor
/// optional are reported with a warning, or rejected in strict mode. Blank
/// entries in either list are ignored.
#[derive(Debug, Clone, Default)]
pub struct DefaultJobParametersValidator {
    required_keys: BTreeSet<String>,
    optional_keys: BTreeSet<String>,
    reject_unrecognized: bool,
}

impl DefaultJobParametersValidator {
    pub fn new<R, O, S, T>(required_keys: R, optional_keys: O) -> Self
    where
        R: IntoIterator<Item = S>,
        O: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        let required_keys = non_blank(required_keys);
        let optional_keys = non_blank(optional_keys)
            .into_iter()
            .filter(|key| !required_keys.contains(key))
            .collect();
        Self {
            required_keys,
            optional_keys,
            reject_unrecognized: false,
        }
    }

    /// Reject keys outside the required and optional sets instead of warning
    pub fn reject_unrecognized(mut self, reject: bool) -> Self {
        self.reject_unrecognized = reject;
        self
    }

    pub fn required_keys(&self) -> impl Iterator<Item = &str> {
        self.required_keys.iter().map(String::as_str)
    }
}

fn non_blank<I, S>(keys: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    keys.into_iter()
        .map(Into::into)
        .filter(|key: &String| !key.trim().is_empty())
        .collect()
}

impl JobParametersValidator for DefaultJobParametersValidator {
    fn validate(&self, parameters: &JobParameters) -> Result<(), ValidationError> {
        let missing: Vec<String> = self
            .required_keys
            .iter()
            .filter(|key| {
                parameters
                    .get_value(key)
                    .map(|value| value.is_blank())
                    .unwrap_or(true)
            })
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(ValidationError::MissingRequiredKeys { missing });
        }

        if !self.optional_keys.is_empty() || self.reject_unrecognized {
            let unknown: Vec<String> = parameters
                .keys()
                .filter(|key| {
                    !self.required_keys.contains(*key) && !self.optional_keys.contains(*key)
                })
                .map(str::to_string)
                .collect();
            if !unknown.is_empty() {
                if self.reject_unrecognized {
                    return Err(ValidationError::UnrecognizedKeys { unknown });
                }
                warn!(
                    ?unknown,
                    "The JobParameters contains keys that are not explicitly optional or required"
                );
            }
        }
        Ok(())
    }
}

/// Requires the given keys and allows anything else
pub fn require_keys<I, S>(keys: I) -> DefaultJobParametersValidator
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    DefaultJobParametersValidator::new(keys, Vec::<String>::new())
}

/// Runs validators in order and stops at the first failure
#[derive(Clone, Default)]
pub struct CompositeJobParametersValidator {
    validators: Vec<Arc<dyn JobParametersValidator>>,
}

impl CompositeJobParametersValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<V: JobParametersValidator + 'static>(mut self, validator: V) -> Self {
        self.validators.push(Arc::new(validator));
        self
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}

impl std::fmt::Debug for CompositeJobParametersValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeJobParametersValidator")
            .field("validators", &self.validators.len())
            .finish()
    }
}

impl JobParametersValidator for CompositeJobParametersValidator {
    fn validate(&self, parameters: &JobParameters) -> Result<(), ValidationError> {
        self.validators
            .iter()
            .try_for_each(|validator| validator.validate(parameters))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::JobParametersBuilder;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_missing_required_key() {
        let validator = require_keys(["name"]);
        let params = JobParametersBuilder::new().add_string("test", "x").build();
        assert_eq!(
            validator.validate(&params),
            Err(ValidationError::MissingRequiredKeys {
                missing: vec!["name".into()]
            })
        );
    }

    #[test]
    fn test_blank_required_value_counts_as_missing() {
        let validator = require_keys(["name"]);
        let params = JobParametersBuilder::new().add_string("name", "  ").build();
        assert!(validator.validate(&params).is_err());

        let params = JobParametersBuilder::new().add_string("name", "bob").build();
        assert!(validator.validate(&params).is_ok());
    }

    #[test]
    fn test_blank_optional_key_does_not_restrict() {
        let validator = DefaultJobParametersValidator::new(["name"], [""]);
        let params = JobParametersBuilder::new()
            .add_string("name", "bob")
            .add_string("test", "x")
            .build();
        assert!(validator.validate(&params).is_ok());
    }

    #[test]
    fn test_unrecognized_keys_rejected_in_strict_mode() {
        let validator = DefaultJobParametersValidator::new(["name"], ["verbose"])
            .reject_unrecognized(true);
        let params = JobParametersBuilder::new()
            .add_string("name", "bob")
            .add_string("extra", "x")
            .build();
        assert_eq!(
            validator.validate(&params),
            Err(ValidationError::UnrecognizedKeys {
                unknown: vec!["extra".into()]
            })
        );
    }

    struct Counting(Arc<AtomicUsize>, bool);

    impl JobParametersValidator for Counting {
        fn validate(&self, _parameters: &JobParameters) -> Result<(), ValidationError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            if self.1 {
                Ok(())
            } else {
                Err(ValidationError::Invalid("counting validator".into()))
            }
        }
    }

    #[test]
    fn test_composite_fails_fast_in_order() {
        let calls = Arc::new(AtomicUsize::new(0));
        let composite = CompositeJobParametersValidator::new()
            .with(Counting(calls.clone(), true))
            .with(Counting(calls.clone(), false))
            .with(Counting(calls.clone(), true));

        assert!(composite.validate(&JobParameters::new()).is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
