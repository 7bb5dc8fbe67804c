//! Parameter incrementers derive the next run's parameters from the previous
//! run so every launch gets a fresh job instance.

use crate::constants::parameter_keys;
use crate::models::{JobParameters, JobParametersBuilder};
use chrono::{Local, NaiveDateTime};
use std::sync::Arc;

pub trait JobParametersIncrementer: Send + Sync {
    /// Parameters for the next run, given those of the previous run (if any)
    fn get_next(&self, previous: Option<&JobParameters>) -> JobParameters;
}

/// Increments a numeric `run.id` parameter, starting at 1
#[derive(Debug, Clone)]
pub struct RunIdIncrementer {
    key: String,
}

impl RunIdIncrementer {
    pub fn new() -> Self {
        Self::with_key(parameter_keys::RUN_ID)
    }

    pub fn with_key(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl Default for RunIdIncrementer {
    fn default() -> Self {
        Self::new()
    }
}

impl JobParametersIncrementer for RunIdIncrementer {
    fn get_next(&self, previous: Option<&JobParameters>) -> JobParameters {
        let previous = previous.cloned().unwrap_or_default();
        let next_id = previous
            .get_long(&self.key)
            .or_else(|| previous.get_string(&self.key).and_then(|s| s.parse().ok()))
            .map_or(1, |id: i64| id + 1);
        JobParametersBuilder::from_parameters(&previous)
            .add_long(self.key.clone(), next_id)
            .build()
    }
}

type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

/// Stamps the current local date-time under `currentDate`
#[derive(Clone)]
pub struct TimestampIncrementer {
    key: String,
    clock: Clock,
}

impl TimestampIncrementer {
    pub fn new() -> Self {
        Self {
            key: parameter_keys::CURRENT_DATE.to_string(),
            clock: Arc::new(|| Local::now().naive_local()),
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Replace the clock, mainly for deterministic tests
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> NaiveDateTime + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }
}

impl Default for TimestampIncrementer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TimestampIncrementer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimestampIncrementer")
            .field("key", &self.key)
            .finish()
    }
}

impl JobParametersIncrementer for TimestampIncrementer {
    fn get_next(&self, previous: Option<&JobParameters>) -> JobParameters {
        let previous = previous.cloned().unwrap_or_default();
        JobParametersBuilder::from_parameters(&previous)
            .add_date_time(self.key.clone(), (self.clock)())
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_run_id_starts_at_one_and_increments() {
        let incrementer = RunIdIncrementer::new();
        let first = incrementer.get_next(None);
        assert_eq!(first.get_long("run.id"), Some(1));

        let second = incrementer.get_next(Some(&first));
        assert_eq!(second.get_long("run.id"), Some(2));
    }

    #[test]
    fn test_run_id_keeps_other_parameters() {
        let previous = JobParametersBuilder::new()
            .add_string("name", "bob")
            .add_string("run.id", "41")
            .build();
        let next = RunIdIncrementer::new().get_next(Some(&previous));
        assert_eq!(next.get_string("name"), Some("bob"));
        assert_eq!(next.get_long("run.id"), Some(42));
    }

    #[test]
    fn test_timestamp_changes_between_runs() {
        let tick = Arc::new(AtomicU32::new(0));
        let clock_tick = tick.clone();
        let incrementer = TimestampIncrementer::new().with_clock(move || {
            let second = clock_tick.fetch_add(1, Ordering::SeqCst);
            NaiveDate::from_ymd_opt(2024, 1, 1)
                .and_then(|d| d.and_hms_opt(0, 0, second))
                .unwrap()
        });

        let base = JobParametersBuilder::new().add_string("name", "x").build();
        let first = incrementer.get_next(Some(&base));
        let second = incrementer.get_next(Some(&base));
        assert_ne!(first, second);
        assert_eq!(first.get_string("name"), Some("x"));
        assert!(first.get_date_time("currentDate").is_some());
    }
}
