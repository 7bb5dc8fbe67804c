//! Typed, immutable job parameters and their builder.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Format used when date-time parameters are rendered or parsed
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Value carried by a single job parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ParameterValue {
    String(String),
    Long(i64),
    Double(f64),
    DateTime(NaiveDateTime),
}

impl ParameterValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Long(_) => "long",
            Self::Double(_) => "double",
            Self::DateTime(_) => "datetime",
        }
    }

    /// A string parameter that is empty or whitespace only
    pub fn is_blank(&self) -> bool {
        matches!(self, Self::String(s) if s.trim().is_empty())
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{s}"),
            Self::Long(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::DateTime(v) => write!(f, "{}", v.format(DATE_TIME_FORMAT)),
        }
    }
}

/// A parameter value flagged as identifying or not
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobParameter {
    pub value: ParameterValue,
    pub identifying: bool,
}

impl JobParameter {
    pub fn identifying(value: ParameterValue) -> Self {
        Self {
            value,
            identifying: true,
        }
    }

    pub fn non_identifying(value: ParameterValue) -> Self {
        Self {
            value,
            identifying: false,
        }
    }
}

/// Immutable set of parameters a job is launched with.
///
/// Identifying parameters together with the job name define the
/// [`JobInstance`](super::JobInstance).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobParameters {
    parameters: BTreeMap<String, JobParameter>,
}

impl JobParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&JobParameter> {
        self.parameters.get(key)
    }

    pub fn get_value(&self, key: &str) -> Option<&ParameterValue> {
        self.parameters.get(key).map(|p| &p.value)
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        match self.get_value(key) {
            Some(ParameterValue::String(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn get_long(&self, key: &str) -> Option<i64> {
        match self.get_value(key) {
            Some(ParameterValue::Long(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_double(&self, key: &str) -> Option<f64> {
        match self.get_value(key) {
            Some(ParameterValue::Double(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_date_time(&self, key: &str) -> Option<NaiveDateTime> {
        match self.get_value(key) {
            Some(ParameterValue::DateTime(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.parameters.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.parameters.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &JobParameter)> {
        self.parameters.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Only the identifying parameters
    pub fn identifying_parameters(&self) -> JobParameters {
        JobParameters {
            parameters: self
                .parameters
                .iter()
                .filter(|(_, p)| p.identifying)
                .map(|(k, p)| (k.clone(), p.clone()))
                .collect(),
        }
    }

    /// Whether both sets resolve to the same job instance: their identifying
    /// parameters are equal key by key, type included.
    pub fn same_identity(&self, other: &JobParameters) -> bool {
        let mut ours = self.parameters.iter().filter(|(_, p)| p.identifying);
        let mut theirs = other.parameters.iter().filter(|(_, p)| p.identifying);
        loop {
            match (ours.next(), theirs.next()) {
                (None, None) => return true,
                (Some((k1, p1)), Some((k2, p2))) if k1 == k2 && p1.value == p2.value => {}
                _ => return false,
            }
        }
    }

    /// Overlay `other` on top of `self`; keys in `other` win.
    pub fn merge(&self, other: &JobParameters) -> JobParameters {
        let mut parameters = self.parameters.clone();
        for (key, parameter) in &other.parameters {
            parameters.insert(key.clone(), parameter.clone());
        }
        JobParameters { parameters }
    }
}

impl fmt::Display for JobParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (key, parameter)) in self.parameters.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{key}={}", parameter.value)?;
        }
        write!(f, "}}")
    }
}

/// Builder for [`JobParameters`]
#[derive(Debug, Clone, Default)]
pub struct JobParametersBuilder {
    parameters: BTreeMap<String, JobParameter>,
}

impl JobParametersBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing parameter set
    pub fn from_parameters(parameters: &JobParameters) -> Self {
        Self {
            parameters: parameters.parameters.clone(),
        }
    }

    pub fn add_parameter(mut self, key: impl Into<String>, parameter: JobParameter) -> Self {
        self.parameters.insert(key.into(), parameter);
        self
    }

    pub fn add_string(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.add_parameter(
            key,
            JobParameter::identifying(ParameterValue::String(value.into())),
        )
    }

    pub fn add_long(self, key: impl Into<String>, value: i64) -> Self {
        self.add_parameter(key, JobParameter::identifying(ParameterValue::Long(value)))
    }

    pub fn add_double(self, key: impl Into<String>, value: f64) -> Self {
        self.add_parameter(key, JobParameter::identifying(ParameterValue::Double(value)))
    }

    pub fn add_date_time(self, key: impl Into<String>, value: NaiveDateTime) -> Self {
        self.add_parameter(
            key,
            JobParameter::identifying(ParameterValue::DateTime(value)),
        )
    }

    pub fn add_non_identifying(self, key: impl Into<String>, value: ParameterValue) -> Self {
        self.add_parameter(key, JobParameter::non_identifying(value))
    }

    pub fn remove(mut self, key: &str) -> Self {
        self.parameters.remove(key);
        self
    }

    pub fn build(self) -> JobParameters {
        JobParameters {
            parameters: self.parameters,
        }
    }
}
