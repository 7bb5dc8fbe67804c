//! Conversion between textual `key=value` pairs and [`JobParameters`].
//!
//! A value may carry a type and an identifying flag after commas:
//!
//! ```text
//! name=alice                       string, identifying
//! count=10,long                    long, identifying
//! ratio=0.5,double,false           double, non-identifying
//! at=2024-01-01T10:00:00,datetime  date-time, identifying
//! ```
//!
//! Values containing commas must be given with an explicit type, since the
//! last one or two comma-separated fields are read as type and flag only when
//! they parse as such.

use crate::error::ValidationError;
use crate::models::job_parameters::DATE_TIME_FORMAT;
use crate::models::{JobParameter, JobParameters, JobParametersBuilder, ParameterValue};
use chrono::NaiveDateTime;

/// Parse `key=value[,type[,identifying]]` strings into parameters
pub fn parameters_from_args<I, S>(args: I) -> Result<JobParameters, ValidationError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut builder = JobParametersBuilder::new();
    for arg in args {
        let arg = arg.as_ref();
        let (key, value) = arg
            .split_once('=')
            .ok_or_else(|| ValidationError::InvalidParameter {
                key: arg.to_string(),
                reason: "expected key=value".to_string(),
            })?;
        let key = key.trim();
        if key.is_empty() {
            return Err(ValidationError::InvalidParameter {
                key: arg.to_string(),
                reason: "parameter key is empty".to_string(),
            });
        }
        builder = builder.add_parameter(key, parse_parameter(key, value)?);
    }
    Ok(builder.build())
}

/// Parse `(key, value)` pairs, such as a map handed to a job operator
pub fn parameters_from_pairs<'a, I>(pairs: I) -> Result<JobParameters, ValidationError>
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    let mut builder = JobParametersBuilder::new();
    for (key, value) in pairs {
        builder = builder.add_parameter(key.clone(), parse_parameter(key, value)?);
    }
    Ok(builder.build())
}

/// Parse one `value[,type[,identifying]]` argument
pub fn parse_parameter(key: &str, text: &str) -> Result<JobParameter, ValidationError> {
    let fields: Vec<&str> = text.rsplitn(3, ',').collect();
    let (raw, type_name, identifying) = match fields.as_slice() {
        [flag, type_name, raw] if parse_flag(flag).is_some() && is_type_name(type_name) => {
            (*raw, Some(*type_name), parse_flag(flag).unwrap_or(true))
        }
        [last, _, ..] if is_type_name(last) => {
            let raw = &text[..text.len() - last.len() - 1];
            (raw, Some(*last), true)
        }
        _ => (text, None, true),
    };

    let value = match type_name.map(|t| t.trim().to_ascii_lowercase()).as_deref() {
        None | Some("string") => ParameterValue::String(raw.to_string()),
        Some("long") => ParameterValue::Long(raw.trim().parse().map_err(|e| invalid(key, raw, e))?),
        Some("double") => {
            ParameterValue::Double(raw.trim().parse().map_err(|e| invalid(key, raw, e))?)
        }
        Some(_) => ParameterValue::DateTime(
            NaiveDateTime::parse_from_str(raw.trim(), DATE_TIME_FORMAT)
                .map_err(|e| invalid(key, raw, e))?,
        ),
    };

    Ok(if identifying {
        JobParameter::identifying(value)
    } else {
        JobParameter::non_identifying(value)
    })
}

/// Render parameters back into `key=value,type,identifying` strings
pub fn parameters_to_args(parameters: &JobParameters) -> Vec<String> {
    parameters
        .iter()
        .map(|(key, parameter)| {
            format!(
                "{key}={},{},{}",
                parameter.value,
                parameter.value.type_name(),
                parameter.identifying
            )
        })
        .collect()
}

fn is_type_name(candidate: &str) -> bool {
    matches!(
        candidate.trim().to_ascii_lowercase().as_str(),
        "string" | "long" | "double" | "datetime"
    )
}

fn parse_flag(candidate: &str) -> Option<bool> {
    match candidate.trim().to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

fn invalid(key: &str, raw: &str, error: impl std::fmt::Display) -> ValidationError {
    ValidationError::InvalidParameter {
        key: key.to_string(),
        reason: format!("cannot parse '{raw}': {error}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::HashMap;

    #[test]
    fn test_plain_values_are_identifying_strings() {
        let params = parameters_from_args(["name=alice", "test=hello world"]).unwrap();
        assert_eq!(params.get_string("name"), Some("alice"));
        assert_eq!(params.get_string("test"), Some("hello world"));
        assert!(params.get("name").unwrap().identifying);
    }

    #[test]
    fn test_typed_values() {
        let params = parameters_from_args([
            "count=10,long",
            "ratio=0.5,double,false",
            "at=2024-01-02T03:04:05,datetime",
        ])
        .unwrap();

        assert_eq!(params.get_long("count"), Some(10));
        assert_eq!(params.get_double("ratio"), Some(0.5));
        assert!(!params.get("ratio").unwrap().identifying);
        assert_eq!(
            params.get_date_time("at"),
            NaiveDate::from_ymd_opt(2024, 1, 2).and_then(|d| d.and_hms_opt(3, 4, 5))
        );
    }

    #[test]
    fn test_commas_in_untyped_values_are_kept() {
        let params = parameters_from_args(["list=a,b,c", "kind=long"]).unwrap();
        assert_eq!(params.get_string("list"), Some("a,b,c"));
        assert_eq!(params.get_string("kind"), Some("long"));
    }

    #[test]
    fn test_bad_input_is_rejected() {
        assert!(parameters_from_args(["novalue"]).is_err());
        assert!(parameters_from_args(["=x"]).is_err());
        assert!(matches!(
            parameters_from_args(["count=ten,long"]),
            Err(ValidationError::InvalidParameter { ref key, .. }) if key == "count"
        ));
    }

    #[test]
    fn test_pairs_and_rendering() {
        let map = HashMap::from([("count".to_string(), "3,long".to_string())]);
        let params = parameters_from_pairs(&map).unwrap();
        assert_eq!(params.get_long("count"), Some(3));
        assert_eq!(parameters_to_args(&params), vec!["count=3,long,true".to_string()]);
    }
}
