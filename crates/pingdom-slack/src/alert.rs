//! Pingdom alert payloads.
//!
//! Pingdom sends a loosely typed JSON body. Every field is looked up on its
//! own so that a missing or mistyped field only loses that field.

use serde_json::Value;
use std::fmt;
use tracing::{debug, error, warn};

/// State of a check as reported by Pingdom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckState {
    Up,
    Down,
    /// Any other state Pingdom reports
    Other(String),
    /// State missing from the payload
    Unknown,
}

impl CheckState {
    /// Parse a wire value, case-insensitively for the known states.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => Self::Unknown,
            Some(s) if s.eq_ignore_ascii_case("UP") => Self::Up,
            Some(s) if s.eq_ignore_ascii_case("DOWN") => Self::Down,
            Some(s) => Self::Other(s.to_string()),
        }
    }

    pub fn is_down(&self) -> bool {
        matches!(self, Self::Down)
    }
}

impl fmt::Display for CheckState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Up => f.write_str("UP"),
            Self::Down => f.write_str("DOWN"),
            Self::Other(s) => f.write_str(s),
            Self::Unknown => f.write_str("UNKNOWN"),
        }
    }
}

/// Parameters of the check that fired.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckParams {
    pub full_url: Option<String>,
    pub hostname: Option<String>,
    pub responsetime_threshold: Option<i64>,
    pub verify_certificate: Option<bool>,
    pub basic_auth: Option<bool>,
    pub shouldcontain: Option<String>,
    pub shouldnotcontain: Option<String>,
}

/// A Pingdom state-change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertEvent {
    pub check_id: Option<i64>,
    pub check_name: Option<String>,
    pub check_type: Option<String>,
    pub current_state: CheckState,
    pub state_changed_timestamp: Option<i64>,
    pub state_changed_utc_time: Option<String>,
    pub long_description: Option<String>,
    pub importance_level: Option<String>,
    pub tags: Vec<String>,
    pub custom_message: Option<String>,
    pub check_params: CheckParams,
    pub first_probe: Option<String>,
    pub second_probe: Option<String>,
}

impl AlertEvent {
    /// Extract an alert from a raw request body.
    ///
    /// A body that is not JSON still yields an event, with every field absent.
    pub fn from_slice(body: &[u8]) -> Self {
        match serde_json::from_slice::<Value>(body) {
            Ok(value) => Self::from_value(&value),
            Err(e) => {
                error!(error = %e, "Impossible to extract data from this Pingdom call");
                Self::from_value(&Value::Null)
            }
        }
    }

    /// Extract an alert from an already parsed JSON value.
    pub fn from_value(data: &Value) -> Self {
        let tags = match lookup(data, &["tags"]) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|tag| match tag {
                    Value::String(s) => Some(s.clone()),
                    other => {
                        warn!(tag = %other, "Skipping non-text tag");
                        None
                    }
                })
                .collect(),
            Some(other) => {
                warn!(field = "tags", value = %other, "Unexpected type for field");
                Vec::new()
            }
            None => Vec::new(),
        };

        Self {
            check_id: int_field(data, &["check_id"]),
            check_name: str_field(data, &["check_name"]),
            check_type: str_field(data, &["check_type"]),
            current_state: CheckState::parse(str_field(data, &["current_state"]).as_deref()),
            state_changed_timestamp: int_field(data, &["state_changed_timestamp"]),
            state_changed_utc_time: str_field(data, &["state_changed_utc_time"]),
            long_description: str_field(data, &["long_description"]),
            importance_level: str_field(data, &["importance_level"]),
            tags,
            custom_message: str_field(data, &["custom_message"]),
            check_params: CheckParams {
                full_url: str_field(data, &["check_params", "full_url"]),
                hostname: str_field(data, &["check_params", "hostname"]),
                responsetime_threshold: int_field(data, &["check_params", "responsetime_threshold"]),
                verify_certificate: bool_field(data, &["check_params", "verify_certificate"]),
                basic_auth: bool_field(data, &["check_params", "basic_auth"]),
                shouldcontain: str_field(data, &["check_params", "shouldcontain"]),
                shouldnotcontain: str_field(data, &["check_params", "shouldnotcontain"]),
            },
            first_probe: str_field(data, &["first_probe", "location"]),
            second_probe: str_field(data, &["second_probe", "location"]),
        }
    }

    /// The monitored target: the full URL when known, otherwise the hostname.
    pub fn target(&self) -> Option<&str> {
        self.check_params
            .full_url
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.check_params.hostname.as_deref().filter(|s| !s.is_empty()))
    }
}

/// Walk `path` through nested objects.
fn lookup<'a>(data: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = data;
    for key in path {
        current = current.as_object()?.get(*key)?;
    }
    if current.is_null() {
        None
    } else {
        Some(current)
    }
}

/// Resolve a field, logging when it is missing or has the wrong type.
fn field<T>(data: &Value, path: &[&str], convert: impl Fn(&Value) -> Option<T>) -> Option<T> {
    let name = path.join(".");
    let Some(value) = lookup(data, path) else {
        debug!(field = %name, "Field missing from Pingdom payload");
        return None;
    };

    let converted = convert(value);
    if converted.is_none() {
        warn!(field = %name, value = %value, "Unexpected type for field");
    }
    converted
}

fn str_field(data: &Value, path: &[&str]) -> Option<String> {
    field(data, path, |v| v.as_str().map(str::to_string))
}

fn int_field(data: &Value, path: &[&str]) -> Option<i64> {
    field(data, path, |v| match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn bool_field(data: &Value, path: &[&str]) -> Option<bool> {
    field(data, path, Value::as_bool)
}
