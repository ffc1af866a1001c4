use chrono::{DateTime, NaiveDate, SecondsFormat};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Start or end of an event, either a whole day or a point in time.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EventDateTime {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub date: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub date_time: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub time_zone: String,
}

/// Calendar event. Fields not modelled here are carried in `extra` so they
/// survive a round trip through the tools.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Event {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub status: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub html_link: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub summary: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<EventDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<EventDateTime>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub recurrence: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CalendarListEntry {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub summary: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub time_zone: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub access_role: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub primary: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ItemsResponse<T> {
    pub items: Vec<T>,
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("expected YYYY-MM-DD or an RFC3339 timestamp, got {value:?}: {source}")]
    DateTime {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("recurrence must be a JSON array of strings: {0}")]
    Recurrence(#[source] serde_json::Error),
}

/// `YYYY-MM-DD` becomes an all-day `date`, an RFC3339 timestamp becomes a
/// `dateTime` normalized to second precision.
pub fn parse_event_date_time(value: &str) -> Result<EventDateTime, ParseError> {
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(EventDateTime {
            date: date.format("%Y-%m-%d").to_string(),
            ..Default::default()
        });
    }

    let timestamp = DateTime::parse_from_rfc3339(value).map_err(|source| ParseError::DateTime {
        value: value.to_string(),
        source,
    })?;

    Ok(EventDateTime {
        date_time: timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
        ..Default::default()
    })
}

/// Recurrence rules from a tool argument.
///
/// Accepts a single `RRULE:` string, a string holding a JSON array, or an
/// array. Returns `None` when nothing usable was given.
pub fn parse_recurrence(value: Option<&Value>) -> Result<Option<Vec<String>>, ParseError> {
    match value {
        Some(Value::String(rule)) if rule.starts_with('[') => serde_json::from_str(rule)
            .map(Some)
            .map_err(ParseError::Recurrence),
        Some(Value::String(rule)) if !rule.is_empty() => Ok(Some(vec![rule.clone()])),
        Some(Value::Array(rules)) => Ok(Some(
            rules
                .iter()
                .filter_map(|rule| rule.as_str().map(str::to_string))
                .collect(),
        )),
        _ => Ok(None),
    }
}
