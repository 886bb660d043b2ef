use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// A named grouping of short links on the remote service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderRef {
    pub id: String,
    pub name: String,
}

/// A sending domain that short links can be issued under.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainRef {
    pub id: String,
    pub url: String,
}

impl DomainRef {
    /// Host part of the domain url, used as a dropdown label.
    pub fn label(&self) -> &str {
        let url = self.url.as_str();
        url.strip_prefix("https://").or_else(|| url.strip_prefix("http://")).unwrap_or(url)
    }
}

/// User-provided fields for one shortening request.
///
/// `long_url` must already be a normalized absolute http/https url.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ShortenRequest {
    pub long_url: String,
    pub masked: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub password: Option<String>,
    pub default_redirect_url: Option<String>,
}

impl ShortenRequest {
    pub fn new(long_url: impl Into<String>) -> Self {
        Self { long_url: long_url.into(), ..Self::default() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ShortenResult {
    pub short_url: String,
    pub request_id: String,
}

/// Formats an expiry the way the remote API expects it (`2026-01-31T23:59:59.000Z`).
pub fn format_expiry(expires_at: &DateTime<Utc>) -> String {
    expires_at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Turns a picked calendar day (`YYYY-MM-DD`, optionally followed by a time part) into the
/// last second of that day in UTC.
pub fn expiry_end_of_day(raw: &str) -> Option<DateTime<Utc>> {
    let date_part = raw.split('T').next().unwrap_or(raw).trim();
    let date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()?;
    let end_of_day = NaiveTime::from_hms_opt(23, 59, 59)?;
    Some(date.and_time(end_of_day).and_utc())
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WireShapeError {
    #[error("field `{0}` is missing")]
    MissingField(&'static str),
    #[error("field `{0}` has an unsupported type")]
    InvalidField(&'static str),
}

/// Folder item exactly as the remote service returns it; every field may be absent.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawFolder {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub name: Option<Value>,
}

/// Domain item exactly as the remote service returns it; every field may be absent.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawDomain {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub url: Option<Value>,
}

impl TryFrom<RawFolder> for FolderRef {
    type Error = WireShapeError;

    fn try_from(raw: RawFolder) -> Result<Self, Self::Error> {
        Ok(Self {
            id: required_wire_string(raw.id.as_ref(), "id")?,
            name: required_wire_string(raw.name.as_ref(), "name")?,
        })
    }
}

impl TryFrom<RawDomain> for DomainRef {
    type Error = WireShapeError;

    fn try_from(raw: RawDomain) -> Result<Self, Self::Error> {
        Ok(Self {
            id: required_wire_string(raw.id.as_ref(), "id")?,
            url: required_wire_string(raw.url.as_ref(), "url")?,
        })
    }
}

/// Coerces a loosely-typed wire value into a non-empty string.
///
/// Strings pass through, numbers and booleans are stringified, `null` and empty strings count
/// as missing, and arrays or objects are rejected.
pub fn required_wire_string(
    value: Option<&Value>,
    field: &'static str,
) -> Result<String, WireShapeError> {
    let coerced = match value {
        None | Some(Value::Null) => return Err(WireShapeError::MissingField(field)),
        Some(Value::String(text)) => text.clone(),
        Some(Value::Number(number)) => number.to_string(),
        Some(Value::Bool(flag)) => flag.to_string(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => {
            return Err(WireShapeError::InvalidField(field))
        }
    };

    if coerced.is_empty() {
        return Err(WireShapeError::MissingField(field));
    }
    Ok(coerced)
}
