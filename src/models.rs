use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Wire format for all ticket datetimes.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Canonical ticket resource as the remote service returns it. The service
/// owns these records; the client only holds transient read-only copies.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Ticket {
    pub id: String,
    #[serde(default)]
    pub event_name: String,
    #[serde(default)]
    pub event_location: String,
    #[serde(default, with = "date_format", skip_serializing_if = "Option::is_none")]
    pub event_date: Option<NaiveDateTime>,
    #[serde(default)]
    pub holder_name: String,
    #[serde(default)]
    pub holder_email: String,
    #[serde(default, with = "date_format", skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terms_and_conditions: Option<String>,
}

/// Caller-supplied fields for creating or replacing a ticket. The server
/// assigns the identifier.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TicketDraft {
    pub event_name: String,
    #[serde(default)]
    pub event_location: String,
    #[serde(default, with = "date_format", skip_serializing_if = "Option::is_none")]
    pub event_date: Option<NaiveDateTime>,
    pub holder_name: String,
    #[serde(default)]
    pub holder_email: String,
    #[serde(default, with = "date_format", skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terms_and_conditions: Option<String>,
}

/// Acknowledgement returned by the delete endpoint.
#[derive(Clone, Debug, Deserialize)]
pub struct Confirmation {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Validity result returned by the check endpoint.
#[derive(Clone, Debug, Deserialize)]
pub struct TicketCheck {
    pub id: String,
    pub valid: bool,
    #[serde(default)]
    pub status: Option<String>,
}

/// Error envelope the remote attaches to non-success statuses.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub suggestion: Option<String>,
}

impl ErrorBody {
    /// Collapses the envelope into one diagnostic line, falling back to the
    /// raw body so nothing the server said is lost.
    pub fn message_or(&self, raw: &str) -> String {
        match (&self.error, &self.message) {
            (Some(e), Some(m)) => format!("{} - {}", e, m),
            (Some(e), None) => e.clone(),
            (None, Some(m)) => m.clone(),
            (None, None) => raw.trim().to_string(),
        }
    }
}

mod date_format {
    use super::DATETIME_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(dt) => serializer.serialize_str(&dt.format(DATETIME_FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value: Option<String> = Option::deserialize(deserializer)?;
        match value {
            Some(s) => NaiveDateTime::parse_from_str(&s, DATETIME_FORMAT)
                .map(Some)
                .map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}
