//! Wire contracts and shared data model for the delivery pipeline
//!
//! Everything the three consumers expose to the presentation layer lives
//! here: credentials, connection lifecycle, the dashboard snapshot and the
//! ticker/push payload shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Credentials handed over by the authentication layer when the client mounts.
/// Owned by that layer; invalidation (logout) must close the session.
#[derive(Debug, Clone)]
pub struct SessionCredentials {
    pub token: String,
    pub business_id: String,
}

impl SessionCredentials {
    /// Both fields are required to open any authenticated transport.
    pub fn is_complete(&self) -> bool {
        !self.token.is_empty() && !self.business_id.is_empty()
    }
}

/// Per-transport connection lifecycle. `Errored` is transient: it is always
/// followed by a transport-driven retry or an explicit teardown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Errored(String),
}

/// Full dashboard state as sent by the server. Opaque at this layer: each
/// arrival replaces the previous snapshot wholesale, no merge, no shape
/// validation. Defensive rendering is the presentation layer's concern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DashboardSnapshot(pub serde_json::Value);

/// Category of a ticker announcement. Unknown tags decode as `Unrecognized`
/// so a newer server never breaks an older client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum AnnouncementKind {
    Appointment,
    Message,
    Review,
    Stats,
    Unrecognized,
}

impl From<String> for AnnouncementKind {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "appointment" => Self::Appointment,
            "message" => Self::Message,
            "review" => Self::Review,
            "stats" => Self::Stats,
            _ => Self::Unrecognized,
        }
    }
}

/// One "what changed" ticker entry from the announcement stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateAnnouncement {
    #[serde(rename = "type")]
    pub kind: AnnouncementKind,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Inbound push delivery. Every field is optional; the gateway fills the
/// gaps with generic fallbacks before display.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PushPayload {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub data: Option<PushData>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PushData {
    #[serde(default)]
    pub url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn announcement_decodes_known_kind() {
        let raw = r#"{"type":"appointment","message":"New appointment booked","timestamp":"2025-06-01T10:00:00Z"}"#;
        let ann: UpdateAnnouncement = serde_json::from_str(raw).unwrap();
        assert_eq!(ann.kind, AnnouncementKind::Appointment);
        assert_eq!(ann.message, "New appointment booked");
    }

    #[test]
    fn announcement_unknown_kind_is_unrecognized() {
        let raw = r#"{"type":"gift_card","message":"?","timestamp":"2025-06-01T10:00:00Z"}"#;
        let ann: UpdateAnnouncement = serde_json::from_str(raw).unwrap();
        assert_eq!(ann.kind, AnnouncementKind::Unrecognized);
    }

    #[test]
    fn push_payload_all_fields_optional() {
        let payload: PushPayload = serde_json::from_str("{}").unwrap();
        assert!(payload.title.is_none());
        assert!(payload.data.is_none());

        let payload: PushPayload =
            serde_json::from_str(r#"{"title":"Hi","data":{"url":"/messages"}}"#).unwrap();
        assert_eq!(payload.title.as_deref(), Some("Hi"));
        assert_eq!(payload.data.unwrap().url.as_deref(), Some("/messages"));
    }

    #[test]
    fn credentials_completeness() {
        let ok = SessionCredentials {
            token: "tok".into(),
            business_id: "biz-1".into(),
        };
        assert!(ok.is_complete());

        let missing = SessionCredentials {
            token: String::new(),
            business_id: "biz-1".into(),
        };
        assert!(!missing.is_complete());
    }
}
