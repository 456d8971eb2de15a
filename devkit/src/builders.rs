/*!
Builders de messages conformes aux contrats Vigie

Produisent des payloads JSON bruts (serde_json::Value) pour alimenter les
consommateurs en test sans dépendre de leurs types internes.
*/

use serde_json::{json, Value};

pub struct VigieMessageBuilder;

impl VigieMessageBuilder {
    /// Crée une enveloppe dashboard.update@v1
    pub fn dashboard_update(payload: Value) -> Value {
        json!({
            "event": "dashboardUpdate",
            "payload": payload,
        })
    }

    /// Crée une enveloppe avec un tag d'événement arbitraire (tests de
    /// compatibilité ascendante)
    pub fn dashboard_event<S: Into<String>>(event: S, payload: Value) -> Value {
        json!({
            "event": event.into(),
            "payload": payload,
        })
    }

    /// Crée une annonce de ticker { type, message, timestamp }
    pub fn announcement<S: Into<String>>(kind: S, message: S) -> Value {
        json!({
            "type": kind.into(),
            "message": message.into(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        })
    }

    /// Crée un payload push complet
    pub fn push_payload<S: Into<String>>(title: S, body: S, url: S) -> Value {
        json!({
            "title": title.into(),
            "body": body.into(),
            "data": { "url": url.into() },
        })
    }

    /// Payload push minimal: tous les champs absents, le gateway doit
    /// appliquer ses fallbacks
    pub fn push_payload_empty() -> Value {
        json!({})
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dashboard_update_shape() {
        let envelope = VigieMessageBuilder::dashboard_update(json!({"views": 12}));
        assert_eq!(envelope["event"], "dashboardUpdate");
        assert_eq!(envelope["payload"]["views"], 12);
    }

    #[test]
    fn test_announcement_shape() {
        let announcement = VigieMessageBuilder::announcement("review", "New review");
        assert_eq!(announcement["type"], "review");
        assert_eq!(announcement["message"], "New review");
        assert!(announcement["timestamp"].is_string());
    }

    #[test]
    fn test_push_payload_shapes() {
        let push = VigieMessageBuilder::push_payload("Hi", "Body", "/tasks");
        assert_eq!(push["data"]["url"], "/tasks");

        let empty = VigieMessageBuilder::push_payload_empty();
        assert!(empty.get("title").is_none());
    }
}
