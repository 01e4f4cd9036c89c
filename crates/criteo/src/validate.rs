//! Pre-mapping validation gate.
//!
//! An ordered list of predicate/message pairs, checked before any
//! mapping happens. The first failing check rejects the event with an
//! invalid-event error and nothing is dispatched. The legacy revision
//! that silently filled an empty device block is intentionally not
//! supported.

use connector_core::{ConnectorError, ConnectorResult, NormalizedEvent};

type Check = (fn(&NormalizedEvent) -> bool, &'static str);

const CHECKS: [Check; 3] = [
    (has_advertising_id, "all calls must carry context.device.advertisingId"),
    (has_app_namespace, "all calls must carry context.app.namespace"),
    (has_routable_locale, "context.locale must be a language-REGION pair"),
];

/// Run every check in order; the first failure wins.
pub fn validate(event: &NormalizedEvent) -> ConnectorResult<()> {
    for (check, message) in CHECKS {
        if !check(event) {
            return Err(ConnectorError::InvalidEvent(message.to_string()));
        }
    }
    Ok(())
}

fn has_advertising_id(event: &NormalizedEvent) -> bool {
    // Strict: the legacy `device.id` fallback does not satisfy the gate.
    event.strict_advertising_id().is_some()
}

fn has_app_namespace(event: &NormalizedEvent) -> bool {
    event.app_namespace().is_some()
}

fn has_routable_locale(event: &NormalizedEvent) -> bool {
    event.locale().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_event() -> NormalizedEvent {
        serde_json::from_value(json!({
            "type": "track",
            "event": "Character Upgraded",
            "userId": "user-42",
            "context": {
                "app": {"namespace": "com.acme.app"},
                "device": {"id": "legacy-id", "advertisingId": "ad-id-1"},
                "locale": "en-US"
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_valid_event_passes() {
        assert!(validate(&valid_event()).is_ok());
    }

    #[test]
    fn test_missing_advertising_id_is_invalid() {
        let mut event = valid_event();
        event.context.device.as_mut().unwrap().advertising_id = None;
        let err = validate(&event).unwrap_err();
        assert!(matches!(err, ConnectorError::InvalidEvent(_)));
        assert!(err.to_string().contains("advertisingId"));
    }

    #[test]
    fn test_legacy_device_id_does_not_satisfy_the_gate() {
        let mut event = valid_event();
        event.context.device = serde_json::from_value(json!({"id": "legacy-id"})).unwrap();
        assert!(validate(&event).is_err());
    }

    #[test]
    fn test_missing_namespace_is_invalid() {
        let mut event = valid_event();
        event.context.app = None;
        let err = validate(&event).unwrap_err();
        assert!(err.to_string().contains("namespace"));
    }

    #[test]
    fn test_locale_without_region_is_invalid() {
        let mut event = valid_event();
        event.context.locale = Some("en".to_string());
        let err = validate(&event).unwrap_err();
        assert!(err.to_string().contains("language-REGION"));
    }
}
