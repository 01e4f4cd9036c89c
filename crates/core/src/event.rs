//! Normalized analytics event envelope — the canonical input consumed
//! by the mapping engine.
//!
//! Events arrive in the Segment-style camelCase wire form. The typed
//! accessors here replace forgiving proxy-path traversal with explicit
//! `Option` results, so callers always see an absent value as absent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Discriminator for the analytics event envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Track,
    Identify,
    Page,
    Screen,
    Group,
    Alias,
}

/// The canonical analytics event. Immutable once constructed; owned by
/// the dispatcher for the duration of one mapping call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedEvent {
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// Event name; only present for track events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    #[serde(default, rename = "userId", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub properties: Map<String, Value>,
    #[serde(default)]
    pub context: EventContext,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app: Option<AppContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<OsContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<DeviceContext>,
    /// `language-REGION` string, e.g. "en-US".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traits: Option<Map<String, Value>>,
    /// Vendor-specific extension block.
    #[serde(default, rename = "Criteo", skip_serializing_if = "Option::is_none")]
    pub criteo: Option<CriteoContext>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OsContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, rename = "advertisingId", skip_serializing_if = "Option::is_none")]
    pub advertising_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CriteoContext {
    /// Sandbox/staging namespace suffix appended to `app.namespace`.
    #[serde(default, rename = "namePostfix", skip_serializing_if = "Option::is_none")]
    pub name_postfix: Option<String>,
}

/// Parsed `language-REGION` pair, both segments lower-cased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locale {
    pub language: String,
    pub country: String,
}

/// A product record inside `properties.products`. Deserialized
/// leniently: ids may be strings or numbers, and every field is
/// optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Product {
    #[serde(default, rename = "productId", skip_serializing_if = "Option::is_none")]
    pub product_id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i64>,
}

impl Product {
    /// Preferred item identifier: `productId` first, `id` as fallback.
    pub fn identifier(&self) -> Option<&Value> {
        self.product_id.as_ref().or(self.id.as_ref())
    }
}

impl NormalizedEvent {
    /// Track event name, if any.
    pub fn name(&self) -> Option<&str> {
        self.event.as_deref()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn app_namespace(&self) -> Option<&str> {
        self.context.app.as_ref()?.namespace.as_deref()
    }

    pub fn os_name(&self) -> Option<&str> {
        self.context.os.as_ref()?.name.as_deref()
    }

    /// Device identifier used in the payload's id block. Prefers
    /// `advertisingId`; `device.id` is a legacy compatibility fallback
    /// only (validation still requires `advertisingId`).
    pub fn advertising_id(&self) -> Option<&str> {
        let device = self.context.device.as_ref()?;
        device.advertising_id.as_deref().or(device.id.as_deref())
    }

    /// Strict advertising id, without the legacy fallback.
    pub fn strict_advertising_id(&self) -> Option<&str> {
        self.context.device.as_ref()?.advertising_id.as_deref()
    }

    /// Parsed locale. `None` unless the context carries a full
    /// `language-REGION` pair. Only the second segment counts as the
    /// country; any further segments are ignored.
    pub fn locale(&self) -> Option<Locale> {
        let raw = self.context.locale.as_deref()?;
        let mut parts = raw.split('-');
        let language = parts.next().filter(|s| !s.is_empty())?;
        let country = parts.next().filter(|s| !s.is_empty())?;
        Some(Locale {
            language: language.to_ascii_lowercase(),
            country: country.to_ascii_lowercase(),
        })
    }

    /// Email address: `context.traits.email` first, then
    /// `properties.email`.
    pub fn email(&self) -> Option<&str> {
        self.context
            .traits
            .as_ref()
            .and_then(|t| t.get("email"))
            .and_then(Value::as_str)
            .or_else(|| self.properties.get("email").and_then(Value::as_str))
    }

    /// Transaction currency; the upstream facade defaults to USD.
    pub fn currency(&self) -> String {
        self.properties
            .get("currency")
            .and_then(Value::as_str)
            .unwrap_or("USD")
            .to_string()
    }

    /// Ordered product list from `properties.products`. Malformed
    /// entries are skipped rather than failing the whole event.
    pub fn products(&self) -> Vec<Product> {
        self.properties
            .get("products")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| serde_json::from_value(item.clone()).ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    pub fn name_postfix(&self) -> Option<&str> {
        self.context.criteo.as_ref()?.name_postfix.as_deref()
    }
}
