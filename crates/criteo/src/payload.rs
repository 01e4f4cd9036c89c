//! Target payload types for the Criteo S2S event endpoint.
//!
//! The wire schema is JSON with a handful of quirks the serializers
//! here reproduce exactly: the device-id block is keyed by platform,
//! `alternate_ids` is omitted entirely when empty, and `events` is a
//! bare object when it holds a single sub-event but an ordered array
//! as soon as any optional sub-event joins it — the receiving endpoint
//! distinguishes the two shapes.

use serde::Serialize;
use serde_json::{Map, Value};

/// Fixed schema revision tag carried by every payload.
pub const SCHEMA_VERSION: &str = "s2s_v1.0.0";

/// Advertiser account block: namespace, country code, language code.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Account {
    pub an: String,
    pub cn: String,
    pub ln: String,
}

/// Platform tag for the originating app.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum SiteType {
    #[serde(rename = "aa")]
    AndroidApp,
    #[serde(rename = "aios")]
    AppleApp,
}

/// Device-identifier block, keyed by platform. Serializes as
/// `{"gaid": "..."}` or `{"idfa": "..."}`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DeviceId {
    Gaid(String),
    Idfa(String),
}

/// Hashed-identity entry for identity stitching.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AlternateId {
    #[serde(rename = "type")]
    pub id_type: &'static str,
    pub value: String,
    pub hash_method: &'static str,
}

/// The `events` field: a single sub-event collapses to a bare object,
/// anything more stays an ordered sequence.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum Events {
    Single(Value),
    Sequence(Vec<Value>),
}

impl Events {
    /// Collapse a non-empty sub-event sequence into the wire shape.
    pub fn from_sequence(mut sub_events: Vec<Value>) -> Self {
        if sub_events.len() == 1 {
            Events::Single(sub_events.remove(0))
        } else {
            Events::Sequence(sub_events)
        }
    }
}

/// Complete outbound payload. Constructed fresh per call; never
/// mutated after being handed to the transport layer.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TargetPayload {
    pub account: Account,
    pub site_type: SiteType,
    pub id: DeviceId,
    pub version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternate_ids: Option<Vec<AlternateId>>,
    pub events: Events,
}

/// Drop null entries from a JSON object map, so absent values never
/// reach the wire as null placeholders.
pub fn strip_nulls(map: &mut Map<String, Value>) {
    map.retain(|_, value| !value.is_null());
}
