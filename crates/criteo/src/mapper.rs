//! Event-to-payload mapping engine.
//!
//! One pure function per supported track-family event, each producing
//! a [`TargetPayload`] from a [`NormalizedEvent`]. Mappers share the
//! top-level-properties builder, the alternate-identity builder, and
//! the events-field assembler; all of them are free of side effects,
//! so mapping the same event twice yields identical payloads.

use md5::{Digest, Md5};
use serde_json::{Map, Value};

use connector_core::{ConnectorError, ConnectorResult, NormalizedEvent};

use crate::dates::date_range_event;
use crate::payload::{
    strip_nulls, Account, AlternateId, DeviceId, Events, SiteType, TargetPayload, SCHEMA_VERSION,
};

/// Select the mapper for a track event by its name. Unrecognized names
/// fall through to the generic track mapping.
pub fn map_track(event: &NormalizedEvent) -> ConnectorResult<TargetPayload> {
    match event.name().map(str::to_ascii_lowercase).as_deref() {
        Some("application opened") => application_opened(event),
        Some("product list viewed") => product_list_viewed(event),
        Some("product viewed") => product_viewed(event),
        Some("cart viewed") => cart_viewed(event),
        Some("order completed") => order_completed(event),
        _ => track(event),
    }
}

/// Generic track: `vs` sub-event carrying the user id and every custom
/// event property.
pub fn track(event: &NormalizedEvent) -> ConnectorResult<TargetPayload> {
    let mut sub = sub_event("vs", event.user_id());
    for (key, value) in &event.properties {
        if !value.is_null() {
            sub.insert(key.clone(), value.clone());
        }
    }
    assemble(event, sub)
}

/// Application Opened → `viewHome`.
pub fn application_opened(event: &NormalizedEvent) -> ConnectorResult<TargetPayload> {
    let sub = sub_event("viewHome", event.user_id());
    assemble(event, sub)
}

/// Product List Viewed → `viewListing` with the ordered list of
/// product ids.
pub fn product_list_viewed(event: &NormalizedEvent) -> ConnectorResult<TargetPayload> {
    let ids: Vec<Value> = event
        .products()
        .iter()
        .filter_map(|product| product.identifier().cloned())
        .collect();

    let mut sub = sub_event("viewListing", event.user_id());
    sub.insert("product".to_string(), Value::Array(ids));
    assemble(event, sub)
}

/// Product Viewed → `viewProduct` with a single product id, taken from
/// `properties.productId` or the event's own `properties.id`.
pub fn product_viewed(event: &NormalizedEvent) -> ConnectorResult<TargetPayload> {
    let product_id = event
        .property("productId")
        .or_else(|| event.property("id"))
        .cloned();

    let mut sub = sub_event("viewProduct", event.user_id());
    if let Some(id) = product_id {
        sub.insert("product".to_string(), id);
    }
    assemble(event, sub)
}

/// Cart Viewed → `viewBasket` with `{id, price, quantity}` per product,
/// sourcing the id from each product's `productId` key.
pub fn cart_viewed(event: &NormalizedEvent) -> ConnectorResult<TargetPayload> {
    let products: Vec<Value> = event
        .products()
        .iter()
        .map(|product| product_entry(product.product_id.clone(), product.price, product.quantity))
        .collect();

    let mut sub = sub_event("viewBasket", event.user_id());
    sub.insert("currency".to_string(), Value::String(event.currency()));
    sub.insert("product".to_string(), Value::Array(products));
    assemble(event, sub)
}

/// Order Completed → `trackTransaction`. Same per-product shape as
/// Cart Viewed, but the id is sourced from each product's `id` key —
/// a documented quirk of the target schema, kept as a distinct path.
pub fn order_completed(event: &NormalizedEvent) -> ConnectorResult<TargetPayload> {
    let products: Vec<Value> = event
        .products()
        .iter()
        .map(|product| product_entry(product.id.clone(), product.price, product.quantity))
        .collect();

    let mut sub = sub_event("trackTransaction", event.user_id());
    sub.insert("currency".to_string(), Value::String(event.currency()));
    sub.insert("product".to_string(), Value::Array(products));
    assemble(event, sub)
}

/// Shared `{account, site_type, id, version}` block.
fn top_level(event: &NormalizedEvent) -> ConnectorResult<(Account, SiteType, DeviceId)> {
    let locale = event
        .locale()
        .ok_or_else(|| ConnectorError::Mapping("event carries no language-REGION locale".into()))?;

    let mut namespace = event
        .app_namespace()
        .ok_or_else(|| ConnectorError::Mapping("event carries no app namespace".into()))?
        .to_string();
    if let Some(postfix) = event.name_postfix() {
        namespace = format!("{namespace}.{postfix}");
    }

    let device_id = event
        .advertising_id()
        .ok_or_else(|| ConnectorError::Mapping("event carries no device identifier".into()))?
        .to_string();

    let (site_type, id) = if event.os_name() == Some("Android") {
        (SiteType::AndroidApp, DeviceId::Gaid(device_id))
    } else {
        (SiteType::AppleApp, DeviceId::Idfa(device_id))
    };

    let account = Account {
        an: namespace,
        cn: locale.country,
        ln: locale.language,
    };

    Ok((account, site_type, id))
}

/// Hashed-email identity block: exactly one md5 entry when an email is
/// present, no key at all otherwise.
fn alternate_ids(event: &NormalizedEvent) -> Option<Vec<AlternateId>> {
    event.email().map(|email| {
        vec![AlternateId {
            id_type: "email",
            value: hex::encode(Md5::digest(email.as_bytes())),
            hash_method: "md5",
        }]
    })
}

/// Base sub-event object: `{event: <name>, ci: <userId>}`, with `ci`
/// simply absent for anonymous events.
fn sub_event(name: &str, user_id: Option<&str>) -> Map<String, Value> {
    let mut sub = Map::new();
    sub.insert("event".to_string(), Value::String(name.to_string()));
    if let Some(ci) = user_id {
        sub.insert("ci".to_string(), Value::String(ci.to_string()));
    }
    sub
}

/// Per-product `{id, price, quantity}` entry with absent fields
/// stripped.
fn product_entry(id: Option<Value>, price: Option<f64>, quantity: Option<i64>) -> Value {
    let mut entry = Map::new();
    if let Some(id) = id {
        entry.insert("id".to_string(), id);
    }
    if let Some(price) = price {
        entry.insert("price".to_string(), price.into());
    }
    if let Some(quantity) = quantity {
        entry.insert("quantity".to_string(), quantity.into());
    }
    strip_nulls(&mut entry);
    Value::Object(entry)
}

/// Combine the primary sub-event with the shared blocks and any
/// date-range sub-event into the final payload.
fn assemble(event: &NormalizedEvent, mut primary: Map<String, Value>) -> ConnectorResult<TargetPayload> {
    let (account, site_type, id) = top_level(event)?;

    strip_nulls(&mut primary);
    let mut sequence = vec![Value::Object(primary)];
    if let Some(date_event) = date_range_event(&event.properties) {
        sequence.push(date_event);
    }

    Ok(TargetPayload {
        account,
        site_type,
        id,
        version: SCHEMA_VERSION,
        alternate_ids: alternate_ids(event),
        events: Events::from_sequence(sequence),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base_event(name: &str, properties: Value) -> NormalizedEvent {
        serde_json::from_value(json!({
            "type": "track",
            "event": name,
            "userId": "user-42",
            "properties": properties,
            "context": {
                "app": {"namespace": "com.acme.travel"},
                "os": {"name": "iOS"},
                "device": {"advertisingId": "ad-id-1"},
                "locale": "en-US"
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_ios_top_level_block() {
        let payload = track(&base_event("Character Upgraded", json!({}))).unwrap();
        assert_eq!(payload.site_type, SiteType::AppleApp);
        assert_eq!(payload.id, DeviceId::Idfa("ad-id-1".into()));
        assert_eq!(payload.account.an, "com.acme.travel");
        assert_eq!(payload.account.cn, "us");
        assert_eq!(payload.account.ln, "en");
        assert_eq!(payload.version, "s2s_v1.0.0");
    }

    #[test]
    fn test_android_top_level_block() {
        let mut event = base_event("Character Upgraded", json!({}));
        event.context.os.as_mut().unwrap().name = Some("Android".to_string());
        let payload = track(&event).unwrap();
        assert_eq!(payload.site_type, SiteType::AndroidApp);
        assert_eq!(payload.id, DeviceId::Gaid("ad-id-1".into()));
    }

    #[test]
    fn test_name_postfix_suffixes_namespace() {
        let mut event = base_event("Character Upgraded", json!({}));
        event.context.criteo = serde_json::from_value(json!({"namePostfix": "sandbox"})).unwrap();
        let payload = track(&event).unwrap();
        assert_eq!(payload.account.an, "com.acme.travel.sandbox");
    }

    #[test]
    fn test_generic_track_merges_custom_properties() {
        let event = base_event("Character Upgraded", json!({"level": 7, "skip": null}));
        let payload = track(&event).unwrap();
        assert_eq!(
            serde_json::to_value(&payload.events).unwrap(),
            json!({"event": "vs", "ci": "user-42", "level": 7})
        );
    }

    #[test]
    fn test_track_with_hotel_dates_appends_date_sub_event() {
        let event = base_event(
            "Hotel Searched",
            json!({"checkin_date": "2024-06-01", "checkout_date": "2024-06-05"}),
        );
        let payload = track(&event).unwrap();
        let events = serde_json::to_value(&payload.events).unwrap();
        let sequence = events.as_array().expect("sequence when a date sub-event applies");
        assert_eq!(sequence.len(), 2);
        assert_eq!(sequence[0]["event"], "vs");
        assert_eq!(
            sequence[1],
            json!({"event": "vs", "din": "2024-06-01", "dout": "2024-06-05"})
        );
    }

    #[test]
    fn test_application_opened() {
        let payload = map_track(&base_event("Application Opened", json!({}))).unwrap();
        assert_eq!(
            serde_json::to_value(&payload.events).unwrap(),
            json!({"event": "viewHome", "ci": "user-42"})
        );
    }

    #[test]
    fn test_product_list_viewed_keeps_order() {
        let event = base_event(
            "Product List Viewed",
            json!({"products": [{"productId": "p2"}, {"id": "p1"}, {"productId": "p9"}]}),
        );
        let payload = map_track(&event).unwrap();
        let events = serde_json::to_value(&payload.events).unwrap();
        assert_eq!(events["event"], "viewListing");
        assert_eq!(events["product"], json!(["p2", "p1", "p9"]));
    }

    #[test]
    fn test_product_viewed_prefers_product_id_property() {
        let event = base_event("Product Viewed", json!({"productId": "p7", "id": "other"}));
        let payload = map_track(&event).unwrap();
        let events = serde_json::to_value(&payload.events).unwrap();
        assert_eq!(events["product"], "p7");

        let fallback = base_event("Product Viewed", json!({"id": "own-id"}));
        let payload = map_track(&fallback).unwrap();
        let events = serde_json::to_value(&payload.events).unwrap();
        assert_eq!(events["product"], "own-id");
    }

    #[test]
    fn test_cart_viewed_sources_id_from_product_id_key() {
        let event = base_event(
            "Cart Viewed",
            json!({
                "currency": "EUR",
                "products": [{"productId": "p1", "price": 9.99, "quantity": 2}]
            }),
        );
        let payload = map_track(&event).unwrap();
        let events = serde_json::to_value(&payload.events).unwrap();
        assert_eq!(events["event"], "viewBasket");
        assert_eq!(events["currency"], "EUR");
        assert_eq!(events["product"], json!([{"id": "p1", "price": 9.99, "quantity": 2}]));
    }

    #[test]
    fn test_order_completed_sources_id_from_id_key() {
        let event = base_event(
            "Order Completed",
            json!({
                "products": [
                    {"id": "sku-1", "productId": "ignored", "price": 4.5, "quantity": 1},
                    {"productId": "no-plain-id", "price": 2.0}
                ]
            }),
        );
        let payload = map_track(&event).unwrap();
        let events = serde_json::to_value(&payload.events).unwrap();
        assert_eq!(events["event"], "trackTransaction");
        assert_eq!(events["currency"], "USD");
        assert_eq!(
            events["product"],
            json!([{"id": "sku-1", "price": 4.5, "quantity": 1}, {"price": 2.0}])
        );
    }

    #[test]
    fn test_email_produces_single_md5_alternate_id() {
        let mut event = base_event("Application Opened", json!({}));
        event.context.traits =
            Some(json!({"email": "jane@example.com"}).as_object().unwrap().clone());
        let payload = map_track(&event).unwrap();

        let ids = payload.alternate_ids.expect("alternate_ids present");
        assert_eq!(ids.len(), 1);
        assert_eq!(ids[0].id_type, "email");
        assert_eq!(ids[0].hash_method, "md5");
        assert_eq!(ids[0].value, "9e26471d35a78862c17e467d87cddedf");

        // Canonical schema: the hashed email never shows up as a
        // setHashedEmail sub-event.
        let events = serde_json::to_value(&payload.events).unwrap();
        assert!(events.is_object());
        assert_eq!(events["event"], "viewHome");
    }

    #[test]
    fn test_no_email_omits_alternate_ids() {
        let payload = map_track(&base_event("Application Opened", json!({}))).unwrap();
        assert!(payload.alternate_ids.is_none());
        let wire = serde_json::to_value(&payload).unwrap();
        assert!(wire.get("alternate_ids").is_none());
    }

    #[test]
    fn test_unknown_event_name_uses_generic_track() {
        let payload = map_track(&base_event("Made Up Event", json!({"x": 1}))).unwrap();
        let events = serde_json::to_value(&payload.events).unwrap();
        assert_eq!(events["event"], "vs");
        assert_eq!(events["x"], 1);
    }

    #[test]
    fn test_mapping_is_idempotent() {
        let event = base_event(
            "Cart Viewed",
            json!({
                "currency": "EUR",
                "email": "buyer@example.com",
                "checkin_date": "2024-06-01",
                "checkout_date": "2024-06-05",
                "products": [{"productId": "p1", "price": 9.99, "quantity": 2}]
            }),
        );
        let first = serde_json::to_string(&map_track(&event).unwrap()).unwrap();
        let second = serde_json::to_string(&map_track(&event).unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_locale_is_a_mapping_error() {
        let mut event = base_event("Application Opened", json!({}));
        event.context.locale = None;
        assert!(matches!(
            map_track(&event),
            Err(ConnectorError::Mapping(_))
        ));
    }
}
