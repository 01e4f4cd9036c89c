//! Travel-date extraction for the date-range sub-event.
//!
//! Four verticals carry check-in/check-out style dates under different
//! property names. The first vertical whose marker key is present on
//! the event wins outright; there is no fallback merge across rules,
//! so a flights event with a single leg produces no date sub-event
//! even if `departure_date` would have matched on its own.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::{Map, Value};

/// Build the `{event: "vs", din, dout}` sub-event from travel dates in
/// the properties map, if both bounds resolve.
pub fn date_range_event(props: &Map<String, Value>) -> Option<Value> {
    let (date_in, date_out) = if props.contains_key("checkin_date") {
        // Hotel
        (props.get("checkin_date"), props.get("checkout_date"))
    } else if let Some(flights) = props.get("flights").and_then(Value::as_array) {
        // Flights: departure of the first two legs
        (
            flights.first().and_then(|leg| leg.get("departure_date")),
            flights.get(1).and_then(|leg| leg.get("departure_date")),
        )
    } else if props.contains_key("departure_date") {
        // Single departure: both bounds
        (props.get("departure_date"), props.get("departure_date"))
    } else if props.contains_key("pickup_date") {
        // Car rental
        (props.get("pickup_date"), props.get("dropoff_date"))
    } else {
        return None;
    };

    let din = format_date(date_in?)?;
    let dout = format_date(date_out?)?;

    Some(serde_json::json!({
        "event": "vs",
        "din": din,
        "dout": dout,
    }))
}

/// Format a date value as `YYYY-MM-DD`. Accepts plain dates, RFC 3339
/// timestamps, and epoch milliseconds.
pub fn format_date(value: &Value) -> Option<String> {
    let date = match value {
        Value::String(raw) => parse_date_string(raw)?,
        Value::Number(n) => {
            let millis = n.as_i64()?;
            Utc.timestamp_millis_opt(millis).single()?.date_naive()
        }
        _ => return None,
    };
    Some(date.format("%Y-%m-%d").to_string())
}

fn parse_date_string(raw: &str) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.date_naive());
    }
    NaiveDate::parse_from_str(raw, "%Y/%m/%d").ok()
}
