//! Normalization of Saweria donation payloads.
//!
//! Saweria (and the tools people put in front of it) send the same donation
//! under a handful of different key names and types. Each logical field is
//! looked up through an ordered list of keys; the first value that is present
//! and not "empty" wins.

use serde::Serialize;
use serde_json::{Map, Value};

const DONOR_NAME_KEYS: &[&str] = &["donator_name", "donor_name", "name"];
const AMOUNT_KEYS: &[&str] = &["amount", "total"];
const MESSAGE_KEYS: &[&str] = &["message", "comment", "note"];
const DONATION_ID_KEYS: &[&str] = &["id"];

const ANONYMOUS: &str = "Anonymous";

/// The payload published to the messaging topic. Every field is always set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DonationNotification {
    pub donor_name: String,
    pub amount: i64,
    pub message: String,
    /// Milliseconds since the Unix epoch, taken when the webhook was processed.
    pub timestamp: i64,
    pub donation_id: String,
}

impl DonationNotification {
    /// Builds a notification from an inbound webhook body.
    ///
    /// Bodies that are not JSON objects are treated as an empty donation.
    pub fn from_webhook(body: &Value, timestamp: i64) -> Self {
        let empty = Map::new();
        let fields = body.as_object().unwrap_or(&empty);

        Self {
            donor_name: first_text(fields, DONOR_NAME_KEYS)
                .unwrap_or_else(|| ANONYMOUS.to_string()),
            amount: first_amount(fields, AMOUNT_KEYS).unwrap_or(0),
            message: first_text(fields, MESSAGE_KEYS).unwrap_or_default(),
            timestamp,
            donation_id: first_text(fields, DONATION_ID_KEYS).unwrap_or_default(),
        }
    }

    /// The notification serialized as a JSON string, the form the messaging
    /// API expects inside its `message` field.
    pub fn to_topic_message(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Absent, `null`, `false`, `0` and `""` do not count as a value.
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f == 0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

fn first_text(fields: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| fields.get(*key))
        .find(|value| !is_blank(value))
        .map(|value| match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
}

fn first_amount(fields: &Map<String, Value>, keys: &[&str]) -> Option<i64> {
    keys.iter()
        .filter_map(|key| fields.get(*key))
        .filter_map(parse_amount)
        .find(|amount| *amount != 0)
}

/// Leading-integer parse: `"50000"` -> 50000, `"12.5k"` -> 12, `7.9` -> 7.
fn parse_amount(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.abs() < i64::MAX as f64)
                .map(|f| f.trunc() as i64)
        }),
        Value::String(s) => parse_leading_int(s),
        _ => None,
    }
}

fn parse_leading_int(raw: &str) -> Option<i64> {
    let s = raw.trim_start();
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits_len == 0 {
        return None;
    }
    let magnitude: i64 = rest[..digits_len].parse().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TS: i64 = 1_700_000_000_000;

    fn normalize(body: Value) -> DonationNotification {
        DonationNotification::from_webhook(&body, TS)
    }

    #[test]
    fn test_typical_saweria_payload() {
        let n = normalize(json!({
            "donator_name": "Budi",
            "amount": "50000",
            "message": "Semangat!"
        }));
        assert_eq!(n.donor_name, "Budi");
        assert_eq!(n.amount, 50000);
        assert_eq!(n.message, "Semangat!");
        assert_eq!(n.donation_id, "");
        assert_eq!(n.timestamp, TS);
    }

    #[test]
    fn test_empty_body_uses_defaults() {
        let n = normalize(json!({}));
        assert_eq!(
            n,
            DonationNotification {
                donor_name: "Anonymous".to_string(),
                amount: 0,
                message: String::new(),
                timestamp: TS,
                donation_id: String::new(),
            }
        );
    }

    #[test]
    fn test_non_object_body_is_empty_donation() {
        assert_eq!(normalize(json!([1, 2, 3])).donor_name, "Anonymous");
        assert_eq!(normalize(json!("Budi")).amount, 0);
    }

    #[test]
    fn test_donor_name_fallback_order() {
        assert_eq!(
            normalize(json!({"donator_name": "A", "donor_name": "B", "name": "C"})).donor_name,
            "A"
        );
        assert_eq!(normalize(json!({"donor_name": "B", "name": "C"})).donor_name, "B");
        assert_eq!(normalize(json!({"name": "C"})).donor_name, "C");
    }

    #[test]
    fn test_blank_donor_names_are_skipped() {
        let n = normalize(json!({"donator_name": "", "donor_name": null, "name": "Sari"}));
        assert_eq!(n.donor_name, "Sari");

        let n = normalize(json!({"donator_name": "", "donor_name": false, "name": 0}));
        assert_eq!(n.donor_name, "Anonymous");
    }

    #[test]
    fn test_non_string_text_fields_are_rendered() {
        let n = normalize(json!({"name": 42, "id": 9876}));
        assert_eq!(n.donor_name, "42");
        assert_eq!(n.donation_id, "9876");
    }

    #[test]
    fn test_amount_prefers_amount_over_total() {
        assert_eq!(normalize(json!({"amount": 10000, "total": 20000})).amount, 10000);
        assert_eq!(normalize(json!({"total": "20000"})).amount, 20000);
    }

    #[test]
    fn test_unparseable_amount_falls_back_to_total() {
        assert_eq!(normalize(json!({"amount": "gratis", "total": 5000})).amount, 5000);
        assert_eq!(normalize(json!({"amount": 0, "total": 5000})).amount, 5000);
    }

    #[test]
    fn test_unparseable_amounts_default_to_zero() {
        assert_eq!(normalize(json!({"amount": "abc", "total": null})).amount, 0);
        assert_eq!(normalize(json!({"amount": true})).amount, 0);
        assert_eq!(normalize(json!({"amount": {"value": 5}})).amount, 0);
        assert_eq!(normalize(json!({"amount": "Rp 5000"})).amount, 0);
    }

    #[test]
    fn test_amount_leading_integer_parse() {
        assert_eq!(normalize(json!({"amount": "12.5k"})).amount, 12);
        assert_eq!(normalize(json!({"amount": "  -300"})).amount, -300);
        assert_eq!(normalize(json!({"amount": 7.9})).amount, 7);
        assert_eq!(normalize(json!({"amount": "99999999999999999999999"})).amount, 0);
    }

    #[test]
    fn test_message_fallback_order() {
        assert_eq!(normalize(json!({"comment": "c", "note": "n"})).message, "c");
        assert_eq!(normalize(json!({"message": "", "note": "n"})).message, "n");
    }

    #[test]
    fn test_donation_id_passthrough() {
        let n = normalize(json!({"id": "d3f1-abc"}));
        assert_eq!(n.donation_id, "d3f1-abc");
    }

    #[test]
    fn test_topic_message_has_exactly_five_fields() {
        let n = normalize(json!({"donator_name": "Budi", "amount": "50000"}));
        let encoded = n.to_topic_message().unwrap();
        let decoded: Value = serde_json::from_str(&encoded).unwrap();
        let obj = decoded.as_object().unwrap();

        assert_eq!(obj.len(), 5);
        assert!(obj["donor_name"].is_string());
        assert!(obj["amount"].is_i64());
        assert!(obj["message"].is_string());
        assert!(obj["timestamp"].is_i64());
        assert!(obj["donation_id"].is_string());
    }
}
