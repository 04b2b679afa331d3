use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::str::FromStr;

/// One row of the `orders` table as returned by the REST endpoint.
///
/// Empty strings coming back from the store are normalised to `None`, so a
/// field is either meaningfully populated or absent.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Order {
    pub id: i64,
    #[serde(default, deserialize_with = "non_empty_string")]
    pub customer_email: Option<String>,
    #[serde(default, deserialize_with = "non_empty_string")]
    pub customer_phone: Option<String>,
    #[serde(default, deserialize_with = "loose_decimal")]
    pub payment_amount: Option<Decimal>,
    #[serde(default, deserialize_with = "non_empty_string")]
    pub payment_method: Option<String>,
    #[serde(default, deserialize_with = "non_empty_string")]
    pub product_name: Option<String>,
    #[serde(default, deserialize_with = "loose_integer")]
    pub ticket_quantity: Option<i64>,
    #[serde(default, deserialize_with = "non_empty_string")]
    pub order_status: Option<String>,
    #[serde(default, deserialize_with = "non_empty_string")]
    pub receipt_url: Option<String>,
    #[serde(default, deserialize_with = "loose_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    /// Every other column of the row, kept for the detail dump.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Order {
    /// Number of populated typed fields. Used to pick the most complete
    /// order among a set of duplicates.
    pub fn completeness(&self) -> usize {
        [
            self.customer_email.is_some(),
            self.customer_phone.is_some(),
            self.payment_amount.is_some(),
            self.payment_method.is_some(),
            self.product_name.is_some(),
            self.ticket_quantity.is_some(),
            self.order_status.is_some(),
            self.receipt_url.is_some(),
            self.created_at.is_some(),
        ]
        .iter()
        .filter(|present| **present)
        .count()
    }
}

/// Parse a timestamp as PostgREST renders it.
///
/// Values with an offset (`Z`, `+00:00`, `+09`) are converted to UTC.
/// Offset-less values (`timestamp without time zone`) are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f%#z", "%Y-%m-%d %H:%M:%S%.f%#z"] {
        if let Ok(dt) = DateTime::parse_from_str(raw, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }

    None
}

fn non_empty_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

fn loose_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let text = match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) if s.trim().is_empty() => return Ok(None),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(other) => {
            return Err(serde::de::Error::custom(format!(
                "expected a numeric amount, got {other}"
            )));
        }
    };

    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map(Some)
        .map_err(|e| serde::de::Error::custom(format!("invalid amount {text:?}: {e}")))
}

fn loose_integer<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("expected an integer, got {n}"))),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|e| serde::de::Error::custom(format!("invalid integer {s:?}: {e}"))),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected an integer, got {other}"
        ))),
    }
}

fn loose_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };

    let parsed = parse_timestamp(&raw);
    if parsed.is_none() && !raw.trim().is_empty() {
        tracing::warn!("Ignoring unparseable created_at value {:?}", raw);
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn test_deserialize_full_row() {
        let row = serde_json::json!({
            "id": 34,
            "customer_email": "tip123@hanmail.net",
            "customer_phone": "01073627711",
            "payment_amount": 15000,
            "payment_method": "PayApp",
            "product_name": "Concert ticket",
            "ticket_quantity": 2,
            "order_status": "pending",
            "receipt_url": "https://payapp.kr/receipt/abc",
            "created_at": "2025-08-01T03:21:09.123456+00:00",
            "order_number": "ORD-34",
            "notes": null
        });

        let order: Order = serde_json::from_value(row).unwrap();

        assert_eq!(order.id, 34);
        assert_eq!(order.customer_email.as_deref(), Some("tip123@hanmail.net"));
        assert_eq!(order.payment_amount, Some(dec!(15000)));
        assert_eq!(order.ticket_quantity, Some(2));
        assert_eq!(
            order.created_at.map(|dt| dt.timestamp()),
            Some(Utc.with_ymd_and_hms(2025, 8, 1, 3, 21, 9).unwrap().timestamp())
        );
        assert_eq!(order.extra.get("order_number"), Some(&Value::from("ORD-34")));
        assert_eq!(order.extra.get("notes"), Some(&Value::Null));
        assert_eq!(order.completeness(), 9);
    }

    #[test]
    fn test_empty_strings_become_none() {
        let row = serde_json::json!({
            "id": 32,
            "customer_email": "",
            "customer_phone": "01073627711",
            "payment_amount": "",
            "payment_method": "  ",
            "ticket_quantity": null,
            "created_at": ""
        });

        let order: Order = serde_json::from_value(row).unwrap();

        assert_eq!(order.customer_email, None);
        assert_eq!(order.payment_amount, None);
        assert_eq!(order.payment_method, None);
        assert_eq!(order.ticket_quantity, None);
        assert_eq!(order.created_at, None);
        assert_eq!(order.completeness(), 1);
    }

    #[test]
    fn test_numeric_strings_accepted() {
        let row = serde_json::json!({
            "id": 1,
            "payment_amount": "12000.50",
            "ticket_quantity": "3"
        });

        let order: Order = serde_json::from_value(row).unwrap();

        assert_eq!(order.payment_amount, Some(dec!(12000.50)));
        assert_eq!(order.ticket_quantity, Some(3));
    }

    #[test]
    fn test_parse_timestamp_variants() {
        let expected = Utc.with_ymd_and_hms(2025, 8, 1, 3, 21, 9).unwrap();

        assert_eq!(parse_timestamp("2025-08-01T03:21:09Z"), Some(expected));
        assert_eq!(parse_timestamp("2025-08-01T03:21:09+00:00"), Some(expected));
        assert_eq!(parse_timestamp("2025-08-01T12:21:09+09:00"), Some(expected));
        assert_eq!(parse_timestamp("2025-08-01T03:21:09"), Some(expected));
        assert_eq!(parse_timestamp("2025-08-01 03:21:09"), Some(expected));
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp(""), None);
    }
}
