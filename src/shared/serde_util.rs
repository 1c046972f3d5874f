//! Custom serde helpers for feed wire formats.

/// Deserializes an optional decimal that may arrive as a string, a number,
/// `null`, or garbage. Anything that does not parse becomes `None`.
///
/// Upstream depth values are advisory, so a bad one must not reject the whole
/// ladder.
pub mod lenient_decimal {
    use rust_decimal::Decimal;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::str::FromStr;

    pub fn serialize<S>(value: &Option<Decimal>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(d) => serializer.serialize_str(&d.to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<serde_json::Value>::deserialize(deserializer)?;
        Ok(match value {
            Some(serde_json::Value::String(s)) => Decimal::from_str(s.trim()).ok(),
            Some(serde_json::Value::Number(n)) => Decimal::from_str(&n.to_string())
                .or_else(|_| Decimal::from_scientific(&n.to_string()))
                .ok(),
            _ => None,
        })
    }
}

/// An RFC 3339 timestamp held as unix milliseconds.
pub mod rfc3339_ms {
    use chrono::{DateTime, SecondsFormat};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(ms: &i64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let dt = DateTime::from_timestamp_millis(*ms)
            .ok_or_else(|| serde::ser::Error::custom(format!("Timestamp out of range: {ms}")))?;
        serializer.serialize_str(&dt.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<i64, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.timestamp_millis())
            .map_err(|e| serde::de::Error::custom(format!("Invalid timestamp {s}: {e}")))
    }
}
