use chrono::{DateTime, TimeZone, Utc};
use serde::de::{self, Deserializer, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A point in time as the backend encodes it: `{"$date": <millis>}`.
///
/// The millisecond value may arrive as a JSON number or as a numeric
/// string; it is always written back as a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(pub DateTime<Utc>);

impl Timestamp {
    pub fn from_millis(millis: i64) -> Option<Self> {
        Utc.timestamp_millis_opt(millis).single().map(Self)
    }

    pub fn as_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("$date", &self.as_millis())?;
        map.end()
    }
}

#[derive(Deserialize)]
struct DateEnvelope {
    #[serde(rename = "$date")]
    date: Millis,
}

struct Millis(i64);

impl<'de> Deserialize<'de> for Millis {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MillisVisitor;

        impl Visitor<'_> for MillisVisitor {
            type Value = Millis;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("milliseconds since epoch as a number or numeric string")
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Millis, E> {
                Ok(Millis(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Millis, E> {
                i64::try_from(v)
                    .map(Millis)
                    .map_err(|_| E::custom(format!("timestamp out of range: {}", v)))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Millis, E> {
                if v.is_finite() && v.fract() == 0.0 {
                    Ok(Millis(v as i64))
                } else {
                    Err(E::custom(format!("non-integral timestamp: {}", v)))
                }
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Millis, E> {
                v.trim()
                    .parse::<i64>()
                    .map(Millis)
                    .map_err(|_| E::custom(format!("invalid numeric timestamp: {:?}", v)))
            }
        }

        deserializer.deserialize_any(MillisVisitor)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let envelope = DateEnvelope::deserialize(deserializer)?;
        Timestamp::from_millis(envelope.date.0)
            .ok_or_else(|| de::Error::custom(format!("timestamp out of range: {}", envelope.date.0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use serde_json::json;

    #[test]
    fn test_decode_numeric_date() {
        let ts: Timestamp = serde_json::from_value(json!({ "$date": 1609459200000i64 })).unwrap();

        assert_eq!(ts.0.year(), 2021);
        assert_eq!(ts.0.month(), 1);
        assert_eq!(ts.0.day(), 1);
        assert_eq!(ts.0.hour(), 0);
        assert_eq!(ts.as_millis(), 1609459200000);
    }

    #[test]
    fn test_decode_quoted_date() {
        let ts: Timestamp = serde_json::from_value(json!({ "$date": "1609459200123" })).unwrap();

        assert_eq!(ts.as_millis(), 1609459200123);
    }

    #[test]
    fn test_encode_keeps_millis() {
        let ts: Timestamp = serde_json::from_value(json!({ "$date": 1609459200000i64 })).unwrap();

        assert_eq!(serde_json::to_value(ts).unwrap(), json!({ "$date": 1609459200000i64 }));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(serde_json::from_value::<Timestamp>(json!({ "$date": "soon" })).is_err());
        assert!(serde_json::from_value::<Timestamp>(json!({ "date": 1 })).is_err());
        assert!(serde_json::from_value::<Timestamp>(json!({ "$date": 1.5 })).is_err());
    }
}
