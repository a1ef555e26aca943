//! Lenient serde helpers
//!
//! The backend is not strict about JSON types: ids arrive as numbers or
//! strings and arrays are sometimes `null`. Numeric fields of a line item
//! that cannot be read decode as absent so the rest of the ticket still
//! prints.

use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Number, Value};

/// Deserialize a string that may have been sent as a number
pub fn de_opt_lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(other) => Some(other.to_string()),
    })
}

/// Treat an explicit `null` like an absent field
pub fn de_null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn integral(f: f64) -> Option<i64> {
    (f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64).then_some(f as i64)
}

fn number_to_i64(n: &Number) -> Option<i64> {
    n.as_i64().or_else(|| n.as_f64().and_then(integral))
}

/// Integer sent as a number, an integral float or a numeric string
///
/// Anything else decodes as `None`.
pub fn de_lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => number_to_i64(&n),
        Some(Value::String(s)) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(integral))
        }
        _ => None,
    })
}

/// Decimal sent as a number or a numeric string; anything else is `None`
pub fn de_lenient_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n
            .to_string()
            .parse::<Decimal>()
            .ok()
            .or_else(|| n.as_f64().and_then(Decimal::from_f64)),
        Some(Value::String(s)) => s.trim().parse::<Decimal>().ok(),
        _ => None,
    })
}

/// Any shape `T` does not accept decodes as `None`
pub fn de_opt_or_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Probe {
        #[serde(default, deserialize_with = "de_opt_lenient_string")]
        id: Option<String>,
        #[serde(default, deserialize_with = "de_null_as_default")]
        list: Vec<u32>,
    }

    #[test]
    fn test_number_becomes_string() {
        let p: Probe = serde_json::from_str(r#"{"id": 42}"#).unwrap();
        assert_eq!(p.id.as_deref(), Some("42"));
        assert!(p.list.is_empty());
    }

    #[derive(Deserialize)]
    struct Amounts {
        #[serde(default, deserialize_with = "de_lenient_i64")]
        qty: Option<i64>,
        #[serde(default, deserialize_with = "de_lenient_decimal")]
        price: Option<Decimal>,
    }

    fn amounts(json: &str) -> (Option<i64>, Option<Decimal>) {
        let a: Amounts = serde_json::from_str(json).unwrap();
        (a.qty, a.price)
    }

    #[test]
    fn test_lenient_amounts() {
        assert_eq!(
            amounts(r#"{"qty": 2, "price": 31.5}"#),
            (Some(2), Some(Decimal::new(315, 1)))
        );
        assert_eq!(
            amounts(r#"{"qty": 1.0, "price": "4.25"}"#),
            (Some(1), Some(Decimal::new(425, 2)))
        );
        assert_eq!(amounts(r#"{"qty": " 3 ", "price": 7}"#), (Some(3), Some(Decimal::new(7, 0))));
        assert_eq!(amounts(r#"{"qty": 1.5, "price": "n/a"}"#), (None, None));
        assert_eq!(amounts(r#"{"qty": true, "price": [1]}"#), (None, None));
        assert_eq!(amounts(r#"{"qty": null}"#), (None, None));
    }

    #[test]
    fn test_unreadable_shape_is_none() {
        #[derive(Deserialize)]
        struct Parts {
            #[serde(default, deserialize_with = "de_opt_or_none")]
            parts: Option<Vec<u32>>,
        }

        let p: Parts = serde_json::from_str(r#"{"parts": [1, 2]}"#).unwrap();
        assert_eq!(p.parts, Some(vec![1, 2]));
        let p: Parts = serde_json::from_str(r#"{"parts": 1715950000000}"#).unwrap();
        assert_eq!(p.parts, None);
    }

    #[test]
    fn test_null_list_is_empty() {
        let p: Probe = serde_json::from_str(r#"{"id": null, "list": null}"#).unwrap();
        assert_eq!(p.id, None);
        assert!(p.list.is_empty());
    }
}
