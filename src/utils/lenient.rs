//! Deserializers for form-style JSON where numbers and flags may arrive as strings.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

pub fn deserialize_lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_as_f64))
}

pub fn deserialize_lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_as_f64).map(|v| v.round() as i64))
}

pub fn deserialize_lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Bool(b)) => Some(b),
        Some(Value::Number(n)) => n.as_i64().map(|n| n != 0),
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Some(true),
            "false" | "0" | "no" | "off" => Some(false),
            _ => None,
        },
        _ => None,
    })
}

/// `null` deserializes as `T::default()`.
pub fn deserialize_null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Form {
        #[serde(default, deserialize_with = "deserialize_lenient_f64")]
        height: Option<f64>,
        #[serde(default, deserialize_with = "deserialize_lenient_i64")]
        heart_rate: Option<i64>,
        #[serde(default, deserialize_with = "deserialize_lenient_bool")]
        consent: Option<bool>,
    }

    #[test]
    fn accepts_numbers_and_numeric_strings() {
        let form: Form =
            serde_json::from_str(r#"{"height": "172.5", "heart_rate": 71, "consent": "true"}"#).unwrap();
        assert_eq!(form.height, Some(172.5));
        assert_eq!(form.heart_rate, Some(71));
        assert_eq!(form.consent, Some(true));
    }

    #[test]
    fn empty_and_null_values_become_none() {
        let form: Form =
            serde_json::from_str(r#"{"height": "", "heart_rate": null}"#).unwrap();
        assert_eq!(form.height, None);
        assert_eq!(form.heart_rate, None);
        assert_eq!(form.consent, None);
    }
}
