use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::lenient::{deserialize_lenient_f64, deserialize_lenient_i64};

#[derive(sqlx::FromRow, Serialize, Debug, Clone)]
pub struct VitalSigns {
    pub id: i64,
    pub user_id: i64,
    /// Fahrenheit.
    pub temperature: Option<f64>,
    pub heart_rate: Option<i64>,
    pub blood_pressure_systolic: Option<i64>,
    pub blood_pressure_diastolic: Option<i64>,
    pub oxygen_saturation: Option<i64>,
    pub weight: Option<f64>,
    pub height: Option<f64>,
    pub recorded_at: DateTime<Utc>,
    pub notes: Option<String>,
}

impl VitalSigns {
    pub fn blood_pressure(&self) -> Option<String> {
        match (self.blood_pressure_systolic, self.blood_pressure_diastolic) {
            (Some(sys), Some(dia)) => Some(format!("{}/{}", sys, dia)),
            _ => None,
        }
    }
}

/// Stored reading plus the combined `"120/80"` blood pressure.
#[derive(Serialize, Debug)]
pub struct VitalSignsView {
    #[serde(flatten)]
    pub vitals: VitalSigns,
    pub blood_pressure: Option<String>,
}

impl From<VitalSigns> for VitalSignsView {
    fn from(vitals: VitalSigns) -> Self {
        let blood_pressure = vitals.blood_pressure();
        Self { vitals, blood_pressure }
    }
}

#[derive(Deserialize, Default, Debug)]
pub struct NewVitalSigns {
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub temperature: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_lenient_i64")]
    pub heart_rate: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_lenient_i64")]
    pub blood_pressure_systolic: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_lenient_i64")]
    pub blood_pressure_diastolic: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_lenient_i64")]
    pub oxygen_saturation: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub weight: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub height: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewVitalSigns {
    /// Returns the first out-of-range field as a user-facing message.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(spo2) = self.oxygen_saturation {
            if !(0..=100).contains(&spo2) {
                return Err("Oxygen saturation must be between 0 and 100".to_string());
            }
        }
        if self.heart_rate.is_some_and(|hr| hr < 0) {
            return Err("Heart rate cannot be negative".to_string());
        }
        if self.blood_pressure_systolic.is_some_and(|v| v < 0)
            || self.blood_pressure_diastolic.is_some_and(|v| v < 0)
        {
            return Err("Blood pressure cannot be negative".to_string());
        }
        Ok(())
    }
}

#[derive(Deserialize, Debug)]
pub struct VitalSignsQuery {
    pub limit: Option<i64>,
}

impl VitalSignsQuery {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(10).clamp(1, 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_oxygen_saturation() {
        let vitals = NewVitalSigns { oxygen_saturation: Some(101), ..Default::default() };
        assert!(vitals.validate().is_err());
        let vitals = NewVitalSigns { oxygen_saturation: Some(97), heart_rate: Some(72), ..Default::default() };
        assert!(vitals.validate().is_ok());
    }

    #[test]
    fn limit_is_clamped() {
        assert_eq!(VitalSignsQuery { limit: None }.limit(), 10);
        assert_eq!(VitalSignsQuery { limit: Some(0) }.limit(), 1);
        assert_eq!(VitalSignsQuery { limit: Some(5000) }.limit(), 100);
    }
}
