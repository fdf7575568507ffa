use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::lenient::{deserialize_lenient_f64, deserialize_lenient_i64, deserialize_null_default};

pub const DEFAULT_DEVICE_TYPE: &str = "ESP32";
pub const MIN_DEVICE_ID_LEN: usize = 5;
pub const DEFAULT_WINDOW_HOURS: i64 = 24;
pub const MAX_WINDOW_HOURS: i64 = 24 * 365;

#[derive(sqlx::FromRow, Serialize, Debug, Clone)]
pub struct WearableDevice {
    pub id: i64,
    pub user_id: i64,
    pub device_id: String,
    pub device_name: Option<String>,
    pub device_type: String,
    pub is_active: bool,
    pub last_sync: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Compact view of a user's current link.
#[derive(Serialize, Debug, Clone)]
pub struct DeviceInfo {
    pub device_id: String,
    pub device_type: String,
    pub linked_at: Option<DateTime<Utc>>,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct DeviceDataRecord {
    pub id: i64,
    pub device_id: String,
    pub user_id: i64,
    pub timestamp: DateTime<Utc>,
    pub temperature_c: Option<f64>,
    pub temperature_f: Option<f64>,
    pub heart_rate_bpm: Option<i64>,
    pub spo2_percent: Option<i64>,
    pub ecg_data: Option<String>,
    pub blood_pressure_systolic: Option<i64>,
    pub blood_pressure_diastolic: Option<i64>,
    pub steps: Option<i64>,
    pub calories_burned: Option<f64>,
    pub data_quality: String,
    pub battery_level: Option<i64>,
    pub signal_strength: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl DeviceDataRecord {
    /// Stored ECG samples; a missing or corrupt column reads as no samples.
    pub fn ecg(&self) -> Vec<f64> {
        self.ecg_data
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_default()
    }
}

/// Reading as returned by `/api/device-data/24h` and `/api/device/data/latest`.
#[derive(Serialize, Debug)]
pub struct DeviceReading {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub device_id: String,
    pub timestamp: DateTime<Utc>,
    pub temperature_c: Option<f64>,
    pub temperature_f: Option<f64>,
    pub heart_rate_bpm: Option<i64>,
    pub spo2_percent: Option<i64>,
    pub ecg_data: Vec<f64>,
}

impl DeviceReading {
    pub fn from_record(record: &DeviceDataRecord, with_id: bool) -> Self {
        Self {
            id: with_id.then_some(record.id),
            device_id: record.device_id.clone(),
            timestamp: record.timestamp,
            temperature_c: record.temperature_c,
            temperature_f: record.temperature_f,
            heart_rate_bpm: record.heart_rate_bpm,
            spo2_percent: record.spo2_percent,
            ecg_data: record.ecg(),
        }
    }
}

/// Column-oriented series for the dashboard charts. Missing values are zero.
#[derive(Serialize, Debug, Default)]
pub struct DeviceChartSeries {
    pub timestamps: Vec<DateTime<Utc>>,
    pub heart_rate: Vec<i64>,
    pub spo2: Vec<i64>,
    /// Fahrenheit, as displayed by the dashboard.
    pub temperature: Vec<f64>,
    pub temperature_c: Vec<f64>,
    pub temperature_f: Vec<f64>,
    pub ecg_data: Vec<Vec<f64>>,
}

impl DeviceChartSeries {
    pub fn from_records(records: &[DeviceDataRecord]) -> Self {
        let mut series = Self::default();
        for record in records {
            let temperature_f = record.temperature_f.unwrap_or(0.0);
            series.timestamps.push(record.timestamp);
            series.heart_rate.push(record.heart_rate_bpm.unwrap_or(0));
            series.spo2.push(record.spo2_percent.unwrap_or(0));
            series.temperature.push(temperature_f);
            series.temperature_c.push(record.temperature_c.unwrap_or(0.0));
            series.temperature_f.push(temperature_f);
            series.ecg_data.push(record.ecg());
        }
        series
    }
}

#[derive(Deserialize, Debug)]
pub struct LinkDeviceRequest {
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub device_name: Option<String>,
    #[serde(default)]
    pub device_type: Option<String>,
}

impl LinkDeviceRequest {
    /// Trimmed device id, or the message to answer with.
    pub fn validated_device_id(&self) -> Result<String, &'static str> {
        let device_id = self.device_id.as_deref().unwrap_or_default().trim();
        if device_id.is_empty() {
            return Err("Device ID is required");
        }
        if device_id.chars().count() < MIN_DEVICE_ID_LEN {
            return Err("Device ID must be at least 5 characters");
        }
        Ok(device_id.to_string())
    }

    pub fn device_name(&self) -> Option<String> {
        self.device_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
    }

    pub fn device_type(&self) -> String {
        self.device_type
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_DEVICE_TYPE)
            .to_string()
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct DeviceDataQuery {
    #[serde(default, deserialize_with = "deserialize_lenient_i64")]
    pub hours: Option<i64>,
}

impl DeviceDataQuery {
    /// Requested chart window. Missing, unparsable or non-positive values fall back to a day.
    pub fn window_hours(&self) -> i64 {
        self.hours
            .filter(|h| *h > 0)
            .map(|h| h.min(MAX_WINDOW_HOURS))
            .unwrap_or(DEFAULT_WINDOW_HOURS)
    }
}

#[derive(Deserialize, Debug)]
pub struct DeviceData24hQuery {
    pub device_id: Option<String>,
}

/// Body posted by a wearable to `/device`.
#[derive(Deserialize, Debug)]
pub struct TelemetryPayload {
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub data: SensorReadings,
}

#[derive(Deserialize, Serialize, Default, Debug, Clone)]
pub struct SensorReadings {
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub temperature_c: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub temperature_f: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_lenient_i64")]
    pub heart_rate_bpm: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_lenient_i64")]
    pub spo2_percent: Option<i64>,
    #[serde(default, rename = "ecg_mV", deserialize_with = "deserialize_null_default")]
    pub ecg_mv: Vec<f64>,
    #[serde(default, deserialize_with = "deserialize_lenient_i64")]
    pub blood_pressure_systolic: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_lenient_i64")]
    pub blood_pressure_diastolic: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_lenient_i64")]
    pub steps: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub calories_burned: Option<f64>,
    #[serde(default)]
    pub data_quality: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_i64")]
    pub battery_level: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_lenient_i64")]
    pub signal_strength: Option<i64>,
}

impl SensorReadings {
    pub fn temperature_f(&self) -> Option<f64> {
        self.temperature_f
            .or_else(|| self.temperature_c.map(|c| c * 9.0 / 5.0 + 32.0))
    }
}

/// Reference to the stored row in the `/device` response.
#[derive(Serialize, Debug, Clone)]
pub struct SavedReading {
    pub id: i64,
    pub user_id: i64,
    pub device_id: String,
    pub timestamp: DateTime<Utc>,
}

/// Payload of the `device_data_update` event.
#[derive(Serialize, Debug, Clone)]
pub struct DeviceDataUpdate {
    pub device_id: String,
    pub timestamp: String,
    pub temperature_c: Option<f64>,
    pub heart_rate_bpm: Option<i64>,
    pub spo2_percent: Option<i64>,
    pub ecg_data: Vec<f64>,
}

/// Device clocks send RFC 3339 or naive ISO timestamps; naive ones are UTC.
pub fn parse_device_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}
