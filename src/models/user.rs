use std::fmt;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use secrecy::SecretString;

use crate::utils::lenient::{deserialize_lenient_bool, deserialize_lenient_f64};

/// Row of the `users` table. Never serialized directly: the password hash stays here.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct UserRecord {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub blood_type: Option<String>,
    pub allergies: Option<String>,
    pub current_medications: Option<String>,
    pub medical_conditions: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_relationship: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub linked_device_id: Option<String>,
    pub device_linked_at: Option<DateTime<Utc>>,
    pub marketing_emails_consent: bool,
    pub sms_notifications_consent: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_active: bool,
}

impl UserRecord {
    pub fn has_health_profile(&self) -> bool {
        self.height.is_some()
            || self.weight.is_some()
            || non_empty(&self.blood_type)
            || non_empty(&self.allergies)
            || non_empty(&self.current_medications)
            || non_empty(&self.medical_conditions)
    }

    pub fn has_emergency_contact(&self) -> bool {
        non_empty(&self.emergency_contact_name)
    }
}

fn non_empty(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.is_empty())
}

/// Full profile as returned by `PUT /api/profile`.
#[derive(Serialize, Debug)]
pub struct UserProfile {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub blood_type: Option<String>,
    pub allergies: Option<String>,
    pub current_medications: Option<String>,
    pub medical_conditions: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_relationship: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub linked_device_id: Option<String>,
    pub device_linked_at: Option<DateTime<Utc>>,
    pub marketing_emails_consent: bool,
    pub sms_notifications_consent: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_active: bool,
}

impl From<UserRecord> for UserProfile {
    fn from(user: UserRecord) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            phone: user.phone,
            date_of_birth: user.date_of_birth,
            gender: user.gender,
            height: user.height,
            weight: user.weight,
            blood_type: user.blood_type,
            allergies: user.allergies,
            current_medications: user.current_medications,
            medical_conditions: user.medical_conditions,
            emergency_contact_name: user.emergency_contact_name,
            emergency_contact_relationship: user.emergency_contact_relationship,
            emergency_contact_phone: user.emergency_contact_phone,
            linked_device_id: user.linked_device_id,
            device_linked_at: user.device_linked_at,
            marketing_emails_consent: user.marketing_emails_consent,
            sms_notifications_consent: user.sms_notifications_consent,
            created_at: user.created_at,
            updated_at: user.updated_at,
            is_active: user.is_active,
        }
    }
}

/// Short user view used by login and `GET /api/profile`.
#[derive(Serialize, Debug)]
pub struct UserSummary {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl UserSummary {
    pub fn from_record(user: &UserRecord, with_created_at: bool) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            phone: user.phone.clone(),
            date_of_birth: user.date_of_birth,
            gender: user.gender.clone(),
            created_at: with_created_at.then_some(user.created_at),
        }
    }
}

/// View returned right after registration.
#[derive(Serialize, Debug)]
pub struct RegisteredUser {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub has_health_profile: bool,
    pub has_emergency_contact: bool,
    pub marketing_emails_consent: bool,
    pub sms_notifications_consent: bool,
}

impl From<&UserRecord> for RegisteredUser {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            phone: user.phone.clone(),
            date_of_birth: user.date_of_birth,
            gender: user.gender.clone(),
            has_health_profile: user.has_health_profile(),
            has_emergency_contact: user.has_emergency_contact(),
            marketing_emails_consent: user.marketing_emails_consent,
            sms_notifications_consent: user.sms_notifications_consent,
        }
    }
}

#[derive(Serialize, Deserialize)]
pub struct RegistrationRequest {
    #[serde(default)]
    pub email: String,
    #[serde(
        default = "crate::models::auth::empty_secret",
        serialize_with = "serialize_secret_string",
        deserialize_with = "deserialize_secret_string"
    )]
    pub password: SecretString,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub metadata: Option<RegistrationMetadata>,
}

impl fmt::Display for RegistrationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name: {}, Email: {}", self.name, self.email)
    }
}

/// Health profile captured by the sign-up form.
#[derive(Serialize, Deserialize, Default, Debug)]
pub struct RegistrationMetadata {
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub height: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub weight: Option<f64>,
    #[serde(default)]
    pub blood_type: Option<String>,
    #[serde(default)]
    pub allergies: Option<String>,
    #[serde(default)]
    pub medications: Option<String>,
    #[serde(default)]
    pub medical_conditions: Option<String>,
    #[serde(default)]
    pub emergency_contact: Option<EmergencyContact>,
    #[serde(default)]
    pub preferences: Option<Preferences>,
}

#[derive(Serialize, Deserialize, Default, Debug, Clone)]
pub struct EmergencyContact {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub relationship: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl EmergencyContact {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.relationship.is_none() && self.phone.is_none()
    }
}

#[derive(Serialize, Deserialize, Default, Debug, Clone)]
pub struct Preferences {
    #[serde(default, deserialize_with = "deserialize_lenient_bool")]
    pub marketing_emails: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_lenient_bool")]
    pub sms_notifications: Option<bool>,
}

/// Validated registration data ready to be written.
#[derive(Debug)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub metadata: RegistrationMetadata,
}

#[derive(Deserialize, Default, Debug)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub metadata: Option<ProfileMetadata>,
}

#[derive(Deserialize, Default, Debug)]
pub struct ProfileMetadata {
    #[serde(default)]
    pub health: Option<HealthInfo>,
    #[serde(default)]
    pub emergency_contact: Option<EmergencyContact>,
    #[serde(default)]
    pub preferences: Option<Preferences>,
}

/// Fields present in the request overwrite the stored value, absent ones are kept.
#[derive(Deserialize, Default, Debug)]
pub struct HealthInfo {
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub height: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub weight: Option<f64>,
    #[serde(default)]
    pub blood_type: Option<String>,
    #[serde(default)]
    pub allergies: Option<String>,
    #[serde(default)]
    pub medications: Option<String>,
    #[serde(default)]
    pub medical_conditions: Option<String>,
}

pub fn serialize_secret_string<S>(_: &SecretString, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str("[REDACTED]")
}

pub fn deserialize_secret_string<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
    Ok(SecretString::new(s.into_boxed_str()))
}
