use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(sqlx::FromRow, Serialize, Debug, Clone)]
pub struct MedicalCondition {
    pub id: i64,
    pub user_id: i64,
    pub condition_name: String,
    pub diagnosis_date: Option<NaiveDate>,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionStatus {
    Active,
    Resolved,
    Chronic,
}

impl ConditionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionStatus::Active => "active",
            ConditionStatus::Resolved => "resolved",
            ConditionStatus::Chronic => "chronic",
        }
    }
}

impl TryFrom<&str> for ConditionStatus {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "resolved" => Ok(Self::Resolved),
            "chronic" => Ok(Self::Chronic),
            other => Err(format!(
                "Invalid status '{}'. Use active, resolved or chronic",
                other
            )),
        }
    }
}

#[derive(Deserialize, Default, Debug)]
pub struct NewMedicalCondition {
    #[serde(default)]
    pub condition_name: Option<String>,
    #[serde(default)]
    pub diagnosis_date: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_statuses_case_insensitively() {
        assert_eq!(ConditionStatus::try_from("Chronic"), Ok(ConditionStatus::Chronic));
        assert_eq!(ConditionStatus::try_from("resolved"), Ok(ConditionStatus::Resolved));
        assert!(ConditionStatus::try_from("cured").is_err());
    }
}
