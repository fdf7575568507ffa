use chrono::{Datelike, NaiveDate, Utc};
use lazy_static::lazy_static;
use regex::Regex;

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MIN_AGE: i32 = 13;
pub const MAX_AGE: i32 = 120;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub fn is_valid_password(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_LEN
}

/// Parse a `YYYY-MM-DD` birth date and check the age limits against `today`.
pub fn parse_date_of_birth(raw: &str, today: NaiveDate) -> Result<NaiveDate, &'static str> {
    let dob = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| "Invalid date of birth format")?;

    let mut age = today.year() - dob.year();
    if (today.month(), today.day()) < (dob.month(), dob.day()) {
        age -= 1;
    }

    if age < MIN_AGE {
        return Err("You must be at least 13 years old to create an account");
    }
    if age > MAX_AGE {
        return Err("Please enter a valid date of birth");
    }
    Ok(dob)
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Lenient date parsing for optional fields: `None` when absent or unparsable.
pub fn parse_optional_date(raw: Option<&str>) -> Option<NaiveDate> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
}

/// Empty strings from form fields count as absent.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_pattern() {
        assert!(is_valid_email("jane.doe@example.com"));
        assert!(!is_valid_email("jane.doe@example"));
        assert!(!is_valid_email("jane doe@example.com"));
        assert!(!is_valid_email("@example.com"));
        assert_eq!(normalize_email("  Jane@Example.COM "), "jane@example.com");
    }

    #[test]
    fn age_limits_are_inclusive() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        assert!(parse_date_of_birth("2012-06-15", today).is_ok());
        assert!(parse_date_of_birth("2012-06-16", today).is_err());
        assert!(parse_date_of_birth("1905-06-15", today).is_ok());
        assert!(parse_date_of_birth("1904-06-16", today).is_ok());
        assert!(parse_date_of_birth("1904-06-15", today).is_err());
        assert!(parse_date_of_birth("15/06/1990", today).is_err());
    }

    #[test]
    fn optional_dates_are_lenient() {
        assert_eq!(parse_optional_date(Some("2020-02-29")), NaiveDate::from_ymd_opt(2020, 2, 29));
        assert_eq!(parse_optional_date(Some("last spring")), None);
        assert_eq!(parse_optional_date(None), None);
    }
}
