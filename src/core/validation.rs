//! Profile input validation.
//!
//! The profile-update body arrives as loose JSON so that type errors can be
//! reported with field-named messages instead of a generic deserialization
//! failure. Date-of-birth values must be real calendar dates in the
//! `YYYY-MM-DD` format and must not lie in the future.

use chrono::{NaiveDate, Utc};
use serde_json::Value;

use crate::core::db::models::ProfileUpdate;

/// Fields required by the profile-update operation
const PROFILE_FIELDS: [&str; 4] = ["firstName", "lastName", "dob", "address"];

/// Profile validation error types. The display strings are the
/// user-visible, field-named messages.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProfileValidationError {
    #[error("Request body incomplete: firstName, lastName, dob and address are required.")]
    MissingFields,

    #[error("Request body invalid: firstName, lastName and address must be strings only.")]
    NonStringFields,

    #[error("Invalid input: dob must be a real date in format YYYY-MM-DD.")]
    MalformedDob,

    #[error("Invalid input: dob must be a date in the past.")]
    DobInFuture,
}

/// Validate a loose profile-update body and lift it into a `ProfileUpdate`
pub fn parse_profile_update(body: &Value) -> Result<ProfileUpdate, ProfileValidationError> {
    let object = body.as_object().ok_or(ProfileValidationError::MissingFields)?;

    // Presence first, then types, matching the order messages are expected in
    for field in PROFILE_FIELDS {
        match object.get(field) {
            None | Some(Value::Null) => return Err(ProfileValidationError::MissingFields),
            Some(Value::String(s)) if s.is_empty() => {
                return Err(ProfileValidationError::MissingFields);
            }
            Some(_) => {}
        }
    }

    let first_name = require_string(object, "firstName")?;
    let last_name = require_string(object, "lastName")?;
    let dob = require_string(object, "dob")?;
    let address = require_string(object, "address")?;

    validate_dob(dob)?;

    Ok(ProfileUpdate {
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        dob: dob.to_string(),
        address: address.to_string(),
    })
}

fn require_string<'a>(
    object: &'a serde_json::Map<String, Value>,
    field: &str,
) -> Result<&'a str, ProfileValidationError> {
    object
        .get(field)
        .and_then(Value::as_str)
        .ok_or(ProfileValidationError::NonStringFields)
}

/// Check that a date of birth is a real `YYYY-MM-DD` date in the past
pub fn validate_dob(dob: &str) -> Result<(), ProfileValidationError> {
    let bytes = dob.as_bytes();
    let shaped = bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());
    if !shaped {
        return Err(ProfileValidationError::MalformedDob);
    }

    // Rejects impossible dates like 2021-04-31, leap years honored
    let date = NaiveDate::parse_from_str(dob, "%Y-%m-%d")
        .map_err(|_| ProfileValidationError::MalformedDob)?;

    if date > Utc::now().date_naive() {
        return Err(ProfileValidationError::DobInFuture);
    }

    Ok(())
}
