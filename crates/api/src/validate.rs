//! Validation primitives gating each pipeline step.
//!
//! Pure predicates over request input plus the merge algorithm shared by
//! every PUT pipeline. Filesystem existence probes live on
//! [`crate::store::RecordStore`].

use serde_json::{Map, Value};

use pizzapp_core::{Email, now_ms};

use crate::error::{Failure, Result};
use crate::models::Token;

/// A string with non-whitespace content after trimming.
#[must_use]
pub fn valid_string(v: &str) -> bool {
    !v.trim().is_empty()
}

/// A finite number `>= 0`. Zero is accepted; negatives never are.
#[must_use]
pub fn valid_number(v: f64) -> bool {
    v.is_finite() && v >= 0.0
}

/// Syntactic email validity.
#[must_use]
pub fn valid_email(v: &str) -> bool {
    Email::parse(v).is_ok()
}

/// Control-flow gate on a numeric outcome code: only 200 and 201 pass.
///
/// Used between steps that surface a provider's status code rather than a
/// typed error; it is not an HTTP status check at that point.
///
/// # Errors
///
/// [`Failure::Upstream`] for any code other than 200 or 201.
pub fn status_gate(code: u16) -> Result<()> {
    if code == 200 || code == 201 {
        Ok(())
    } else {
        Err(Failure::Upstream(format!("outcome code {code} is not a success")))
    }
}

/// Token validity: owned by `email` and not yet expired.
///
/// # Errors
///
/// [`Failure::InvalidOrExpiredToken`] on any mismatch or past expiry.
pub fn token_not_expired(token: &Token, email: &Email) -> Result<()> {
    if token.email == *email && token.expires > now_ms() {
        Ok(())
    } else {
        Err(Failure::InvalidOrExpiredToken)
    }
}

/// Membership gate: the value must be present in the array.
///
/// # Errors
///
/// [`Failure::NotFound`] when absent.
pub fn value_in_array<T: PartialEq + std::fmt::Display>(value: &T, array: &[T]) -> Result<()> {
    if array.contains(value) {
        Ok(())
    } else {
        Err(Failure::NotFound(value.to_string()))
    }
}

/// Membership gate: the value must be absent from the array.
///
/// # Errors
///
/// [`Failure::AlreadyExists`] when present.
pub fn value_not_in_array<T: PartialEq + std::fmt::Display>(value: &T, array: &[T]) -> Result<()> {
    if array.contains(value) {
        Err(Failure::AlreadyExists(value.to_string()))
    } else {
        Ok(())
    }
}

/// The update-merge algorithm used by every PUT pipeline.
///
/// Both objects must have identical key sets; callers pre-populate fields
/// that are not eligible for update (id, email, token, ...) with a literal
/// `false` sentinel. Every incoming value that is not `false` and differs
/// from the current value is merged and counted. `current` is never
/// mutated; the merged document is returned.
///
/// # Errors
///
/// - [`Failure::MissingOrInvalidFields`] when the key sets differ
/// - [`Failure::NoChange`] when zero fields changed
pub fn merge_changes(
    current: &Map<String, Value>,
    incoming: &Map<String, Value>,
) -> Result<Map<String, Value>> {
    let mut current_keys: Vec<&String> = current.keys().collect();
    let mut incoming_keys: Vec<&String> = incoming.keys().collect();
    current_keys.sort();
    incoming_keys.sort();
    if current_keys != incoming_keys {
        return Err(Failure::MissingOrInvalidFields(
            "different keys in objects".to_owned(),
        ));
    }

    let mut merged = current.clone();
    let mut changed = 0_usize;
    for (key, new_value) in incoming {
        if *new_value == Value::Bool(false) {
            continue;
        }
        if current.get(key) != Some(new_value) {
            merged.insert(key.clone(), new_value.clone());
            changed += 1;
        }
    }

    if changed == 0 {
        return Err(Failure::NoChange);
    }
    Ok(merged)
}
