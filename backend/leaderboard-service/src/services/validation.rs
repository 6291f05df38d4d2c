//! Submission validation: score coercion and name normalization.

use serde_json::Value;
use thiserror::Error;

/// Name stored when a submission carries no usable name.
pub const PLACEHOLDER_NAME: &str = "익명 노동자";

pub const MAX_NAME_CHARS: usize = 32;

/// Largest accepted score: 2^53 - 1, exact both as a JavaScript number on
/// the client and as a 64-bit integer in the document store.
pub const MAX_SCORE: u64 = (1 << 53) - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("score must be a finite, non-negative number no larger than 2^53 - 1")]
    InvalidScore,
}

/// Coerce a client-supplied score to a stored score.
///
/// Accepts JSON numbers and numeric strings; the value must be finite,
/// non-negative and at most [`MAX_SCORE`] once floored.
pub fn coerce_score(raw: Option<&Value>) -> Result<u64, ValidationError> {
    let value = match raw {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .ok_or(ValidationError::InvalidScore)?;

    if !value.is_finite() || value < 0.0 {
        return Err(ValidationError::InvalidScore);
    }

    let floored = value.floor();
    if floored > MAX_SCORE as f64 {
        return Err(ValidationError::InvalidScore);
    }

    Ok(floored as u64)
}

/// Trim, cap at [`MAX_NAME_CHARS`] characters, fall back to [`PLACEHOLDER_NAME`].
pub fn normalize_name(raw: Option<&Value>) -> String {
    let text = match raw {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    };

    let name: String = text.trim().chars().take(MAX_NAME_CHARS).collect();
    if name.is_empty() {
        PLACEHOLDER_NAME.to_string()
    } else {
        name
    }
}
