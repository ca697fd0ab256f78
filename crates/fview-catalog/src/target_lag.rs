//! Target lag parsing and comparison.
//!
//! The warehouse reports lags in its own spelling (`"1 minute"` for a declared
//! `"60 seconds"`), so drift is decided on the parsed duration rather than the
//! text.

use std::fmt;

/// Parsed target lag of a managed feature view.
#[derive(Debug, Clone)]
pub struct TargetLag {
    text: String,
    kind: LagKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LagKind {
    Seconds(u64),
    Downstream,
}

/// Errors for target lag parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TargetLagError {
    /// Lag text is empty.
    #[error("target lag cannot be empty")]
    Empty,

    /// Lag text is not `<n> <unit>` or `DOWNSTREAM`.
    #[error("invalid target lag '{0}' (expected e.g. '5 minutes' or 'DOWNSTREAM')")]
    Invalid(String),

    /// Lag is zero.
    #[error("target lag must be greater than zero: '{0}'")]
    Zero(String),
}

impl TargetLag {
    /// Parses a lag such as `"5 minutes"`, `"1 hour"`, `"30seconds"` or `"DOWNSTREAM"`.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is empty, malformed, or zero.
    pub fn parse(input: &str) -> Result<Self, TargetLagError> {
        let text = input.split_whitespace().collect::<Vec<_>>().join(" ");
        if text.is_empty() {
            return Err(TargetLagError::Empty);
        }
        if text.eq_ignore_ascii_case("downstream") {
            return Ok(Self {
                text: "DOWNSTREAM".to_string(),
                kind: LagKind::Downstream,
            });
        }

        let split = text
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| TargetLagError::Invalid(text.clone()))?;
        let (number, unit) = text.split_at(split);
        let count: u64 = number
            .parse()
            .map_err(|_| TargetLagError::Invalid(text.clone()))?;
        let multiplier = unit_seconds(unit.trim()).ok_or_else(|| TargetLagError::Invalid(text.clone()))?;
        if count == 0 {
            return Err(TargetLagError::Zero(text));
        }
        let seconds = count
            .checked_mul(multiplier)
            .ok_or_else(|| TargetLagError::Invalid(text.clone()))?;

        Ok(Self {
            text,
            kind: LagKind::Seconds(seconds),
        })
    }

    /// Returns the lag as declared (whitespace normalized).
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Returns true for `DOWNSTREAM`.
    #[must_use]
    pub fn is_downstream(&self) -> bool {
        self.kind == LagKind::Downstream
    }

    /// Returns the lag in seconds, or `None` for `DOWNSTREAM`.
    #[must_use]
    pub fn seconds(&self) -> Option<u64> {
        match self.kind {
            LagKind::Seconds(s) => Some(s),
            LagKind::Downstream => None,
        }
    }

    /// Returns true if `observed` (as reported by the warehouse) is the same lag.
    ///
    /// Unparseable observations never match.
    #[must_use]
    pub fn matches_observed(&self, observed: &str) -> bool {
        Self::parse(observed).is_ok_and(|o| o == *self)
    }
}

impl PartialEq for TargetLag {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl Eq for TargetLag {}

impl fmt::Display for TargetLag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

fn unit_seconds(unit: &str) -> Option<u64> {
    match unit.to_ascii_lowercase().as_str() {
        "second" | "seconds" | "sec" | "secs" => Some(1),
        "minute" | "minutes" | "min" | "mins" => Some(60),
        "hour" | "hours" => Some(60 * 60),
        "day" | "days" => Some(24 * 60 * 60),
        _ => None,
    }
}
