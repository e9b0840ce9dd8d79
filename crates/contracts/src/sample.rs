//! RealtimeSample - one polling tick of trainer telemetry
//!
//! `SampleName` uses `Arc<str>` internally so the per-tick clone of the
//! device label is a reference count bump, never a bounded buffer copy.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use crate::ContractError;

/// Maximum length of a sample name in bytes
pub const MAX_SAMPLE_NAME_LEN: usize = 64;

/// Length-checked device/sample label.
///
/// # Examples
/// ```
/// use contracts::SampleName;
///
/// let name = SampleName::new("KICKR").unwrap();
/// assert_eq!(name.as_str(), "KICKR");
/// assert!(SampleName::new(&"x".repeat(65)).is_err());
/// ```
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct SampleName(Arc<str>);

impl SampleName {
    /// Validate and create a name.
    pub fn new(s: &str) -> Result<Self, ContractError> {
        if s.len() > MAX_SAMPLE_NAME_LEN {
            return Err(ContractError::InvalidSampleName {
                message: format!(
                    "{} bytes exceeds maximum of {MAX_SAMPLE_NAME_LEN}",
                    s.len()
                ),
            });
        }
        if s.chars().any(char::is_control) {
            return Err(ContractError::InvalidSampleName {
                message: "contains control characters".to_string(),
            });
        }
        Ok(Self(Arc::from(s)))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for SampleName {
    type Target = str;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl TryFrom<&str> for SampleName {
    type Error = ContractError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl TryFrom<String> for SampleName {
    type Error = ContractError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(&s)
    }
}

impl fmt::Display for SampleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for SampleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SampleName({:?})", self.0)
    }
}

impl Serialize for SampleName {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for SampleName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::new(&s).map_err(serde::de::Error::custom)
    }
}

/// Telemetry sample
///
/// Produced once per polling tick by a `SampleSource` and moved into the
/// sync engine for a single update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RealtimeSample {
    /// Device label
    #[serde(default)]
    pub name: SampleName,

    /// Power (watts)
    #[serde(default)]
    pub power_w: f64,

    /// Heart rate (bpm)
    #[serde(default)]
    pub heart_rate_bpm: f64,

    /// Speed (km/h)
    #[serde(default)]
    pub speed_kmh: f64,

    /// Cadence (rpm)
    #[serde(default)]
    pub cadence_rpm: f64,

    /// Derived training load
    #[serde(default)]
    pub load: f64,

    /// Session elapsed time (ms), monotonic
    pub elapsed_ms: u64,
}

impl RealtimeSample {
    /// Sample with only elapsed time and speed set
    pub fn at(elapsed_ms: u64, speed_kmh: f64) -> Self {
        Self {
            elapsed_ms,
            speed_kmh,
            ..Default::default()
        }
    }

    /// Clamp negative or NaN readings to zero.
    ///
    /// Returns the sanitized sample and the number of fields that were
    /// out of range.
    pub fn sanitized(mut self) -> (Self, u32) {
        let mut clamped = 0;
        for value in [
            &mut self.power_w,
            &mut self.heart_rate_bpm,
            &mut self.speed_kmh,
            &mut self.cadence_rpm,
            &mut self.load,
        ] {
            if !value.is_finite() || *value < 0.0 {
                *value = 0.0;
                clamped += 1;
            }
        }
        (self, clamped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_is_cheap() {
        let a = SampleName::new("trainer").unwrap();
        let b = a.clone();
        assert_eq!(a.as_str().as_ptr(), b.as_str().as_ptr());
    }

    #[test]
    fn test_name_bounds() {
        assert!(SampleName::new(&"a".repeat(MAX_SAMPLE_NAME_LEN)).is_ok());
        assert!(SampleName::new(&"a".repeat(MAX_SAMPLE_NAME_LEN + 1)).is_err());
        assert!(SampleName::new("bad\nname").is_err());
    }

    #[test]
    fn test_name_serde_rejects_oversized() {
        let json = format!("\"{}\"", "z".repeat(100));
        let parsed: Result<SampleName, _> = serde_json::from_str(&json);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_sanitize_clamps_negative_and_nan() {
        let sample = RealtimeSample {
            speed_kmh: -3.0,
            power_w: f64::NAN,
            cadence_rpm: 90.0,
            ..RealtimeSample::at(1000, 0.0)
        };
        let (clean, clamped) = sample.sanitized();
        assert_eq!(clamped, 2);
        assert_eq!(clean.speed_kmh, 0.0);
        assert_eq!(clean.power_w, 0.0);
        assert_eq!(clean.cadence_rpm, 90.0);
    }

    #[test]
    fn test_sample_deserialize_defaults() {
        let sample: RealtimeSample =
            serde_json::from_str(r#"{"elapsed_ms": 2000, "speed_kmh": 30.5}"#).unwrap();
        assert_eq!(sample.elapsed_ms, 2000);
        assert_eq!(sample.speed_kmh, 30.5);
        assert_eq!(sample.name.as_str(), "");
    }
}
