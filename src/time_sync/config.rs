//! Time-sync configuration and timestamp parsing.
//!
//! Config shape:
//! {
//!   "start-time": "2023-12-12T00:00:00.000Z",
//!   "end-time": "2023-12-12T00:01:00.000Z",
//!   "interval": 5,
//!   "allow-padding": true,
//!   "upsampling-resolution": 1          // optional
//! }

use crate::error::{EngineError, Result};

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawTimeSyncConfig {
    start_time: String,
    end_time: String,
    interval: f64,
    allow_padding: bool,
    #[serde(default)]
    upsampling_resolution: Option<f64>,
}

/// Validated configuration. All spans are whole seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSyncConfig {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub interval: i64,
    pub allow_padding: bool,
    pub upsampling_resolution: Option<i64>,
}

impl TimeSyncConfig {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, interval: i64, allow_padding: bool) -> Result<Self> {
        let config = Self {
            start,
            end,
            interval,
            allow_padding,
            upsampling_resolution: None,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_upsampling_resolution(mut self, resolution: i64) -> Result<Self> {
        self.upsampling_resolution = Some(resolution);
        self.validate()?;
        Ok(self)
    }

    /// Parse and validate a JSON config object.
    pub fn from_value(value: &Value) -> Result<Self> {
        if value.as_object().is_none_or(|map| map.is_empty()) {
            return Err(EngineError::Configuration("Config is not provided.".to_string()));
        }

        let raw: RawTimeSyncConfig = serde_json::from_value(value.clone())
            .map_err(|e| EngineError::Configuration(format!("time-sync config: {}", e)))?;

        let start = parse_timestamp(&raw.start_time).ok_or_else(|| {
            EngineError::Configuration(format!(
                "`start-time` is not a valid ISO-8601 date-time: {:?}",
                raw.start_time
            ))
        })?;
        let end = parse_timestamp(&raw.end_time).ok_or_else(|| {
            EngineError::Configuration(format!(
                "`end-time` is not a valid ISO-8601 date-time: {:?}",
                raw.end_time
            ))
        })?;

        let config = Self {
            start,
            end,
            interval: whole_seconds("interval", raw.interval)?,
            allow_padding: raw.allow_padding,
            upsampling_resolution: raw
                .upsampling_resolution
                .map(|r| whole_seconds("upsampling-resolution", r))
                .transpose()?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.start >= self.end {
            return Err(EngineError::Configuration(
                "`start-time` should be lower than `end-time`".to_string(),
            ));
        }
        if self.interval <= 0 {
            return Err(EngineError::Configuration(format!(
                "`interval` must be a positive number of seconds, got {}",
                self.interval
            )));
        }
        if shift_secs(self.start_secs(), self.interval).is_none() {
            return Err(EngineError::Configuration(format!(
                "`interval` of {} seconds reaches past the supported date range",
                self.interval
            )));
        }
        if let Some(resolution) = self.upsampling_resolution {
            if resolution < 1 {
                return Err(EngineError::Configuration(format!(
                    "`upsampling-resolution` must be at least 1 second, got {}",
                    resolution
                )));
            }
        }
        Ok(())
    }

    pub(crate) fn start_secs(&self) -> i64 {
        self.start.timestamp()
    }

    pub(crate) fn end_secs(&self) -> i64 {
        self.end.timestamp()
    }

    /// Number of buckets on the output grid.
    pub fn bucket_count(&self) -> usize {
        let span = self.end_secs() - self.start_secs();
        if span <= 0 {
            return 0;
        }
        ((span - 1) / self.interval + 1) as usize
    }
}

/// `secs + span`, if the result is still a representable date-time.
pub(crate) fn shift_secs(secs: i64, span: i64) -> Option<i64> {
    secs.checked_add(span)
        .filter(|shifted| DateTime::<Utc>::from_timestamp(*shifted, 0).is_some())
}

fn whole_seconds(field: &str, value: f64) -> Result<i64> {
    if !value.is_finite() || value.fract() != 0.0 {
        return Err(EngineError::Configuration(format!(
            "`{}` must be a whole number of seconds, got {}",
            field, value
        )));
    }
    Ok(value as i64)
}

/// Parse an ISO-8601 timestamp. Values without an offset are taken as UTC.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Render whole seconds since the epoch as `2023-12-12T00:00:05.000Z`.
pub fn format_timestamp(secs: i64) -> Result<String> {
    DateTime::<Utc>::from_timestamp(secs, 0)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
        .ok_or_else(|| EngineError::Validation(format!("timestamp {} is out of range", secs)))
}
