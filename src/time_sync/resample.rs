//! Resampling core: observations -> per-unit points -> uniform buckets.
//!
//! 1) Parse and sort observation windows, reject overlaps.
//! 2) Decide the upsampling resolution and check every span divides by it.
//! 3) Upsample each window into `duration / resolution` points; fill timeline
//!    gaps and (if allowed) the edges of the global window with synthetic points.
//! 4) Drop points outside `[start-time, end-time)`.
//! 5) Downsample the points into `interval`-long buckets.
//!
//! Everything that can fail is checked in 1) and 2), before any point exists.

use crate::error::{EngineError, Result};
use crate::manifest::Observation;
use crate::manifest::observation::{DURATION, TIMESTAMP, number_value};
use crate::params::{AggregationMethod, ParameterRegistry};
use crate::time_sync::config::{TimeSyncConfig, format_timestamp, parse_timestamp, shift_secs};

use serde_json::Value;

const TIME_RESERVED: &str = "time-reserved";

/// One observation placed on the time axis.
#[derive(Debug, Clone)]
struct Window {
    start: i64,
    duration: i64,
    /// Every field except `timestamp` and `duration`.
    fields: Observation,
}

impl Window {
    fn end(&self) -> i64 {
        self.start + self.duration
    }
}

/// One upsampled time point.
#[derive(Debug, Clone)]
struct Point {
    start: i64,
    duration: i64,
    fields: Observation,
}

/// Which edges of the global window need synthetic points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Padding {
    start: bool,
    end: bool,
}

impl Padding {
    fn needed(&self) -> bool {
        self.start || self.end
    }

    fn describe(&self) -> &'static str {
        match (self.start, self.end) {
            (true, true) => "start and end",
            (true, false) => "start",
            _ => "end",
        }
    }
}

pub(crate) struct Resampler<'a> {
    config: &'a TimeSyncConfig,
    params: &'a ParameterRegistry,
}

impl<'a> Resampler<'a> {
    pub(crate) fn new(config: &'a TimeSyncConfig, params: &'a ParameterRegistry) -> Self {
        Self { config, params }
    }

    pub(crate) fn run(&self, inputs: &[Observation]) -> Result<Vec<Observation>> {
        if inputs.is_empty() {
            tracing::debug!("time-sync received no observations; nothing to resample");
            return Ok(Vec::new());
        }

        let windows = parse_windows(inputs)?;
        check_overlaps(&windows)?;

        let padding = self.check_padding(&windows)?;
        let resolution = self.resolution(&windows)?;
        tracing::debug!(
            "time-sync: {} observations, resolution {}s, interval {}s, padding {:?}",
            windows.len(),
            resolution,
            self.config.interval,
            padding
        );

        let points = self.upsample(&windows, padding, resolution);
        let start = self.config.start_secs();
        let end = self.config.end_secs();
        let points: Vec<Point> = points
            .into_iter()
            .filter(|p| p.start >= start && p.start < end)
            .collect();

        self.downsample(&points)
    }

    fn check_padding(&self, windows: &[Window]) -> Result<Padding> {
        let (Some(first), Some(last)) = (windows.first(), windows.last()) else {
            return Ok(Padding::default());
        };
        let padding = Padding {
            start: first.start > self.config.start_secs(),
            end: last.end() < self.config.end_secs(),
        };
        if padding.needed() && !self.config.allow_padding {
            return Err(EngineError::TemporalAlignment(format!(
                "Avoiding padding at {}",
                padding.describe()
            )));
        }
        Ok(padding)
    }

    /// Spans that must be whole multiples of the resolution, tagged by what
    /// they are for error reporting.
    fn spans(&self, windows: &[Window]) -> (Vec<i64>, Vec<i64>) {
        let durations: Vec<i64> = windows.iter().map(|w| w.duration).collect();

        let mut gaps: Vec<i64> = windows
            .windows(2)
            .map(|pair| pair[1].start - pair[0].end())
            .filter(|gap| *gap > 0)
            .collect();
        if let (Some(first), Some(last)) = (windows.first(), windows.last()) {
            let lead = (first.start - self.config.start_secs()).abs();
            let tail = (self.config.end_secs() - last.end()).abs();
            gaps.extend([lead, tail].into_iter().filter(|span| *span > 0));
        }

        (durations, gaps)
    }

    fn resolution(&self, windows: &[Window]) -> Result<i64> {
        let (durations, gaps) = self.spans(windows);

        let Some(resolution) = self.config.upsampling_resolution else {
            // Largest step every span divides by.
            let inferred = durations
                .iter()
                .chain(gaps.iter())
                .fold(self.config.interval, |acc, span| gcd(acc, *span));
            return Ok(inferred.max(1));
        };

        if self.config.interval % resolution != 0 {
            return Err(EngineError::Configuration(
                "The upsampling resolution must be a divisor of the given interval, but the \
                 provided value does not satisfy this criteria."
                    .to_string(),
            ));
        }
        if durations.iter().any(|d| d % resolution != 0) {
            return Err(EngineError::TemporalAlignment(
                "The upsampling resolution must be a divisor of all inputs durations, but the \
                 provided values do not satisfy this criteria."
                    .to_string(),
            ));
        }
        if gaps.iter().any(|g| g % resolution != 0) {
            return Err(EngineError::TemporalAlignment(
                "The upsampling resolution must be a divisor of gaps and paddings in the \
                 time-series, but the provided values do not satisfy this criteria."
                    .to_string(),
            ));
        }
        Ok(resolution)
    }

    fn upsample(&self, windows: &[Window], padding: Padding, resolution: i64) -> Vec<Point> {
        let mut points = Vec::new();

        if let (true, Some(first)) = (padding.start, windows.first()) {
            self.fill(&mut points, first, self.config.start_secs(), first.start, resolution);
        }

        for (idx, window) in windows.iter().enumerate() {
            if idx > 0 {
                let previous_end = windows[idx - 1].end();
                if window.start > previous_end {
                    self.fill(&mut points, window, previous_end, window.start, resolution);
                }
            }
            self.break_down(&mut points, window, resolution);
        }

        if let (true, Some(last)) = (padding.end, windows.last()) {
            self.fill(&mut points, last, last.end(), self.config.end_secs(), resolution);
        }

        points
    }

    /// Spread one observation over its sub-points. Sum-type numbers are split
    /// evenly; everything else is copied to every point.
    fn break_down(&self, points: &mut Vec<Point>, window: &Window, resolution: i64) {
        let count = (window.duration / resolution).max(1);

        let mut fields = Observation::new();
        for (key, value) in &window.fields {
            let spread = match (self.params.lookup(key), value) {
                (AggregationMethod::Sum, Value::Number(n)) => n
                    .as_f64()
                    .map(|v| number_value(v / count as f64))
                    .unwrap_or_else(|| value.clone()),
                _ => value.clone(),
            };
            fields.insert(key.clone(), spread);
        }

        for step in 0..count {
            points.push(Point {
                start: window.start + step * resolution,
                duration: resolution,
                fields: fields.clone(),
            });
        }
    }

    /// Synthetic points covering `[from, to)`, shaped after `template`:
    /// sum/avg numbers become zero, constants and descriptive values carry over.
    fn fill(&self, points: &mut Vec<Point>, template: &Window, from: i64, to: i64, resolution: i64) {
        let mut fields = Observation::new();
        for (key, value) in &template.fields {
            let filled = if key == TIME_RESERVED {
                Value::from(resolution)
            } else {
                match (self.params.lookup(key), value) {
                    (AggregationMethod::Sum | AggregationMethod::Avg, Value::Number(_)) => {
                        Value::from(0)
                    }
                    _ => value.clone(),
                }
            };
            fields.insert(key.clone(), filled);
        }

        let mut at = from;
        while at < to {
            points.push(Point {
                start: at,
                duration: resolution.min(to - at),
                fields: fields.clone(),
            });
            at += resolution;
        }
    }

    /// A bucket's `duration` is the seconds it covers: the interval, or less
    /// for a final bucket truncated by `end-time`.
    fn downsample(&self, points: &[Point]) -> Result<Vec<Observation>> {
        let start = self.config.start_secs();
        let end = self.config.end_secs();
        let interval = self.config.interval;

        let mut buckets: Vec<Vec<&Point>> = vec![Vec::new(); self.config.bucket_count()];
        for point in points {
            let idx = ((point.start - start) / interval) as usize;
            if let Some(bucket) = buckets.get_mut(idx) {
                bucket.push(point);
            }
        }

        let mut out = Vec::with_capacity(buckets.len());
        for (idx, bucket) in buckets.iter().enumerate() {
            let bucket_start = start + idx as i64 * interval;
            let covered: i64 = if bucket.is_empty() {
                interval.min(end - bucket_start)
            } else {
                bucket.iter().map(|p| p.duration).sum()
            };

            let mut observation = Observation::new();
            observation.insert(TIMESTAMP.to_string(), Value::from(format_timestamp(bucket_start)?));
            observation.insert(DURATION.to_string(), Value::from(covered));

            for key in field_order(bucket) {
                let values: Vec<&Value> = bucket.iter().filter_map(|p| p.fields.get(key)).collect();
                observation.insert(key.to_string(), self.combine(key, &values));
            }

            out.push(observation);
        }

        Ok(out)
    }

    /// Reduce one field's values within a bucket.
    fn combine(&self, key: &str, values: &[&Value]) -> Value {
        let Some(first) = values.first() else {
            return Value::Null;
        };

        let numbers: Option<Vec<f64>> = values.iter().map(|v| v.as_f64()).collect();
        match (self.params.lookup(key), numbers) {
            (AggregationMethod::Sum, Some(numbers)) => number_value(numbers.iter().sum()),
            (AggregationMethod::Avg, Some(numbers)) => {
                number_value(numbers.iter().sum::<f64>() / numbers.len() as f64)
            }
            _ => (*first).clone(),
        }
    }
}

/// Keys in order of first appearance across the bucket's points.
fn field_order<'p>(bucket: &[&'p Point]) -> Vec<&'p str> {
    let mut keys: Vec<&str> = Vec::new();
    for point in bucket {
        for key in point.fields.keys() {
            if !keys.contains(&key.as_str()) {
                keys.push(key);
            }
        }
    }
    keys
}

fn parse_windows(inputs: &[Observation]) -> Result<Vec<Window>> {
    let mut windows = Vec::with_capacity(inputs.len());

    for (idx, input) in inputs.iter().enumerate() {
        let start = match input.get(TIMESTAMP) {
            Some(Value::String(text)) => parse_timestamp(text)
                .ok_or_else(|| {
                    EngineError::Validation(format!(
                        "`timestamp` is not a valid ISO-8601 date-time at index {}: {:?}",
                        idx, text
                    ))
                })?
                .timestamp(),
            Some(other) => {
                return Err(EngineError::Validation(format!(
                    "Unexpected date datatype at index {}: {}",
                    idx, other
                )));
            }
            None => {
                return Err(EngineError::Validation(format!(
                    "`timestamp` is missing from input at index {}",
                    idx
                )));
            }
        };

        let duration = match input.get(DURATION).and_then(Value::as_f64) {
            Some(d) if d >= 1.0 && d.fract() == 0.0 => d as i64,
            Some(d) => {
                return Err(EngineError::Validation(format!(
                    "`duration` must be a whole number of seconds >= 1 at index {}, got {}",
                    idx, d
                )));
            }
            None => {
                return Err(EngineError::Validation(format!(
                    "`duration` is missing or not a number at index {}",
                    idx
                )));
            }
        };

        if shift_secs(start, duration).is_none() {
            return Err(EngineError::Validation(format!(
                "`duration` of {} seconds at index {} ends past the supported date range",
                duration, idx
            )));
        }

        let mut fields = input.clone();
        fields.remove(TIMESTAMP);
        fields.remove(DURATION);

        windows.push(Window {
            start,
            duration,
            fields,
        });
    }

    windows.sort_by_key(|w| w.start);
    Ok(windows)
}

fn check_overlaps(windows: &[Window]) -> Result<()> {
    for pair in windows.windows(2) {
        if pair[0].end() > pair[1].start {
            let at = format_timestamp(pair[1].start).unwrap_or_else(|_| pair[1].start.to_string());
            return Err(EngineError::TemporalAlignment(format!(
                "Observation timestamps overlap at {}, please check inputs.",
                at
            )));
        }
    }
    Ok(())
}

fn gcd(a: i64, b: i64) -> i64 {
    let (mut a, mut b) = (a.abs(), b.abs());
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}
