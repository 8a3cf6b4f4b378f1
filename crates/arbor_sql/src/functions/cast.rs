//! Casts between scalar values.
//!
//! Strings cast to integers the way MySQL does it: a string with trailing
//! garbage is truncated to its leading digits, and values outside the target
//! type are clamped to its bounds. Both produce a warning in the
//! [`CastContext`] instead of an error.

use std::fmt;

use arbor_types::scalar::EPOCH_DAYS_FROM_CE;
use arbor_types::{DataType, ScalarValue};
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use tracing::debug;

use crate::errors::CastError;

#[derive(Debug, Clone, PartialEq)]
pub enum CastWarning {
    /// Trailing text was dropped before parsing.
    Truncated { value: String, kept: String },
    /// Value did not fit the target and was replaced by the nearest bound.
    Clamped { value: String, target: DataType },
}

impl fmt::Display for CastWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated { value, kept } => write!(f, "Truncated '{value}' to '{kept}'"),
            Self::Clamped { value, target } => write!(f, "Clamped {value} into {target}"),
        }
    }
}

/// Collects warnings raised while casting.
#[derive(Debug, Default)]
pub struct CastContext {
    warnings: Vec<CastWarning>,
}

impl CastContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warnings(&self) -> &[CastWarning] {
        &self.warnings
    }

    fn warn(&mut self, warning: CastWarning) {
        debug!(%warning, "cast warning");
        self.warnings.push(warning);
    }
}

pub fn cast_scalar(
    value: &ScalarValue,
    to: DataType,
    ctx: &mut CastContext,
) -> Result<ScalarValue, CastError> {
    if value.is_null() {
        return Ok(ScalarValue::Null);
    }
    let from = value.datatype();
    if from == to {
        return Ok(value.clone());
    }
    let unsupported = || CastError::Unsupported { from, to };

    match (value, to) {
        (_, DataType::Utf8) => Ok(ScalarValue::Utf8(value.to_string())),
        (ScalarValue::Utf8(s), to) if to.is_integer() => {
            let v = parse_integer(s, to, ctx)?;
            Ok(clamp_integer(v as i128, to, ctx))
        }
        (ScalarValue::Boolean(b), to) if to.is_integer() => Ok(clamp_integer(*b as i128, to, ctx)),
        (ScalarValue::Float64(f), to) if to.is_integer() => {
            let rounded = f.round();
            if !rounded.is_finite() {
                return Err(CastError::OutOfRange {
                    value: f.to_string(),
                    target: to,
                });
            }
            // Saturating conversion, clamp handles the rest.
            Ok(clamp_integer(rounded as i128, to, ctx))
        }
        (v, to) if to.is_integer() => {
            let v = v.try_as_i128().ok_or_else(unsupported)?;
            Ok(clamp_integer(v, to, ctx))
        }
        (ScalarValue::Utf8(s), DataType::Float64) => s
            .trim()
            .parse::<f64>()
            .map(ScalarValue::Float64)
            .map_err(|_| out_of_range(s, to)),
        (v, DataType::Float64) => v.try_as_f64().map(ScalarValue::Float64).ok_or_else(unsupported),
        (ScalarValue::Utf8(s), DataType::Boolean) => parse_bool(s).ok_or_else(|| out_of_range(s, to)),
        (v, DataType::Boolean) => v
            .try_as_i128()
            .map(|v| ScalarValue::Boolean(v != 0))
            .ok_or_else(unsupported),
        (ScalarValue::Utf8(s), DataType::Date32) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(|d| ScalarValue::Date32(d.num_days_from_ce() - EPOCH_DAYS_FROM_CE))
            .map_err(|_| out_of_range(s, to)),
        (ScalarValue::Utf8(s), DataType::Time64) => parse_time(s.trim())
            .map(|t| {
                let micros = t.num_seconds_from_midnight() as i64 * 1_000_000
                    + (t.nanosecond() / 1000) as i64;
                ScalarValue::Time64(micros)
            })
            .ok_or_else(|| out_of_range(s, to)),
        (ScalarValue::Utf8(s), DataType::Timestamp) => parse_timestamp(s.trim())
            .map(|ts| ScalarValue::Timestamp(ts.and_utc().timestamp_micros()))
            .ok_or_else(|| out_of_range(s, to)),
        (ScalarValue::Timestamp(micros), DataType::Date32) => {
            Ok(ScalarValue::Date32(micros.div_euclid(86_400_000_000) as i32))
        }
        _ => Err(unsupported()),
    }
}

fn out_of_range(s: &str, target: DataType) -> CastError {
    CastError::OutOfRange {
        value: s.to_string(),
        target,
    }
}

/// Parse as i64, retrying on the leading `[+-]?digits` prefix.
fn parse_integer(s: &str, target: DataType, ctx: &mut CastContext) -> Result<i64, CastError> {
    let trimmed = s.trim();
    if let Ok(v) = trimmed.parse::<i64>() {
        return Ok(v);
    }

    let sign_len = usize::from(trimmed.starts_with(['+', '-']));
    let digits = trimmed[sign_len..]
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();
    let kept = &trimmed[..sign_len + digits];
    match kept.parse::<i64>() {
        Ok(v) => {
            ctx.warn(CastWarning::Truncated {
                value: s.to_string(),
                kept: kept.to_string(),
            });
            Ok(v)
        }
        Err(_) => Err(out_of_range(s, target)),
    }
}

fn clamp_integer(v: i128, target: DataType, ctx: &mut CastContext) -> ScalarValue {
    let Some((min, max)) = target.integer_bounds() else {
        return ScalarValue::Null;
    };
    let clamped = v.clamp(min, max);
    if clamped != v {
        ctx.warn(CastWarning::Clamped {
            value: v.to_string(),
            target,
        });
    }
    // In bounds by construction.
    ScalarValue::try_integer_of_type(target, clamped).unwrap_or(ScalarValue::Null)
}

fn parse_bool(s: &str) -> Option<ScalarValue> {
    let b = match s.trim().to_ascii_lowercase().as_str() {
        "t" | "true" | "1" | "y" | "yes" => true,
        "f" | "false" | "0" | "n" | "no" => false,
        _ => return None,
    };
    Some(ScalarValue::Boolean(b))
}

fn parse_time(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .ok()
}

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
