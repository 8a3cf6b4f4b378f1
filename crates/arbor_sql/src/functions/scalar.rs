//! Builtin scalar functions usable at rewrite time.

use std::cmp::Ordering;

use arbor_types::scalar::EPOCH_DAYS_FROM_CE;
use arbor_types::{DataType, ScalarValue};
use chrono::{Datelike, Timelike, Utc};

use crate::errors::{Result, SqlError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionVolatility {
    /// Same inputs always give the same output.
    Consistent,
    /// Output may change between calls, never evaluated early.
    Volatile,
}

#[derive(Debug, Clone, Copy)]
pub struct ScalarFunction {
    pub name: &'static str,
    pub volatility: FunctionVolatility,
    /// Produces a boolean condition.
    pub is_condition: bool,
    /// Handles NULL inputs itself instead of returning NULL.
    pub null_handling: bool,
    pub eval: fn(&[ScalarValue]) -> Result<ScalarValue>,
}

impl ScalarFunction {
    pub fn is_volatile(&self) -> bool {
        self.volatility == FunctionVolatility::Volatile
    }

    pub fn call(&self, args: &[ScalarValue]) -> Result<ScalarValue> {
        if !self.null_handling && args.iter().any(ScalarValue::is_null) {
            return Ok(ScalarValue::Null);
        }
        (self.eval)(args)
    }
}

const fn consistent(name: &'static str, eval: fn(&[ScalarValue]) -> Result<ScalarValue>) -> ScalarFunction {
    ScalarFunction {
        name,
        volatility: FunctionVolatility::Consistent,
        is_condition: false,
        null_handling: false,
        eval,
    }
}

const fn volatile(name: &'static str, eval: fn(&[ScalarValue]) -> Result<ScalarValue>) -> ScalarFunction {
    ScalarFunction {
        name,
        volatility: FunctionVolatility::Volatile,
        is_condition: false,
        null_handling: false,
        eval,
    }
}

pub const BUILTIN_SCALAR_FUNCTIONS: &[ScalarFunction] = &[
    consistent("plus", plus),
    consistent("minus", minus),
    consistent("times", times),
    consistent("divide", divide),
    consistent("mod", modulo),
    consistent("abs", abs),
    consistent("concatenate", concatenate),
    consistent("upper", upper),
    consistent("lower", lower),
    consistent("length", length),
    ScalarFunction {
        is_condition: true,
        ..consistent("not", not)
    },
    ScalarFunction {
        is_condition: true,
        null_handling: true,
        ..consistent("and", and)
    },
    ScalarFunction {
        is_condition: true,
        null_handling: true,
        ..consistent("or", or)
    },
    ScalarFunction {
        is_condition: true,
        null_handling: true,
        ..consistent("isNullOp", is_null)
    },
    ScalarFunction {
        null_handling: true,
        ..consistent("COALESCE", coalesce)
    },
    volatile("currentDate", current_date),
    volatile("currentTime", current_time),
    volatile("currentTimestamp", current_timestamp),
    volatile("RAND", random),
];

/// Find a builtin by name, ignoring case.
pub fn find_function(name: &str) -> Option<&'static ScalarFunction> {
    BUILTIN_SCALAR_FUNCTIONS
        .iter()
        .find(|f| f.name.eq_ignore_ascii_case(name))
}

fn invalid(function: &str, reason: impl Into<String>) -> SqlError {
    SqlError::InvalidArguments {
        function: function.to_string(),
        reason: reason.into(),
    }
}

fn expect_args<'a, const N: usize>(function: &str, args: &'a [ScalarValue]) -> Result<&'a [ScalarValue; N]> {
    args.try_into()
        .map_err(|_| invalid(function, format!("expected {N} arguments, got {}", args.len())))
}

/// Integer type able to hold results of both operands. Unsigned only when
/// both are.
fn wider_integer(a: DataType, b: DataType) -> DataType {
    let width = |t: DataType| match t {
        DataType::Int8 | DataType::UInt8 => 1,
        DataType::Int16 | DataType::UInt16 => 2,
        DataType::Int32 | DataType::UInt32 => 3,
        _ => 4,
    };
    let unsigned = a.is_unsigned() && b.is_unsigned();
    match (width(a).max(width(b)), unsigned) {
        (1, false) => DataType::Int8,
        (2, false) => DataType::Int16,
        (3, false) => DataType::Int32,
        (1, true) => DataType::UInt8,
        (2, true) => DataType::UInt16,
        (3, true) => DataType::UInt32,
        (_, true) => DataType::UInt64,
        (_, false) => DataType::Int64,
    }
}

fn arith(
    name: &str,
    args: &[ScalarValue],
    int_op: fn(i128, i128) -> Option<i128>,
    float_op: fn(f64, f64) -> f64,
) -> Result<ScalarValue> {
    let [a, b] = expect_args::<2>(name, args)?;
    if let (Some(x), Some(y)) = (a.try_as_i128(), b.try_as_i128()) {
        let result_type = wider_integer(a.datatype(), b.datatype());
        let v = int_op(x, y).ok_or_else(|| invalid(name, "arithmetic overflow"))?;
        return ScalarValue::try_integer_of_type(result_type, v)
            .ok_or_else(|| invalid(name, format!("result {v} out of range for {result_type}")));
    }
    match (a.try_as_f64(), b.try_as_f64()) {
        (Some(x), Some(y)) => Ok(ScalarValue::Float64(float_op(x, y))),
        _ => Err(invalid(name, format!("cannot apply to {} and {}", a.datatype(), b.datatype()))),
    }
}

fn plus(args: &[ScalarValue]) -> Result<ScalarValue> {
    arith("plus", args, i128::checked_add, |a, b| a + b)
}

fn minus(args: &[ScalarValue]) -> Result<ScalarValue> {
    arith("minus", args, i128::checked_sub, |a, b| a - b)
}

fn times(args: &[ScalarValue]) -> Result<ScalarValue> {
    arith("times", args, i128::checked_mul, |a, b| a * b)
}

fn divide(args: &[ScalarValue]) -> Result<ScalarValue> {
    let [a, b] = expect_args::<2>("divide", args)?;
    match (a.try_as_f64(), b.try_as_f64()) {
        // Division by zero is NULL.
        (Some(_), Some(y)) if y == 0.0 => Ok(ScalarValue::Null),
        (Some(x), Some(y)) => Ok(ScalarValue::Float64(x / y)),
        _ => Err(invalid("divide", "expected numeric arguments")),
    }
}

fn modulo(args: &[ScalarValue]) -> Result<ScalarValue> {
    let [_, b] = expect_args::<2>("mod", args)?;
    if b.try_as_f64() == Some(0.0) {
        return Ok(ScalarValue::Null);
    }
    arith("mod", args, i128::checked_rem, |a, b| a % b)
}

fn abs(args: &[ScalarValue]) -> Result<ScalarValue> {
    let [a] = expect_args::<1>("abs", args)?;
    if let Some(v) = a.try_as_i128() {
        return ScalarValue::try_integer_of_type(a.datatype(), v.abs())
            .ok_or_else(|| invalid("abs", "arithmetic overflow"));
    }
    a.try_as_f64()
        .map(|v| ScalarValue::Float64(v.abs()))
        .ok_or_else(|| invalid("abs", "expected a numeric argument"))
}

fn concatenate(args: &[ScalarValue]) -> Result<ScalarValue> {
    let mut out = String::new();
    for arg in args {
        out.push_str(&arg.to_string());
    }
    Ok(ScalarValue::Utf8(out))
}

fn string_arg<'a>(name: &str, args: &'a [ScalarValue]) -> Result<&'a str> {
    let [a] = expect_args::<1>(name, args)?;
    a.try_as_str()
        .ok_or_else(|| invalid(name, format!("expected a string, got {}", a.datatype())))
}

fn upper(args: &[ScalarValue]) -> Result<ScalarValue> {
    Ok(ScalarValue::Utf8(string_arg("upper", args)?.to_uppercase()))
}

fn lower(args: &[ScalarValue]) -> Result<ScalarValue> {
    Ok(ScalarValue::Utf8(string_arg("lower", args)?.to_lowercase()))
}

fn length(args: &[ScalarValue]) -> Result<ScalarValue> {
    Ok(ScalarValue::Int64(string_arg("length", args)?.chars().count() as i64))
}

fn bool_arg(name: &str, v: &ScalarValue) -> Result<Option<bool>> {
    match v {
        ScalarValue::Null => Ok(None),
        ScalarValue::Boolean(b) => Ok(Some(*b)),
        other => Err(invalid(name, format!("expected a boolean, got {}", other.datatype()))),
    }
}

fn not(args: &[ScalarValue]) -> Result<ScalarValue> {
    let [a] = expect_args::<1>("not", args)?;
    Ok(bool_arg("not", a)?.map(|b| !b).into())
}

/// Three valued AND over any number of operands.
fn and(args: &[ScalarValue]) -> Result<ScalarValue> {
    let mut saw_null = false;
    for arg in args {
        match bool_arg("and", arg)? {
            Some(false) => return Ok(ScalarValue::Boolean(false)),
            None => saw_null = true,
            Some(true) => (),
        }
    }
    Ok(if saw_null { ScalarValue::Null } else { ScalarValue::Boolean(true) })
}

fn or(args: &[ScalarValue]) -> Result<ScalarValue> {
    let mut saw_null = false;
    for arg in args {
        match bool_arg("or", arg)? {
            Some(true) => return Ok(ScalarValue::Boolean(true)),
            None => saw_null = true,
            Some(false) => (),
        }
    }
    Ok(if saw_null { ScalarValue::Null } else { ScalarValue::Boolean(false) })
}

fn is_null(args: &[ScalarValue]) -> Result<ScalarValue> {
    let [a] = expect_args::<1>("isNullOp", args)?;
    Ok(ScalarValue::Boolean(a.is_null()))
}

fn coalesce(args: &[ScalarValue]) -> Result<ScalarValue> {
    Ok(args
        .iter()
        .find(|v| !v.is_null())
        .cloned()
        .unwrap_or(ScalarValue::Null))
}

fn current_date(_args: &[ScalarValue]) -> Result<ScalarValue> {
    let today = Utc::now().date_naive();
    Ok(ScalarValue::Date32(today.num_days_from_ce() - EPOCH_DAYS_FROM_CE))
}

fn current_time(_args: &[ScalarValue]) -> Result<ScalarValue> {
    let now = Utc::now().time();
    let micros = now.num_seconds_from_midnight() as i64 * 1_000_000 + (now.nanosecond() / 1000) as i64;
    Ok(ScalarValue::Time64(micros))
}

fn current_timestamp(_args: &[ScalarValue]) -> Result<ScalarValue> {
    Ok(ScalarValue::Timestamp(Utc::now().timestamp_micros()))
}

fn random(_args: &[ScalarValue]) -> Result<ScalarValue> {
    Ok(ScalarValue::Float64(rand::random::<f64>()))
}

/// Evaluate a comparison. NULL if either side is NULL.
pub fn compare_values(a: &ScalarValue, b: &ScalarValue) -> Result<Option<Ordering>> {
    if a.is_null() || b.is_null() {
        return Ok(None);
    }
    a.sql_cmp(b)
        .map(Some)
        .ok_or_else(|| invalid("compare", format!("cannot compare {} with {}", a.datatype(), b.datatype())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: &[ScalarValue]) -> ScalarValue {
        find_function(name).unwrap().call(args).unwrap()
    }

    #[test]
    fn arithmetic_widens() {
        assert_eq!(
            ScalarValue::Int32(123),
            call("plus", &[ScalarValue::Int32(123), ScalarValue::Int32(0)])
        );
        assert_eq!(
            ScalarValue::Int64(10),
            call("times", &[ScalarValue::Int8(2), ScalarValue::Int64(5)])
        );
        assert_eq!(
            ScalarValue::Float64(2.5),
            call("plus", &[ScalarValue::Float64(1.5), ScalarValue::Int32(1)])
        );
        assert_eq!(
            ScalarValue::Null,
            call("divide", &[ScalarValue::Int32(1), ScalarValue::Int32(0)])
        );
    }

    #[test]
    fn null_inputs() {
        assert_eq!(ScalarValue::Null, call("plus", &[ScalarValue::Null, ScalarValue::Int32(1)]));
        assert_eq!(
            ScalarValue::Boolean(false),
            call("and", &[ScalarValue::Null, ScalarValue::Boolean(false)])
        );
        assert_eq!(ScalarValue::Null, call("or", &[ScalarValue::Null, ScalarValue::Boolean(false)]));
        assert_eq!(ScalarValue::Boolean(true), call("isnullop", &[ScalarValue::Null]));
        assert_eq!(
            ScalarValue::Utf8("x".to_string()),
            call("coalesce", &[ScalarValue::Null, "x".into()])
        );
    }

    #[test]
    fn volatile_functions() {
        for name in ["currentDate", "currentTime", "currentTimestamp", "RAND"] {
            assert!(find_function(name).unwrap().is_volatile(), "{name}");
        }
        assert!(!find_function("plus").unwrap().is_volatile());
        assert!(find_function("nope").is_none());
    }

    #[test]
    fn wrong_arity() {
        let err = find_function("abs").unwrap().call(&[]).unwrap_err();
        assert!(matches!(err, SqlError::InvalidArguments { .. }));
    }
}
