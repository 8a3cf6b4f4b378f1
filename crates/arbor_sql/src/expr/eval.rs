//! Evaluation of expressions without an input row.

use std::cmp::Ordering;

use arbor_types::ScalarValue;

use super::{ComparisonOp, Expression};
use crate::errors::{Result, SqlError, internal};
use crate::functions::cast::{CastContext, cast_scalar};
use crate::functions::scalar::{compare_values, find_function};

/// Evaluate an expression that references no columns or subqueries.
pub fn evaluate_constant(expr: &Expression, ctx: &mut CastContext) -> Result<ScalarValue> {
    match expr {
        Expression::Constant(c) => Ok(c.value.clone()),
        Expression::BooleanConstant(c) => Ok(c.value.into()),
        Expression::Cast(c) => {
            let value = evaluate_constant(&c.expr, ctx)?;
            Ok(cast_scalar(&value, c.to, ctx)?)
        }
        Expression::Comparison(c) => {
            let left = evaluate_constant(&c.left, ctx)?;
            let right = evaluate_constant(&c.right, ctx)?;
            let Some(ord) = compare_values(&left, &right)? else {
                return Ok(ScalarValue::Null);
            };
            let result = match c.op {
                ComparisonOp::Eq => ord == Ordering::Equal,
                ComparisonOp::NotEq => ord != Ordering::Equal,
                ComparisonOp::Lt => ord == Ordering::Less,
                ComparisonOp::LtEq => ord != Ordering::Greater,
                ComparisonOp::Gt => ord == Ordering::Greater,
                ComparisonOp::GtEq => ord != Ordering::Less,
            };
            Ok(ScalarValue::Boolean(result))
        }
        Expression::Function(f) => {
            let function =
                find_function(&f.name).ok_or_else(|| SqlError::UnknownFunction(f.name.clone()))?;
            let args = f
                .operands
                .iter()
                .map(|operand| evaluate_constant(operand, ctx))
                .collect::<Result<Vec<_>>>()?;
            let value = function.call(&args)?;
            match f.sql_type {
                Some(t) if !value.is_null() && t.datatype != value.datatype() => {
                    Ok(cast_scalar(&value, t.datatype, ctx)?)
                }
                _ => Ok(value),
            }
        }
        Expression::IfElse(e) => match evaluate_constant(&e.test, ctx)? {
            ScalarValue::Boolean(true) => evaluate_constant(&e.then_expr, ctx),
            ScalarValue::Boolean(false) | ScalarValue::Null => evaluate_constant(&e.else_expr, ctx),
            other => Err(internal!("IF test evaluated to non-boolean {other}")),
        },
        Expression::Column(_) | Expression::Subquery(_) | Expression::SubqueryCondition(_) => {
            Err(SqlError::NotConstant(expr.to_string()))
        }
    }
}
