//! Logical expressions.

pub mod eval;

use std::fmt;

use arbor_types::{DataType, ScalarValue};

use crate::plan::{PlanNode, SourceId};

/// Type of an expression's result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SqlType {
    pub datatype: DataType,
    pub nullable: bool,
}

impl SqlType {
    pub const fn new(datatype: DataType, nullable: bool) -> Self {
        SqlType { datatype, nullable }
    }

    pub const fn boolean() -> Self {
        SqlType::new(DataType::Boolean, true)
    }
}

/// What the folder knows about an expression's value at rewrite time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constantness {
    Null,
    Constant,
    Variable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl ComparisonOp {
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "<>",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubqueryConditionKind {
    Exists,
    Any,
    All,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstantExpr {
    pub value: ScalarValue,
    pub sql_type: Option<SqlType>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BooleanConstantExpr {
    /// None is a NULL boolean.
    pub value: Option<bool>,
    pub sql_type: Option<SqlType>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnExpr {
    pub source: SourceId,
    pub position: usize,
    pub sql_type: Option<SqlType>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CastExpr {
    pub expr: Box<Expression>,
    pub to: DataType,
    pub sql_type: Option<SqlType>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonExpr {
    pub op: ComparisonOp,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
    pub sql_type: Option<SqlType>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionExpr {
    pub name: String,
    pub operands: Vec<Expression>,
    pub sql_type: Option<SqlType>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfElseExpr {
    pub test: Box<Expression>,
    pub then_expr: Box<Expression>,
    pub else_expr: Box<Expression>,
    pub sql_type: Option<SqlType>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubqueryExpr {
    pub subquery: Box<PlanNode>,
    pub sql_type: Option<SqlType>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubqueryConditionExpr {
    pub kind: SubqueryConditionKind,
    pub subquery: Box<PlanNode>,
    pub sql_type: Option<SqlType>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Constant(ConstantExpr),
    BooleanConstant(BooleanConstantExpr),
    Column(ColumnExpr),
    Cast(CastExpr),
    Comparison(ComparisonExpr),
    Function(FunctionExpr),
    IfElse(IfElseExpr),
    Subquery(SubqueryExpr),
    SubqueryCondition(SubqueryConditionExpr),
}

impl Expression {
    pub fn sql_type(&self) -> Option<SqlType> {
        match self {
            Self::Constant(e) => e.sql_type,
            Self::BooleanConstant(e) => e.sql_type,
            Self::Column(e) => e.sql_type,
            Self::Cast(e) => e.sql_type,
            Self::Comparison(e) => e.sql_type,
            Self::Function(e) => e.sql_type,
            Self::IfElse(e) => e.sql_type,
            Self::Subquery(e) => e.sql_type,
            Self::SubqueryCondition(e) => e.sql_type,
        }
    }

    pub fn constantness(&self) -> Constantness {
        match self {
            Self::Constant(c) if c.value.is_null() => Constantness::Null,
            Self::BooleanConstant(c) if c.value.is_none() => Constantness::Null,
            Self::Constant(_) | Self::BooleanConstant(_) => Constantness::Constant,
            _ => Constantness::Variable,
        }
    }

    /// If this expression produces a boolean condition.
    pub fn is_condition(&self) -> bool {
        match self {
            Self::BooleanConstant(_) | Self::Comparison(_) | Self::SubqueryCondition(_) => true,
            Self::Function(f) => crate::functions::scalar::find_function(&f.name)
                .is_some_and(|func| func.is_condition),
            _ => false,
        }
    }

    /// Constant value of this expression, if it is a constant.
    pub fn constant_value(&self) -> Option<ScalarValue> {
        match self {
            Self::Constant(c) => Some(c.value.clone()),
            Self::BooleanConstant(c) => Some(c.value.into()),
            _ => None,
        }
    }

    pub fn for_each_child_mut<F>(&mut self, func: &mut F)
    where
        F: FnMut(&mut Expression),
    {
        match self {
            Self::Constant(_)
            | Self::BooleanConstant(_)
            | Self::Column(_)
            | Self::Subquery(_)
            | Self::SubqueryCondition(_) => (),
            Self::Cast(e) => func(&mut e.expr),
            Self::Comparison(e) => {
                func(&mut e.left);
                func(&mut e.right);
            }
            Self::Function(e) => {
                for operand in &mut e.operands {
                    func(operand);
                }
            }
            Self::IfElse(e) => {
                func(&mut e.test);
                func(&mut e.then_expr);
                func(&mut e.else_expr);
            }
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(c) => match &c.value {
                ScalarValue::Utf8(s) => write!(f, "'{s}'"),
                other => write!(f, "{other}"),
            },
            Self::BooleanConstant(c) => match c.value {
                Some(true) => write!(f, "TRUE"),
                Some(false) => write!(f, "FALSE"),
                None => write!(f, "NULL"),
            },
            Self::Column(c) => write!(f, "#{}.{}", c.source, c.position),
            Self::Cast(c) => write!(f, "CAST({} AS {})", c.expr, c.to),
            Self::Comparison(c) => write!(f, "{} {} {}", c.left, c.op.symbol(), c.right),
            Self::Function(func) => {
                write!(f, "{}(", func.name)?;
                for (idx, operand) in func.operands.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{operand}")?;
                }
                write!(f, ")")
            }
            Self::IfElse(e) => write!(f, "IF({}, {}, {})", e.test, e.then_expr, e.else_expr),
            Self::Subquery(_) => write!(f, "(subquery)"),
            Self::SubqueryCondition(c) => write!(f, "{:?}(subquery)", c.kind),
        }
    }
}

/// Untyped constant.
pub fn lit(value: impl Into<ScalarValue>) -> Expression {
    let value = value.into();
    let sql_type = (!value.is_null()).then(|| SqlType::new(value.datatype(), false));
    Expression::Constant(ConstantExpr { value, sql_type })
}

pub fn null() -> Expression {
    Expression::Constant(ConstantExpr {
        value: ScalarValue::Null,
        sql_type: None,
    })
}

pub fn boolean(value: Option<bool>) -> Expression {
    Expression::BooleanConstant(BooleanConstantExpr {
        value,
        sql_type: Some(SqlType::boolean()),
    })
}

pub fn column(source: SourceId, position: usize, sql_type: SqlType) -> Expression {
    Expression::Column(ColumnExpr {
        source,
        position,
        sql_type: Some(sql_type),
    })
}

pub fn cast(expr: Expression, to: DataType) -> Expression {
    let nullable = expr.sql_type().is_none_or(|t| t.nullable);
    Expression::Cast(CastExpr {
        expr: Box::new(expr),
        to,
        sql_type: Some(SqlType::new(to, nullable)),
    })
}

pub fn compare(op: ComparisonOp, left: Expression, right: Expression) -> Expression {
    Expression::Comparison(ComparisonExpr {
        op,
        left: Box::new(left),
        right: Box::new(right),
        sql_type: Some(SqlType::boolean()),
    })
}

pub fn function(name: impl Into<String>, operands: impl IntoIterator<Item = Expression>) -> Expression {
    Expression::Function(FunctionExpr {
        name: name.into(),
        operands: operands.into_iter().collect(),
        sql_type: None,
    })
}

pub fn if_else(test: Expression, then_expr: Expression, else_expr: Expression) -> Expression {
    let sql_type = then_expr.sql_type();
    Expression::IfElse(IfElseExpr {
        test: Box::new(test),
        then_expr: Box::new(then_expr),
        else_expr: Box::new(else_expr),
        sql_type,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constantness_of_variants() {
        assert_eq!(Constantness::Null, null().constantness());
        assert_eq!(Constantness::Null, boolean(None).constantness());
        assert_eq!(Constantness::Constant, lit(3).constantness());
        assert_eq!(
            Constantness::Variable,
            column(1, 0, SqlType::new(DataType::Int32, false)).constantness()
        );
        assert_eq!(Constantness::Variable, cast(lit("1"), DataType::Int32).constantness());
    }

    #[test]
    fn display() {
        let expr = function(
            "plus",
            [cast(lit("123"), DataType::Int32), lit(0)],
        );
        assert_eq!("plus(CAST('123' AS INT), 0)", expr.to_string());

        let cond = compare(
            ComparisonOp::LtEq,
            column(2, 1, SqlType::new(DataType::Int64, true)),
            boolean(Some(true)),
        );
        assert_eq!("#2.1 <= TRUE", cond.to_string());
        assert!(cond.is_condition());
        assert!(function("isNullOp", [null()]).is_condition());
        assert!(!function("plus", [null()]).is_condition());
    }
}
