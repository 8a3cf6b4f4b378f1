//! Constant folding over a logical plan.
//!
//! Expressions are folded children first. Evaluation is best effort, an
//! expression that fails to evaluate is left as is and will fail at execution
//! time instead.

use std::collections::HashMap;
use std::mem;

use arbor_types::ScalarValue;
use tracing::{debug, trace, warn};

use super::PlanRule;
use crate::errors::Result;
use crate::expr::eval::evaluate_constant;
use crate::expr::{
    BooleanConstantExpr, ColumnExpr, ConstantExpr, Constantness, Expression, FunctionExpr, SqlType,
};
use crate::functions::cast::CastContext;
use crate::functions::scalar::find_function;
use crate::plan::{JoinType, NoRows, PlanNode, SourceId};

#[derive(Debug)]
pub struct FoldConstants {
    max_passes: usize,
}

impl FoldConstants {
    pub fn new(max_passes: usize) -> Self {
        FoldConstants {
            max_passes: max_passes.max(1),
        }
    }
}

impl PlanRule for FoldConstants {
    fn name(&self) -> &'static str {
        "fold_constants"
    }

    fn apply(&mut self, mut plan: PlanNode) -> Result<PlanNode> {
        let mut folder = Folder::default();
        for pass in 1..=self.max_passes {
            folder.changed = false;
            plan = folder.fold_plan(plan);
            if !folder.changed {
                debug!(passes = pass, "constant folding reached fixpoint");
                return Ok(plan);
            }
        }
        warn!(max_passes = self.max_passes, "constant folding stopped before fixpoint");
        Ok(plan)
    }
}

/// One folder is used for every pass over a plan so that substitutions
/// recorded while rewriting sources apply to columns visited later.
#[derive(Debug, Default)]
struct Folder {
    substitutions: HashMap<SourceId, SourceId>,
    changed: bool,
}

impl Folder {
    fn fold_plan(&mut self, mut plan: PlanNode) -> PlanNode {
        plan.for_each_child_mut(&mut |child| {
            let owned = mem::replace(child, PlanNode::NoRows(NoRows));
            *child = self.fold_plan(owned);
        });
        plan.for_each_expr_mut(&mut |expr| self.fold_expr(expr));

        match self.rewrite_plan(plan) {
            Rewrite::Changed(plan) => {
                self.changed = true;
                plan
            }
            Rewrite::Unchanged(plan) => plan,
        }
    }

    fn rewrite_plan(&mut self, plan: PlanNode) -> Rewrite {
        match plan {
            PlanNode::Filter(filter) if filter.input.is_no_rows() => Rewrite::Changed(*filter.input),
            PlanNode::Filter(mut filter) => match check_conditions(&mut filter.conditions) {
                Feasibility::Never => Rewrite::Changed(PlanNode::NoRows(NoRows)),
                Feasibility::Possible { removed } => {
                    if filter.conditions.is_empty() {
                        Rewrite::Changed(*filter.input)
                    } else if removed {
                        Rewrite::Changed(PlanNode::Filter(filter))
                    } else {
                        Rewrite::Unchanged(PlanNode::Filter(filter))
                    }
                }
            },
            PlanNode::Project(project) if project.input.is_no_rows() => {
                Rewrite::Changed(*project.input)
            }
            PlanNode::Limit(limit) if limit.input.is_no_rows() => Rewrite::Changed(*limit.input),
            PlanNode::Join(join)
                if join.left.is_no_rows()
                    || (join.join_type == JoinType::Inner && join.right.is_no_rows()) =>
            {
                Rewrite::Changed(PlanNode::NoRows(NoRows))
            }
            PlanNode::Join(mut join) if join.join_type == JoinType::Inner => {
                match check_conditions(&mut join.conditions) {
                    Feasibility::Never => Rewrite::Changed(PlanNode::NoRows(NoRows)),
                    Feasibility::Possible { removed: true } => Rewrite::Changed(PlanNode::Join(join)),
                    Feasibility::Possible { removed: false } => {
                        Rewrite::Unchanged(PlanNode::Join(join))
                    }
                }
            }
            PlanNode::SubquerySource(source) if source.subquery.is_no_rows() => {
                Rewrite::Changed(*source.subquery)
            }
            PlanNode::SubquerySource(source) => match inner_table_source(&source.subquery) {
                Some(inner) => {
                    trace!(outer = source.id, inner, "replacing subquery source");
                    self.substitutions.insert(source.id, inner);
                    match *source.subquery {
                        PlanNode::Project(project) => Rewrite::Changed(*project.input),
                        other => Rewrite::Changed(other),
                    }
                }
                None => Rewrite::Unchanged(PlanNode::SubquerySource(source)),
            },
            other => Rewrite::Unchanged(other),
        }
    }

    fn fold_expr(&mut self, expr: &mut Expression) {
        expr.for_each_child_mut(&mut |child| self.fold_expr(child));

        match expr {
            Expression::Subquery(e) => self.fold_subquery(e.subquery.as_mut()),
            Expression::SubqueryCondition(e) => self.fold_subquery(e.subquery.as_mut()),
            _ => (),
        }

        if let Some(folded) = self.rewrite_expr(expr) {
            trace!(from = %expr, to = %folded, "folded expression");
            *expr = folded;
            self.changed = true;
        }
    }

    fn fold_subquery(&mut self, subquery: &mut PlanNode) {
        let owned = mem::replace(subquery, PlanNode::NoRows(NoRows));
        *subquery = self.fold_plan(owned);
    }

    fn rewrite_expr(&self, expr: &Expression) -> Option<Expression> {
        match expr {
            Expression::Comparison(c) => {
                let (left, right) = (c.left.constantness(), c.right.constantness());
                if left == Constantness::Null || right == Constantness::Null {
                    Some(null_of(expr))
                } else if left != Constantness::Variable && right != Constantness::Variable {
                    eval_now(expr)
                } else {
                    None
                }
            }
            Expression::Cast(c) if c.expr.constantness() != Constantness::Variable => eval_now(expr),
            Expression::Function(f) => self.rewrite_function(expr, f),
            Expression::IfElse(e) => match e.test.constant_value()? {
                ScalarValue::Boolean(true) => Some((*e.then_expr).clone()),
                ScalarValue::Boolean(false) | ScalarValue::Null => Some((*e.else_expr).clone()),
                _ => None,
            },
            Expression::Column(c) => {
                let mut source = *self.substitutions.get(&c.source)?;
                // Sources replaced in earlier passes may have been replaced again.
                while let Some(next) = self.substitutions.get(&source) {
                    if *next == source {
                        break;
                    }
                    source = *next;
                }
                Some(Expression::Column(ColumnExpr { source, ..*c }))
            }
            _ => None,
        }
    }

    fn rewrite_function(&self, expr: &Expression, f: &FunctionExpr) -> Option<Expression> {
        if f.name.eq_ignore_ascii_case("isNullOp") {
            let operand = f.operands.first()?;
            if operand.sql_type().is_some_and(|t| !t.nullable) {
                return Some(boolean_expr(Some(false)));
            }
            if operand.constantness() != Constantness::Variable {
                return eval_now(expr);
            }
            return None;
        }

        if f.name.eq_ignore_ascii_case("COALESCE") {
            let leading_nulls = f
                .operands
                .iter()
                .take_while(|op| op.constantness() == Constantness::Null)
                .count();
            let remaining = &f.operands[leading_nulls..];
            return match remaining.first() {
                None => Some(null_of(expr)),
                Some(first) if first.constantness() == Constantness::Constant => Some(first.clone()),
                Some(_) if leading_nulls > 0 => Some(Expression::Function(FunctionExpr {
                    name: f.name.clone(),
                    operands: remaining.to_vec(),
                    sql_type: f.sql_type,
                })),
                Some(_) => None,
            };
        }

        // Functions outside the registry get no NULL handling of their own.
        let function = find_function(&f.name);
        let any_null = f
            .operands
            .iter()
            .any(|op| op.constantness() == Constantness::Null);
        if any_null && !function.is_some_and(|func| func.null_handling) {
            return Some(null_of(expr));
        }
        let all_constant = f
            .operands
            .iter()
            .all(|op| op.constantness() == Constantness::Constant);
        if all_constant && function.is_some_and(|func| !func.is_volatile()) {
            return eval_now(expr);
        }
        None
    }
}

enum Rewrite {
    Changed(PlanNode),
    Unchanged(PlanNode),
}

enum Feasibility {
    /// Some condition is FALSE or NULL.
    Never,
    Possible { removed: bool },
}

/// Drop TRUE conditions from a conjunction.
fn check_conditions(conditions: &mut Vec<Expression>) -> Feasibility {
    let before = conditions.len();
    let mut never = false;
    conditions.retain(|cond| match cond.constant_value() {
        Some(ScalarValue::Boolean(true)) => false,
        Some(ScalarValue::Boolean(false)) | Some(ScalarValue::Null) => {
            never = true;
            true
        }
        _ => true,
    });
    if never {
        return Feasibility::Never;
    }
    Feasibility::Possible {
        removed: conditions.len() != before,
    }
}

/// Table source a subquery trivially reads from, either directly or through
/// a projection of its leading columns in order.
fn inner_table_source(subquery: &PlanNode) -> Option<SourceId> {
    match subquery {
        PlanNode::TableSource(table) => Some(table.id),
        PlanNode::Project(project) => {
            let PlanNode::TableSource(table) = project.input.as_ref() else {
                return None;
            };
            let identity = project.projections.iter().enumerate().all(|(idx, proj)| {
                matches!(proj, Expression::Column(c) if c.source == table.id && c.position == idx)
            });
            identity.then_some(table.id)
        }
        _ => None,
    }
}

fn boolean_expr(value: Option<bool>) -> Expression {
    Expression::BooleanConstant(BooleanConstantExpr {
        value,
        sql_type: Some(SqlType::boolean()),
    })
}

/// NULL in place of `expr`, typed as a condition when `expr` is one.
fn null_of(expr: &Expression) -> Expression {
    if expr.is_condition() {
        return boolean_expr(None);
    }
    Expression::Constant(ConstantExpr {
        value: ScalarValue::Null,
        sql_type: expr.sql_type(),
    })
}

/// Evaluate `expr`, returning None if evaluation fails.
fn eval_now(expr: &Expression) -> Option<Expression> {
    let mut ctx = CastContext::new();
    let value = match evaluate_constant(expr, &mut ctx) {
        Ok(value) => value,
        Err(error) => {
            trace!(%expr, %error, "leaving expression unfolded");
            return None;
        }
    };

    if expr.is_condition() {
        return match value {
            ScalarValue::Boolean(b) => Some(boolean_expr(Some(b))),
            ScalarValue::Null => Some(boolean_expr(None)),
            _ => None,
        };
    }

    let sql_type = expr
        .sql_type()
        .or_else(|| (!value.is_null()).then(|| SqlType::new(value.datatype(), false)));
    Some(Expression::Constant(ConstantExpr { value, sql_type }))
}

#[cfg(test)]
mod tests {
    use arbor_catalog::TableName;
    use arbor_types::DataType;

    use super::*;
    use crate::expr::{
        ComparisonOp, SubqueryConditionExpr, SubqueryConditionKind, boolean, cast, column, compare,
        function, if_else, lit, null,
    };
    use crate::plan::{Limit, TargetColumn, UpdateStatement};

    fn table(id: SourceId) -> PlanNode {
        PlanNode::table(id, TableName::new("test", "t"))
    }

    fn int_col(source: SourceId, position: usize) -> Expression {
        column(source, position, SqlType::new(DataType::Int32, true))
    }

    fn fold(plan: PlanNode) -> PlanNode {
        FoldConstants::new(16).apply(plan).unwrap()
    }

    fn fold_expr(expr: Expression) -> Expression {
        let plan = fold(PlanNode::project(table(1), [expr]));
        let PlanNode::Project(mut project) = plan else {
            panic!("expected project");
        };
        project.projections.remove(0)
    }

    #[test]
    fn cast_and_arithmetic() {
        logutil::init_test();

        let expr = function("plus", [cast(lit("123"), DataType::Int32), lit(0_i32)]);
        assert_eq!(lit(123_i32), fold_expr(expr));
    }

    #[test]
    fn coalesce_strips_leading_nulls() {
        logutil::init_test();

        let expr = function("COALESCE", [null(), null(), lit("x"), int_col(1, 0)]);
        assert_eq!(lit("x"), fold_expr(expr));

        let expr = function("COALESCE", [null(), int_col(1, 0), lit("x")]);
        assert_eq!(function("COALESCE", [int_col(1, 0), lit("x")]), fold_expr(expr));

        let folded = fold_expr(function("COALESCE", [null(), null()]));
        assert_eq!(Constantness::Null, folded.constantness());
    }

    #[test]
    fn comparisons_and_nulls() {
        let expr = compare(ComparisonOp::Lt, lit(1), lit(2));
        assert_eq!(boolean(Some(true)), fold_expr(expr));

        let expr = compare(ComparisonOp::Eq, int_col(1, 0), null());
        assert_eq!(boolean(None), fold_expr(expr));

        let expr = function("plus", [int_col(1, 0), null()]);
        assert_eq!(Constantness::Null, fold_expr(expr).constantness());

        // Comparing two columns is left alone.
        let expr = compare(ComparisonOp::Eq, int_col(1, 0), int_col(1, 1));
        assert_eq!(expr.clone(), fold_expr(expr));
    }

    #[test]
    fn is_null_of_non_nullable() {
        let non_null = column(1, 0, SqlType::new(DataType::Int32, false));
        assert_eq!(boolean(Some(false)), fold_expr(function("isNullOp", [non_null])));
        assert_eq!(boolean(Some(true)), fold_expr(function("isNullOp", [null()])));

        let expr = function("isNullOp", [int_col(1, 0)]);
        assert_eq!(expr.clone(), fold_expr(expr));
    }

    #[test]
    fn if_else_picks_branch() {
        let expr = if_else(
            compare(ComparisonOp::Gt, lit(1), lit(2)),
            int_col(1, 0),
            int_col(1, 1),
        );
        assert_eq!(int_col(1, 1), fold_expr(expr));

        let expr = if_else(boolean(None), lit(1), lit(2));
        assert_eq!(lit(2), fold_expr(expr));
    }

    #[test]
    fn volatile_and_failing_expressions_stay() {
        logutil::init_test();

        let expr = function("RAND", []);
        assert_eq!(expr.clone(), fold_expr(expr));

        let expr = function("plus", [lit("abc"), lit(1)]);
        assert_eq!(expr.clone(), fold_expr(expr));

        let expr = function("frobnicate", [lit(1)]);
        assert_eq!(expr.clone(), fold_expr(expr));
    }

    #[test]
    fn unregistered_function_with_null_operand_is_null() {
        let folded = fold_expr(function("frobnicate", [null(), int_col(1, 0)]));
        assert_eq!(null(), folded);

        // Registered functions with their own NULL handling are kept.
        let expr = function("or", [boolean(None), compare(ComparisonOp::Eq, int_col(1, 0), lit(1))]);
        assert_eq!(expr.clone(), fold_expr(expr));
    }

    #[test]
    fn filter_conditions() {
        logutil::init_test();

        let col_eq = compare(ComparisonOp::Eq, int_col(1, 0), int_col(1, 0));
        let plan = fold(PlanNode::filter(
            table(1),
            [boolean(Some(true)), col_eq.clone()],
        ));
        assert_eq!(PlanNode::filter(table(1), [col_eq.clone()]), plan);

        let plan = fold(PlanNode::filter(table(1), [boolean(Some(false))]));
        assert!(plan.is_no_rows());

        let plan = fold(PlanNode::filter(table(1), [col_eq, boolean(None)]));
        assert!(plan.is_no_rows());

        // All conditions true leaves only the input.
        let plan = fold(PlanNode::filter(
            table(1),
            [compare(ComparisonOp::GtEq, lit(3), lit(3))],
        ));
        assert_eq!(table(1), plan);
    }

    #[test]
    fn no_rows_propagates() {
        let infeasible = |input| PlanNode::filter(input, [boolean(Some(false))]);

        let plan = PlanNode::Limit(Limit {
            input: Box::new(PlanNode::project(infeasible(table(1)), [int_col(1, 0)])),
            offset: 0,
            limit: Some(10),
        });
        assert!(fold(plan).is_no_rows());

        let update = UpdateStatement::new(
            TableName::new("test", "t"),
            infeasible(table(1)),
            [TargetColumn::new("a", function("plus", [lit(1), lit(2)]))],
        );
        let PlanNode::Update(update) = fold(PlanNode::Update(update)) else {
            panic!("expected update");
        };
        assert!(update.input.is_no_rows());
        assert_eq!(lit(3), update.update_columns[0].value);
        assert_eq!("UPDATE test.t SET a = 3 WHERE FALSE", update.to_string());
    }

    #[test]
    fn subquery_source_substitution() {
        logutil::init_test();

        // SELECT #2.1 FROM (SELECT #1.0, #1.1 FROM t) AS s WHERE #2.0 = 5
        let subquery = PlanNode::project(table(1), [int_col(1, 0), int_col(1, 1)]);
        let plan = PlanNode::project(
            PlanNode::filter(
                PlanNode::subquery(2, subquery),
                [compare(ComparisonOp::Eq, int_col(2, 0), lit(5))],
            ),
            [int_col(2, 1)],
        );

        let expected = PlanNode::project(
            PlanNode::filter(table(1), [compare(ComparisonOp::Eq, int_col(1, 0), lit(5))]),
            [int_col(1, 1)],
        );
        assert_eq!(expected, fold(plan));

        // Reordering projection is not replaced.
        let subquery = PlanNode::project(table(1), [int_col(1, 1), int_col(1, 0)]);
        let plan = PlanNode::subquery(2, subquery);
        assert_eq!(plan.clone(), fold(plan));
    }

    #[test]
    fn folds_inside_subquery_expressions() {
        let correlated = compare(ComparisonOp::Eq, int_col(3, 0), int_col(1, 0));
        let exists = |subquery| {
            Expression::SubqueryCondition(SubqueryConditionExpr {
                kind: SubqueryConditionKind::Exists,
                subquery: Box::new(subquery),
                sql_type: Some(SqlType::boolean()),
            })
        };

        let plan = PlanNode::filter(
            table(1),
            [exists(PlanNode::filter(
                table(3),
                [boolean(Some(true)), correlated.clone()],
            ))],
        );
        let expected = PlanNode::filter(
            table(1),
            [exists(PlanNode::filter(table(3), [correlated]))],
        );
        assert_eq!(expected, fold(plan));
    }

    #[test]
    fn second_pass_changes_nothing() {
        let plan = PlanNode::filter(
            table(1),
            [
                compare(
                    ComparisonOp::Eq,
                    int_col(1, 0),
                    function("times", [lit(2), cast(lit("21"), DataType::Int32)]),
                ),
                function("isNullOp", [int_col(1, 1)]),
            ],
        );
        let once = fold(plan);
        let expected = PlanNode::filter(
            table(1),
            [
                compare(ComparisonOp::Eq, int_col(1, 0), lit(42)),
                function("isNullOp", [int_col(1, 1)]),
            ],
        );
        assert_eq!(expected, once);

        let mut folder = Folder::default();
        let twice = folder.fold_plan(once.clone());
        assert!(!folder.changed);
        assert_eq!(once, twice);
    }
}
