use std::fmt;

use arbor_catalog::TableName;

use super::PlanNode;
use crate::expr::Expression;

#[derive(Debug, Clone, PartialEq)]
pub struct TargetColumn {
    pub column: String,
    pub value: Expression,
}

impl TargetColumn {
    pub fn new(column: impl Into<String>, value: Expression) -> Self {
        TargetColumn {
            column: column.into(),
            value,
        }
    }
}

/// UPDATE of one table. The input produces the rows to update, usually a
/// filter over the target table.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    pub target: TableName,
    pub input: Box<PlanNode>,
    pub update_columns: Vec<TargetColumn>,
}

impl UpdateStatement {
    pub fn new(
        target: TableName,
        input: PlanNode,
        update_columns: impl IntoIterator<Item = TargetColumn>,
    ) -> Self {
        UpdateStatement {
            target,
            input: Box::new(input),
            update_columns: update_columns.into_iter().collect(),
        }
    }

    /// Conditions of the filter feeding this update, if any.
    pub fn conditions(&self) -> &[Expression] {
        match self.input.as_ref() {
            PlanNode::Filter(filter) => &filter.conditions,
            _ => &[],
        }
    }
}

impl fmt::Display for UpdateStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UPDATE {} SET ", self.target)?;
        for (idx, col) in self.update_columns.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} = {}", col.column, col.value)?;
        }
        if self.input.is_no_rows() {
            return write!(f, " WHERE FALSE");
        }
        for (idx, cond) in self.conditions().iter().enumerate() {
            let sep = if idx == 0 { " WHERE " } else { " AND " };
            write!(f, "{sep}{cond}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use arbor_types::DataType;

    use super::*;
    use crate::expr::{ComparisonOp, SqlType, column, compare, lit};

    #[test]
    fn display_with_conditions() {
        let target = TableName::new("test", "t");
        let id = column(1, 0, SqlType::new(DataType::Int32, false));
        let update = UpdateStatement::new(
            target.clone(),
            PlanNode::filter(
                PlanNode::table(1, target),
                [
                    compare(ComparisonOp::Gt, id.clone(), lit(5)),
                    compare(ComparisonOp::NotEq, id, lit(9)),
                ],
            ),
            [TargetColumn::new("a", lit("x")), TargetColumn::new("b", lit(2))],
        );
        assert_eq!(
            "UPDATE test.t SET a = 'x', b = 2 WHERE #1.0 > 5 AND #1.0 <> 9",
            update.to_string()
        );
    }
}
