//! Logical plan nodes.

pub mod update;

use arbor_catalog::TableName;

use crate::expr::Expression;

pub use update::{TargetColumn, UpdateStatement};

/// Identifies a column source within a plan. Column expressions refer to
/// their source by this id.
pub type SourceId = u32;

#[derive(Debug, Clone, PartialEq)]
pub struct TableSource {
    pub id: SourceId,
    pub table: TableName,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubquerySource {
    pub id: SourceId,
    pub subquery: Box<PlanNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub input: Box<PlanNode>,
    /// Conjunction of conditions.
    pub conditions: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub input: Box<PlanNode>,
    pub projections: Vec<Expression>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub join_type: JoinType,
    pub left: Box<PlanNode>,
    pub right: Box<PlanNode>,
    pub conditions: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Limit {
    pub input: Box<PlanNode>,
    pub offset: usize,
    pub limit: Option<usize>,
}

/// Plan known to produce no rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NoRows;

#[derive(Debug, Clone, PartialEq)]
pub enum PlanNode {
    TableSource(TableSource),
    SubquerySource(SubquerySource),
    Filter(Filter),
    Project(Project),
    Join(Join),
    Limit(Limit),
    Update(UpdateStatement),
    NoRows(NoRows),
}

impl PlanNode {
    pub fn filter(input: PlanNode, conditions: impl IntoIterator<Item = Expression>) -> Self {
        PlanNode::Filter(Filter {
            input: Box::new(input),
            conditions: conditions.into_iter().collect(),
        })
    }

    pub fn project(input: PlanNode, projections: impl IntoIterator<Item = Expression>) -> Self {
        PlanNode::Project(Project {
            input: Box::new(input),
            projections: projections.into_iter().collect(),
        })
    }

    pub fn table(id: SourceId, table: TableName) -> Self {
        PlanNode::TableSource(TableSource { id, table })
    }

    pub fn subquery(id: SourceId, subquery: PlanNode) -> Self {
        PlanNode::SubquerySource(SubquerySource {
            id,
            subquery: Box::new(subquery),
        })
    }

    pub fn is_no_rows(&self) -> bool {
        matches!(self, PlanNode::NoRows(_))
    }

    pub fn for_each_child_mut<F>(&mut self, func: &mut F)
    where
        F: FnMut(&mut PlanNode),
    {
        match self {
            Self::TableSource(_) | Self::NoRows(_) => (),
            Self::SubquerySource(n) => func(&mut n.subquery),
            Self::Filter(n) => func(&mut n.input),
            Self::Project(n) => func(&mut n.input),
            Self::Join(n) => {
                func(&mut n.left);
                func(&mut n.right);
            }
            Self::Limit(n) => func(&mut n.input),
            Self::Update(n) => func(&mut n.input),
        }
    }

    /// Expressions held directly by this node.
    pub fn for_each_expr_mut<F>(&mut self, func: &mut F)
    where
        F: FnMut(&mut Expression),
    {
        let exprs: &mut [Expression] = match self {
            Self::Filter(n) => &mut n.conditions,
            Self::Project(n) => &mut n.projections,
            Self::Join(n) => &mut n.conditions,
            Self::Update(n) => {
                for col in &mut n.update_columns {
                    func(&mut col.value);
                }
                return;
            }
            Self::TableSource(_) | Self::SubquerySource(_) | Self::Limit(_) | Self::NoRows(_) => {
                return;
            }
        };
        for expr in exprs {
            func(expr);
        }
    }
}
