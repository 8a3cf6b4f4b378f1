use serde::{Deserialize, Serialize};

use crate::TableId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinColumn {
    pub parent: String,
    pub child: String,
}

impl JoinColumn {
    pub fn new(parent: impl Into<String>, child: impl Into<String>) -> Self {
        JoinColumn {
            parent: parent.into(),
            child: child.into(),
        }
    }
}

/// A parent-child relationship between two user tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Join {
    pub name: String,
    pub parent: TableId,
    pub child: TableId,
    pub columns: Vec<JoinColumn>,
    /// Set once the join has been added to a group.
    pub group: Option<String>,
}
