use std::collections::BTreeMap;

use arbor_types::ScalarValue;

use crate::errors::{ExecutionError, Result};
use crate::row::RowRef;

#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Row(RowRef),
    Value(ScalarValue),
}

/// Values bound for one execution of a query, keyed by position.
#[derive(Debug, Clone, Default)]
pub struct QueryBindings {
    bindings: BTreeMap<usize, Binding>,
}

impl QueryBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_row(&mut self, position: usize, row: RowRef) {
        self.bindings.insert(position, Binding::Row(row));
    }

    pub fn set_value(&mut self, position: usize, value: ScalarValue) {
        self.bindings.insert(position, Binding::Value(value));
    }

    pub fn get(&self, position: usize) -> Option<&Binding> {
        self.bindings.get(&position)
    }

    pub fn get_row(&self, position: usize) -> Result<&RowRef> {
        match self.bindings.get(&position) {
            Some(Binding::Row(row)) => Ok(row),
            Some(Binding::Value(_)) => Err(ExecutionError::InvalidArgument(format!(
                "Binding {position} is a value, not a row"
            ))),
            None => Err(ExecutionError::InvalidArgument(format!(
                "Nothing bound at position {position}"
            ))),
        }
    }

    pub fn get_value(&self, position: usize) -> Result<&ScalarValue> {
        match self.bindings.get(&position) {
            Some(Binding::Value(v)) => Ok(v),
            Some(Binding::Row(_)) => Err(ExecutionError::InvalidArgument(format!(
                "Binding {position} is a row, not a value"
            ))),
            None => Err(ExecutionError::InvalidArgument(format!(
                "Nothing bound at position {position}"
            ))),
        }
    }

    pub fn clear(&mut self) {
        self.bindings.clear();
    }
}
