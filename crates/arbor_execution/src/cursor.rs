//! Cursor protocol shared by operators and group cursors.

use std::fmt;

use crate::bindings::QueryBindings;
use crate::errors::{ExecutionError, Result};
use crate::row::RowRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    Idle,
    Active,
    Destroyed,
}

impl fmt::Display for CursorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Active => write!(f, "active"),
            Self::Destroyed => write!(f, "destroyed"),
        }
    }
}

/// A stateful row iterator produced by an operator.
///
/// Idle -> Active on `open`, Active -> Idle on `close` or end of stream, and
/// Idle or Active -> Destroyed on `destroy`. `close` on an idle cursor does
/// nothing.
pub trait Cursor: fmt::Debug + Send {
    fn open(&mut self, bindings: &QueryBindings) -> Result<()>;

    /// Next row, or None once the stream is exhausted.
    fn next(&mut self) -> Result<Option<RowRef>>;

    fn close(&mut self) -> Result<()>;

    /// Release everything held by the cursor, including child cursors.
    fn destroy(&mut self) -> Result<()>;

    fn state(&self) -> CursorState;

    fn is_idle(&self) -> bool {
        self.state() == CursorState::Idle
    }

    fn is_active(&self) -> bool {
        self.state() == CursorState::Active
    }

    fn is_destroyed(&self) -> bool {
        self.state() == CursorState::Destroyed
    }
}

/// Tracks a cursor's state and enforces the allowed transitions.
#[derive(Debug, Clone, Copy)]
pub struct CursorLifecycle {
    name: &'static str,
    state: CursorState,
    check_next: bool,
}

impl CursorLifecycle {
    /// `check_next` controls whether `next` on an idle cursor is rejected.
    /// Destroyed cursors are always rejected.
    pub fn new(name: &'static str, check_next: bool) -> Self {
        CursorLifecycle {
            name,
            state: CursorState::Idle,
            check_next,
        }
    }

    pub fn state(&self) -> CursorState {
        self.state
    }

    fn violation(&self, operation: &'static str) -> ExecutionError {
        ExecutionError::CursorLifecycleViolation {
            cursor: self.name,
            operation,
            state: self.state,
        }
    }

    pub fn check_open(&self) -> Result<()> {
        match self.state {
            CursorState::Idle => Ok(()),
            _ => Err(self.violation("open")),
        }
    }

    pub fn check_next(&self) -> Result<()> {
        match self.state {
            CursorState::Active => Ok(()),
            CursorState::Idle if !self.check_next => Ok(()),
            _ => Err(self.violation("next")),
        }
    }

    pub fn check_close(&self) -> Result<()> {
        match self.state {
            CursorState::Destroyed => Err(self.violation("close")),
            _ => Ok(()),
        }
    }

    pub fn check_destroy(&self) -> Result<()> {
        match self.state {
            CursorState::Destroyed => Err(self.violation("destroy")),
            _ => Ok(()),
        }
    }

    pub fn set_active(&mut self) {
        self.state = CursorState::Active;
    }

    pub fn set_idle(&mut self) {
        if self.state != CursorState::Destroyed {
            self.state = CursorState::Idle;
        }
    }

    pub fn set_destroyed(&mut self) {
        self.state = CursorState::Destroyed;
    }
}
