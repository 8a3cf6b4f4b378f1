use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::SessionConfig;
use crate::errors::{ExecutionError, Result};
use crate::session::Session;
use crate::store::Store;

/// Shared flag used to cancel a running query.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    canceled: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::Release);
    }

    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::Acquire)
    }
}

/// Query-scoped services handed to operators when creating cursors.
#[derive(Debug, Clone)]
pub struct QueryContext {
    store: Arc<dyn Store>,
    config: Arc<SessionConfig>,
    cancel: CancelHandle,
    session: Option<Arc<Session>>,
}

impl QueryContext {
    /// Context outside of any session, using the default config.
    pub fn new(store: Arc<dyn Store>) -> Self {
        QueryContext {
            store,
            config: Arc::new(SessionConfig::default()),
            cancel: CancelHandle::new(),
            session: None,
        }
    }

    /// Context for a query in `session`, using a snapshot of its config.
    pub fn for_session(store: Arc<dyn Store>, session: Arc<Session>) -> Self {
        QueryContext {
            store,
            config: Arc::new(session.config()),
            cancel: CancelHandle::new(),
            session: Some(session),
        }
    }

    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = Arc::new(config);
        self
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn session(&self) -> Option<&Arc<Session>> {
        self.session.as_ref()
    }

    pub fn cancel_handle(&self) -> &CancelHandle {
        &self.cancel
    }

    pub fn check_canceled(&self) -> Result<()> {
        if self.cancel.is_canceled() {
            return Err(ExecutionError::QueryCanceled);
        }
        Ok(())
    }
}
