//! Per-session state shared between queries and DDL.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use arbor_catalog::TableId;
use parking_lot::Mutex;
use tracing::debug;

use crate::config::SessionConfig;

#[derive(Debug)]
pub struct Session {
    id: u64,
    config: Mutex<SessionConfig>,
    scans: ScanRegistry,
}

impl Default for Session {
    fn default() -> Self {
        Session::new(SessionConfig::default())
    }
}

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Session {
            id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
            config: Mutex::new(config),
            scans: ScanRegistry::default(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Snapshot of the current config.
    pub fn config(&self) -> SessionConfig {
        self.config.lock().clone()
    }

    pub fn update_config<T>(&self, f: impl FnOnce(&mut SessionConfig) -> T) -> T {
        f(&mut self.config.lock())
    }

    pub fn scans(&self) -> &ScanRegistry {
        &self.scans
    }
}

/// Open scan, as seen by DDL.
#[derive(Debug)]
pub struct ScanHandle {
    /// User table or group table being scanned.
    table: TableId,
    open: AtomicBool,
    ddl_modified: AtomicBool,
}

impl ScanHandle {
    pub fn table(&self) -> TableId {
        self.table
    }

    pub fn is_ddl_modified(&self) -> bool {
        self.ddl_modified.load(Ordering::Acquire)
    }

    pub fn set_closed(&self) {
        self.open.store(false, Ordering::Release);
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }
}

/// Scans opened in a session. DDL marks the ones touching modified tables.
#[derive(Debug, Default)]
pub struct ScanRegistry {
    scans: Mutex<Vec<Weak<ScanHandle>>>,
}

impl ScanRegistry {
    pub fn register(&self, table: TableId) -> Arc<ScanHandle> {
        let handle = Arc::new(ScanHandle {
            table,
            open: AtomicBool::new(true),
            ddl_modified: AtomicBool::new(false),
        });
        let mut scans = self.scans.lock();
        scans.retain(|s| s.strong_count() > 0);
        scans.push(Arc::downgrade(&handle));
        handle
    }

    /// Mark every open scan on `table` or `group_table` as modified.
    pub fn mark_ddl_modified(&self, table: TableId, group_table: TableId) -> usize {
        let mut marked = 0;
        let mut scans = self.scans.lock();
        scans.retain(|s| s.strong_count() > 0);
        for scan in scans.iter().filter_map(Weak::upgrade) {
            if !scan.is_open() {
                continue;
            }
            if scan.table == table || scan.table == group_table {
                scan.ddl_modified.store(true, Ordering::Release);
                marked += 1;
            }
        }
        if marked > 0 {
            debug!(table, group_table, marked, "marked scans as ddl modified");
        }
        marked
    }

    pub fn open_scans(&self) -> usize {
        self.scans
            .lock()
            .iter()
            .filter_map(Weak::upgrade)
            .filter(|s| s.is_open())
            .count()
    }
}
