use std::collections::HashMap;
use std::sync::LazyLock;

use arbor_types::ScalarValue;
use serde::{Deserialize, Serialize};

use crate::errors::{ExecutionError, Result};

pub const DEFAULT_SCAN_BATCH_HINT: u64 = 64;

const MIN_SCAN_BATCH_HINT: u64 = 1;
const MAX_SCAN_BATCH_HINT: u64 = 8192;

/// Configuration for a session's query execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub cursor_lifecycle_checks: bool,
    pub log_execution: bool,
    pub scan_batch_hint: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            cursor_lifecycle_checks: true,
            log_execution: false,
            scan_batch_hint: DEFAULT_SCAN_BATCH_HINT,
        }
    }
}

impl SessionConfig {
    pub fn set_from_scalar(&mut self, name: &str, value: ScalarValue) -> Result<()> {
        let func = GET_SET_FUNCTIONS
            .get(name)
            .ok_or_else(|| ExecutionError::InvalidArgument(format!("Missing setting for '{name}'")))?;

        (func.set)(value, self)
    }

    pub fn get_as_scalar(&self, name: &str) -> Result<ScalarValue> {
        let func = GET_SET_FUNCTIONS
            .get(name)
            .ok_or_else(|| ExecutionError::InvalidArgument(format!("Missing setting for '{name}'")))?;

        Ok((func.get)(self))
    }

    pub fn reset(&mut self, name: &str) -> Result<()> {
        let value = SessionConfig::default().get_as_scalar(name)?;
        self.set_from_scalar(name, value)
    }

    /// Names and descriptions of every setting.
    pub fn settings() -> impl Iterator<Item = (&'static str, &'static str)> {
        GET_SET_FUNCTIONS
            .iter()
            .map(|(name, funcs)| (*name, funcs.description))
    }
}

struct SettingFunctions {
    description: &'static str,
    set: fn(scalar: ScalarValue, conf: &mut SessionConfig) -> Result<()>,
    get: fn(conf: &SessionConfig) -> ScalarValue,
}

impl SettingFunctions {
    const fn new<S: SessionSetting>() -> Self {
        SettingFunctions {
            description: S::DESCRIPTION,
            set: S::set_from_scalar as _,
            get: S::get_as_scalar as _,
        }
    }
}

fn insert_setting<S: SessionSetting>(map: &mut HashMap<&'static str, SettingFunctions>) {
    if map.insert(S::NAME, SettingFunctions::new::<S>()).is_some() {
        panic!("Duplicate settings names: {}", S::NAME);
    }
}

static GET_SET_FUNCTIONS: LazyLock<HashMap<&'static str, SettingFunctions>> = LazyLock::new(|| {
    let mut map = HashMap::new();

    insert_setting::<CursorLifecycleChecks>(&mut map);
    insert_setting::<LogExecution>(&mut map);
    insert_setting::<ScanBatchHint>(&mut map);

    map
});

pub trait SessionSetting: Sync + Send + 'static {
    const NAME: &'static str;
    const DESCRIPTION: &'static str;

    fn set_from_scalar(scalar: ScalarValue, conf: &mut SessionConfig) -> Result<()>;
    fn get_as_scalar(conf: &SessionConfig) -> ScalarValue;
}

fn expect_bool(name: &str, scalar: &ScalarValue) -> Result<bool> {
    scalar.try_as_bool().ok_or_else(|| {
        ExecutionError::InvalidArgument(format!("Setting '{name}' expects a boolean, got {scalar}"))
    })
}

pub struct CursorLifecycleChecks;

impl SessionSetting for CursorLifecycleChecks {
    const NAME: &'static str = "cursor_lifecycle_checks";
    const DESCRIPTION: &'static str = "Check cursor state on every call to next";

    fn set_from_scalar(scalar: ScalarValue, conf: &mut SessionConfig) -> Result<()> {
        conf.cursor_lifecycle_checks = expect_bool(Self::NAME, &scalar)?;
        Ok(())
    }

    fn get_as_scalar(conf: &SessionConfig) -> ScalarValue {
        conf.cursor_lifecycle_checks.into()
    }
}

pub struct LogExecution;

impl SessionSetting for LogExecution {
    const NAME: &'static str = "log_execution";
    const DESCRIPTION: &'static str = "Trace every row produced by operators";

    fn set_from_scalar(scalar: ScalarValue, conf: &mut SessionConfig) -> Result<()> {
        conf.log_execution = expect_bool(Self::NAME, &scalar)?;
        Ok(())
    }

    fn get_as_scalar(conf: &SessionConfig) -> ScalarValue {
        conf.log_execution.into()
    }
}

pub struct ScanBatchHint;

impl SessionSetting for ScanBatchHint {
    const NAME: &'static str = "scan_batch_hint";
    const DESCRIPTION: &'static str = "Number of rows group cursors fetch from storage at once";

    fn set_from_scalar(scalar: ScalarValue, conf: &mut SessionConfig) -> Result<()> {
        let val = scalar
            .try_as_i128()
            .and_then(|v| u64::try_from(v).ok())
            .ok_or_else(|| {
                ExecutionError::InvalidArgument(format!(
                    "Setting '{}' expects a positive integer, got {scalar}",
                    Self::NAME
                ))
            })?;

        if val < MIN_SCAN_BATCH_HINT {
            return Err(ExecutionError::InvalidArgument(format!(
                "Scan batch hint cannot be less than {MIN_SCAN_BATCH_HINT}"
            )));
        }
        if val > MAX_SCAN_BATCH_HINT {
            return Err(ExecutionError::InvalidArgument(format!(
                "Scan batch hint cannot be greater than {MAX_SCAN_BATCH_HINT}"
            )));
        }

        conf.scan_batch_hint = val;
        Ok(())
    }

    fn get_as_scalar(conf: &SessionConfig) -> ScalarValue {
        conf.scan_batch_hint.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_setting_exists() {
        let mut conf = SessionConfig::default();
        conf.set_from_scalar("log_execution", true.into()).unwrap();

        let val = conf.get_as_scalar("log_execution").unwrap();
        assert_eq!(ScalarValue::Boolean(true), val);

        conf.reset("log_execution").unwrap();
        assert!(!conf.log_execution);
    }

    #[test]
    fn set_setting_not_exists() {
        let mut conf = SessionConfig::default();
        conf.set_from_scalar("hell_world", 58_i64.into()).unwrap_err();
    }

    #[test]
    fn set_casts_value() {
        let mut conf = SessionConfig::default();
        conf.set_from_scalar("scan_batch_hint", ScalarValue::Int8(13))
            .unwrap();

        let val = conf.get_as_scalar("scan_batch_hint").unwrap();
        assert_eq!(ScalarValue::UInt64(13), val);
    }

    #[test]
    fn batch_hint_bounds() {
        let mut conf = SessionConfig::default();
        conf.set_from_scalar("scan_batch_hint", ScalarValue::Int64(0))
            .unwrap_err();
        conf.set_from_scalar("scan_batch_hint", ScalarValue::Int64(-4))
            .unwrap_err();
        assert_eq!(DEFAULT_SCAN_BATCH_HINT, conf.scan_batch_hint);
    }

    #[test]
    fn deserialize_partial() {
        let conf: SessionConfig = serde_json::from_str(r#"{"log_execution": true}"#).unwrap();
        assert!(conf.log_execution);
        assert!(conf.cursor_lifecycle_checks);
        assert_eq!(DEFAULT_SCAN_BATCH_HINT, conf.scan_batch_hint);
    }
}
