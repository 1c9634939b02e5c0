//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TimetableError};

/// Default bound of the worker's outbound event channel.
const DEFAULT_PROGRESS_CAPACITY: usize = 64;

/// Tunables for a timetable run.
///
/// # Examples
///
/// ```
/// use u_timetable::EngineConfig;
///
/// let config = EngineConfig::default().with_progress_interval(10);
/// assert!(config.validate().is_ok());
/// assert_eq!(config.progress_capacity, 64);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Bound of the worker's outbound event channel.
    ///
    /// Progress events that do not fit are dropped; terminal events are not.
    pub progress_capacity: usize,
    /// Emit a "placing" progress event every N placement attempts.
    pub progress_interval: u64,
    /// Include skipped-input diagnostics in the result.
    pub report_skipped: bool,
    /// Stop searching once the backtrack count exceeds this and report the
    /// best partial timetable. `None` searches exhaustively.
    pub max_backtracks: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            progress_capacity: DEFAULT_PROGRESS_CAPACITY,
            progress_interval: 1,
            report_skipped: true,
            max_backtracks: None,
        }
    }
}

impl EngineConfig {
    /// Sets the event channel bound.
    pub fn with_progress_capacity(mut self, capacity: usize) -> Self {
        self.progress_capacity = capacity;
        self
    }

    /// Sets the placing-event interval.
    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Enables or disables skipped-input diagnostics.
    pub fn with_report_skipped(mut self, report: bool) -> Self {
        self.report_skipped = report;
        self
    }

    /// Stops a run once its backtrack count exceeds `limit`.
    pub fn with_max_backtracks(mut self, limit: u64) -> Self {
        self.max_backtracks = Some(limit);
        self
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.progress_capacity == 0 {
            return Err(TimetableError::InvalidConfig(
                "progress_capacity must be at least 1".into(),
            ));
        }
        if self.progress_interval == 0 {
            return Err(TimetableError::InvalidConfig(
                "progress_interval must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.progress_interval, 1);
        assert!(config.report_skipped);
        assert_eq!(config.max_backtracks, None);
    }

    #[test]
    fn test_zero_values_rejected() {
        assert!(EngineConfig::default()
            .with_progress_capacity(0)
            .validate()
            .is_err());
        assert!(EngineConfig::default()
            .with_progress_interval(0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"progress_interval": 5}"#).unwrap();
        assert_eq!(config.progress_interval, 5);
        assert_eq!(config.progress_capacity, 64);
        assert!(config.report_skipped);
        assert_eq!(config.max_backtracks, None);

        let capped: EngineConfig = serde_json::from_str(r#"{"max_backtracks": 1000}"#).unwrap();
        assert_eq!(capped.max_backtracks, Some(1000));
    }
}
