//! Processor configuration, loadable from YAML.
//!
//! ```yaml
//! signals: [terminate-request, interrupt, SIGHUP]
//! resume: eager
//! drain_on_shutdown: true
//! drain_timeout_ms: 2000
//! ```
//!
//! Every field is optional; omitted fields take their defaults.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{io_err, SignalError};
use crate::kind::SignalSet;
use crate::paths::{default_config_path, DEFAULT_DRAIN_TIMEOUT};

/// What happens to a held batch when dispatch is resumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResumePolicy {
    /// The held batch goes out with the next incoming signal.
    #[default]
    Lazy,
    /// The held batch goes out as soon as the processor loop sees the resume.
    Eager,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessorConfig {
    /// Allow-list of signals to subscribe to.
    pub signals: SignalSet,
    pub resume: ResumePolicy,
    /// Wait for in-flight handler calls before reporting the processor stopped.
    pub drain_on_shutdown: bool,
    pub drain_timeout_ms: u64,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            signals: SignalSet::catchable(),
            resume: ResumePolicy::Lazy,
            drain_on_shutdown: false,
            drain_timeout_ms: DEFAULT_DRAIN_TIMEOUT.as_millis() as u64,
        }
    }
}

impl ProcessorConfig {
    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, SignalError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validated()
    }

    pub fn load(path: &Path) -> Result<Self, SignalError> {
        let raw = fs::read_to_string(path).map_err(|e| io_err(path, e))?;
        let config: Self = serde_yaml::from_str(&raw).map_err(|source| SignalError::Config {
            path: path.to_path_buf(),
            source,
        })?;
        config.validated()
    }

    /// Load the per-user config file if it exists, defaults otherwise.
    pub fn load_default() -> Result<Self, SignalError> {
        match default_config_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    fn validated(self) -> Result<Self, SignalError> {
        if self.signals.is_empty() {
            return Err(SignalError::EmptySignalSet);
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::SignalKind;
    use crate::paths::config_path;
    use tempfile::TempDir;

    #[test]
    fn defaults_subscribe_to_everything_with_lazy_resume() {
        let config = ProcessorConfig::default();
        assert_eq!(config.signals, SignalSet::catchable());
        assert_eq!(config.resume, ResumePolicy::Lazy);
        assert!(!config.drain_on_shutdown);
        assert_eq!(config.drain_timeout(), DEFAULT_DRAIN_TIMEOUT);
    }

    #[test]
    fn partial_yaml_keeps_defaults_for_missing_fields() {
        let config =
            ProcessorConfig::from_yaml_str("signals: [SIGTERM, hangup]\nresume: eager\n")
                .expect("parse config");
        let expected: SignalSet = [SignalKind::TerminateRequest, SignalKind::Hangup]
            .into_iter()
            .collect();
        assert_eq!(config.signals, expected);
        assert_eq!(config.resume, ResumePolicy::Eager);
        assert!(!config.drain_on_shutdown);
        assert_eq!(config.drain_timeout_ms, 5000);
    }

    #[test]
    fn empty_mapping_is_all_defaults() {
        let config = ProcessorConfig::from_yaml_str("{}").expect("parse config");
        assert_eq!(config, ProcessorConfig::default());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = ProcessorConfig::from_yaml_str("flush_on_resume: true\n").unwrap_err();
        assert!(matches!(err, SignalError::Yaml(_)), "got: {err}");
        assert!(err.to_string().contains("flush_on_resume"));
    }

    #[test]
    fn empty_signal_list_is_rejected() {
        let err = ProcessorConfig::from_yaml_str("signals: []\n").unwrap_err();
        assert!(matches!(err, SignalError::EmptySignalSet), "got: {err}");
    }

    #[test]
    fn uncatchable_signal_in_list_is_a_parse_error() {
        let err = ProcessorConfig::from_yaml_str("signals: [SIGKILL]\n").unwrap_err();
        assert!(err.to_string().contains("SIGKILL"), "got: {err}");
    }

    #[test]
    fn load_reads_file_and_reports_path_on_parse_failure() {
        let home = TempDir::new().expect("tempdir");
        let path = config_path(home.path());
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");

        fs::write(&path, "drain_on_shutdown: true\ndrain_timeout_ms: 250\n").expect("write");
        let config = ProcessorConfig::load(&path).expect("load config");
        assert!(config.drain_on_shutdown);
        assert_eq!(config.drain_timeout(), Duration::from_millis(250));

        fs::write(&path, "resume: sometimes\n").expect("write");
        let err = ProcessorConfig::load(&path).unwrap_err();
        assert!(matches!(err, SignalError::Config { .. }), "got: {err}");
        assert!(err.to_string().contains("signals.yaml"));
    }

    #[test]
    fn load_missing_file_is_an_io_error_with_path() {
        let home = TempDir::new().expect("tempdir");
        let path = home.path().join("absent.yaml");
        let err = ProcessorConfig::load(&path).unwrap_err();
        assert!(matches!(err, SignalError::Io { .. }), "got: {err}");
        assert!(err.to_string().contains("absent.yaml"));
    }
}
