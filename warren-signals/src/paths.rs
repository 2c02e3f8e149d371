use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_DIR: &str = "warren";
pub const CONFIG_FILE: &str = "signals.yaml";

pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

pub fn config_root(base: &Path) -> PathBuf {
    base.join(CONFIG_DIR)
}

pub fn config_path(base: &Path) -> PathBuf {
    config_root(base).join(CONFIG_FILE)
}

/// `<config dir>/warren/signals.yaml`, or `None` when the platform has no config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|base| config_path(&base))
}
