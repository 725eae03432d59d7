//! Config file locations.

use std::path::{Path, PathBuf};

/// File name used for both global and project configuration.
pub const CONFIG_FILE_NAME: &str = "cset.toml";

/// `<config_dir>/cset/cset.toml`, if the platform has a config directory.
pub fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| global_config_path_in(&dir))
}

pub fn global_config_path_in(config_dir: &Path) -> PathBuf {
    config_dir.join("cset").join(CONFIG_FILE_NAME)
}

pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(CONFIG_FILE_NAME)
}
