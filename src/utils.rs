use directories::{BaseDirs, ProjectDirs};
use std::path::PathBuf;

/// Profile mode for the application (dev or prod)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Dev,
    Prod,
}

impl Profile {
    /// Directory name used under the platform config/data roots
    pub fn app_name(self) -> &'static str {
        match self {
            Profile::Dev => "tasks-dev",
            Profile::Prod => "tasks",
        }
    }
}

/// Get the configuration directory path
/// If profile is Dev, uses "tasks-dev" instead of "tasks"
pub fn get_config_dir(profile: Profile) -> Option<PathBuf> {
    ProjectDirs::from("org", "tasks", profile.app_name())
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the data directory path
/// If profile is Dev, uses "tasks-dev" instead of "tasks"
pub fn get_data_dir(profile: Profile) -> Option<PathBuf> {
    ProjectDirs::from("org", "tasks", profile.app_name())
        .map(|dirs| dirs.data_dir().to_path_buf())
}

/// Expand `~` in a path string to the user's home directory
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
