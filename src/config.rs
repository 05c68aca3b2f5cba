use std::path::PathBuf;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

pub const ENV_ENVIRONMENT: &str = "DBLOG_ENVIRONMENT";
pub const ENV_APPLICATION: &str = "DBLOG_APPLICATION";
pub const ENV_TRACE_TARGET: &str = "DBLOG_TRACE_TARGET";
pub const ENV_WORKSPACE: &str = "DBLOG_WORKSPACE";

/// Settings identifying the embedding application and where its log lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbLogConfig {
    pub environment: String,
    pub application: String,
    pub trace_target: String,
    pub workspace_dir: Option<PathBuf>,
}

impl Default for DbLogConfig {
    fn default() -> Self {
        Self {
            environment: "development".into(),
            application: env!("CARGO_PKG_NAME").into(),
            trace_target: env!("CARGO_PKG_NAME").into(),
            workspace_dir: None,
        }
    }
}

impl DbLogConfig {
    /// Defaults overlaid with any `DBLOG_*` environment variables.
    pub fn from_env() -> Self {
        Self::default().overlay(|name| std::env::var(name).ok())
    }

    pub(crate) fn overlay(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: &str| lookup(name).filter(|v: &String| !v.trim().is_empty());
        if let Some(value) = non_empty(ENV_ENVIRONMENT) {
            self.environment = value;
        }
        if let Some(value) = non_empty(ENV_APPLICATION) {
            self.application = value;
        }
        if let Some(value) = non_empty(ENV_TRACE_TARGET) {
            self.trace_target = value;
        }
        if let Some(value) = non_empty(ENV_WORKSPACE) {
            self.workspace_dir = Some(PathBuf::from(value));
        }
        self
    }

    /// The configured workspace, else the platform data directory for the
    /// application, else a folder under the temp dir.
    pub fn resolve_workspace(&self) -> PathBuf {
        if let Some(dir) = &self.workspace_dir {
            return dir.clone();
        }
        if let Some(proj) = ProjectDirs::from("", "", &self.application) {
            proj.data_dir().to_path_buf()
        } else {
            std::env::temp_dir().join(&self.application)
        }
    }
}
