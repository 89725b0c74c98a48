use std::fmt;
use std::fs::File;

use colored::Colorize;
use log::info;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorSetting {
    /// Locals capacity of frames whose member reports no max-locals.
    pub max_locals_default: usize,
    /// Class-name prefixes treated as uninstrumented code.
    pub ignored_prefixes: Vec<String>,
    pub normalize_constraints: bool,
    /// Purge collected references every N callbacks; 0 disables purging.
    pub purge_collected_interval: usize,
    /// Stop tracking the execution at the first error instead of skipping
    /// the offending callback.
    pub abort_on_error: bool,
}

impl Default for ExecutorSetting {
    fn default() -> Self {
        get_default_setting_for_concolic_execution()
    }
}

pub fn get_default_setting_for_concolic_execution() -> ExecutorSetting {
    ExecutorSetting {
        max_locals_default: 1024,
        ignored_prefixes: vec![
            "java.".to_string(),
            "javax.".to_string(),
            "sun.".to_string(),
            "jdk.".to_string(),
            "com.sun.".to_string(),
        ],
        normalize_constraints: true,
        purge_collected_interval: 4096,
        abort_on_error: true,
    }
}

/// Setting used by the replay tool: keeps going after a failing callback so
/// that every problem of a trace gets reported.
pub fn get_default_setting_for_diagnostics() -> ExecutorSetting {
    ExecutorSetting {
        abort_on_error: false,
        ..get_default_setting_for_concolic_execution()
    }
}

pub fn load_setting_from_json(file_path: &str) -> Result<ExecutorSetting, serde_json::Error> {
    match File::open(file_path) {
        Ok(file) => serde_json::from_reader(file),
        Err(_) => {
            info!("Use the default setting for concolic execution");
            Ok(ExecutorSetting::default())
        }
    }
}

impl fmt::Display for ExecutorSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "⚙️ Executor Settings:
    ├─ Default Max Locals        : {}
    ├─ Ignored Prefixes          : {}
    ├─ Normalize Constraints     : {}
    ├─ Purge Interval            : {}
    └─ Abort On Error            : {}",
            self.max_locals_default.to_string().bright_yellow(),
            self.ignored_prefixes.join(", ").bright_yellow(),
            self.normalize_constraints.to_string().bright_yellow(),
            self.purge_collected_interval.to_string().bright_yellow(),
            self.abort_on_error.to_string().bright_yellow()
        )
    }
}
