use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "import.json";
const CONFIGS_PATH_VAR: &str = "CONFIGS_PATH";

/// Settings for one import run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Records handed to the store between progress checks.
    pub batch_size: usize,
    /// Log a progress line every this many processed sections.
    pub progress_interval: usize,
    /// Upper bound on error messages kept in an `ImportResult`.
    pub max_errors: usize,
    /// Release point override, e.g. `119-46`.
    pub release_point: Option<String>,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            progress_interval: 1000,
            max_errors: 100,
            release_point: None,
        }
    }
}

impl ImportConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let content = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {CONFIG_FILE}: {e}"))?;
        let config: ImportConfig = serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse {CONFIG_FILE}: {e}"))?;
        Ok(config)
    }

    /// Load `import.json` from the directory named by `CONFIGS_PATH`.
    ///
    /// Without the variable, or when the directory has no `import.json`, the
    /// defaults are used. A file that exists but does not parse is an error.
    pub fn load_default() -> Result<Self, String> {
        let Some(dir) = env::var_os(CONFIGS_PATH_VAR) else {
            return Ok(Self::default());
        };
        let path = PathBuf::from(dir).join(CONFIG_FILE);
        if !path.exists() {
            tracing::info!(
                "No {} in {}, using defaults",
                CONFIG_FILE,
                path.parent().unwrap_or(&path).display()
            );
            return Ok(Self::default());
        }
        Self::load_from_file(path)
    }

    /// Release point to import, falling back to the built-in default.
    pub fn release_point(&self) -> &str {
        self.release_point
            .as_deref()
            .unwrap_or(crate::source::DEFAULT_RELEASE_POINT)
    }
}
