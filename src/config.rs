//! Runtime configuration.
//!
//! Defaults suit a fullscreen app. Every field can be overridden from the
//! environment:
//!
//! | Variable | Field | Example |
//! |---|---|---|
//! | `SPARK_STENCIL_LOG` | `log_filter` | `spark_stencil=trace` |
//! | `SPARK_STENCIL_LOG_DIR` | `log_dir` | `/tmp/stencil` |
//! | `SPARK_STENCIL_SYNC_CLEAR` | `background_clear = false` | `1` |
//! | `SPARK_STENCIL_INLINE` | `alt_screen = false` | `true` |

use std::path::PathBuf;

pub const ENV_LOG: &str = "SPARK_STENCIL_LOG";
pub const ENV_LOG_DIR: &str = "SPARK_STENCIL_LOG_DIR";
pub const ENV_SYNC_CLEAR: &str = "SPARK_STENCIL_SYNC_CLEAR";
pub const ENV_INLINE: &str = "SPARK_STENCIL_INLINE";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Clear vacated buffers on a worker thread instead of inside `swap()`.
    pub background_clear: bool,
    /// Draw on the alternate screen, filling the terminal. When false the
    /// output is inline and the root takes its content height.
    pub alt_screen: bool,
    /// Where the log file goes.
    pub log_dir: PathBuf,
    /// `EnvFilter` directives.
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            background_clear: true,
            alt_screen: true,
            log_dir: std::env::temp_dir().join("spark-stencil"),
            log_filter: "spark_stencil=info".to_string(),
        }
    }
}

impl Config {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by `lookup`, which maps a variable name to its
    /// value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            background_clear: !lookup(ENV_SYNC_CLEAR).is_some_and(|v| is_truthy(&v)),
            alt_screen: !lookup(ENV_INLINE).is_some_and(|v| is_truthy(&v)),
            log_dir: lookup(ENV_LOG_DIR)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.log_dir),
            log_filter: lookup(ENV_LOG)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.log_filter),
        }
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
