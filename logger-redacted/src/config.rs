// Logger configuration
use serde::{Deserialize, Serialize};

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines for local development
    Pretty,
    /// One JSON object per line for log shippers
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggerConfig {
    pub format: LogFormat,
    /// Filter used when `RUST_LOG` is not set
    pub default_directives: String,
    pub ansi: bool,
}

impl LoggerConfig {
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_default_directives(mut self, directives: impl Into<String>) -> Self {
        self.default_directives = directives.into();
        self
    }

    pub fn with_ansi(mut self, ansi: bool) -> Self {
        self.ansi = ansi;
        self
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            default_directives: "info".to_string(),
            ansi: true,
        }
    }
}
