use std::fmt;

/// Carries enough context to debug a failed generative call without
/// re-running it. `raw_output` is the reply text when the failure happened
/// after the transport succeeded.
#[derive(Debug, Clone)]
pub struct GenerativeDiagnosticsError {
    pub provider: &'static str,
    pub stage: &'static str,
    pub detail: String,
    pub raw_output: Option<String>,
}

impl fmt::Display for GenerativeDiagnosticsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "generative error (provider={}, stage={}): {}",
            self.provider, self.stage, self.detail
        )
    }
}

impl std::error::Error for GenerativeDiagnosticsError {}
