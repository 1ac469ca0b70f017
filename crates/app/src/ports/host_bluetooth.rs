//! Host Bluetooth port — the system Bluetooth daemon and its tools.
//!
//! Command-line tool output is not a stable format. Callers treat the exit
//! status and recognisable substrings as a best-effort signal.

use std::future::Future;

use omnihub_domain::capability::MediaAction;
use omnihub_domain::error::OmniHubError;

/// Captured result of one tool invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    /// Lowercased stderr and stdout joined, for substring checks.
    #[must_use]
    pub fn combined_lowercase(&self) -> String {
        format!("{} {}", self.stderr, self.stdout).to_lowercase()
    }

    /// The most useful one-line explanation of a failure.
    #[must_use]
    pub fn detail(&self) -> String {
        let stderr = self.stderr.trim();
        let stdout = self.stdout.trim();
        if !stderr.is_empty() {
            stderr.to_string()
        } else if !stdout.is_empty() {
            stdout.to_string()
        } else {
            match self.code {
                Some(code) => format!("exit code {code}"),
                None => "terminated by signal".to_string(),
            }
        }
    }
}

/// Access to the host Bluetooth stack.
pub trait HostBluetooth: Send + Sync {
    /// Run the Bluetooth control tool with `args`.
    ///
    /// A missing tool is an error; a non-zero exit is reported in the output.
    fn run_tool(
        &self,
        args: Vec<String>,
    ) -> impl Future<Output = Result<ToolOutput, OmniHubError>> + Send;

    /// Register a default pairing agent by scripting the control tool.
    fn run_agent_script(
        &self,
        capability: &str,
    ) -> impl Future<Output = Result<ToolOutput, OmniHubError>> + Send;

    /// Register a default pairing agent directly on the system bus.
    fn register_agent(
        &self,
        capability: &str,
    ) -> impl Future<Output = Result<(), OmniHubError>> + Send;

    /// Raw service-discovery dump for `address`.
    fn browse_services(
        &self,
        address: &str,
    ) -> impl Future<Output = Result<String, OmniHubError>> + Send;

    /// Send an AVRCP transport control to the media player of `address`.
    fn media_control(
        &self,
        address: &str,
        action: MediaAction,
    ) -> impl Future<Output = Result<ToolOutput, OmniHubError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_prefer_stderr_then_stdout_then_exit_code_in_detail() {
        let mut output = ToolOutput {
            success: false,
            code: Some(1),
            stdout: "Attempting to pair\n".to_string(),
            stderr: "Failed to pair: org.bluez.Error.AuthenticationFailed\n".to_string(),
        };
        assert_eq!(
            output.detail(),
            "Failed to pair: org.bluez.Error.AuthenticationFailed"
        );

        output.stderr.clear();
        assert_eq!(output.detail(), "Attempting to pair");

        output.stdout.clear();
        assert_eq!(output.detail(), "exit code 1");
    }
}
