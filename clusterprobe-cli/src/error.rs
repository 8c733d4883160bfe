//! CLI-specific error types and exit code mapping

use clusterprobe_core::CoreError;
use clusterprobe_generator::GenerateError;
use clusterprobe_scenario::ScenarioError;

/// CLI-specific error type.
///
/// The `exit_code()` method maps errors to process exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// Registry lookup or configuration error from clusterprobe-core.
    #[error("{0}")]
    Core(#[from] CoreError),

    /// Scenario execution failed.
    #[error("scenario failed: {0}")]
    Scenario(#[from] ScenarioError),

    /// Artifact generation failed.
    #[error("generate failed: {0}")]
    Generate(#[from] GenerateError),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file write, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                                        |
    /// |------|------------------------------------------------|
    /// | 0    | Success                                        |
    /// | 1    | General / command error, interrupted run       |
    /// | 2    | Configuration or input error, nothing executed |
    /// | 3    | Scenario failed during execution               |
    /// | 4    | Artifact generation failed                     |
    /// | 10   | IO error                                       |
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) | Self::Core(_) => 2,
            Self::Scenario(e) => match e.kind_name() {
                "validation" | "config" => 2,
                "cancelled" => 1,
                _ => 3,
            },
            Self::Generate(GenerateError::Io(_)) | Self::Io(_) => 10,
            Self::Generate(_) => 4,
            Self::JsonSerialize(_) | Self::Command(_) => 1,
        }
    }
}
