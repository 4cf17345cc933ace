//! Constants used throughout the CLI.

/// Exit codes for the CLI.
///
/// These follow common Unix conventions:
/// - 0: Success
/// - 1: General error (used by anyhow for unhandled errors)
/// - 2: Misuse of shell command (clap usage errors)
/// - 3+: Application-specific errors
pub mod exit_codes {
    /// Nothing to lock: the checklist from a previous unlock is missing.
    pub const NOT_FOUND: i32 = 3;

    /// Invalid user input or configuration.
    pub const INVALID_INPUT: i32 = 4;

    /// The encryption tool failed.
    pub const EXTERNAL_TOOL: i32 = 5;

    /// Refused to overwrite existing state (already unlocked or initialized).
    pub const CONFLICT: i32 = 6;
}

/// Environment variable holding a log filter directive.
pub const LOG_ENV: &str = "JOURNAL_LOG";
