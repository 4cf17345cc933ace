//! CLI error types for structured error handling.
//!
//! Core errors are mapped to a message, an optional hint, and an exit code,
//! so every command reports failures the same way.

use std::fmt;

use journal_core::JournalError;

use crate::constants::exit_codes;

/// CLI-specific errors with associated exit codes.
#[derive(Debug, Clone)]
pub enum CliError {
    /// Resource not found (checklist).
    NotFound { message: String, hint: String },

    /// Invalid user input or configuration.
    InvalidInput {
        message: String,
        hint: Option<String>,
    },

    /// The encryption tool failed.
    ExternalTool { message: String, hint: String },

    /// Existing state would be overwritten.
    Conflict { message: String, hint: String },

    /// Anything else.
    Other(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())?;
        if let Some(hint) = self.hint() {
            write!(f, "\n{}", hint)?;
        }
        Ok(())
    }
}

impl std::error::Error for CliError {}

impl CliError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        CliError::InvalidInput {
            message: message.into(),
            hint: None,
        }
    }

    /// Classify an error from any command.
    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        if let Some(journal) = err.chain().find_map(|e| e.downcast_ref::<JournalError>()) {
            return Self::from_journal(journal);
        }
        if let Some(cli) = err.downcast_ref::<CliError>() {
            return cli.clone();
        }
        CliError::Other(format!("{:#}", err))
    }

    pub fn from_journal(err: &JournalError) -> Self {
        let message = err.to_string();
        match err {
            JournalError::MissingChecklist { .. } => CliError::NotFound {
                message,
                hint: "Hint: Nothing is unlocked. Run `journal unlock` first.".to_string(),
            },
            JournalError::AlreadyUnlocked { .. } => CliError::Conflict {
                message,
                hint: "Hint: Run `journal lock` to seal the open entries before unlocking again."
                    .to_string(),
            },
            JournalError::AlreadyInitialized { .. } => CliError::Conflict {
                message,
                hint: "Hint: Pass --force to replace the recipient.".to_string(),
            },
            JournalError::ExternalTool { .. } => CliError::ExternalTool {
                message,
                hint: "Hint: Check that gpg can use your key, or set [gpg] command in the config."
                    .to_string(),
            },
            JournalError::InvalidInput(_) => CliError::InvalidInput {
                message,
                hint: None,
            },
            JournalError::Parse { .. } => CliError::InvalidInput {
                message,
                hint: Some(
                    "Hint: The .check file is damaged; inspect it before locking.".to_string(),
                ),
            },
            _ => CliError::Other(message),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            CliError::NotFound { message, .. }
            | CliError::InvalidInput { message, .. }
            | CliError::ExternalTool { message, .. }
            | CliError::Conflict { message, .. }
            | CliError::Other(message) => message,
        }
    }

    pub fn hint(&self) -> Option<&str> {
        match self {
            CliError::NotFound { hint, .. }
            | CliError::ExternalTool { hint, .. }
            | CliError::Conflict { hint, .. } => Some(hint),
            CliError::InvalidInput { hint, .. } => hint.as_deref(),
            CliError::Other(_) => None,
        }
    }

    /// Get the exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::NotFound { .. } => exit_codes::NOT_FOUND,
            CliError::InvalidInput { .. } => exit_codes::INVALID_INPUT,
            CliError::ExternalTool { .. } => exit_codes::EXTERNAL_TOOL,
            CliError::Conflict { .. } => exit_codes::CONFLICT,
            CliError::Other(_) => 1,
        }
    }
}
