use thiserror::Error;
use tracing::{error, warn};

/// Domain errors for Numpad Prompter.
///
/// Every variant is recoverable: failures are caught at the handler boundary
/// and none may terminate the event loop.
#[derive(Error, Debug)]
pub enum PrompterError {
    /// Malformed or missing persisted document. Recovered by falling back to
    /// schema defaults.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// OS hotkey already claimed by this or another process. Recovered by
    /// skipping that single binding.
    #[error("hotkey '{accelerator}' could not be registered: {reason}")]
    RegistrationConflict { accelerator: String, reason: String },

    /// Paste-keystroke or shortcut-creation process failed to spawn or exited
    /// abnormally.
    #[error("automation failure: {0}")]
    AutomationFailure(String),

    /// Import sanitization yielded zero valid profiles. No state change, no
    /// success signal.
    #[error("import rejected: {0}")]
    ImportValidation(String),

    /// AI collaborator unreachable, malformed response, or missing key.
    /// Surfaced to the invoking action; never affects hotkey or store state.
    #[error("external service error: {0}")]
    ExternalService(String),
}

pub type Result<T> = std::result::Result<T, PrompterError>;

/// Extension trait for silent error logging with caller location tracking.
/// Use when the operation is recoverable and the user doesn't need to know.
pub trait ResultExt<T> {
    /// Log error with caller location and return None. Use for recoverable failures.
    fn log_err(self) -> Option<T>;
    /// Log as warning with caller location and return None. Use for expected failures.
    fn warn_on_err(self) -> Option<T>;
}

impl<T, E: std::fmt::Debug> ResultExt<T> for std::result::Result<T, E> {
    #[track_caller]
    fn log_err(self) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(err) => {
                let caller = std::panic::Location::caller();
                error!(
                    error = ?err,
                    file = caller.file(),
                    line = caller.line(),
                    "Operation failed"
                );
                None
            }
        }
    }

    #[track_caller]
    fn warn_on_err(self) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(err) => {
                let caller = std::panic::Location::caller();
                warn!(
                    error = ?err,
                    file = caller.file(),
                    line = caller.line(),
                    "Operation had warning"
                );
                None
            }
        }
    }
}
