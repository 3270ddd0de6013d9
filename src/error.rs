//! Fatal conditions and the process exit codes they map to.
//!
//! None of these are recoverable inside the engine. The binary logs the
//! error and exits with [`FatalError::exit_code`].

use crate::display::{DisplayNotFound, DisplaySourceError};

/// Process exit codes.
pub mod exit_code {
    /// Configuration file could not be read or is invalid
    pub const CONFIG_INVALID: i32 = 2;
    /// The OS disabled the input tap after user input
    pub const TAP_DISABLED_BY_USER_INPUT: i32 = 3;
    /// The OS disabled the input tap because a callback took too long
    pub const TAP_DISABLED_BY_TIMEOUT: i32 = 4;
    /// An input arrived at a point outside every known display
    pub const DISPLAY_NOT_FOUND: i32 = 5;
    /// The active display list could not be queried
    pub const DISPLAY_LIST_UNAVAILABLE: i32 = 6;
    /// The OS input listener could not be started or stopped unexpectedly
    pub const LISTEN_FAILED: i32 = 7;
}

/// Why the OS revoked the input tap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapDisabledCause {
    UserInput,
    Timeout,
}

/// Conditions that end the process.
#[derive(Debug, thiserror::Error)]
pub enum FatalError {
    #[error("Event tap disabled by user input")]
    TapDisabledByUserInput,

    #[error("Event tap disabled by timeout")]
    TapDisabledByTimeout,

    #[error(transparent)]
    DisplayNotFound(#[from] DisplayNotFound),

    #[error(transparent)]
    DisplayListUnavailable(#[from] DisplaySourceError),

    #[error("Input listener failed: {0}")]
    ListenFailed(String),
}

impl FatalError {
    pub fn tap_disabled(cause: TapDisabledCause) -> Self {
        match cause {
            TapDisabledCause::UserInput => FatalError::TapDisabledByUserInput,
            TapDisabledCause::Timeout => FatalError::TapDisabledByTimeout,
        }
    }

    /// Exit status the process should terminate with.
    pub fn exit_code(&self) -> i32 {
        match self {
            FatalError::TapDisabledByUserInput => exit_code::TAP_DISABLED_BY_USER_INPUT,
            FatalError::TapDisabledByTimeout => exit_code::TAP_DISABLED_BY_TIMEOUT,
            FatalError::DisplayNotFound(_) => exit_code::DISPLAY_NOT_FOUND,
            FatalError::DisplayListUnavailable(_) => exit_code::DISPLAY_LIST_UNAVAILABLE,
            FatalError::ListenFailed(_) => exit_code::LISTEN_FAILED,
        }
    }
}
