//! Controller errors and the shared error-code convention.
//!
//! Every error enum in the crate implements [`ErrorCode`] so hosts can map
//! failures to stable machine-readable codes without matching on messages.

#[cfg(test)]
#[path = "error_test.rs"]
mod error_test;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::handle::HandleError;
use crate::scene::SceneError;

/// Stable code and retry hint for an error.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

/// An application mode under which manipulation is refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisabledReason {
    ExplodedView,
    Measurement,
    SheetView,
}

impl fmt::Display for DisabledReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::ExplodedView => "exploded view is active",
            Self::Measurement => "a measurement is in progress",
            Self::SheetView => "a 2D sheet view is open",
        };
        f.write_str(text)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ManipulationError {
    #[error("manipulation disabled: {0}")]
    Disabled(DisabledReason),
    #[error(transparent)]
    Handle(#[from] HandleError),
    #[error(transparent)]
    Scene(#[from] SceneError),
}

impl ErrorCode for ManipulationError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Disabled(_) => "E_MANIPULATION_DISABLED",
            Self::Handle(e) => e.error_code(),
            Self::Scene(e) => e.error_code(),
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::Disabled(_) => true,
            Self::Handle(_) => false,
            Self::Scene(e) => e.retryable(),
        }
    }
}
