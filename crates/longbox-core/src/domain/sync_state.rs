//! Synchronization status state machine
//!
//! ```text
//!   ┌──────┐  begin   ┌─────────┐  fail   ┌───────┐
//!   │ Idle │ ───────► │ Syncing │ ──────► │ Error │
//!   └──────┘ ◄─────── └─────────┘ ◄────── └───────┘
//!            success              begin
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

/// Observable synchronization status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum SyncState {
    #[default]
    Idle,
    Syncing,
    /// Last operation failed; the message is user-presentable
    Error(String),
}

impl SyncState {
    pub fn is_syncing(&self) -> bool {
        matches!(self, SyncState::Syncing)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, SyncState::Error(_))
    }

    /// Returns the state name without error details
    pub fn name(&self) -> &'static str {
        match self {
            SyncState::Idle => "idle",
            SyncState::Syncing => "syncing",
            SyncState::Error(_) => "error",
        }
    }

    /// Checks whether a transition to `target` is allowed
    pub fn can_transition_to(&self, target: &SyncState) -> bool {
        matches!(
            (self, target),
            (SyncState::Idle, SyncState::Syncing)
                | (SyncState::Syncing, SyncState::Idle)
                | (SyncState::Syncing, SyncState::Error(_))
                | (SyncState::Error(_), SyncState::Syncing)
        )
    }

    /// Returns the target state if the transition is allowed
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidState` for any other transition.
    pub fn transition_to(&self, target: SyncState) -> Result<SyncState, DomainError> {
        if !self.can_transition_to(&target) {
            return Err(DomainError::InvalidState {
                from: self.name().to_string(),
                to: target.name().to_string(),
            });
        }
        Ok(target)
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncState::Idle => write!(f, "idle"),
            SyncState::Syncing => write!(f, "syncing"),
            SyncState::Error(message) => write!(f, "error: {}", message),
        }
    }
}
