//! Error types for the action and poll engine.

use dbot_core::DbotError;
use thiserror::Error;

/// Registry failures. Lookups never fail; only registration can.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Action registry is full ({capacity} actions) and eviction is disabled")]
    Full { capacity: usize },

    #[error("Could not generate a unique token after {attempts} attempts")]
    TokenSpaceExhausted { attempts: usize },
}

/// Errors surfaced while driving an action or a poll.
#[derive(Error, Debug)]
pub enum InteractError {
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("{0}")]
    Transport(#[from] DbotError),

    /// The application callback returned an error or panicked.
    #[error("{0}")]
    Callback(String),
}
