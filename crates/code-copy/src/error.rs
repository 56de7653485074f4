//! Error taxonomy for binding and copying. None of these are fatal to the page.

use thiserror::Error;

/// A copy button that could not be paired with a code block at startup.
/// The button is left unbound.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    #[error("association failed for button {button}: index out of range ({code_bodies} code blocks on page)")]
    IndexOutOfRange { button: usize, code_bodies: usize },

    #[error("association failed for button {button}: no code block with id `{target}`")]
    UnknownTarget { button: usize, target: String },
}

/// A clipboard write that did not happen.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CopyError {
    /// No clipboard on this page (e.g. served over plain http)
    #[error("clipboard is not available in this context")]
    Unavailable,

    #[error("clipboard write rejected: {0}")]
    Rejected(String),
}
