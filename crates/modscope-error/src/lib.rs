//! Shared error taxonomy for the modscope workspace.
//!
//! Leaf crates define their own domain errors and map into this enum at the
//! boundary: fatal conditions abort the operation that hit them, warnings
//! mean the operation completed in a degraded form, internal errors signal
//! plumbing failures (closed channels, broken invariants). Cancellation is
//! its own variant because it is expected under last-request-wins
//! navigation and is swallowed at public entry points rather than reported.

pub mod fatal;
pub mod internal;
pub mod warning;

pub use fatal::FatalError;
pub use internal::InternalError;
pub use warning::WarningError;

#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Fatal(#[from] FatalError),
    #[error(transparent)]
    Warning(#[from] WarningError),
    #[error(transparent)]
    Internal(#[from] InternalError),

    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    pub fn is_warning(&self) -> bool {
        matches!(self, Error::Warning(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}
