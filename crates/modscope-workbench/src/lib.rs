//! The workbench session: an actor owning the module cache, presentation
//! trees, symbol index, and navigation history, driven over a command
//! channel by a clonable [`WorkbenchHandle`].
//!
//! Parsing and candidate probing run on background workers; every mutation
//! of shared state is committed on the session task. User-initiated
//! resolutions carry a [`CancellationToken`], and a newer search-hit
//! resolution cancels the in-flight one, which then resolves quietly to
//! not-found instead of erroring.

mod cancel;
pub mod candidates;
pub mod loader;
mod search_dirs;
mod session;

pub use cancel::{CancellationHandle, CancellationToken};
pub use loader::{LoadedModule, ModuleCache};
pub use search_dirs::SearchDirs;
pub use session::{NodeSnapshot, WorkbenchHandle};

/// Installs a `tracing` subscriber driven by `RUST_LOG`. For embedders and
/// examples; safe to call once per process.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}
