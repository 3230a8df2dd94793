use crate::ModHandle;
use ember_mod_api::{EventHandle, ModError};
use std::path::PathBuf;

/// Errors raised by the mod host.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("failed to load mod library {}: {reason}", .path.display())]
    LoadFailed { path: PathBuf, reason: String },

    #[error("mod library {} does not export `{symbol}`: {reason}", .path.display())]
    SymbolMissing {
        path: PathBuf,
        symbol: String,
        reason: String,
    },

    #[error("mod library {} returned a null instance", .path.display())]
    NullInstance { path: PathBuf },

    #[error(
        "mod library {} was built against mod API {found}, host provides {expected}",
        .path.display()
    )]
    VersionMismatch {
        path: PathBuf,
        expected: String,
        found: String,
    },

    #[error("a mod named {0} is already loaded")]
    AlreadyLoaded(String),

    #[error("no mod loaded as {0}")]
    NotFound(ModHandle),

    #[error("{0} was registered in-process and cannot be reloaded")]
    NotReloadable(ModHandle),

    #[error("{0} is not a registered event")]
    UnknownEvent(EventHandle),

    #[error("invalid zoom bounds: min {min}, max {max}")]
    InvalidZoomBounds { min: f32, max: f32 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("mod {name} failed: {source}")]
    Mod {
        name: String,
        #[source]
        source: ModError,
    },
}
