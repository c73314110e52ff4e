//! Frame graph error types

use crate::backend::BackendError;
use thiserror::Error;

/// Errors surfaced by compiling or executing a frame.
///
/// Authoring mistakes (stale handles, nodes from another frame) are not
/// represented here; they panic at the call site.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("Failed to allocate '{name}': {source}")]
    AllocationFailed {
        name: String,
        #[source]
        source: BackendError,
    },
    #[error("Pass '{pass}' failed: {message}")]
    PassFailed { pass: String, message: String },
}

pub type GraphResult<T> = Result<T, GraphError>;
