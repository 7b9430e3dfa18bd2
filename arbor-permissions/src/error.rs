// SPDX-License-Identifier: MIT OR Apache-2.0

use arbor_core::{GrantId, PageId};
use thiserror::Error;

/// Errors of the permission engine, generic over the error `E` of the underlying store.
#[derive(Debug, Error)]
pub enum PermissionError<E> {
    #[error("page {0} not found")]
    PageNotFound(PageId),

    #[error("grant {0} not found")]
    GrantNotFound(GrantId),

    /// The requested change would break the page tree or permission invariants.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Stored state is corrupted. Reported, never repaired.
    #[error("inconsistent permission state: {0}")]
    Consistency(String),

    #[error("store error: {0}")]
    Store(E),
}
