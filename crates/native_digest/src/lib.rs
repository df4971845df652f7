// Copyright (C) Microsoft Corporation. All rights reserved.

//! Message digests over whichever native OpenSSL build the host provides.
//!
//! The hash algorithms themselves live in the native library. This crate
//! decides, once per process, which of the installed library builds to bind
//! to and then exposes one streaming digest API regardless of the ABI
//! generation that was found:
//!
//! - **Legacy** (OpenSSL 1.0): `EVP_MD_CTX_create` / `EVP_MD_CTX_cleanup` /
//!   `EVP_MD_CTX_destroy`, digest table populated by `OpenSSL_add_all_digests`
//! - **Modern** (OpenSSL 1.1): `EVP_MD_CTX_new` / `EVP_MD_CTX_reset` /
//!   `EVP_MD_CTX_free`
//! - **Current** (OpenSSL 3.x): as Modern, with the `EVP_MD_get_*` getters
//!
//! # Usage
//!
//! ```no_run
//! use native_digest::*;
//!
//! # fn main() -> Result<(), DigestError> {
//! let backend = active_backend()?;
//! let algo = DigestAlgo::lookup(backend, "SHA256")?;
//! let mut ctx = DigestContext::new(backend)?;
//! ctx.init(&algo)?;
//! ctx.update(b"ab")?;
//! ctx.update(b"c")?;
//! let digest = ctx.finish_vec()?;
//! assert_eq!(digest.len(), 32);
//! # Ok(())
//! # }
//! ```
//!
//! # Thread Safety
//!
//! Backend resolution runs at most once even under concurrent first use. The
//! resolved [`ActiveBackend`] is immutable and shared freely; each
//! [`DigestContext`] belongs to a single thread.

mod backend;
mod config;
mod context;
mod digest;
mod hasher;

pub use backend::*;
pub use config::*;
pub use context::*;
pub use digest::*;
pub use hasher::*;
use thiserror::Error;

/// Error returned by the prober when no registry candidate could be bound.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendResolutionError {
    /// Every candidate library was missing, lacked an entry point, or
    /// reported a version outside its generation's range.
    #[error("no compatible native digest library found")]
    NoCompatibleLibrary,
}

/// Error type for all digest operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DigestError {
    // Backend errors
    /// No native backend could be resolved for this process.
    #[error("no compatible native digest library found")]
    NoCompatibleLibrary,
    /// The active backend has no digest of the requested name.
    #[error("unknown digest algorithm: {0}")]
    UnknownAlgorithm(String),
    /// The algorithm handle was obtained from a different backend than the context.
    #[error("digest algorithm belongs to a different backend")]
    BackendMismatch,
    /// The backend reported a non-positive output or block size.
    #[error("digest size query failed")]
    SizeQueryFailed,

    // Context lifecycle errors
    /// The native allocator returned no context.
    #[error("digest context allocation failed")]
    ContextAllocFailed,
    /// The native reset (or legacy cleanup) call failed.
    #[error("digest context reset failed")]
    ContextResetFailed,
    /// A previous native failure left the context unusable.
    #[error("digest context unusable after a native failure")]
    ContextFailed,

    // Native step failures
    /// Native digest initialization failed.
    #[error("digest initialization failed")]
    DigestInitFailed,
    /// Native digest update failed.
    #[error("digest update failed")]
    DigestUpdateFailed,
    /// Native digest finalization failed.
    #[error("digest finalization failed")]
    DigestFinalFailed,

    // Usage errors, detected locally
    /// Update or finish was called before init.
    #[error("digest context not initialized")]
    NotInitialized,
    /// Update or finish was called after finish without a new init.
    #[error("digest context already finalized")]
    AlreadyFinalized,
    /// Output buffer is too small to hold the digest.
    #[error("digest buffer too small: required {required}, provided {provided}")]
    BufferTooSmall {
        /// Bytes the algorithm produces.
        required: usize,
        /// Bytes the caller supplied.
        provided: usize,
    },
    /// A raw update was given a null pointer with a non-zero length.
    #[error("null input pointer with non-zero length")]
    NullInput,
}

impl From<BackendResolutionError> for DigestError {
    fn from(err: BackendResolutionError) -> Self {
        match err {
            BackendResolutionError::NoCompatibleLibrary => DigestError::NoCompatibleLibrary,
        }
    }
}

#[cfg(test)]
mod tests;
