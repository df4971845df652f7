// Copyright (C) Microsoft Corporation. All rights reserved.

//! Streaming digest engine.
//!
//! A digest runs through `init -> update* -> finish` on a [`DigestContext`].
//! Algorithms are looked up by name on the active backend and their output
//! size is queried from the library each time it is needed, never assumed.
//!
//! # State Machine
//!
//! ```text
//! Created --init--> Initialized --update--> Updated --finish--> Finalized
//!                        ^                     |  ^                  |
//!                        |                     +--+ update           |
//!                        +------------------ init -------------------+
//! ```
//!
//! Any native failure moves the context to `Failed`, after which every call
//! returns `DigestError::ContextFailed`.

use std::ffi::c_uint;
use std::ffi::c_void;
use std::ffi::CString;
use std::fmt;
use std::ptr;
use std::ptr::NonNull;

use super::*;

/// Handle to a digest algorithm owned by the native library.
///
/// Obtained from [`DigestAlgo::lookup`]; never freed by this crate.
#[derive(Clone)]
pub struct DigestAlgo<'a> {
    backend: &'a ActiveBackend,
    md: NonNull<c_void>,
    name: String,
}

// SAFETY: `EVP_MD` objects returned by name lookup are immutable library data.
#[allow(unsafe_code)]
unsafe impl Send for DigestAlgo<'_> {}
#[allow(unsafe_code)]
unsafe impl Sync for DigestAlgo<'_> {}

impl<'a> DigestAlgo<'a> {
    /// Looks up a digest by exact, case-sensitive name on `backend`.
    ///
    /// The name is handed to the library unmodified; whether e.g. `SHA256`,
    /// `sha256` or `SHA2-256` are accepted is up to the backend.
    ///
    /// # Errors
    ///
    /// Returns `DigestError::UnknownAlgorithm` if the backend has no such digest.
    #[allow(unsafe_code)]
    pub fn lookup(backend: &'a ActiveBackend, name: &str) -> Result<Self, DigestError> {
        // An interior NUL can never name a native digest.
        let c_name =
            CString::new(name).map_err(|_| DigestError::UnknownAlgorithm(name.to_string()))?;

        // SAFETY: `c_name` is NUL-terminated and outlives the call.
        let md = unsafe { (backend.entry_points().digest_by_name)(c_name.as_ptr()) };
        let md = NonNull::new(md as *mut c_void).ok_or_else(|| {
            tracing::debug!(name, "Digest not provided by the active backend");
            DigestError::UnknownAlgorithm(name.to_string())
        })?;

        Ok(Self {
            backend,
            md,
            name: name.to_string(),
        })
    }

    /// Returns the name this handle was looked up with.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the backend this handle belongs to.
    pub fn backend(&self) -> &'a ActiveBackend {
        self.backend
    }

    /// Queries the digest output size in bytes from the library.
    ///
    /// # Errors
    ///
    /// Returns `DigestError::SizeQueryFailed` for a non-positive answer.
    #[allow(unsafe_code)]
    pub fn output_size(&self) -> Result<usize, DigestError> {
        // SAFETY: `md` is a live digest of this backend.
        let size = unsafe { (self.backend.entry_points().md_size)(self.md.as_ptr()) };
        positive_size(size, "output")
    }

    /// Queries the digest input block size in bytes from the library.
    ///
    /// # Errors
    ///
    /// Returns `DigestError::SizeQueryFailed` for a non-positive answer.
    #[allow(unsafe_code)]
    pub fn block_size(&self) -> Result<usize, DigestError> {
        // SAFETY: `md` is a live digest of this backend.
        let size = unsafe { (self.backend.entry_points().md_block_size)(self.md.as_ptr()) };
        positive_size(size, "block")
    }

    fn as_ptr(&self) -> *const c_void {
        self.md.as_ptr()
    }
}

fn positive_size(size: std::ffi::c_int, kind: &'static str) -> Result<usize, DigestError> {
    match usize::try_from(size) {
        Ok(size) if size > 0 => Ok(size),
        _ => {
            tracing::error!(size, kind, "Native digest size query failed");
            Err(DigestError::SizeQueryFailed)
        }
    }
}

impl fmt::Debug for DigestAlgo<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DigestAlgo")
            .field("name", &self.name)
            .field("md", &self.md)
            .finish()
    }
}

/// Position of a [`DigestContext`] in the digest protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestState {
    /// Context allocated, no algorithm bound.
    Created,
    /// Algorithm bound, no data fed yet.
    Initialized,
    /// At least one update accepted.
    Updated,
    /// Digest produced; needs a new init before further use.
    Finalized,
    /// A native call failed; the context must be discarded.
    Failed,
}

/// Streaming digest over one native context.
///
/// The native context is released when this value is dropped.
pub struct DigestContext<'a> {
    backend: &'a ActiveBackend,
    scope: ScopedContext<'a>,
    algo: Option<DigestAlgo<'a>>,
    state: DigestState,
}

impl<'a> DigestContext<'a> {
    /// Acquires a fresh context on `backend`.
    ///
    /// # Errors
    ///
    /// Returns `DigestError::ContextAllocFailed` if the library cannot allocate one.
    pub fn new(backend: &'a ActiveBackend) -> Result<Self, DigestError> {
        Ok(Self {
            backend,
            scope: ScopedContext::acquire(backend)?,
            algo: None,
            state: DigestState::Created,
        })
    }

    /// Returns the current protocol state.
    pub fn state(&self) -> DigestState {
        self.state
    }

    /// Returns the algorithm bound by the last successful init.
    pub fn algo(&self) -> Option<&DigestAlgo<'a>> {
        self.algo.as_ref()
    }

    /// Binds `algo` and starts a new digest.
    ///
    /// Calling init on a context that was already used resets it first and
    /// discards any accumulated input.
    ///
    /// # Errors
    ///
    /// - `DigestError::BackendMismatch` if `algo` came from another backend
    /// - `DigestError::ContextFailed` after an earlier native failure
    /// - `DigestError::ContextResetFailed` / `DigestError::DigestInitFailed`
    ///   if the library reports failure
    #[allow(unsafe_code)]
    pub fn init(&mut self, algo: &DigestAlgo<'a>) -> Result<(), DigestError> {
        if !ptr::eq(algo.backend(), self.backend) {
            Err(DigestError::BackendMismatch)?;
        }
        match self.state {
            DigestState::Failed => Err(DigestError::ContextFailed)?,
            DigestState::Created => {}
            DigestState::Initialized | DigestState::Updated | DigestState::Finalized => {
                self.scope.reset().inspect_err(|_| self.state = DigestState::Failed)?;
            }
        }

        // SAFETY: context and digest are live objects of the same backend; no engine.
        let result = unsafe {
            (self.backend.entry_points().digest_init)(
                self.scope.as_ptr(),
                algo.as_ptr(),
                ptr::null_mut(),
            )
        };
        if result == 0 {
            tracing::error!(algo = algo.name(), "Native digest init failed");
            self.state = DigestState::Failed;
            Err(DigestError::DigestInitFailed)?;
        }

        self.algo = Some(algo.clone());
        self.state = DigestState::Initialized;
        Ok(())
    }

    /// Feeds `data` into the digest. Empty slices are accepted.
    ///
    /// # Errors
    ///
    /// - `DigestError::NotInitialized` before init
    /// - `DigestError::AlreadyFinalized` after finish
    /// - `DigestError::DigestUpdateFailed` if the library reports failure
    pub fn update(&mut self, data: &[u8]) -> Result<(), DigestError> {
        self.check_accepting()?;
        self.native_update(data.as_ptr().cast(), data.len())
    }

    /// Feeds `len` bytes starting at `data` into the digest.
    ///
    /// # Safety
    ///
    /// `data` must be valid for reads of `len` bytes for the duration of the
    /// call. A null `data` is only allowed with `len == 0`.
    ///
    /// # Errors
    ///
    /// As [`DigestContext::update`], plus `DigestError::NullInput` for a null
    /// pointer with non-zero length.
    #[allow(unsafe_code)]
    pub unsafe fn update_raw(&mut self, data: *const u8, len: usize) -> Result<(), DigestError> {
        self.check_accepting()?;
        if data.is_null() {
            if len != 0 {
                Err(DigestError::NullInput)?;
            }
            // Nothing to feed; the native side is never handed a null pointer.
            return self.native_update(NonNull::<u8>::dangling().as_ptr().cast(), 0);
        }
        self.native_update(data.cast(), len)
    }

    /// Produces the digest.
    ///
    /// With `None`, returns the required output size without finalizing.
    /// With `Some(output)`, writes exactly the algorithm's output size into
    /// the front of `output` and returns that count; the context is then
    /// finalized until the next init. On native failure the written region
    /// is zeroed.
    ///
    /// # Errors
    ///
    /// - `DigestError::NotInitialized` before init
    /// - `DigestError::AlreadyFinalized` on a second finish
    /// - `DigestError::BufferTooSmall` if `output` is shorter than the digest;
    ///   the context is left untouched
    /// - `DigestError::SizeQueryFailed` / `DigestError::DigestFinalFailed`
    ///   if the library reports failure
    #[allow(unsafe_code)]
    pub fn finish(&mut self, output: Option<&mut [u8]>) -> Result<usize, DigestError> {
        self.check_accepting()?;
        let size = match &self.algo {
            Some(algo) => algo.output_size()?,
            None => Err(DigestError::NotInitialized)?,
        };

        let Some(output) = output else {
            return Ok(size);
        };
        if output.len() < size {
            Err(DigestError::BufferTooSmall {
                required: size,
                provided: output.len(),
            })?;
        }

        let output = &mut output[..size];
        let mut written: c_uint = 0;
        // SAFETY: `output` holds at least the size the library reports for
        // the bound digest, which is what finalize writes.
        let result = unsafe {
            (self.backend.entry_points().digest_final)(
                self.scope.as_ptr(),
                output.as_mut_ptr(),
                &mut written,
            )
        };
        if result == 0 || written as usize != size {
            tracing::error!(result, written, size, "Native digest finalize failed");
            output.fill(0);
            self.state = DigestState::Failed;
            Err(DigestError::DigestFinalFailed)?;
        }

        self.state = DigestState::Finalized;
        Ok(size)
    }

    /// Produces the digest into a newly allocated vector.
    ///
    /// # Errors
    ///
    /// As [`DigestContext::finish`].
    pub fn finish_vec(&mut self) -> Result<Vec<u8>, DigestError> {
        let size = self.finish(None)?;
        let mut digest = vec![0u8; size];
        let written = self.finish(Some(&mut digest))?;
        digest.truncate(written);
        Ok(digest)
    }

    /// Resets the native context and returns to `Created`.
    ///
    /// # Errors
    ///
    /// `DigestError::ContextFailed` after an earlier native failure, or
    /// `DigestError::ContextResetFailed` if the library reports failure.
    pub fn reset(&mut self) -> Result<(), DigestError> {
        if self.state == DigestState::Failed {
            Err(DigestError::ContextFailed)?;
        }
        self.scope
            .reset()
            .inspect_err(|_| self.state = DigestState::Failed)?;
        self.algo = None;
        self.state = DigestState::Created;
        Ok(())
    }

    fn check_accepting(&self) -> Result<(), DigestError> {
        match self.state {
            DigestState::Initialized | DigestState::Updated => Ok(()),
            DigestState::Created => Err(DigestError::NotInitialized),
            DigestState::Finalized => Err(DigestError::AlreadyFinalized),
            DigestState::Failed => Err(DigestError::ContextFailed),
        }
    }

    #[allow(unsafe_code)]
    fn native_update(&mut self, data: *const c_void, len: usize) -> Result<(), DigestError> {
        // SAFETY: callers guarantee `data` is readable for `len` bytes.
        let result = unsafe {
            (self.backend.entry_points().digest_update)(self.scope.as_ptr(), data, len)
        };
        if result == 0 {
            tracing::error!(len, "Native digest update failed");
            self.state = DigestState::Failed;
            Err(DigestError::DigestUpdateFailed)?;
        }
        self.state = DigestState::Updated;
        Ok(())
    }
}

impl fmt::Debug for DigestContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DigestContext")
            .field("algo", &self.algo)
            .field("state", &self.state)
            .finish()
    }
}
