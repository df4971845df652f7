// Copyright (C) Microsoft Corporation. All rights reserved.

//! Native digest context lifecycle.
//!
//! OpenSSL 1.0 allocates contexts with `EVP_MD_CTX_create` and releases them
//! with `EVP_MD_CTX_cleanup` followed by `EVP_MD_CTX_destroy`; 1.1 and later
//! pair `EVP_MD_CTX_new` with `EVP_MD_CTX_free` and add `EVP_MD_CTX_reset`.
//! [`ScopedContext`] hides the difference and releases on drop, so a context
//! is freed on every exit path including failed init or finalize.

use std::ffi::c_void;
use std::ptr::NonNull;

use super::*;

/// Exclusively owned native digest context.
///
/// Not `Send` or `Sync`: the native context carries mutable hashing state.
pub struct ScopedContext<'a> {
    lifecycle: &'a ContextLifecycle,
    ctx: NonNull<c_void>,
}

impl<'a> ScopedContext<'a> {
    /// Allocates a context with `backend`'s generation-specific constructor.
    ///
    /// # Errors
    ///
    /// Returns `DigestError::ContextAllocFailed` if the library returns null.
    #[allow(unsafe_code)]
    pub fn acquire(backend: &'a ActiveBackend) -> Result<Self, DigestError> {
        let lifecycle = &backend.entry_points().lifecycle;
        let create = match *lifecycle {
            ContextLifecycle::Legacy { create, .. } => create,
            ContextLifecycle::Modern { new, .. } => new,
        };

        // SAFETY: the constructor takes no arguments and returns an owned context or null.
        let ctx = unsafe { create() };
        let ctx = NonNull::new(ctx).ok_or_else(|| {
            tracing::error!(error = ?DigestError::ContextAllocFailed, "Native context allocation returned null");
            DigestError::ContextAllocFailed
        })?;

        tracing::trace!(ctx = ?ctx, "Acquired digest context");
        Ok(Self { lifecycle, ctx })
    }

    /// Clears digest state so the context can start another digest.
    ///
    /// Uses `EVP_MD_CTX_reset` on Modern/Current and `EVP_MD_CTX_cleanup` on Legacy.
    ///
    /// # Errors
    ///
    /// Returns `DigestError::ContextResetFailed` if the native call reports failure.
    #[allow(unsafe_code)]
    pub fn reset(&mut self) -> Result<(), DigestError> {
        let reset = match *self.lifecycle {
            ContextLifecycle::Legacy { cleanup, .. } => cleanup,
            ContextLifecycle::Modern { reset, .. } => reset,
        };

        // SAFETY: `ctx` is a live context owned by `self`.
        let result = unsafe { reset(self.ctx.as_ptr()) };
        if result == 0 {
            tracing::error!(error = ?DigestError::ContextResetFailed, "Native context reset failed");
            Err(DigestError::ContextResetFailed)?;
        }
        Ok(())
    }

    /// Returns the native context pointer, valid while `self` is alive.
    pub(crate) fn as_ptr(&self) -> *mut c_void {
        self.ctx.as_ptr()
    }
}

impl Drop for ScopedContext<'_> {
    #[allow(unsafe_code)]
    fn drop(&mut self) {
        let ctx = self.ctx.as_ptr();
        // SAFETY: `ctx` is live and never used again after this point.
        unsafe {
            match *self.lifecycle {
                ContextLifecycle::Legacy {
                    cleanup, destroy, ..
                } => {
                    // Release proceeds regardless; destroy frees the allocation.
                    if cleanup(ctx) == 0 {
                        tracing::warn!("Native context cleanup failed during release");
                    }
                    destroy(ctx);
                }
                ContextLifecycle::Modern { free, .. } => free(ctx),
            }
        }
        tracing::trace!(ctx = ?self.ctx, "Released digest context");
    }
}
