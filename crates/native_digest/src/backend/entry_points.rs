// Copyright (C) Microsoft Corporation. All rights reserved.

//! Typed entry-point table.
//!
//! Symbols are resolved as untyped addresses and cast once, here, to the
//! C signatures the EVP API documents. Everything above this module calls
//! through the typed table.

use std::ffi::c_char;
use std::ffi::c_int;
use std::ffi::c_uint;
use std::ffi::c_ulong;
use std::ffi::c_void;
use std::mem;

use super::*;

/// `EVP_MD_CTX *EVP_MD_CTX_new(void)` / `EVP_MD_CTX_create`.
pub(crate) type CtxNewFn = unsafe extern "C" fn() -> *mut c_void;
/// `int EVP_MD_CTX_reset(EVP_MD_CTX *)` / `EVP_MD_CTX_cleanup`.
pub(crate) type CtxResetFn = unsafe extern "C" fn(*mut c_void) -> c_int;
/// `void EVP_MD_CTX_free(EVP_MD_CTX *)` / `EVP_MD_CTX_destroy`.
pub(crate) type CtxFreeFn = unsafe extern "C" fn(*mut c_void);
/// `int EVP_DigestInit_ex(EVP_MD_CTX *, const EVP_MD *, ENGINE *)`.
pub(crate) type DigestInitFn = unsafe extern "C" fn(*mut c_void, *const c_void, *mut c_void) -> c_int;
/// `int EVP_DigestUpdate(EVP_MD_CTX *, const void *, size_t)`.
pub(crate) type DigestUpdateFn = unsafe extern "C" fn(*mut c_void, *const c_void, usize) -> c_int;
/// `int EVP_DigestFinal_ex(EVP_MD_CTX *, unsigned char *, unsigned int *)`.
pub(crate) type DigestFinalFn = unsafe extern "C" fn(*mut c_void, *mut u8, *mut c_uint) -> c_int;
/// `const EVP_MD *EVP_get_digestbyname(const char *)`.
pub(crate) type DigestByNameFn = unsafe extern "C" fn(*const c_char) -> *const c_void;
/// `int EVP_MD_get_size(const EVP_MD *)` and the block-size getter.
pub(crate) type MdSizeFn = unsafe extern "C" fn(*const c_void) -> c_int;
/// `const char *OpenSSL_version(int)` / `SSLeay_version`.
pub(crate) type VersionStringFn = unsafe extern "C" fn(c_int) -> *const c_char;
/// `unsigned long OpenSSL_version_num(void)` / `SSLeay`.
pub(crate) type VersionNumberFn = unsafe extern "C" fn() -> c_ulong;
/// `void OpenSSL_add_all_digests(void)`.
pub(crate) type RegisterDigestsFn = unsafe extern "C" fn();

/// Context lifecycle calls, by generation.
#[derive(Clone, Copy)]
pub(crate) enum ContextLifecycle {
    /// create, then cleanup + destroy on release.
    Legacy {
        create: CtxNewFn,
        cleanup: CtxResetFn,
        destroy: CtxFreeFn,
    },
    /// new, then free on release; reset for reuse.
    Modern {
        new: CtxNewFn,
        reset: CtxResetFn,
        free: CtxFreeFn,
    },
}

/// Entry points of one bound backend.
#[derive(Clone, Copy)]
pub(crate) struct EntryPointTable {
    pub(crate) lifecycle: ContextLifecycle,
    pub(crate) digest_init: DigestInitFn,
    pub(crate) digest_update: DigestUpdateFn,
    pub(crate) digest_final: DigestFinalFn,
    pub(crate) digest_by_name: DigestByNameFn,
    pub(crate) md_size: MdSizeFn,
    pub(crate) md_block_size: MdSizeFn,
    pub(crate) version_string: VersionStringFn,
    pub(crate) version_number: VersionNumberFn,
    pub(crate) register_digests: Option<RegisterDigestsFn>,
}

/// Symbols resolved for one descriptor, keyed by canonical operation.
pub(crate) struct ResolvedSymbols {
    symbols: Vec<(EntryPoint, RawSymbol)>,
}

impl ResolvedSymbols {
    /// Resolves every entry point `descriptor` requires from `library`.
    ///
    /// Returns the first symbol that is missing.
    pub(crate) fn resolve(
        library: &dyn NativeLibrary,
        descriptor: &BackendDescriptor,
    ) -> Result<Self, &'static str> {
        let symbols = descriptor
            .symbols()
            .iter()
            .map(|binding| {
                library
                    .try_resolve(binding.symbol)
                    .map(|symbol| (binding.entry_point, symbol))
                    .ok_or(binding.symbol)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { symbols })
    }

    fn get(&self, entry_point: EntryPoint) -> Option<RawSymbol> {
        self.symbols
            .iter()
            .find(|(ep, _)| *ep == entry_point)
            .map(|(_, symbol)| *symbol)
    }

    /// Casts the resolved symbol for `entry_point` to `F`.
    ///
    /// # Safety
    ///
    /// `F` must be the function-pointer type matching the native signature of
    /// the symbol bound to `entry_point`.
    #[allow(unsafe_code)]
    unsafe fn cast<F: Copy>(&self, entry_point: EntryPoint) -> Option<F> {
        debug_assert_eq!(mem::size_of::<F>(), mem::size_of::<*const c_void>());
        self.get(entry_point).map(|symbol| {
            let ptr = symbol.as_ptr();
            // SAFETY: caller guarantees `F` is a pointer-sized fn type for this symbol.
            unsafe { mem::transmute_copy::<*const c_void, F>(&ptr) }
        })
    }
}

impl EntryPointTable {
    /// Builds the typed table for `generation` from `resolved`.
    ///
    /// Returns `None` if `resolved` lacks an entry point the generation needs,
    /// which cannot happen for symbols resolved from that generation's table.
    #[allow(unsafe_code)]
    pub(crate) fn bind(generation: AbiGeneration, resolved: &ResolvedSymbols) -> Option<Self> {
        // SAFETY: each cast below names the type alias documenting the C
        // signature of that canonical operation in every generation.
        unsafe {
            let lifecycle = if generation.uses_cleanup() {
                ContextLifecycle::Legacy {
                    create: resolved.cast::<CtxNewFn>(EntryPoint::CreateContext)?,
                    cleanup: resolved.cast::<CtxResetFn>(EntryPoint::CleanupContext)?,
                    destroy: resolved.cast::<CtxFreeFn>(EntryPoint::DestroyContext)?,
                }
            } else {
                ContextLifecycle::Modern {
                    new: resolved.cast::<CtxNewFn>(EntryPoint::CreateContext)?,
                    reset: resolved.cast::<CtxResetFn>(EntryPoint::ResetContext)?,
                    free: resolved.cast::<CtxFreeFn>(EntryPoint::DestroyContext)?,
                }
            };

            Some(Self {
                lifecycle,
                digest_init: resolved.cast::<DigestInitFn>(EntryPoint::InitDigest)?,
                digest_update: resolved.cast::<DigestUpdateFn>(EntryPoint::UpdateDigest)?,
                digest_final: resolved.cast::<DigestFinalFn>(EntryPoint::FinalizeDigest)?,
                digest_by_name: resolved.cast::<DigestByNameFn>(EntryPoint::LookupDigestByName)?,
                md_size: resolved.cast::<MdSizeFn>(EntryPoint::DigestOutputSize)?,
                md_block_size: resolved.cast::<MdSizeFn>(EntryPoint::DigestBlockSize)?,
                version_string: resolved.cast::<VersionStringFn>(EntryPoint::LibraryVersionString)?,
                version_number: resolved.cast::<VersionNumberFn>(EntryPoint::LibraryVersionNumber)?,
                register_digests: resolved.cast::<RegisterDigestsFn>(EntryPoint::RegisterDigests),
            })
        }
    }
}
