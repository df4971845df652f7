// Copyright (C) Microsoft Corporation. All rights reserved.

//! Backend probing and the process-wide active backend.

use std::ffi::CStr;
use std::fmt;
use std::sync::OnceLock;

use super::*;

/// `OPENSSL_VERSION` / `SSLEAY_VERSION` selector for the version string getter.
const VERSION_TEXT: std::ffi::c_int = 0;

/// A bound native backend.
///
/// Immutable once built; symbols stay valid because the library handle is
/// owned here.
pub struct ActiveBackend {
    descriptor: BackendDescriptor,
    entry_points: EntryPointTable,
    version: String,
    version_number: u64,
    _library: Box<dyn NativeLibrary>,
}

impl ActiveBackend {
    /// Returns the descriptor that was bound.
    pub fn descriptor(&self) -> &BackendDescriptor {
        &self.descriptor
    }

    /// Returns the ABI generation of the bound library.
    pub fn generation(&self) -> AbiGeneration {
        self.descriptor.generation()
    }

    /// Returns the library's version string, e.g. `OpenSSL 3.0.13 30 Jan 2024`.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns the library's numeric version, e.g. `0x300000d0`.
    pub fn version_number(&self) -> u64 {
        self.version_number
    }

    pub(crate) fn entry_points(&self) -> &EntryPointTable {
        &self.entry_points
    }
}

impl fmt::Debug for ActiveBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveBackend")
            .field("descriptor", &self.descriptor)
            .field("version", &self.version)
            .field("version_number", &format_args!("{:#x}", self.version_number))
            .finish()
    }
}

/// Why one candidate was passed over.
#[derive(Debug)]
enum CandidateRejection {
    LibraryNotFound,
    MissingEntryPoint(&'static str),
    IncompleteTable,
    VersionOutOfRange(u64),
}

/// Runs one probing pass over `registry` and binds the first usable candidate.
///
/// Candidates whose library cannot be opened, that lack an entry point, or
/// that report a version outside their generation's range are skipped. The
/// result is not memoized; see [`BackendSlot`] for that.
pub fn resolve_active_backend(
    loader: &dyn LibraryLoader,
    registry: &BackendRegistry,
) -> Result<ActiveBackend, BackendResolutionError> {
    for descriptor in registry.iter() {
        match try_bind(loader, descriptor) {
            Ok(backend) => {
                tracing::debug!(
                    library = descriptor.library_name(),
                    generation = %descriptor.generation(),
                    version = backend.version(),
                    "Selected native digest backend"
                );
                return Ok(backend);
            }
            Err(rejection) => {
                tracing::debug!(
                    library = descriptor.library_name(),
                    generation = %descriptor.generation(),
                    ?rejection,
                    "Skipping native digest backend candidate"
                );
            }
        }
    }

    tracing::error!(
        candidates = registry.len(),
        "No compatible native digest library found"
    );
    Err(BackendResolutionError::NoCompatibleLibrary)
}

#[allow(unsafe_code)]
fn try_bind(
    loader: &dyn LibraryLoader,
    descriptor: &BackendDescriptor,
) -> Result<ActiveBackend, CandidateRejection> {
    let library = loader
        .try_load(descriptor.library_name())
        .ok_or(CandidateRejection::LibraryNotFound)?;

    let resolved = ResolvedSymbols::resolve(library.as_ref(), descriptor)
        .map_err(CandidateRejection::MissingEntryPoint)?;
    let entry_points = EntryPointTable::bind(descriptor.generation(), &resolved)
        .ok_or(CandidateRejection::IncompleteTable)?;

    // SAFETY: version getters take no pointers and return library-owned data.
    let version_number = unsafe { (entry_points.version_number)() } as u64;
    let versions = descriptor.versions();
    if !versions.contains(version_number) {
        tracing::warn!(
            library = descriptor.library_name(),
            generation = %descriptor.generation(),
            version_number,
            "Library version outside the generation's range"
        );
        Err(CandidateRejection::VersionOutOfRange(version_number))?;
    }

    if let Some(register_digests) = entry_points.register_digests {
        // SAFETY: idempotent global table setup of the 1.0 library.
        unsafe { register_digests() };
    }

    // SAFETY: the getter returns a static NUL-terminated string or null.
    let version = unsafe {
        let text = (entry_points.version_string)(VERSION_TEXT);
        if text.is_null() {
            String::new()
        } else {
            CStr::from_ptr(text).to_string_lossy().into_owned()
        }
    };

    Ok(ActiveBackend {
        descriptor: *descriptor,
        entry_points,
        version,
        version_number,
        _library: library,
    })
}

/// Memoized backend resolution.
///
/// The first call to [`BackendSlot::get_or_resolve`] runs one probing pass;
/// concurrent callers wait for it, and every later call returns the stored
/// outcome without probing again, including a stored failure.
#[derive(Debug, Default)]
pub struct BackendSlot {
    cell: OnceLock<Result<ActiveBackend, BackendResolutionError>>,
}

impl BackendSlot {
    /// Creates an unresolved slot.
    pub const fn new() -> Self {
        Self {
            cell: OnceLock::new(),
        }
    }

    /// Returns the resolved backend, probing with `loader` and `registry` on first use.
    pub fn get_or_resolve(
        &self,
        loader: &dyn LibraryLoader,
        registry: &BackendRegistry,
    ) -> Result<&ActiveBackend, BackendResolutionError> {
        self.get_or_resolve_with(|| resolve_active_backend(loader, registry))
    }

    fn get_or_resolve_with<F>(&self, resolve: F) -> Result<&ActiveBackend, BackendResolutionError>
    where
        F: FnOnce() -> Result<ActiveBackend, BackendResolutionError>,
    {
        self.cell.get_or_init(resolve).as_ref().map_err(|err| *err)
    }

    /// Returns the stored outcome without probing.
    pub fn get(&self) -> Option<Result<&ActiveBackend, BackendResolutionError>> {
        self.cell
            .get()
            .map(|outcome| outcome.as_ref().map_err(|err| *err))
    }
}

static ACTIVE_BACKEND: BackendSlot = BackendSlot::new();

/// Returns the process-wide backend, resolving it on first use.
///
/// Configuration is read from the environment (see [`ProbeConfig::from_env`])
/// during the first call only.
pub fn active_backend() -> Result<&'static ActiveBackend, BackendResolutionError> {
    ACTIVE_BACKEND.get_or_resolve_with(|| {
        let config = ProbeConfig::from_env();
        let loader = SystemLoader::new(&config);
        let registry = BackendRegistry::from_config(&config);
        resolve_active_backend(&loader, &registry)
    })
}
