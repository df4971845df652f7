// Copyright (C) Microsoft Corporation. All rights reserved.

//! Dynamic library loading.
//!
//! The prober only needs two capabilities: open a library by logical name and
//! look up a symbol in it. Both are expressed as traits so the probing
//! algorithm can be driven by an in-process test double as well as by the
//! system dynamic loader.

use std::env::consts::DLL_SUFFIX;
use std::ffi::c_void;
use std::fmt;
use std::path::PathBuf;
use std::ptr::NonNull;

use libloading::Library;

use super::*;

/// Address of a resolved native symbol.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct RawSymbol(NonNull<c_void>);

// SAFETY: a symbol address is immutable data owned by the loaded image; it
// carries no thread affinity.
#[allow(unsafe_code)]
unsafe impl Send for RawSymbol {}
#[allow(unsafe_code)]
unsafe impl Sync for RawSymbol {}

impl RawSymbol {
    /// Wraps a symbol address, rejecting null.
    pub fn new(ptr: *const c_void) -> Option<Self> {
        NonNull::new(ptr as *mut c_void).map(Self)
    }

    /// Returns the symbol address.
    pub fn as_ptr(&self) -> *const c_void {
        self.0.as_ptr()
    }
}

impl fmt::Debug for RawSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawSymbol({:p})", self.0)
    }
}

/// A loaded native library.
///
/// Symbols resolved from it stay valid for as long as the value is alive.
pub trait NativeLibrary: Send + Sync {
    /// Looks up `symbol`, returning `None` when the library does not export it.
    fn try_resolve(&self, symbol: &str) -> Option<RawSymbol>;
}

/// Opens native libraries by logical name.
pub trait LibraryLoader: Send + Sync {
    /// Loads `name`, returning `None` when no matching library can be opened.
    fn try_load(&self, name: &str) -> Option<Box<dyn NativeLibrary>>;
}

/// [`LibraryLoader`] backed by the operating system's dynamic loader.
#[derive(Debug, Clone, Default)]
pub struct SystemLoader {
    search_dirs: Vec<PathBuf>,
}

impl SystemLoader {
    /// Creates a loader searching `config`'s directories before the system default.
    pub fn new(config: &ProbeConfig) -> Self {
        Self {
            search_dirs: config.search_dirs().to_vec(),
        }
    }

    /// Returns the paths tried for `name`, in order.
    ///
    /// Names without a shared-library extension get the platform suffix
    /// appended; the bare name is tried last.
    pub fn candidate_paths(&self, name: &str) -> Vec<PathBuf> {
        let mut file_names = Vec::with_capacity(2);
        if !has_library_extension(name) {
            file_names.push(format!("{name}{DLL_SUFFIX}"));
        }
        file_names.push(name.to_string());

        let mut paths = Vec::with_capacity(file_names.len() * (self.search_dirs.len() + 1));
        for dir in &self.search_dirs {
            paths.extend(file_names.iter().map(|file_name| dir.join(file_name)));
        }
        paths.extend(file_names.into_iter().map(PathBuf::from));
        paths
    }
}

fn has_library_extension(name: &str) -> bool {
    name.ends_with(".dll") || name.ends_with(".dylib") || name.contains(".so")
}

impl LibraryLoader for SystemLoader {
    #[allow(unsafe_code)]
    fn try_load(&self, name: &str) -> Option<Box<dyn NativeLibrary>> {
        for path in self.candidate_paths(name) {
            // SAFETY: loading runs the library's initializers; OpenSSL's are
            // safe to run in any process.
            match unsafe { Library::new(&path) } {
                Ok(library) => {
                    tracing::trace!(path = %path.display(), "Loaded native library");
                    return Some(Box::new(SystemLibrary { library, path }));
                }
                Err(err) => {
                    tracing::trace!(path = %path.display(), %err, "Native library not loadable");
                }
            }
        }
        None
    }
}

/// Library opened through [`SystemLoader`].
struct SystemLibrary {
    library: Library,
    path: PathBuf,
}

impl NativeLibrary for SystemLibrary {
    #[allow(unsafe_code)]
    fn try_resolve(&self, symbol: &str) -> Option<RawSymbol> {
        // SAFETY: the symbol is read as an untyped address; it is only called
        // after being cast to the signature its generation documents.
        let resolved = unsafe { self.library.get::<*const c_void>(symbol.as_bytes()) };
        match resolved {
            Ok(address) => RawSymbol::new(*address),
            Err(err) => {
                tracing::trace!(path = %self.path.display(), symbol, %err, "Symbol not exported");
                None
            }
        }
    }
}
