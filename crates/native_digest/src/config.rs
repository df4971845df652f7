// Copyright (C) Microsoft Corporation. All rights reserved.

//! Probe configuration read from the process environment.

use std::env;
use std::ffi::OsStr;
use std::path::PathBuf;

use super::*;

/// Environment variable holding extra directories to search for the native library.
pub const LIBRARY_PATH_ENV_NAME: &str = "NATIVE_DIGEST_LIBRARY_PATH";

/// Environment variable naming the ABI generation to try first.
pub const BACKEND_ENV_NAME: &str = "NATIVE_DIGEST_BACKEND";

/// Settings that influence where and in which order backends are probed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeConfig {
    search_dirs: Vec<PathBuf>,
    preferred: Option<AbiGeneration>,
}

impl ProbeConfig {
    /// Reads [`LIBRARY_PATH_ENV_NAME`] and [`BACKEND_ENV_NAME`].
    pub fn from_env() -> Self {
        let path = env::var_os(LIBRARY_PATH_ENV_NAME);
        let backend = env::var(BACKEND_ENV_NAME).ok();
        Self::from_vars(path.as_deref(), backend.as_deref())
    }

    /// Builds a configuration from raw variable values.
    ///
    /// `library_path` is a platform path list. An unrecognized `backend`
    /// value is ignored.
    pub fn from_vars(library_path: Option<&OsStr>, backend: Option<&str>) -> Self {
        let search_dirs = library_path
            .map(|paths| {
                env::split_paths(paths)
                    .filter(|dir| !dir.as_os_str().is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let preferred = backend.and_then(|name| {
            let generation = AbiGeneration::from_name(name);
            if generation.is_none() {
                tracing::warn!(
                    value = name,
                    variable = BACKEND_ENV_NAME,
                    "Ignoring unrecognized backend generation"
                );
            }
            generation
        });

        Self {
            search_dirs,
            preferred,
        }
    }

    /// Adds a directory searched before the system default.
    pub fn with_search_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.search_dirs.push(dir.into());
        self
    }

    /// Sets the generation probed first.
    pub fn with_preferred_generation(mut self, generation: AbiGeneration) -> Self {
        self.preferred = Some(generation);
        self
    }

    /// Directories searched before the system default, in order.
    pub fn search_dirs(&self) -> &[PathBuf] {
        &self.search_dirs
    }

    /// Generation probed first, if any.
    pub fn preferred_generation(&self) -> Option<AbiGeneration> {
        self.preferred
    }
}
