// Copyright (C) Microsoft Corporation. All rights reserved.

//! Ordered list of backend candidates.

use super::*;

/// Candidate library names per generation for unix-like targets.
///
/// `libssl` pulls in `libcrypto`, so its handle resolves the EVP symbols too.
#[cfg(not(target_os = "windows"))]
const PLATFORM_LIBRARIES: &[BackendDescriptor] = &[
    BackendDescriptor::new("libssl", AbiGeneration::Current),
    BackendDescriptor::new("libssl.so.3", AbiGeneration::Current),
    BackendDescriptor::new("libcrypto", AbiGeneration::Current),
    BackendDescriptor::new("libcrypto.so", AbiGeneration::Current),
    BackendDescriptor::new("libcrypto.so.3", AbiGeneration::Current),
    BackendDescriptor::new("libcrypto.3.dylib", AbiGeneration::Current),
    BackendDescriptor::new("libssl", AbiGeneration::Modern),
    BackendDescriptor::new("libssl.so.1.1", AbiGeneration::Modern),
    BackendDescriptor::new("libssl.so.1.1.0", AbiGeneration::Modern),
    BackendDescriptor::new("libcrypto", AbiGeneration::Modern),
    BackendDescriptor::new("libcrypto.1.1.dylib", AbiGeneration::Modern),
    BackendDescriptor::new("libssl", AbiGeneration::Legacy),
    BackendDescriptor::new("libssl.so.1.0", AbiGeneration::Legacy),
    BackendDescriptor::new("libssl.so.1.0.0", AbiGeneration::Legacy),
];

/// Candidate library names per generation for Windows.
#[cfg(target_os = "windows")]
const PLATFORM_LIBRARIES: &[BackendDescriptor] = &[
    BackendDescriptor::new("libcrypto-3.dll", AbiGeneration::Current),
    BackendDescriptor::new("libcrypto-3-x64.dll", AbiGeneration::Current),
    BackendDescriptor::new("libcrypto.dll", AbiGeneration::Modern),
    BackendDescriptor::new("libcrypto-1_1.dll", AbiGeneration::Modern),
    BackendDescriptor::new("libcrypto-1_1-x64.dll", AbiGeneration::Modern),
    BackendDescriptor::new("libcrypto-x64.dll", AbiGeneration::Modern),
    BackendDescriptor::new("libeay32.dll", AbiGeneration::Legacy),
];

/// Backend candidates in preference order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendRegistry {
    descriptors: Vec<BackendDescriptor>,
}

impl BackendRegistry {
    /// Creates a registry probing `descriptors` in the given order.
    pub fn new(descriptors: Vec<BackendDescriptor>) -> Self {
        Self { descriptors }
    }

    /// Returns the built-in candidates for the current platform.
    pub fn platform_default() -> Self {
        Self::new(PLATFORM_LIBRARIES.to_vec())
    }

    /// Builds the registry the process-wide backend is resolved from.
    pub fn from_config(config: &ProbeConfig) -> Self {
        let registry = Self::platform_default();
        match config.preferred_generation() {
            Some(generation) => registry.with_preferred(generation),
            None => registry,
        }
    }

    /// Moves every descriptor of `generation` to the front, keeping relative order.
    pub fn with_preferred(mut self, generation: AbiGeneration) -> Self {
        // Stable sort: `false` (preferred) sorts before `true`.
        self.descriptors
            .sort_by_key(|descriptor| descriptor.generation() != generation);
        self
    }

    /// Iterates the candidates in preference order.
    pub fn iter(&self) -> impl Iterator<Item = &BackendDescriptor> {
        self.descriptors.iter()
    }

    /// Number of candidates.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Whether the registry has no candidates.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::platform_default()
    }
}
