// Copyright (C) Microsoft Corporation. All rights reserved.

//! Backend descriptors.
//!
//! The OpenSSL major versions differ in which context lifecycle functions
//! they export and in the names of the `EVP_MD` getters. Rather than one
//! binding type per library, each generation owns a static symbol table and a
//! descriptor is just a library name paired with a generation.

use std::fmt;

/// ABI generation of a native backend.
///
/// Determines which context lifecycle calls are valid and which symbol names
/// the entry points are exported under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AbiGeneration {
    /// OpenSSL 1.0: create / cleanup / destroy, no reset.
    Legacy,
    /// OpenSSL 1.1: new / reset / free.
    Modern,
    /// OpenSSL 3.x: new / reset / free with the `EVP_MD_get_*` getters.
    Current,
}

impl AbiGeneration {
    /// All generations, newest first.
    pub const ALL: [AbiGeneration; 3] = [
        AbiGeneration::Current,
        AbiGeneration::Modern,
        AbiGeneration::Legacy,
    ];

    /// Returns the entry points this generation must export, with their symbol names.
    pub fn symbols(&self) -> &'static [SymbolBinding] {
        match self {
            AbiGeneration::Legacy => LEGACY_SYMBOLS,
            AbiGeneration::Modern => MODERN_SYMBOLS,
            AbiGeneration::Current => CURRENT_SYMBOLS,
        }
    }

    /// Returns the numeric library versions this generation accepts.
    pub fn versions(&self) -> VersionRange {
        match self {
            AbiGeneration::Legacy => VersionRange::new(0x1000_0000, 0x1010_0000),
            AbiGeneration::Modern => VersionRange::new(0x1010_0000, 0x3000_0000),
            AbiGeneration::Current => VersionRange::new(0x3000_0000, 0x4000_0000),
        }
    }

    /// Returns the symbol name bound to `entry_point`, if this generation has one.
    pub fn symbol(&self, entry_point: EntryPoint) -> Option<&'static str> {
        self.symbols()
            .iter()
            .find(|binding| binding.entry_point == entry_point)
            .map(|binding| binding.symbol)
    }

    /// Whether contexts of this generation are released with cleanup + destroy.
    pub fn uses_cleanup(&self) -> bool {
        matches!(self, AbiGeneration::Legacy)
    }

    /// Parses a generation name as accepted in configuration.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "legacy" => Some(AbiGeneration::Legacy),
            "modern" => Some(AbiGeneration::Modern),
            "current" => Some(AbiGeneration::Current),
            _ => None,
        }
    }
}

impl fmt::Display for AbiGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AbiGeneration::Legacy => "legacy",
            AbiGeneration::Modern => "modern",
            AbiGeneration::Current => "current",
        };
        f.write_str(name)
    }
}

/// Canonical operation a native entry point implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryPoint {
    /// Allocate a digest context.
    CreateContext,
    /// Reset a context for reuse (Modern / Current).
    ResetContext,
    /// Clear a context's internal state (Legacy).
    CleanupContext,
    /// Free a digest context.
    DestroyContext,
    /// Bind a context to a digest algorithm.
    InitDigest,
    /// Feed data into a context.
    UpdateDigest,
    /// Produce the digest.
    FinalizeDigest,
    /// Resolve a digest algorithm by name.
    LookupDigestByName,
    /// Output size of a digest algorithm.
    DigestOutputSize,
    /// Input block size of a digest algorithm.
    DigestBlockSize,
    /// Human-readable library version.
    LibraryVersionString,
    /// Numeric library version.
    LibraryVersionNumber,
    /// Populate the digest name table (Legacy).
    RegisterDigests,
}

/// One required entry point and the symbol it is exported under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolBinding {
    /// Canonical operation.
    pub entry_point: EntryPoint,
    /// Exported symbol name.
    pub symbol: &'static str,
}

const fn bind(entry_point: EntryPoint, symbol: &'static str) -> SymbolBinding {
    SymbolBinding {
        entry_point,
        symbol,
    }
}

const LEGACY_SYMBOLS: &[SymbolBinding] = &[
    bind(EntryPoint::CreateContext, "EVP_MD_CTX_create"),
    bind(EntryPoint::CleanupContext, "EVP_MD_CTX_cleanup"),
    bind(EntryPoint::DestroyContext, "EVP_MD_CTX_destroy"),
    bind(EntryPoint::InitDigest, "EVP_DigestInit_ex"),
    bind(EntryPoint::UpdateDigest, "EVP_DigestUpdate"),
    bind(EntryPoint::FinalizeDigest, "EVP_DigestFinal_ex"),
    bind(EntryPoint::LookupDigestByName, "EVP_get_digestbyname"),
    bind(EntryPoint::DigestOutputSize, "EVP_MD_size"),
    bind(EntryPoint::DigestBlockSize, "EVP_MD_block_size"),
    bind(EntryPoint::LibraryVersionString, "SSLeay_version"),
    bind(EntryPoint::LibraryVersionNumber, "SSLeay"),
    bind(EntryPoint::RegisterDigests, "OpenSSL_add_all_digests"),
];

const MODERN_SYMBOLS: &[SymbolBinding] = &[
    bind(EntryPoint::CreateContext, "EVP_MD_CTX_new"),
    bind(EntryPoint::ResetContext, "EVP_MD_CTX_reset"),
    bind(EntryPoint::DestroyContext, "EVP_MD_CTX_free"),
    bind(EntryPoint::InitDigest, "EVP_DigestInit_ex"),
    bind(EntryPoint::UpdateDigest, "EVP_DigestUpdate"),
    bind(EntryPoint::FinalizeDigest, "EVP_DigestFinal_ex"),
    bind(EntryPoint::LookupDigestByName, "EVP_get_digestbyname"),
    bind(EntryPoint::DigestOutputSize, "EVP_MD_size"),
    bind(EntryPoint::DigestBlockSize, "EVP_MD_block_size"),
    bind(EntryPoint::LibraryVersionString, "OpenSSL_version"),
    bind(EntryPoint::LibraryVersionNumber, "OpenSSL_version_num"),
];

// In 3.x `EVP_MD_size` and `EVP_MD_block_size` are macros over the getters.
const CURRENT_SYMBOLS: &[SymbolBinding] = &[
    bind(EntryPoint::CreateContext, "EVP_MD_CTX_new"),
    bind(EntryPoint::ResetContext, "EVP_MD_CTX_reset"),
    bind(EntryPoint::DestroyContext, "EVP_MD_CTX_free"),
    bind(EntryPoint::InitDigest, "EVP_DigestInit_ex"),
    bind(EntryPoint::UpdateDigest, "EVP_DigestUpdate"),
    bind(EntryPoint::FinalizeDigest, "EVP_DigestFinal_ex"),
    bind(EntryPoint::LookupDigestByName, "EVP_get_digestbyname"),
    bind(EntryPoint::DigestOutputSize, "EVP_MD_get_size"),
    bind(EntryPoint::DigestBlockSize, "EVP_MD_get_block_size"),
    bind(EntryPoint::LibraryVersionString, "OpenSSL_version"),
    bind(EntryPoint::LibraryVersionNumber, "OpenSSL_version_num"),
];

/// Half-open range of numeric library versions, `min..max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionRange {
    /// Lowest accepted version.
    pub min: u64,
    /// First version no longer accepted.
    pub max: u64,
}

impl VersionRange {
    /// Creates a range accepting `min..max`.
    pub const fn new(min: u64, max: u64) -> Self {
        Self { min, max }
    }

    /// Whether `version` falls inside the range.
    pub fn contains(&self, version: u64) -> bool {
        self.min <= version && version < self.max
    }
}

/// One candidate native-library binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendDescriptor {
    library_name: &'static str,
    generation: AbiGeneration,
}

impl BackendDescriptor {
    /// Creates a descriptor for `library_name` bound with `generation`'s symbols.
    ///
    /// `library_name` may omit the platform extension; the loader appends it.
    pub const fn new(library_name: &'static str, generation: AbiGeneration) -> Self {
        Self {
            library_name,
            generation,
        }
    }

    /// Returns the library load identifier.
    pub fn library_name(&self) -> &'static str {
        self.library_name
    }

    /// Returns the ABI generation.
    pub fn generation(&self) -> AbiGeneration {
        self.generation
    }

    /// Returns the entry points required by this candidate.
    pub fn symbols(&self) -> &'static [SymbolBinding] {
        self.generation.symbols()
    }

    /// Returns the symbol reporting a digest's output size.
    pub fn digest_size_symbol(&self) -> &'static str {
        self.generation
            .symbol(EntryPoint::DigestOutputSize)
            .unwrap_or("EVP_MD_size")
    }

    /// Returns the accepted numeric version range.
    pub fn versions(&self) -> VersionRange {
        self.generation.versions()
    }
}

impl fmt::Display for BackendDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.library_name, self.generation)
    }
}
