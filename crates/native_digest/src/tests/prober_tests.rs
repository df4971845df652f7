// Copyright (C) Microsoft Corporation. All rights reserved.

use std::ffi::c_void;
use std::ptr;
use std::sync::Barrier;
use std::thread;

use test_with_tracing::test;

use super::*;

fn registry(candidates: &[(&'static str, AbiGeneration)]) -> BackendRegistry {
    BackendRegistry::new(
        candidates
            .iter()
            .map(|(name, generation)| BackendDescriptor::new(*name, *generation))
            .collect(),
    )
}

#[test]
fn test_binds_first_usable_candidate() {
    for generation in AbiGeneration::ALL {
        let loader = MockLoader::new().with_library("lib", MockLibrary::for_generation(generation));
        let backend = resolve_active_backend(&loader, &registry(&[("lib", generation)]))
            .expect("resolve mock backend");

        assert_eq!(backend.generation(), generation);
        assert_eq!(backend.descriptor().library_name(), "lib");
        assert!(backend.version().starts_with("OpenSSL"));
        assert!(generation.versions().contains(backend.version_number()));
    }
}

#[test]
fn test_skips_missing_library() {
    let loader = MockLoader::new().with_library(
        "modern",
        MockLibrary::for_generation(AbiGeneration::Modern),
    );
    let registry = registry(&[
        ("current", AbiGeneration::Current),
        ("modern", AbiGeneration::Modern),
    ]);

    let backend = resolve_active_backend(&loader, &registry).expect("resolve");
    assert_eq!(backend.generation(), AbiGeneration::Modern);
    assert_eq!(loader.attempts(), 2);
    assert_eq!(loader.loaded(), ["modern"]);
}

#[test]
fn test_skips_candidate_missing_entry_point() {
    let loader = MockLoader::new()
        .with_library(
            "partial",
            MockLibrary::for_generation(AbiGeneration::Current).without("EVP_MD_get_size"),
        )
        .with_library(
            "complete",
            MockLibrary::for_generation(AbiGeneration::Current),
        );
    let registry = registry(&[
        ("partial", AbiGeneration::Current),
        ("complete", AbiGeneration::Current),
    ]);

    let backend = resolve_active_backend(&loader, &registry).expect("resolve");
    assert_eq!(backend.descriptor().library_name(), "complete");
    assert_eq!(loader.loaded(), ["partial", "complete"]);
}

#[test]
fn test_wrong_generation_symbols_rejected() {
    // A 1.1 library has no 3.x getters and no 1.0 create/cleanup/destroy.
    let loader = MockLoader::new().with_library(
        "libcrypto",
        MockLibrary::for_generation(AbiGeneration::Modern),
    );
    let registry = registry(&[
        ("libcrypto", AbiGeneration::Current),
        ("libcrypto", AbiGeneration::Legacy),
        ("libcrypto", AbiGeneration::Modern),
    ]);

    let backend = resolve_active_backend(&loader, &registry).expect("resolve");
    assert_eq!(backend.generation(), AbiGeneration::Modern);
}

#[test]
fn test_version_out_of_range_rejected() {
    let loader = MockLoader::new()
        .with_library(
            "mislabeled",
            MockLibrary::for_generation(AbiGeneration::Current)
                .with("OpenSSL_version_num", mismatched_version_number as *const c_void),
        )
        .with_library("legacy", MockLibrary::for_generation(AbiGeneration::Legacy));
    let registry = registry(&[
        ("mislabeled", AbiGeneration::Current),
        ("legacy", AbiGeneration::Legacy),
    ]);

    let backend = resolve_active_backend(&loader, &registry).expect("resolve");
    assert_eq!(backend.generation(), AbiGeneration::Legacy);
    assert_eq!(backend.version_number(), LEGACY_VERSION as u64);
}

#[test]
fn test_legacy_registers_digests() {
    reset_mock();
    let _backend = mock_backend(AbiGeneration::Legacy);
    assert_eq!(counters().registers, 1);

    reset_mock();
    let _backend = mock_backend(AbiGeneration::Current);
    assert_eq!(counters().registers, 0);
}

#[test]
fn test_no_compatible_library() {
    let loader = MockLoader::new();
    let registry = BackendRegistry::platform_default();

    let result = resolve_active_backend(&loader, &registry);
    assert_eq!(
        result.err(),
        Some(BackendResolutionError::NoCompatibleLibrary)
    );
    assert_eq!(loader.attempts(), registry.len());
}

#[test]
fn test_empty_registry() {
    let result = resolve_active_backend(&MockLoader::new(), &BackendRegistry::new(Vec::new()));
    assert_eq!(
        result.err(),
        Some(BackendResolutionError::NoCompatibleLibrary)
    );
}

#[test]
fn test_slot_resolves_once() {
    let loader = MockLoader::new().with_library(
        "lib",
        MockLibrary::for_generation(AbiGeneration::Current),
    );
    let registry = registry(&[("lib", AbiGeneration::Current)]);
    let slot = BackendSlot::new();
    assert!(slot.get().is_none());

    let first = slot.get_or_resolve(&loader, &registry).expect("first");
    let second = slot.get_or_resolve(&loader, &registry).expect("second");
    assert!(ptr::eq(first, second));
    assert_eq!(loader.attempts(), 1);
    assert!(matches!(slot.get(), Some(Ok(backend)) if ptr::eq(backend, first)));
}

#[test]
fn test_slot_memoizes_failure() {
    let loader = MockLoader::new();
    let registry = registry(&[
        ("current", AbiGeneration::Current),
        ("legacy", AbiGeneration::Legacy),
    ]);
    let slot = BackendSlot::default();

    assert_eq!(
        slot.get_or_resolve(&loader, &registry).err(),
        Some(BackendResolutionError::NoCompatibleLibrary)
    );
    assert_eq!(loader.attempts(), 2);

    // A library appearing later is not picked up.
    let late = MockLoader::new().with_library(
        "current",
        MockLibrary::for_generation(AbiGeneration::Current),
    );
    assert_eq!(
        slot.get_or_resolve(&late, &registry).err(),
        Some(BackendResolutionError::NoCompatibleLibrary)
    );
    assert_eq!(late.attempts(), 0);
}

#[test]
fn test_slot_concurrent_first_use() {
    const THREADS: usize = 8;

    let loader = MockLoader::new().with_library(
        "lib",
        MockLibrary::for_generation(AbiGeneration::Modern),
    );
    let registry = registry(&[("lib", AbiGeneration::Modern)]);
    let slot = BackendSlot::new();
    let barrier = Barrier::new(THREADS);
    let (slot, loader, registry, barrier) = (&slot, &loader, &registry, &barrier);

    let addresses: Vec<usize> = thread::scope(|scope| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                scope.spawn(move || {
                    barrier.wait();
                    let backend = slot.get_or_resolve(loader, registry).expect("resolve");
                    backend as *const ActiveBackend as usize
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("join"))
            .collect()
    });

    assert!(addresses.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(loader.attempts(), 1);
    assert_eq!(loader.loaded(), ["lib"]);
}
