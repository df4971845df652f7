// Copyright (C) Microsoft Corporation. All rights reserved.

use test_with_tracing::test;

use super::*;

#[test]
fn test_legacy_symbol_table() {
    let generation = AbiGeneration::Legacy;
    assert!(generation.uses_cleanup());
    assert_eq!(
        generation.symbol(EntryPoint::CreateContext),
        Some("EVP_MD_CTX_create")
    );
    assert_eq!(
        generation.symbol(EntryPoint::CleanupContext),
        Some("EVP_MD_CTX_cleanup")
    );
    assert_eq!(
        generation.symbol(EntryPoint::DestroyContext),
        Some("EVP_MD_CTX_destroy")
    );
    assert_eq!(generation.symbol(EntryPoint::ResetContext), None);
    assert_eq!(
        generation.symbol(EntryPoint::RegisterDigests),
        Some("OpenSSL_add_all_digests")
    );
    assert_eq!(generation.symbol(EntryPoint::LibraryVersionNumber), Some("SSLeay"));
}

#[test]
fn test_modern_symbol_table() {
    let generation = AbiGeneration::Modern;
    assert!(!generation.uses_cleanup());
    assert_eq!(
        generation.symbol(EntryPoint::CreateContext),
        Some("EVP_MD_CTX_new")
    );
    assert_eq!(
        generation.symbol(EntryPoint::ResetContext),
        Some("EVP_MD_CTX_reset")
    );
    assert_eq!(
        generation.symbol(EntryPoint::DestroyContext),
        Some("EVP_MD_CTX_free")
    );
    assert_eq!(generation.symbol(EntryPoint::CleanupContext), None);
    assert_eq!(generation.symbol(EntryPoint::RegisterDigests), None);
    assert_eq!(
        generation.symbol(EntryPoint::DigestOutputSize),
        Some("EVP_MD_size")
    );
}

#[test]
fn test_current_uses_getters() {
    let descriptor = BackendDescriptor::new("libcrypto.so.3", AbiGeneration::Current);
    assert_eq!(descriptor.digest_size_symbol(), "EVP_MD_get_size");
    assert_eq!(
        descriptor.generation().symbol(EntryPoint::DigestBlockSize),
        Some("EVP_MD_get_block_size")
    );

    let descriptor = BackendDescriptor::new("libcrypto.so.1.1", AbiGeneration::Modern);
    assert_eq!(descriptor.digest_size_symbol(), "EVP_MD_size");
}

#[test]
fn test_symbol_tables_have_unique_entry_points() {
    for generation in AbiGeneration::ALL {
        let symbols = generation.symbols();
        for (i, binding) in symbols.iter().enumerate() {
            assert!(
                symbols[i + 1..]
                    .iter()
                    .all(|other| other.entry_point != binding.entry_point),
                "{generation}: duplicate {:?}",
                binding.entry_point
            );
        }
    }
}

#[test]
fn test_version_ranges() {
    assert!(AbiGeneration::Legacy.versions().contains(0x1000_2150));
    assert!(!AbiGeneration::Legacy.versions().contains(0x1010_1110));
    assert!(AbiGeneration::Modern.versions().contains(0x1010_1110));
    assert!(!AbiGeneration::Modern.versions().contains(0x3000_0000));
    assert!(AbiGeneration::Current.versions().contains(0x3000_0000));
    assert!(AbiGeneration::Current.versions().contains(0x3050_0010));
    assert!(!AbiGeneration::Current.versions().contains(0x4000_0000));
}

#[test]
fn test_generation_names() {
    for generation in AbiGeneration::ALL {
        assert_eq!(
            AbiGeneration::from_name(&generation.to_string()),
            Some(generation)
        );
    }
    assert_eq!(AbiGeneration::from_name("CURRENT"), Some(AbiGeneration::Current));
    assert_eq!(AbiGeneration::from_name(""), None);
}

#[test]
fn test_descriptor_display() {
    let descriptor = BackendDescriptor::new("libssl", AbiGeneration::Modern);
    assert_eq!(descriptor.to_string(), "libssl (modern)");
}
