// Copyright (C) Microsoft Corporation. All rights reserved.

use test_with_tracing::test;

use super::*;

#[test]
fn test_modern_acquire_release() {
    for generation in [AbiGeneration::Modern, AbiGeneration::Current] {
        let backend = mock_backend(generation);
        reset_mock();
        {
            let _ctx = ScopedContext::acquire(&backend).expect("acquire");
            assert_eq!(counters().created, 1);
            assert_eq!(counters().released, 0);
        }
        assert_eq!(
            counters(),
            MockCounters {
                created: 1,
                released: 1,
                ..Default::default()
            }
        );
    }
}

#[test]
fn test_legacy_release_cleans_then_destroys() {
    let backend = mock_backend(AbiGeneration::Legacy);
    reset_mock();
    drop(ScopedContext::acquire(&backend).expect("acquire"));

    let counters = counters();
    assert_eq!(counters.created, 1);
    assert_eq!(counters.cleanups, 1);
    assert_eq!(counters.released, 1);
    assert_eq!(counters.resets, 0);
}

#[test]
fn test_legacy_release_survives_cleanup_failure() {
    let backend = mock_backend(AbiGeneration::Legacy);
    reset_mock();
    let ctx = ScopedContext::acquire(&backend).expect("acquire");
    {
        let _fault = inject(Fault::Reset);
        drop(ctx);
    }
    assert_eq!(counters().released, 1);
}

#[test]
fn test_acquire_failure() {
    let backend = mock_backend(AbiGeneration::Current);
    reset_mock();
    let _fault = inject(Fault::Alloc);

    let result = ScopedContext::acquire(&backend);
    assert!(matches!(result, Err(DigestError::ContextAllocFailed)));
    assert_eq!(counters().released, 0);
}

#[test]
fn test_reset_dispatches_by_generation() {
    let backend = mock_backend(AbiGeneration::Modern);
    reset_mock();
    let mut ctx = ScopedContext::acquire(&backend).expect("acquire");
    ctx.reset().expect("reset");
    assert_eq!(counters().resets, 1);
    assert_eq!(counters().cleanups, 0);

    let backend = mock_backend(AbiGeneration::Legacy);
    reset_mock();
    let mut ctx = ScopedContext::acquire(&backend).expect("acquire");
    ctx.reset().expect("reset");
    assert_eq!(counters().cleanups, 1);
    assert_eq!(counters().resets, 0);
}

#[test]
fn test_reset_failure() {
    let backend = mock_backend(AbiGeneration::Current);
    let mut ctx = ScopedContext::acquire(&backend).expect("acquire");
    let _fault = inject(Fault::Reset);
    assert_eq!(ctx.reset(), Err(DigestError::ContextResetFailed));
}

#[test]
fn test_digest_context_released_on_every_path() {
    for generation in AbiGeneration::ALL {
        let backend = mock_backend(generation);
        let algo = DigestAlgo::lookup(&backend, "SHA256").expect("lookup");
        reset_mock();

        // Completed digest.
        let mut ctx = DigestContext::new(&backend).expect("new");
        ctx.init(&algo).expect("init");
        ctx.update(b"abc").expect("update");
        ctx.finish_vec().expect("finish");
        drop(ctx);

        // Failed init.
        {
            let _fault = inject(Fault::Init);
            let mut ctx = DigestContext::new(&backend).expect("new");
            assert_eq!(ctx.init(&algo), Err(DigestError::DigestInitFailed));
        }

        // Failed finalize.
        {
            let mut ctx = DigestContext::new(&backend).expect("new");
            ctx.init(&algo).expect("init");
            let _fault = inject(Fault::Final);
            assert_eq!(ctx.finish_vec(), Err(DigestError::DigestFinalFailed));
        }

        // Abandoned mid-stream.
        {
            let mut ctx = DigestContext::new(&backend).expect("new");
            ctx.init(&algo).expect("init");
            ctx.update(b"partial").expect("update");
        }

        let counters = counters();
        assert_eq!(counters.created, 4, "{generation}");
        assert_eq!(counters.released, 4, "{generation}");
    }
}
