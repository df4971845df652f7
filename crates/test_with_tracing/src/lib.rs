// Copyright (C) Microsoft Corporation. All rights reserved.

//! Crate for defining tests that have tracing output.
//!
//! `#[test_with_tracing::test]` behaves like `#[test]` but installs a
//! test-writer subscriber first, so probe and digest events emitted by the
//! code under test show up in the captured output of a failing test.

// This is only used by test code; we allow `expect` usage (but not `unwrap`) here.
#![allow(clippy::expect_used)]

#[cfg(test)]
extern crate self as test_with_tracing;

pub use test_with_tracing_macro::test;
use tracing::metadata::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::prelude::*;

#[doc(hidden)]
/// Initializes `tracing` for tests.
///
/// Honors `RUST_LOG` when set, otherwise everything at `DEBUG` and above.
pub fn init() {
    static ONCE: std::sync::Once = std::sync::Once::new();

    ONCE.call_once(|| {
        let targets = if let Ok(var) = std::env::var("RUST_LOG") {
            var.parse()
                .expect("Failed to parse RUST_LOG environment variable")
        } else {
            Targets::new().with_default(LevelFilter::DEBUG)
        };
        // Another harness may already own the global default.
        let _ = tracing_subscriber::fmt()
            .pretty()
            .with_ansi(false)
            .with_test_writer()
            .with_max_level(LevelFilter::TRACE)
            .with_thread_ids(true)
            .finish()
            .with(targets)
            .try_init();
    });
}
