// Copyright (C) Microsoft Corporation. All rights reserved.


mod context_tests;
mod descriptor_tests;
mod prober_tests;

pub(crate) use mock::*;

use super::*;

/// SHA-256 of `abc`.
pub(crate) const SHA256_ABC: &str =
    "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";

/// SHA-256 of the empty message.
pub(crate) const SHA256_EMPTY: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// SHA-512 of `abc`.
pub(crate) const SHA512_ABC: &str = "ddaf35a193617abacc417349ae20413112e6fa4e89a97ea20a9eeee64b55d39a\
2192992a274fc1a836ba3c23a3feebbd454d4423643ce80e2a9ac94fa54ca49f";
