// Copyright (C) Microsoft Corporation. All rights reserved.

//! One-shot and streaming hashing over the active backend.

use super::*;

/// Hash operation wrapper.
///
/// Convenience entry points over [`DigestContext`]; every call acquires its
/// own native context and releases it before returning.
pub struct Hasher;

impl Hasher {
    /// Hashes `data` in a single call.
    ///
    /// # Arguments
    ///
    /// * `algo` - Digest to compute
    /// * `data` - Input data to hash
    /// * `output` - Optional output buffer. If `None`, only returns the required size.
    ///
    /// # Returns
    ///
    /// The number of bytes written, or the required size if `output` is `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The output buffer is too small
    /// - A native digest call fails
    pub fn hash(
        algo: &DigestAlgo<'_>,
        data: &[u8],
        output: Option<&mut [u8]>,
    ) -> Result<usize, DigestError> {
        let Some(output) = output else {
            return algo.output_size();
        };

        let mut ctx = Hasher::hash_init(algo)?;
        ctx.update(data)?;
        ctx.finish(Some(output))
    }

    /// Hashes `data` and returns the digest as a vector.
    ///
    /// # Errors
    ///
    /// Returns an error if a native digest call fails.
    pub fn hash_vec(algo: &DigestAlgo<'_>, data: &[u8]) -> Result<Vec<u8>, DigestError> {
        let hash_size = Hasher::hash(algo, data, None)?;
        let mut digest = vec![0u8; hash_size];
        let written = Hasher::hash(algo, data, Some(digest.as_mut_slice()))?;
        digest.truncate(written);
        Ok(digest)
    }

    /// Starts a streaming digest with `algo`.
    ///
    /// # Errors
    ///
    /// Returns an error if the native context cannot be allocated or initialized.
    pub fn hash_init<'a>(algo: &DigestAlgo<'a>) -> Result<DigestContext<'a>, DigestError> {
        let mut ctx = DigestContext::new(algo.backend())?;
        ctx.init(algo)?;
        Ok(ctx)
    }
}
