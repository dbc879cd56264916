//! Ready-made transforms for [`FloodRing::add_transform`](crate::FloodRing::add_transform).
//!
//! All of them map an empty batch to an empty batch.

use crate::pipeline::BatchContext;

/// Returns the batch unchanged.
pub fn pass_through<T>(batch: Vec<T>, _ctx: &BatchContext) -> Vec<T> {
    batch
}

/// Concatenates every byte chunk in the batch into a single chunk.
///
/// `[[1, 2], [3]]` becomes `[[1, 2, 3]]`.
pub fn merge_bytes(batch: Vec<Vec<u8>>, ctx: &BatchContext) -> Vec<Vec<u8>> {
    merge_chunks(batch, ctx)
}

/// Splits every byte chunk into one-byte chunks.
///
/// `[[1, 2], [3]]` becomes `[[1], [2], [3]]`.
pub fn split_bytes(batch: Vec<Vec<u8>>, _ctx: &BatchContext) -> Vec<Vec<u8>> {
    batch
        .into_iter()
        .flat_map(|chunk| chunk.into_iter().map(|b| vec![b]))
        .collect()
}

/// Concatenates every chunk in the batch into a single chunk.
pub fn merge_chunks<U>(batch: Vec<Vec<U>>, _ctx: &BatchContext) -> Vec<Vec<U>> {
    if batch.is_empty() {
        return batch;
    }
    let total = batch.iter().map(Vec::len).sum();
    let mut merged = Vec::with_capacity(total);
    for chunk in batch {
        merged.extend(chunk);
    }
    vec![merged]
}
