//! Scalar reference backend

use super::HashBackend;
use crate::domain::hash::fnv1_hash_bytes;

/// Reference backend: one candidate at a time
#[derive(Clone, Copy, Debug, Default)]
pub struct ScalarBackend;

impl HashBackend for ScalarBackend {
    fn name(&self) -> &'static str {
        "scalar"
    }

    fn hash_batch(&self, inputs: &[&[u8]], out: &mut [u32]) {
        for (slot, input) in out.iter_mut().zip(inputs) {
            *slot = fnv1_hash_bytes(input);
        }
    }
}
