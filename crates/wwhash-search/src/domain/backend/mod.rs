//! Hash backends
//!
//! A backend hashes batches of candidates with the forward FNV-1 hash. The
//! scalar backend is the reference; the lane backend hashes 16 candidates in
//! interleaved lanes and must produce bit-identical results.
//!
//! ## Feature Flags
//!
//! - `multi-lane`: Build the 16-lane backend. Without it, requesting lanes
//!   falls back to the scalar backend.

mod scalar;

#[cfg(feature = "multi-lane")]
mod lanes;

pub use scalar::ScalarBackend;

#[cfg(feature = "multi-lane")]
pub use lanes::{LaneBackend, hash_x16};

use crate::error::{Result, SearchError};
use std::sync::Arc;
use tracing::warn;

/// Batch forward-hash capability
pub trait HashBackend: Send + Sync {
    /// Short backend name for logs and reports
    fn name(&self) -> &'static str;

    /// Hash every input into `out` (`out.len() >= inputs.len()`)
    fn hash_batch(&self, inputs: &[&[u8]], out: &mut [u32]);
}

/// Requested backend
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BackendPreference {
    /// Lanes when available, scalar otherwise
    #[default]
    Auto,
    /// Reference implementation only
    Scalar,
    /// Lane backend, falling back to scalar if it cannot be initialized
    Lanes,
}

/// Try to initialize the accelerated backend
pub fn accelerated_backend() -> Result<Arc<dyn HashBackend>> {
    #[cfg(feature = "multi-lane")]
    {
        LaneBackend::new().map(|b| Arc::new(b) as Arc<dyn HashBackend>)
    }

    #[cfg(not(feature = "multi-lane"))]
    {
        Err(SearchError::AccelerationUnavailable(
            "built without the multi-lane feature".to_string(),
        ))
    }
}

/// Select a backend, falling back to the scalar reference when acceleration is unavailable
pub fn select_backend(preference: BackendPreference) -> Arc<dyn HashBackend> {
    match preference {
        BackendPreference::Scalar => Arc::new(ScalarBackend),
        BackendPreference::Auto | BackendPreference::Lanes => match accelerated_backend() {
            Ok(backend) => backend,
            Err(SearchError::AccelerationUnavailable(reason)) => {
                warn!(%reason, "accelerated backend unavailable, using scalar");
                Arc::new(ScalarBackend)
            }
            Err(e) => {
                warn!(error = %e, "accelerated backend failed, using scalar");
                Arc::new(ScalarBackend)
            }
        },
    }
}
