//! 16-lane batch hashing
//!
//! Each lane holds the running state of one candidate. Lanes shorter than the
//! longest input keep their state once their bytes are exhausted, so every
//! lane ends with the same value the scalar hash would produce.
//!
//! The inner loop is branch-free over fixed-size arrays; the compiler turns
//! it into vector multiplies and blends for the target CPU.

#![allow(clippy::needless_range_loop)]

use super::{HashBackend, ScalarBackend};
use crate::constants::{FNV_OFFSET, FNV_PRIME, LANES};
use crate::error::{Result, SearchError};

/// Hash 16 inputs in interleaved lanes
pub fn hash_x16(inputs: [&[u8]; LANES]) -> [u32; LANES] {
    let mut state = [FNV_OFFSET; LANES];
    let mut lens = [0usize; LANES];
    for lane in 0..LANES {
        lens[lane] = inputs[lane].len();
    }
    let max_len = lens.iter().copied().max().unwrap_or(0);

    for pos in 0..max_len {
        let mut bytes = [0u32; LANES];
        let mut active = [false; LANES];
        for lane in 0..LANES {
            active[lane] = pos < lens[lane];
            if active[lane] {
                bytes[lane] = inputs[lane][pos].to_ascii_lowercase() as u32;
            }
        }
        for lane in 0..LANES {
            let next = state[lane].wrapping_mul(FNV_PRIME) ^ bytes[lane];
            state[lane] = if active[lane] { next } else { state[lane] };
        }
    }

    state
}

/// 16-lane backend
#[derive(Clone, Copy, Debug)]
pub struct LaneBackend {
    _private: (),
}

impl LaneBackend {
    /// Initialize the backend after a self-check against the scalar reference
    pub fn new() -> Result<Self> {
        let probe: [&[u8]; LANES] = [
            b"", b"a", b"foobar", b"play_music", b"stop_", b"_01", b"x", b"hero_attack",
            b"sfx", b"vo_", b"amb_wind_lp", b"ui_click", b"npc", b"z9", b"qqq", b"Mixed_Case",
        ];
        let lanes = hash_x16(probe);
        let mut scalar = [0u32; LANES];
        ScalarBackend.hash_batch(&probe, &mut scalar);
        if lanes != scalar {
            return Err(SearchError::AccelerationUnavailable(
                "lane self-check disagrees with scalar hash".to_string(),
            ));
        }
        Ok(Self { _private: () })
    }
}

impl HashBackend for LaneBackend {
    fn name(&self) -> &'static str {
        "lanes-x16"
    }

    fn hash_batch(&self, inputs: &[&[u8]], out: &mut [u32]) {
        let mut chunks = inputs.chunks_exact(LANES);
        let mut offset = 0;
        for chunk in &mut chunks {
            let batch: [&[u8]; LANES] = std::array::from_fn(|i| chunk[i]);
            out[offset..offset + LANES].copy_from_slice(&hash_x16(batch));
            offset += LANES;
        }

        let rest = chunks.remainder();
        if !rest.is_empty() {
            ScalarBackend.hash_batch(rest, &mut out[offset..offset + rest.len()]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::hash::fnv1_hash_bytes;

    #[test]
    fn test_hash_x16_matches_single() {
        let words: [&[u8]; LANES] = std::array::from_fn(|i| match i % 4 {
            0 => b"play_music".as_slice(),
            1 => b"a".as_slice(),
            2 => b"".as_slice(),
            _ => b"creature_roar_03".as_slice(),
        });
        let multi = hash_x16(words);
        for (i, word) in words.iter().enumerate() {
            assert_eq!(multi[i], fnv1_hash_bytes(word), "lane {}", i);
        }
    }

    #[test]
    fn test_lane_backend_uneven_batch() {
        let owned: Vec<String> = (0..37).map(|i| format!("weapon_{}", i)).collect();
        let inputs: Vec<&[u8]> = owned.iter().map(|s| s.as_bytes()).collect();
        let mut out = vec![0u32; inputs.len()];
        LaneBackend::new().unwrap().hash_batch(&inputs, &mut out);
        for (input, h) in inputs.iter().zip(&out) {
            assert_eq!(*h, fnv1_hash_bytes(input));
        }
    }
}
