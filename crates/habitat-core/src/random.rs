//! Weighted and uniform selection over candidates, drawn from one seeded RNG.

use rand::distributions::WeightedIndex;
use rand::prelude::*;
use rand_chacha::ChaCha12Rng;

/// The manager's shared random source.
pub type SimRng = ChaCha12Rng;

pub fn seeded_rng(seed: u64) -> SimRng {
    ChaCha12Rng::seed_from_u64(seed)
}

/// Pick a candidate with probability proportional to its weight.
///
/// Candidates are drawn in the order given, so callers pass them sorted for
/// replayable results. Negative or non-finite weights count as zero; when no
/// weight is positive the draw falls back to uniform.
pub fn weighted_choice<T: Copy, R: Rng + ?Sized>(candidates: &[(T, f64)], rng: &mut R) -> Option<T> {
    if candidates.is_empty() {
        return None;
    }
    let weights: Vec<f64> = candidates
        .iter()
        .map(|(_, w)| if w.is_finite() && *w > 0.0 { *w } else { 0.0 })
        .collect();
    match WeightedIndex::new(&weights) {
        Ok(dist) => Some(candidates[dist.sample(rng)].0),
        Err(_) => candidates.choose(rng).map(|(c, _)| *c),
    }
}

/// Uniformly random member.
pub fn choose_uniform<T: Copy, R: Rng + ?Sized>(candidates: &[T], rng: &mut R) -> Option<T> {
    candidates.choose(rng).copied()
}
