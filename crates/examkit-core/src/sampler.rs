//! Unbiased question sampling.
//!
//! Draws `min(count, bank)` distinct questions with a partial Fisher-Yates
//! shuffle over bank positions, so every ordered subset is equally likely.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::error::SessionError;
use crate::model::Question;

/// Sample up to `count` distinct questions from `bank` using `rng`.
///
/// Returns [`SessionError::EmptyBank`] when the bank has no questions.
pub fn sample_with<R: Rng + ?Sized>(
    bank: &[Question],
    count: usize,
    rng: &mut R,
) -> Result<Vec<Question>, SessionError> {
    if bank.is_empty() {
        return Err(SessionError::EmptyBank);
    }

    let amount = count.min(bank.len());
    let mut positions: Vec<usize> = (0..bank.len()).collect();
    let (chosen, _) = positions.partial_shuffle(rng, amount);

    Ok(chosen.iter().map(|&i| bank[i].clone()).collect())
}

/// Question sampler owning its random source.
pub struct Sampler {
    rng: StdRng,
}

impl Sampler {
    /// A sampler seeded from the operating system.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// A reproducible sampler.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn sample(
        &mut self,
        bank: &[Question],
        count: usize,
    ) -> Result<Vec<Question>, SessionError> {
        sample_with(bank, count, &mut self.rng)
    }
}

impl Default for Sampler {
    fn default() -> Self {
        Self::new()
    }
}
