//! Zipf-Mandelbrot rank weighting and target selection.

use rand::rngs::SmallRng;
use rand::SeedableRng;
use rand_distr::weighted::WeightedIndex;
use rand_distr::Distribution;

use crate::error::{Error, Result};

/// A Zipf-Mandelbrot probability model over a fixed-size rank list.
///
/// Weights follow `(rank + q)^-s` for ranks `1..=N` and are normalized to a
/// probability vector. [`sample`](Self::sample) then draws independent,
/// identically distributed indices in `[0, N)` with replacement, biased
/// toward low ranks for `s > 0`.
#[derive(Debug)]
pub struct RankWeightModel {
    probabilities: Vec<f64>,
    index: WeightedIndex<f64>,
    rng: SmallRng,
}

impl RankWeightModel {
    /// Creates a model over `n` ranks with Zipf-Mandelbrot parameters `q`
    /// and `s`, seeded from entropy.
    ///
    /// Valid domain: `n >= 1`, `q > -1`, `s >= 0`. Anything that produces a
    /// non-finite or non-positive weight is rejected with
    /// [`Error::InvalidParameter`].
    pub fn new(n: usize, q: f64, s: f64) -> Result<Self> {
        Self::with_seed(n, q, s, rand::random())
    }

    /// Creates a model with a fixed RNG seed, for reproducible draws.
    pub fn with_seed(n: usize, q: f64, s: f64, seed: u64) -> Result<Self> {
        if n == 0 {
            return Err(Error::InvalidParameter(
                "target list must contain at least one URL".into(),
            ));
        }

        let mut weights = Vec::with_capacity(n);
        for rank in 1..=n {
            let weight = (rank as f64 + q).powf(-s);
            if !weight.is_finite() || weight <= 0.0 {
                return Err(Error::InvalidParameter(format!(
                    "weight for rank {rank} is not positive and finite (q={q}, s={s})"
                )));
            }
            weights.push(weight);
        }

        let sum: f64 = weights.iter().sum();
        let probabilities = weights.iter().map(|w| w / sum).collect();
        let index = WeightedIndex::new(&weights)
            .map_err(|err| Error::InvalidParameter(format!("invalid weight vector: {err}")))?;

        Ok(Self {
            probabilities,
            index,
            rng: SmallRng::seed_from_u64(seed),
        })
    }

    /// The normalized probability vector, ordered by rank.
    pub fn probabilities(&self) -> &[f64] {
        &self.probabilities
    }

    /// Number of ranks in the model.
    pub fn len(&self) -> usize {
        self.probabilities.len()
    }

    /// Returns `true` if the model has no ranks. Construction rejects this,
    /// so it only exists for API completeness.
    pub fn is_empty(&self) -> bool {
        self.probabilities.is_empty()
    }

    /// Draws one index in `[0, len)` according to the probability vector.
    pub fn sample(&mut self) -> usize {
        self.index.sample(&mut self.rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probabilities_sum_to_one() {
        for (n, q, s) in [(1, 0.0, 1.0), (5, 0.5, 2.0), (100, 2.7, 0.8), (3, -0.5, 1.5)] {
            let model = RankWeightModel::new(n, q, s).unwrap();
            assert_eq!(model.len(), n);
            let sum: f64 = model.probabilities().iter().sum();
            assert!((sum - 1.0).abs() < 1e-9, "sum = {sum} for n={n} q={q} s={s}");
        }
    }

    #[test]
    fn single_rank_is_certain() {
        let mut model = RankWeightModel::new(1, 123.0, 9.0).unwrap();
        assert_eq!(model.probabilities(), &[1.0]);
        for _ in 0..10 {
            assert_eq!(model.sample(), 0);
        }
    }

    #[test]
    fn zero_skew_is_uniform() {
        for q in [0.0, 1.0, 42.0] {
            let model = RankWeightModel::new(4, q, 0.0).unwrap();
            for p in model.probabilities() {
                assert!((p - 0.25).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn probabilities_decay_monotonically() {
        let model = RankWeightModel::new(50, 1.3, 1.2).unwrap();
        let probs = model.probabilities();
        for pair in probs.windows(2) {
            assert!(pair[0] >= pair[1]);
        }
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        // Empty rank list.
        assert!(matches!(
            RankWeightModel::new(0, 0.0, 1.0),
            Err(Error::InvalidParameter(_))
        ));
        // rank + q == 0 produces an infinite weight.
        assert!(matches!(
            RankWeightModel::new(3, -1.0, 1.0),
            Err(Error::InvalidParameter(_))
        ));
        // rank + q < 0 with fractional s produces NaN.
        assert!(matches!(
            RankWeightModel::new(3, -2.5, 1.5),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn sampling_favors_low_ranks() {
        // With q=0, s=1 weights are 1 : 1/2 : 1/3, so rank 1 should be drawn
        // roughly three times as often as rank 3.
        let mut model = RankWeightModel::with_seed(3, 0.0, 1.0, 17).unwrap();
        let mut counts = [0u32; 3];
        for _ in 0..9000 {
            counts[model.sample()] += 1;
        }
        let ratio = counts[0] as f64 / counts[2] as f64;
        assert!((2.0..4.0).contains(&ratio), "ratio = {ratio}, counts = {counts:?}");
        assert!(counts[0] > counts[1]);
        assert!(counts[1] > counts[2]);
    }

    #[test]
    fn seeded_draws_are_reproducible() {
        let mut a = RankWeightModel::with_seed(10, 0.5, 1.0, 7).unwrap();
        let mut b = RankWeightModel::with_seed(10, 0.5, 1.0, 7).unwrap();
        let draws_a: Vec<_> = (0..100).map(|_| a.sample()).collect();
        let draws_b: Vec<_> = (0..100).map(|_| b.sample()).collect();
        assert_eq!(draws_a, draws_b);
    }
}
