//! Full conditional of a single token and the categorical draw over it.

use rand::Rng;

use crate::config::Hyperparameters;
use crate::stats::SufficientStats;

/// Unnormalized cumulative weights of a discrete distribution over topics.
///
/// The buffer is reused across tokens so a sweep allocates nothing.
#[derive(Debug, Clone)]
pub struct Categorical {
    cumulative: Vec<f64>,
}

impl Categorical {
    pub fn with_capacity(num_topics: usize) -> Categorical {
        Categorical {
            cumulative: Vec::with_capacity(num_topics),
        }
    }

    pub fn from_weights<I: IntoIterator<Item = f64>>(weights: I) -> Categorical {
        let mut cat = Categorical::with_capacity(0);
        cat.fill(weights);
        cat
    }

    pub fn fill<I: IntoIterator<Item = f64>>(&mut self, weights: I) {
        self.cumulative.clear();
        let mut sum = 0.0;
        for w in weights {
            sum += w;
            self.cumulative.push(sum);
        }
    }

    /// Loads `p(z = k | rest) ∝ φ̂_k(v) · θ̂_m(k)` for every topic `k`.
    ///
    /// `stats` must already exclude the token being resampled.
    pub fn fill_full_conditional(&mut self, stats: &SufficientStats, hyper: &Hyperparameters, m: usize, v: usize) {
        let ndk = stats.doc_topic().row(m);
        let nkv = stats.topic_term().column(v);
        let nk = stats.topic_totals();
        let alpha = hyper.alpha();
        let beta_v = hyper.beta()[v];
        let theta_denom = stats.doc_totals()[m] as f64 + hyper.sum_alpha();
        let sum_beta = hyper.sum_beta();
        self.fill((0..stats.num_topics()).map(|k| {
            let phi = (nkv[k] as f64 + beta_v) / (nk[k] as f64 + sum_beta);
            let theta = (ndk[k] as f64 + alpha[k]) / theta_denom;
            phi * theta
        }));
    }

    pub fn cumulative(&self) -> &[f64] {
        &self.cumulative
    }

    pub fn total(&self) -> f64 {
        self.cumulative.last().cloned().unwrap_or(0.0)
    }

    /// Picks the first index whose cumulative weight exceeds `u * total`, for `u` in `[0, 1)`.
    ///
    /// Topics with zero weight are never chosen. Returns `None` when the total mass is not a
    /// positive finite number.
    pub fn select(&self, u: f64) -> Option<usize> {
        let total = self.total();
        if !(total > 0.0) || !total.is_finite() {
            return None;
        }
        let x = u * total;
        if let Some(k) = self.cumulative.iter().position(|&c| x < c) {
            return Some(k);
        }
        // u * total rounded up to total: fall back to the last topic that carries mass
        let mut prev = 0.0;
        let mut last = None;
        for (k, &c) in self.cumulative.iter().enumerate() {
            if c > prev {
                last = Some(k);
            }
            prev = c;
        }
        last
    }

    pub fn sample<R: Rng>(&self, rng: &mut R) -> Option<usize> {
        let u: f64 = rng.gen();
        self.select(u)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn selects_by_cumulative_mass() {
        let cat = Categorical::from_weights(vec![1.0, 2.0, 1.0]);
        assert_eq!(cat.cumulative(), &[1.0, 3.0, 4.0]);
        assert_eq!(cat.select(0.0), Some(0));
        assert_eq!(cat.select(0.24), Some(0));
        // exactly on a boundary belongs to the next topic
        assert_eq!(cat.select(0.25), Some(1));
        assert_eq!(cat.select(0.74), Some(1));
        assert_eq!(cat.select(0.75), Some(2));
        assert_eq!(cat.select(0.999), Some(2));
    }

    #[test]
    fn zero_weight_topics_are_never_selected() {
        let cat = Categorical::from_weights(vec![0.0, 1.0, 0.0, 1.0, 0.0]);
        for &u in &[0.0, 0.1, 0.4999, 0.5, 0.9, 0.999_999] {
            let k = cat.select(u).unwrap();
            assert!(k == 1 || k == 3, "u = {} picked {}", u, k);
        }
        assert_eq!(cat.select(0.0), Some(1));
        assert_eq!(cat.select(0.5), Some(3));
        // a draw that rounds onto the total mass
        assert_eq!(cat.select(1.0), Some(3));
    }

    #[test]
    fn degenerate_mass_is_rejected() {
        assert_eq!(Categorical::from_weights(vec![0.0, 0.0]).select(0.3), None);
        assert_eq!(Categorical::from_weights(Vec::new()).select(0.3), None);
        assert_eq!(Categorical::from_weights(vec![1.0, f64::NAN]).select(0.3), None);
        assert_eq!(Categorical::from_weights(vec![1.0, f64::INFINITY]).select(0.3), None);
    }

    #[test]
    fn single_topic_always_wins() {
        let cat = Categorical::from_weights(vec![0.37]);
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            assert_eq!(cat.sample(&mut rng), Some(0));
        }
        assert_eq!(cat.select(1.0), Some(0));
    }

    #[test]
    fn empirical_frequencies_follow_weights() {
        let cat = Categorical::from_weights(vec![1.0, 3.0]);
        let mut rng = StdRng::seed_from_u64(11);
        let n = 20_000;
        let ones = (0..n).filter(|_| cat.sample(&mut rng) == Some(1)).count();
        assert_relative_eq!(ones as f64 / n as f64, 0.75, epsilon = 0.02);
    }

    #[test]
    fn full_conditional_matches_closed_form() {
        let docs = vec![vec![0, 0, 1], vec![1, 1, 0]];
        let z = vec![vec![0, 1, 1], vec![0, 0, 1]];
        let mut stats = SufficientStats::from_assignments(&docs, &z, 2, 2);
        let hyper = Hyperparameters::new(vec![2.0, 2.0], vec![0.5, 0.5]).unwrap();

        // exclude token (0, 0): term 0, topic 0
        stats.decrement(0, 0, 0);
        let mut cat = Categorical::with_capacity(2);
        cat.fill_full_conditional(&stats, &hyper, 0, 0);

        // ndk[0] = [0, 2], nd[0] = 2; nkv[.][0] = [0, 2]; nk = [2, 3]
        let w0 = (0.0 + 0.5) / (2.0 + 1.0) * (0.0 + 2.0) / (2.0 + 4.0);
        let w1 = (2.0 + 0.5) / (3.0 + 1.0) * (2.0 + 2.0) / (2.0 + 4.0);
        let cum = cat.cumulative();
        assert_eq!(cum.len(), 2);
        assert_relative_eq!(cum[0], w0, epsilon = 1e-12);
        assert_relative_eq!(cum[1], w0 + w1, epsilon = 1e-12);
    }
}
