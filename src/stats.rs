//! Markov chain state of the collapsed sampler: one topic label per token and the
//! four count tables derived from it.

use ndarray::{Array1, Array2};
use rand::Rng;

/// Count tables kept exactly consistent with [`Assignments`].
///
/// * `ndk[[m, k]]` tokens of document `m` assigned to topic `k`
/// * `nkv[[k, v]]` occurrences of term `v` assigned to topic `k`
/// * `nd[m]`, `nk[k]` the row sums of the two tables
#[derive(Debug, Clone, PartialEq)]
pub struct SufficientStats {
    ndk: Array2<usize>,
    nkv: Array2<usize>,
    nd: Array1<usize>,
    nk: Array1<usize>,
}

/// Topic label of every token, `z[m][n]`.
pub type Assignments = Vec<Vec<usize>>;

impl SufficientStats {
    pub fn zeros(num_docs: usize, num_topics: usize, vocab_size: usize) -> SufficientStats {
        SufficientStats {
            ndk: Array2::zeros((num_docs, num_topics)),
            nkv: Array2::zeros((num_topics, vocab_size)),
            nd: Array1::zeros(num_docs),
            nk: Array1::zeros(num_topics),
        }
    }

    /// Draws every token's topic uniformly from `0..num_topics` and counts it.
    pub fn initialize<R: Rng>(
        documents: &[Vec<usize>],
        num_topics: usize,
        vocab_size: usize,
        rng: &mut R,
    ) -> (SufficientStats, Assignments) {
        let mut stats = SufficientStats::zeros(documents.len(), num_topics, vocab_size);
        let mut z: Assignments = Vec::with_capacity(documents.len());
        for (m, doc) in documents.iter().enumerate() {
            let mut z_m = Vec::with_capacity(doc.len());
            for &v in doc {
                let k = rng.gen_range(0..num_topics);
                stats.increment(m, k, v);
                z_m.push(k);
            }
            z.push(z_m);
        }
        (stats, z)
    }

    /// Rebuilds the tables from an explicit assignment.
    pub fn from_assignments(
        documents: &[Vec<usize>],
        z: &[Vec<usize>],
        num_topics: usize,
        vocab_size: usize,
    ) -> SufficientStats {
        let mut stats = SufficientStats::zeros(documents.len(), num_topics, vocab_size);
        for (m, (doc, z_m)) in documents.iter().zip(z).enumerate() {
            for (&v, &k) in doc.iter().zip(z_m) {
                stats.increment(m, k, v);
            }
        }
        stats
    }

    #[inline]
    pub fn increment(&mut self, m: usize, k: usize, v: usize) {
        self.ndk[[m, k]] += 1;
        self.nkv[[k, v]] += 1;
        self.nd[m] += 1;
        self.nk[k] += 1;
    }

    /// Removes one token; the caller guarantees it was counted under `(m, k, v)`.
    #[inline]
    pub fn decrement(&mut self, m: usize, k: usize, v: usize) {
        self.ndk[[m, k]] -= 1;
        self.nkv[[k, v]] -= 1;
        self.nd[m] -= 1;
        self.nk[k] -= 1;
    }

    pub fn num_docs(&self) -> usize {
        self.nd.len()
    }

    pub fn num_topics(&self) -> usize {
        self.nk.len()
    }

    pub fn vocab_size(&self) -> usize {
        self.nkv.ncols()
    }

    pub fn doc_topic(&self) -> &Array2<usize> {
        &self.ndk
    }

    pub fn topic_term(&self) -> &Array2<usize> {
        &self.nkv
    }

    pub fn doc_totals(&self) -> &Array1<usize> {
        &self.nd
    }

    pub fn topic_totals(&self) -> &Array1<usize> {
        &self.nk
    }

    /// Checks both row-sum invariants and, when given, the document lengths.
    pub fn is_consistent(&self, documents: Option<&[Vec<usize>]>) -> bool {
        let docs_ok = self
            .ndk
            .outer_iter()
            .zip(self.nd.iter())
            .all(|(row, &total)| row.sum() == total);
        let topics_ok = self
            .nkv
            .outer_iter()
            .zip(self.nk.iter())
            .all(|(row, &total)| row.sum() == total);
        let lengths_ok = documents.map_or(true, |docs| {
            docs.len() == self.nd.len() && docs.iter().zip(self.nd.iter()).all(|(d, &n)| d.len() == n)
        });
        docs_ok && topics_ok && lengths_ok && self.nd.sum() == self.nk.sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn documents() -> Vec<Vec<usize>> {
        vec![vec![0, 0, 1], vec![1, 1, 0], vec![], vec![2]]
    }

    #[test]
    fn initialization_is_consistent() {
        let docs = documents();
        let mut rng = StdRng::seed_from_u64(7);
        let (stats, z) = SufficientStats::initialize(&docs, 3, 3, &mut rng);
        assert!(stats.is_consistent(Some(&docs[..])));
        assert_eq!(stats.doc_totals().to_vec(), vec![3, 3, 0, 1]);
        assert_eq!(stats.topic_totals().sum(), 7);
        assert!(z.iter().flatten().all(|&k| k < 3));
        assert_eq!(stats, SufficientStats::from_assignments(&docs, &z, 3, 3));
    }

    #[test]
    fn moving_a_token_keeps_row_sums() {
        let docs = documents();
        let z = vec![vec![0, 0, 1], vec![1, 1, 0], vec![], vec![1]];
        let mut stats = SufficientStats::from_assignments(&docs, &z, 2, 3);
        assert_eq!(stats.doc_topic()[[0, 0]], 2);
        assert_eq!(stats.topic_term()[[1, 1]], 3);

        stats.decrement(0, 0, 0);
        assert!(!stats.is_consistent(Some(&docs[..])));
        assert!(stats.is_consistent(None));
        stats.increment(0, 1, 0);
        assert!(stats.is_consistent(Some(&docs[..])));
        assert_eq!(stats.doc_topic()[[0, 1]], 2);
        assert_eq!(stats.topic_totals().to_vec(), vec![2, 5]);
    }

    #[test]
    fn single_topic_takes_everything() {
        let docs = documents();
        let mut rng = StdRng::seed_from_u64(1);
        let (stats, z) = SufficientStats::initialize(&docs, 1, 3, &mut rng);
        assert!(z.iter().flatten().all(|&k| k == 0));
        assert_eq!(stats.topic_totals()[0], 7);
        assert_eq!(stats.num_topics(), 1);
        assert_eq!(stats.vocab_size(), 3);
        assert_eq!(stats.num_docs(), 4);
    }
}
