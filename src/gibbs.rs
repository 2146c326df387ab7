use std::ops::ControlFlow;

use ndarray::Array2;
use rand::Rng;

use crate::config::{Hyperparameters, SamplerConfig};
use crate::corpus::Corpus;
use crate::error::{LdaError, Result};
use crate::sampler::Categorical;
use crate::stats::{Assignments, SufficientStats};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    BurnIn,
    Sampling,
}

/// Passed to the observer of [`GibbsSampler::run_with`] after every sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    /// 1-indexed number of the sweep just completed.
    pub iteration: usize,
    pub phase: Phase,
    /// Whether this sweep ended with a snapshot.
    pub captured: bool,
}

/// Final posterior estimate.
#[derive(Debug, Clone, PartialEq)]
pub struct Posterior {
    /// Document-topic distribution, M x K.
    pub theta: Array2<f64>,
    /// Topic-term distribution, K x V.
    pub phi: Array2<f64>,
}

/// Running sum of plug-in estimates taken after burn-in.
#[derive(Debug, Clone)]
struct Accumulator {
    theta: Array2<f64>,
    phi: Array2<f64>,
    samples: usize,
}

impl Accumulator {
    fn new(num_docs: usize, num_topics: usize, vocab_size: usize) -> Accumulator {
        Accumulator {
            theta: Array2::zeros((num_docs, num_topics)),
            phi: Array2::zeros((num_topics, vocab_size)),
            samples: 0,
        }
    }

    fn capture(&mut self, stats: &SufficientStats, hyper: &Hyperparameters) {
        add_plug_in(&mut self.theta, &mut self.phi, stats, hyper);
        self.samples += 1;
    }
}

/// Adds `(n + prior) / (total + sum(prior))` for every cell of both tables.
fn add_plug_in(theta: &mut Array2<f64>, phi: &mut Array2<f64>, stats: &SufficientStats, hyper: &Hyperparameters) {
    let alpha = hyper.alpha();
    let beta = hyper.beta();
    for ((mut theta_m, ndk_m), &nd_m) in theta
        .outer_iter_mut()
        .zip(stats.doc_topic().outer_iter())
        .zip(stats.doc_totals())
    {
        let denom = nd_m as f64 + hyper.sum_alpha();
        for (k, t) in theta_m.iter_mut().enumerate() {
            *t += (ndk_m[k] as f64 + alpha[k]) / denom;
        }
    }
    for ((mut phi_k, nkv_k), &nk_k) in phi
        .outer_iter_mut()
        .zip(stats.topic_term().outer_iter())
        .zip(stats.topic_totals())
    {
        let denom = nk_k as f64 + hyper.sum_beta();
        for (v, p) in phi_k.iter_mut().enumerate() {
            *p += (nkv_k[v] as f64 + beta[v]) / denom;
        }
    }
}

/// Collapsed Gibbs sampler for one training run.
///
/// The sampler owns the chain state exclusively; tokens are visited strictly in
/// document order, then position order, and every random draw comes from `rng` in
/// that order, so a fixed seed reproduces the run exactly.
pub struct GibbsSampler<'a, R> {
    corpus: &'a Corpus,
    config: SamplerConfig,
    hyper: Hyperparameters,
    rng: R,
    stats: SufficientStats,
    z: Assignments,
    weights: Categorical,
    accum: Accumulator,
    completed: usize,
    abandoned: bool,
}

impl<'a, R: Rng> GibbsSampler<'a, R> {
    /// Validates the configuration, then draws the initial state.
    pub fn new(corpus: &'a Corpus, config: SamplerConfig, hyper: Hyperparameters, mut rng: R) -> Result<Self> {
        config.validate()?;
        hyper.check_shape(config.topics, corpus.vocabulary_size())?;

        let num_topics = config.topics;
        let vocab_size = corpus.vocabulary_size();
        let (stats, z) = SufficientStats::initialize(corpus.documents(), num_topics, vocab_size, &mut rng);
        debug_assert!(stats.is_consistent(Some(corpus.documents())));
        log::info!(
            "initialized chain: M = {}, V = {}, K = {}, {} tokens",
            corpus.num_documents(),
            vocab_size,
            num_topics,
            corpus.num_tokens()
        );

        Ok(GibbsSampler {
            corpus,
            config,
            hyper,
            rng,
            stats,
            z,
            weights: Categorical::with_capacity(num_topics),
            accum: Accumulator::new(corpus.num_documents(), num_topics, vocab_size),
            completed: 0,
            abandoned: false,
        })
    }

    /// Resamples the topic of token `n` of document `m` and returns the new topic.
    /// Fails once the chain has been abandoned; a degenerate draw abandons it.
    pub fn resample(&mut self, m: usize, n: usize) -> Result<usize> {
        if self.abandoned {
            return Err(LdaError::Cancelled {
                completed_sweeps: self.completed,
            });
        }
        let v = self.corpus.document(m)[n];
        let old = self.z[m][n];
        self.stats.decrement(m, old, v);

        self.weights.fill_full_conditional(&self.stats, &self.hyper, m, v);
        let new = match self.weights.sample(&mut self.rng) {
            Some(k) => k,
            None => {
                let total = self.weights.total();
                // leave the counts describing the old assignment
                self.stats.increment(m, old, v);
                self.abandoned = true;
                return Err(LdaError::ArithmeticDegeneracy {
                    document: m,
                    position: n,
                    total,
                });
            }
        };

        self.stats.increment(m, new, v);
        self.z[m][n] = new;
        Ok(new)
    }

    /// One pass over every token, then a snapshot if the schedule asks for one.
    pub fn sweep(&mut self) -> Result<SweepReport> {
        if self.abandoned {
            return Err(LdaError::Cancelled {
                completed_sweeps: self.completed,
            });
        }
        if self.completed >= self.config.iterations {
            return Err(LdaError::ScheduleExhausted {
                iterations: self.config.iterations,
            });
        }
        let corpus = self.corpus;
        for (m, doc) in corpus.documents().iter().enumerate() {
            for n in 0..doc.len() {
                self.resample(m, n)?;
            }
        }
        self.completed += 1;

        let iteration = self.completed;
        let captured = self.config.captures_after(iteration);
        if captured {
            self.accum.capture(&self.stats, &self.hyper);
            log::trace!("snapshot {} taken after sweep {}", self.accum.samples, iteration);
        }
        let phase = if iteration <= self.config.burn_in {
            Phase::BurnIn
        } else {
            Phase::Sampling
        };
        Ok(SweepReport {
            iteration,
            phase,
            captured,
        })
    }

    /// Runs the remaining sweeps of the configured schedule.
    pub fn run(&mut self) -> Result<()> {
        self.run_with(|_| ControlFlow::Continue(()))
    }

    /// Like [`run`](Self::run), calling `observer` after each sweep. Breaking abandons the
    /// chain: the run ends with [`LdaError::Cancelled`] and no further sweeps are accepted.
    pub fn run_with<F>(&mut self, mut observer: F) -> Result<()>
    where
        F: FnMut(&SweepReport) -> ControlFlow<()>,
    {
        while self.completed < self.config.iterations {
            let report = self.sweep()?;
            if log::log_enabled!(log::Level::Debug) {
                log::debug!(
                    "sweep {}/{} ({:?}): log-likelihood {}",
                    report.iteration,
                    self.config.iterations,
                    report.phase,
                    self.log_likelihood()
                );
            }
            if report.iteration == self.config.burn_in && self.config.burn_in > 0 {
                log::info!("burn-in finished after {} sweeps", report.iteration);
            }
            if let ControlFlow::Break(()) = observer(&report) {
                self.abandoned = true;
                log::warn!("run cancelled after {} sweeps", self.completed);
                return Err(LdaError::Cancelled {
                    completed_sweeps: self.completed,
                });
            }
        }
        log::info!(
            "sampling finished: {} sweeps, {} snapshots",
            self.completed,
            self.accum.samples
        );
        Ok(())
    }

    /// Averaged snapshots, or the plug-in estimate of the current counts when no snapshot
    /// has been taken. Reads state only, so repeated calls agree.
    pub fn finalize(&self) -> Posterior {
        if self.accum.samples > 0 {
            let n = self.accum.samples as f64;
            Posterior {
                theta: &self.accum.theta / n,
                phi: &self.accum.phi / n,
            }
        } else {
            let mut theta = Array2::zeros(self.accum.theta.dim());
            let mut phi = Array2::zeros(self.accum.phi.dim());
            add_plug_in(&mut theta, &mut phi, &self.stats, &self.hyper);
            Posterior { theta, phi }
        }
    }

    /// `Σ_k Σ_v n_kv ln φ̂_kv` under the plug-in topic-term estimate of the current counts.
    pub fn log_likelihood(&self) -> f64 {
        let beta = self.hyper.beta();
        let mut ll = 0.0;
        for (nkv_k, &nk_k) in self.stats.topic_term().outer_iter().zip(self.stats.topic_totals()) {
            let denom = nk_k as f64 + self.hyper.sum_beta();
            for (v, &count) in nkv_k.iter().enumerate() {
                if count > 0 {
                    ll += count as f64 * ((count as f64 + beta[v]) / denom).ln();
                }
            }
        }
        ll
    }

    pub fn stats(&self) -> &SufficientStats {
        &self.stats
    }

    pub fn assignments(&self) -> &Assignments {
        &self.z
    }

    pub fn sample_count(&self) -> usize {
        self.accum.samples
    }

    pub fn completed_sweeps(&self) -> usize {
        self.completed
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    pub fn hyperparameters(&self) -> &Hyperparameters {
        &self.hyper
    }
}
