use serde::{Deserialize, Serialize};

use crate::error::{LdaError, Result};

/// Schedule of a single training run.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerConfig {
    pub topics: usize,
    pub iterations: usize,
    pub burn_in: usize,
    pub update_cycle: usize,
}

impl SamplerConfig {
    pub fn new(topics: usize, iterations: usize, burn_in: usize, update_cycle: usize) -> SamplerConfig {
        SamplerConfig {
            topics,
            iterations,
            burn_in,
            update_cycle,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.topics < 1 {
            return Err(LdaError::config("topic count must be at least 1"));
        }
        if self.iterations < 1 {
            return Err(LdaError::config("iteration count must be at least 1"));
        }
        if self.burn_in >= self.iterations {
            return Err(LdaError::config(format!(
                "burn-in ({}) must be smaller than the iteration count ({})",
                self.burn_in, self.iterations
            )));
        }
        if self.update_cycle < 1 {
            return Err(LdaError::config("update cycle must be at least 1"));
        }
        Ok(())
    }

    /// Whether the snapshot is taken after the 1-indexed sweep `iteration`.
    pub fn captures_after(&self, iteration: usize) -> bool {
        iteration > self.burn_in && (iteration - self.burn_in) % self.update_cycle == 0
    }

    /// Number of snapshots a complete run produces.
    pub fn expected_samples(&self) -> usize {
        (self.iterations - self.burn_in) / self.update_cycle
    }
}

/// Dirichlet priors: alpha over topics, beta over terms.
#[derive(Debug, Clone, PartialEq)]
pub struct Hyperparameters {
    alpha: Vec<f64>,
    beta: Vec<f64>,
    sum_alpha: f64,
    sum_beta: f64,
}

impl Hyperparameters {
    pub fn new(alpha: Vec<f64>, beta: Vec<f64>) -> Result<Hyperparameters> {
        check_prior("alpha", &alpha)?;
        check_prior("beta", &beta)?;
        let sum_alpha = alpha.iter().sum();
        let sum_beta = beta.iter().sum();
        Ok(Hyperparameters {
            alpha,
            beta,
            sum_alpha,
            sum_beta,
        })
    }

    pub fn symmetric(alpha: f64, topics: usize, beta: f64, vocabulary_size: usize) -> Result<Hyperparameters> {
        Hyperparameters::new(vec![alpha; topics], vec![beta; vocabulary_size])
    }

    pub fn alpha(&self) -> &[f64] {
        &self.alpha
    }

    pub fn beta(&self) -> &[f64] {
        &self.beta
    }

    pub fn sum_alpha(&self) -> f64 {
        self.sum_alpha
    }

    pub fn sum_beta(&self) -> f64 {
        self.sum_beta
    }

    pub fn num_topics(&self) -> usize {
        self.alpha.len()
    }

    pub fn vocabulary_size(&self) -> usize {
        self.beta.len()
    }

    pub(crate) fn check_shape(&self, topics: usize, vocabulary_size: usize) -> Result<()> {
        if self.alpha.len() != topics {
            return Err(LdaError::config(format!(
                "alpha has {} entries but the topic count is {}",
                self.alpha.len(),
                topics
            )));
        }
        if self.beta.len() != vocabulary_size {
            return Err(LdaError::config(format!(
                "beta has {} entries but the vocabulary size is {}",
                self.beta.len(),
                vocabulary_size
            )));
        }
        Ok(())
    }
}

fn check_prior(name: &str, values: &[f64]) -> Result<()> {
    if values.is_empty() {
        return Err(LdaError::config(format!("{} must not be empty", name)));
    }
    // `!(x > 0.0)` also rejects NaN
    if let Some((i, x)) = values.iter().enumerate().find(|&(_, &x)| !(x > 0.0) || !x.is_finite()) {
        return Err(LdaError::config(format!(
            "{}[{}] = {} is not a positive finite number",
            name, i, x
        )));
    }
    Ok(())
}
