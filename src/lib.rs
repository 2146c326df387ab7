//! Latent Dirichlet allocation inferred by collapsed Gibbs sampling.
//!
//! ```no_run
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//! use tilda::{Corpus, GibbsSampler, Hyperparameters, Model, SamplerConfig};
//!
//! # fn main() -> tilda::Result<()> {
//! let corpus = Corpus::load_file("corpus.txt", None)?;
//! let config = SamplerConfig::new(10, 1000, 500, 100);
//! let hyper = Hyperparameters::symmetric(2.0, 10, 0.1, corpus.vocabulary_size())?;
//! let mut gibbs = GibbsSampler::new(&corpus, config, hyper, StdRng::seed_from_u64(1))?;
//! gibbs.run()?;
//! let model = Model::from_run(&gibbs, Some(1));
//! model.write_topics(&mut std::io::stdout(), &corpus, 10).ok();
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod corpus;
pub mod error;
pub mod gibbs;
pub mod model;
pub mod sampler;
pub mod stats;

pub use config::{Hyperparameters, SamplerConfig};
pub use corpus::{Corpus, Vocabulary};
pub use error::{LdaError, Result};
pub use gibbs::{GibbsSampler, Phase, Posterior, SweepReport};
pub use model::Model;
