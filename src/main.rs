use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;

use tilda::{Corpus, GibbsSampler, Hyperparameters, Model, Result, SamplerConfig};

/// Latent Dirichlet allocation implemented in Rust
#[derive(Parser, Debug)]
#[command(name = "tilda", version, author)]
struct Cli {
    /// Corpus file (one document per line) or directory (one document per file)
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Token separator; whitespace when omitted
    #[arg(long, value_name = "SEP")]
    sep: Option<String>,

    /// Only read files whose name contains this pattern (directory input, repeatable)
    #[arg(long, value_name = "PAT")]
    include: Vec<String>,

    /// Skip files whose name contains this pattern (directory input, repeatable)
    #[arg(long, value_name = "PAT")]
    exclude: Vec<String>,

    /// Set the number of topics
    #[arg(long, value_name = "NUMBER", default_value_t = 10)]
    topics: usize,

    /// Set the number of sweeps over the corpus
    #[arg(long, value_name = "NUMBER", default_value_t = 1000)]
    iterations: usize,

    /// Set the number of sweeps discarded before averaging
    #[arg(long, value_name = "NUMBER", default_value_t = 500)]
    burn_in: usize,

    /// Take a snapshot every NUMBER sweeps after burn-in
    #[arg(long, value_name = "NUMBER", default_value_t = 100)]
    update_cycle: usize,

    /// Symmetric document-topic prior
    #[arg(long, value_name = "VALUE", default_value_t = 2.0)]
    alpha: f64,

    /// Symmetric topic-term prior
    #[arg(long, value_name = "VALUE")]
    beta: f64,

    /// Seed of the random stream; drawn from the OS when omitted
    #[arg(long, value_name = "NUMBER")]
    seed: Option<u64>,

    /// Number of terms listed per topic
    #[arg(long, value_name = "NUMBER", default_value_t = 10)]
    top_terms: usize,

    /// Number of documents listed; all when omitted
    #[arg(long, value_name = "NUMBER")]
    top_documents: Option<usize>,

    /// Also print, for every term, its probability under each topic
    #[arg(long)]
    term_topics: bool,

    /// Write the topic listing to FILE
    #[arg(long, value_name = "FILE")]
    topic_output: Option<PathBuf>,

    /// Write document-topic proportions as CSV to FILE
    #[arg(long, value_name = "FILE")]
    document_output: Option<PathBuf>,

    /// Write the fitted model as JSON to FILE
    #[arg(long, value_name = "FILE")]
    model: Option<PathBuf>,
}

fn load_corpus(cli: &Cli) -> Result<Corpus> {
    let sep = cli.sep.as_deref();
    if cli.input.is_dir() {
        Corpus::load_directory(&cli.input, sep, &cli.include, &cli.exclude)
    } else {
        Corpus::load_file(&cli.input, sep)
    }
}

fn train(cli: &Cli) -> Result<()> {
    let corpus = load_corpus(cli)?;
    let config = SamplerConfig::new(cli.topics, cli.iterations, cli.burn_in, cli.update_cycle);
    let hyper = Hyperparameters::symmetric(cli.alpha, cli.topics, cli.beta, corpus.vocabulary_size())?;
    let seed = cli.seed.unwrap_or_else(rand::random);
    log::info!("seed = {}", seed);

    let mut gibbs = GibbsSampler::new(&corpus, config, hyper, StdRng::seed_from_u64(seed))?;
    gibbs.run()?;
    let model = Model::from_run(&gibbs, Some(seed));

    let stdout = io::stdout();
    let mut out = stdout.lock();
    report(&mut out, &model, &corpus, cli).map_err(|e| tilda::LdaError::Io {
        path: PathBuf::from("<stdout>"),
        source: e,
    })?;

    if let Some(path) = &cli.topic_output {
        model.save_topics(path, &corpus, cli.top_terms)?;
    }
    if let Some(path) = &cli.document_output {
        model.save_document_csv(path, &corpus)?;
    }
    if let Some(path) = &cli.model {
        model.save_json(path)?;
    }
    Ok(())
}

fn report<W: Write>(out: &mut W, model: &Model, corpus: &Corpus, cli: &Cli) -> io::Result<()> {
    model.write_topics(out, corpus, cli.top_terms)?;
    if cli.term_topics {
        model.write_term_topics(out, corpus)?;
    }
    model.write_documents(out, corpus, cli.top_documents)?;
    out.flush()
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    match train(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("tilda: {}", e);
            ExitCode::FAILURE
        }
    }
}
