use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::config::SamplerConfig;
use crate::corpus::Corpus;
use crate::error::{LdaError, Result};
use crate::gibbs::{GibbsSampler, Posterior};

const RULE: &str = "##################################################";

/// Result of a training run, as persisted with `--model`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Model {
    pub config: SamplerConfig,
    pub seed: Option<u64>,
    pub alpha: Vec<f64>,
    pub beta: Vec<f64>,
    pub num_samples: usize,
    /// Document-topic distribution, M x K.
    pub theta: Array2<f64>,
    /// Topic-term distribution, K x V.
    pub phi: Array2<f64>,
}

impl Model {
    pub fn from_run<R: rand::Rng>(gibbs: &GibbsSampler<R>, seed: Option<u64>) -> Model {
        let Posterior { theta, phi } = gibbs.finalize();
        let hyper = gibbs.hyperparameters();
        Model {
            config: *gibbs.config(),
            seed,
            alpha: hyper.alpha().to_vec(),
            beta: hyper.beta().to_vec(),
            num_samples: gibbs.sample_count(),
            theta,
            phi,
        }
    }

    pub fn num_topics(&self) -> usize {
        self.phi.nrows()
    }

    pub fn vocabulary_size(&self) -> usize {
        self.phi.ncols()
    }

    pub fn num_documents(&self) -> usize {
        self.theta.nrows()
    }

    /// The `n` most probable terms of topic `k`, ties broken by term id.
    pub fn top_terms(&self, k: usize, n: usize) -> Vec<(usize, f64)> {
        let mut topic_vec: Vec<(usize, f64)> = self.phi.row(k).iter().cloned().enumerate().collect();
        topic_vec.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then(a.0.cmp(&b.0)));
        topic_vec.truncate(n);
        topic_vec
    }

    // phi: KxV matrix
    pub fn write_topics<W: Write>(&self, w: &mut W, corpus: &Corpus, top_n: usize) -> io::Result<()> {
        self.write_topics_by(w, top_n, |&v| TermLabel(corpus, v))
    }

    pub fn write_topics_by<W, T, F>(&self, w: &mut W, top_n: usize, mut f: F) -> io::Result<()>
    where
        W: Write,
        T: fmt::Display,
        F: FnMut(&usize) -> T,
    {
        for k in 0..self.num_topics() {
            writeln!(w, "{}", RULE)?;
            writeln!(w, "topic: {}", k)?;
            for (v, prob) in self.top_terms(k, top_n) {
                writeln!(w, "{}: {}", f(&v), prob)?;
            }
        }
        Ok(())
    }

    // phi^-1: VxK matrix
    pub fn write_term_topics<W: Write>(&self, w: &mut W, corpus: &Corpus) -> io::Result<()> {
        for v in 0..self.vocabulary_size() {
            write!(w, "{}:", TermLabel(corpus, v))?;
            for k in 0..self.num_topics() {
                if self.phi[[k, v]] > 1e-9 {
                    write!(w, " {}*{}", self.phi[[k, v]], k)?;
                }
            }
            writeln!(w)?;
        }
        Ok(())
    }

    // theta: MxK matrix
    pub fn write_documents<W: Write>(&self, w: &mut W, corpus: &Corpus, limit: Option<usize>) -> io::Result<()> {
        let limit = limit.unwrap_or(self.num_documents()).min(self.num_documents());
        for m in 0..limit {
            writeln!(w, "{}", RULE)?;
            writeln!(w, "document: {}", corpus.document_name(m))?;
            writeln!(w, "{}", self.theta.row(m))?;
        }
        Ok(())
    }

    pub fn write_document_csv<W: Write>(&self, w: &mut W, corpus: &Corpus) -> io::Result<()> {
        write!(w, "document")?;
        for k in 0..self.num_topics() {
            write!(w, ",topic_{}", k)?;
        }
        writeln!(w)?;
        for (m, row) in self.theta.outer_iter().enumerate() {
            write!(w, "{}", csv_field(corpus.document_name(m)))?;
            for p in row.iter() {
                write!(w, ",{}", p)?;
            }
            writeln!(w)?;
        }
        Ok(())
    }

    pub fn save_topics<P: AsRef<Path>>(&self, path: P, corpus: &Corpus, top_n: usize) -> Result<()> {
        write_file(path.as_ref(), |w| self.write_topics(w, corpus, top_n))
    }

    pub fn save_document_csv<P: AsRef<Path>>(&self, path: P, corpus: &Corpus) -> Result<()> {
        write_file(path.as_ref(), |w| self.write_document_csv(w, corpus))
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| LdaError::io(path, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush().map_err(|e| LdaError::io(path, e))
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Model> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| LdaError::io(path, e))?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }
}

fn write_file<F>(path: &Path, body: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> io::Result<()>,
{
    let file = File::create(path).map_err(|e| LdaError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    body(&mut writer)
        .and_then(|_| writer.flush())
        .map_err(|e| LdaError::io(path, e))?;
    log::info!("wrote {}", path.display());
    Ok(())
}

/// Vocabulary term, or the bare id when the vocabulary has no entry for it.
struct TermLabel<'a>(&'a Corpus, usize);

impl<'a> fmt::Display for TermLabel<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.0.vocabulary().term(self.1) {
            Some(term) => term.fmt(f),
            None => self.1.fmt(f),
        }
    }
}

fn csv_field(s: &str) -> String {
    if s.contains(|c: char| c == ',' || c == '"' || c == '\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;
    use std::io::Cursor;

    fn corpus() -> Corpus {
        Corpus::from_reader(Cursor::new("apple banana apple\nbanana cherry\n"), None).unwrap()
    }

    fn model() -> Model {
        Model {
            config: SamplerConfig::new(2, 10, 5, 1),
            seed: Some(1),
            alpha: vec![2.0, 2.0],
            beta: vec![0.1; 3],
            num_samples: 5,
            theta: arr2(&[[0.75, 0.25], [0.5, 0.5]]),
            phi: arr2(&[[0.6, 0.3, 0.1], [0.2, 0.2, 0.6]]),
        }
    }

    #[test]
    fn top_terms_are_sorted_with_stable_ties() {
        let model = model();
        assert_eq!(model.top_terms(0, 2), vec![(0, 0.6), (1, 0.3)]);
        assert_eq!(model.top_terms(1, 3), vec![(2, 0.6), (0, 0.2), (1, 0.2)]);
        assert_eq!(model.top_terms(1, 10).len(), 3);
    }

    #[test]
    fn topic_listing_uses_vocabulary() {
        let mut out = Vec::new();
        model().write_topics(&mut out, &corpus(), 1).unwrap();
        let text = String::from_utf8(out).unwrap();
        let expected = format!("{r}\ntopic: 0\napple: 0.6\n{r}\ntopic: 1\ncherry: 0.6\n", r = RULE);
        assert_eq!(text, expected);
    }

    #[test]
    fn term_listing_skips_negligible_mass() {
        let mut model = model();
        model.phi[[1, 0]] = 0.0;
        let mut out = Vec::new();
        model.write_term_topics(&mut out, &corpus()).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "apple: 0.6*0");
        assert_eq!(lines[2], "cherry: 0.1*0 0.6*1");
    }

    #[test]
    fn document_csv_has_header_and_rows() {
        let mut out = Vec::new();
        model().write_document_csv(&mut out, &corpus()).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "document,topic_0,topic_1\n0,0.75,0.25\n1,0.5,0.5\n");
    }

    #[test]
    fn document_listing_respects_limit() {
        let mut out = Vec::new();
        model().write_documents(&mut out, &corpus(), Some(1)).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("document: 0"));
        assert!(!text.contains("document: 1"));
    }

    #[test]
    fn csv_fields_are_quoted_when_needed() {
        assert_eq!(csv_field("plain.txt"), "plain.txt");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn json_dump_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let model = model();
        model.save_json(&path).unwrap();
        assert_eq!(Model::load_json(&path).unwrap(), model);
    }

    #[test]
    fn report_files_are_written() {
        let dir = tempfile::tempdir().unwrap();
        let topics = dir.path().join("topics.txt");
        let docs = dir.path().join("docs.csv");
        let model = model();
        model.save_topics(&topics, &corpus(), 2).unwrap();
        model.save_document_csv(&docs, &corpus()).unwrap();
        assert!(std::fs::read_to_string(&topics).unwrap().contains("banana: 0.3"));
        assert!(std::fs::read_to_string(&docs).unwrap().starts_with("document,"));
    }
}
