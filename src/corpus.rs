use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{LdaError, Result};

/// Bidirectional term <-> id map. Ids are assigned densely in order of first appearance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vocabulary {
    ids: HashMap<String, usize>,
    terms: Vec<String>,
}

impl Vocabulary {
    pub fn new() -> Vocabulary {
        Vocabulary::default()
    }

    pub fn insert(&mut self, term: &str) -> usize {
        if let Some(&id) = self.ids.get(term) {
            return id;
        }
        let id = self.terms.len();
        self.ids.insert(term.to_owned(), id);
        self.terms.push(term.to_owned());
        id
    }

    pub fn id_of(&self, term: &str) -> Option<usize> {
        self.ids.get(term).cloned()
    }

    pub fn term(&self, id: usize) -> Option<&str> {
        self.terms.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// Immutable, already-tokenized collection of documents.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    documents: Vec<Vec<usize>>,
    names: Vec<String>,
    vocabulary: Vocabulary,
}

impl Corpus {
    /// Builds a corpus from term ids that are already dense in `[0, vocabulary_size)`.
    pub fn from_token_ids(documents: Vec<Vec<usize>>, vocabulary_size: usize) -> Result<Corpus> {
        for (m, doc) in documents.iter().enumerate() {
            if let Some((n, &term)) = doc.iter().enumerate().find(|&(_, &t)| t >= vocabulary_size) {
                return Err(LdaError::TermOutOfRange {
                    document: m,
                    position: n,
                    term,
                    vocabulary_size,
                });
            }
        }
        let mut vocabulary = Vocabulary::new();
        for v in 0..vocabulary_size {
            vocabulary.insert(&v.to_string());
        }
        let names = (0..documents.len()).map(|m| m.to_string()).collect();
        Ok(Corpus {
            documents,
            names,
            vocabulary,
        })
    }

    /// One document per line. Tokens are split on `sep`, or on whitespace when `sep` is `None`.
    pub fn from_reader<R: BufRead>(reader: R, sep: Option<&str>) -> std::io::Result<Corpus> {
        let mut corpus = Corpus::default();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let doc = corpus.tokenize(&line, sep, 1);
            corpus.push(index.to_string(), doc);
        }
        Ok(corpus)
    }

    pub fn load_file<P: AsRef<Path>>(path: P, sep: Option<&str>) -> Result<Corpus> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| LdaError::io(path, e))?;
        let corpus = Corpus::from_reader(BufReader::new(file), sep).map_err(|e| LdaError::io(path, e))?;
        log::info!(
            "loaded {} documents, {} terms from {}",
            corpus.num_documents(),
            corpus.vocabulary_size(),
            path.display()
        );
        Ok(corpus)
    }

    /// One document per regular file in `dir`. A file is kept when its name contains every
    /// `include` pattern and none of the `exclude` patterns. Tokens shorter than two
    /// bytes are dropped.
    pub fn load_directory<P: AsRef<Path>>(
        dir: P,
        sep: Option<&str>,
        include: &[String],
        exclude: &[String],
    ) -> Result<Corpus> {
        let dir = dir.as_ref();
        let mut names = Vec::new();
        for entry in fs::read_dir(dir).map_err(|e| LdaError::io(dir, e))? {
            let entry = entry.map_err(|e| LdaError::io(dir, e))?;
            let file_type = entry.file_type().map_err(|e| LdaError::io(entry.path(), e))?;
            if !file_type.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if accepts_name(&name, include, exclude) {
                names.push(name);
            }
        }
        // read_dir order is platform dependent
        names.sort();

        let mut corpus = Corpus::default();
        for name in names {
            let path = dir.join(&name);
            let file = File::open(&path).map_err(|e| LdaError::io(&path, e))?;
            let mut doc = Vec::new();
            for line in BufReader::new(file).lines() {
                let line = line.map_err(|e| LdaError::io(&path, e))?;
                doc.extend(corpus.tokenize(&line, sep, 2));
            }
            log::debug!("loaded document {} with {} tokens", name, doc.len());
            corpus.push(name, doc);
        }
        log::info!(
            "loaded {} documents, {} terms from {}",
            corpus.num_documents(),
            corpus.vocabulary_size(),
            dir.display()
        );
        Ok(corpus)
    }

    fn tokenize(&mut self, line: &str, sep: Option<&str>, min_bytes: usize) -> Vec<usize> {
        let vocabulary = &mut self.vocabulary;
        // length in UTF-8 bytes, so a single CJK character passes the directory threshold
        let keep = |word: &&str| word.len() >= min_bytes;
        match sep {
            Some(sep) => line.split(sep).filter(keep).map(|w| vocabulary.insert(w)).collect(),
            None => line.split_whitespace().filter(keep).map(|w| vocabulary.insert(w)).collect(),
        }
    }

    fn push(&mut self, name: String, doc: Vec<usize>) {
        self.names.push(name);
        self.documents.push(doc);
    }

    pub fn documents(&self) -> &[Vec<usize>] {
        &self.documents
    }

    pub fn document(&self, m: usize) -> &[usize] {
        &self.documents[m]
    }

    pub fn document_name(&self, m: usize) -> &str {
        &self.names[m]
    }

    pub fn num_documents(&self) -> usize {
        self.documents.len()
    }

    pub fn num_tokens(&self) -> usize {
        self.documents.iter().map(Vec::len).sum()
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }
}

fn accepts_name(name: &str, include: &[String], exclude: &[String]) -> bool {
    include.iter().all(|p| name.contains(p.as_str())) && !exclude.iter().any(|p| name.contains(p.as_str()))
}
