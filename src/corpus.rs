use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::debug;

use crate::dictionary::Dictionary;
use crate::error::{Error, Result};

/// Word id -> occurrences. Ordered so that sweeps are reproducible under a
/// fixed seed.
pub type Bag = BTreeMap<usize, usize>;

/// Part-of-speech category of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pos {
    Topical,
    Opinion,
}

impl Pos {
    pub fn from_code(code: &str) -> Option<Pos> {
        match code {
            "0" => Some(Pos::Topical),
            "1" => Some(Pos::Opinion),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Pos::Topical => 0,
            Pos::Opinion => 1,
        }
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.code().fmt(f)
    }
}

/// Which categories a vocabulary word has been observed under.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Presence {
    pub topical: bool,
    pub opinion: bool,
}

impl Presence {
    pub fn has(self, pos: Pos) -> bool {
        match pos {
            Pos::Topical => self.topical,
            Pos::Opinion => self.opinion,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sentence {
    tokens: Vec<(usize, Pos)>,
    topical: Bag,
    opinion: Bag,
    raw: String,
}

impl Sentence {
    pub fn new(tokens: Vec<(usize, Pos)>) -> Sentence {
        Sentence::with_raw(tokens, String::new())
    }

    pub fn with_raw(tokens: Vec<(usize, Pos)>, raw: String) -> Sentence {
        let mut topical = Bag::new();
        let mut opinion = Bag::new();
        for &(word, pos) in &tokens {
            let bag = match pos {
                Pos::Topical => &mut topical,
                Pos::Opinion => &mut opinion,
            };
            *bag.entry(word).or_insert(0) += 1;
        }
        Sentence {
            tokens,
            topical,
            opinion,
            raw,
        }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn tokens(&self) -> &[(usize, Pos)] {
        &self.tokens
    }

    pub fn topical_counts(&self) -> &Bag {
        &self.topical
    }

    pub fn opinion_counts(&self) -> &Bag {
        &self.opinion
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub sentences: Vec<Sentence>,
    pub raw: String,
}

impl Document {
    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }
}

/// Local -> global word ids of a dataset read against a trained vocabulary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdMap {
    global: Vec<usize>,
}

impl IdMap {
    /// `None` marks an excluded word: it has no counterpart in the trained
    /// model and contributes no evidence.
    pub fn global(&self, local: usize) -> Option<usize> {
        self.global.get(local).cloned()
    }

    pub fn len(&self) -> usize {
        self.global.len()
    }

    pub fn is_empty(&self) -> bool {
        self.global.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Dataset {
    pub docs: Vec<Document>,
    pub dict: Dictionary,
    vocab_size: usize,
    topical_vocab_size: usize,
    opinion_vocab_size: usize,
    presence: Vec<Presence>,
    id_map: Option<IdMap>,
}

impl Dataset {
    fn empty(global: bool) -> Dataset {
        Dataset {
            docs: Vec::new(),
            dict: Dictionary::new(),
            vocab_size: 0,
            topical_vocab_size: 0,
            opinion_vocab_size: 0,
            presence: Vec::new(),
            id_map: if global { Some(IdMap::default()) } else { None },
        }
    }

    /// Reads a corpus file: a document count followed by one document per line.
    pub fn read<P: AsRef<Path>>(path: P, global: Option<&Dictionary>) -> Result<Dataset> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::file(path, e))?;
        Dataset::from_reader(BufReader::new(file), global)
    }

    pub fn from_reader<R: BufRead>(reader: R, global: Option<&Dictionary>) -> Result<Dataset> {
        let mut lines = reader.lines();
        let header = match lines.next() {
            Some(line) => line?,
            None => return Err(Error::malformed(1, "missing document count")),
        };
        let num_docs = header
            .trim()
            .parse::<usize>()
            .map_err(|_| Error::malformed(1, format!("bad document count `{}`", header.trim())))?;

        let mut dataset = Dataset::empty(global.is_some());
        for d in 0..num_docs {
            let line = match lines.next() {
                Some(line) => line?,
                None => {
                    return Err(Error::malformed(
                        d + 2,
                        format!("expected {} documents, found {}", num_docs, d),
                    ))
                }
            };
            dataset.push_document(&line, global).map_err(|e| match e {
                Error::Malformed { message, .. } => Error::malformed(d + 2, message),
                e => e,
            })?;
        }
        Ok(dataset)
    }

    pub fn from_documents(docs: &[&str], global: Option<&Dictionary>) -> Result<Dataset> {
        let mut dataset = Dataset::empty(global.is_some());
        for (d, doc) in docs.iter().enumerate() {
            dataset.push_document(doc, global).map_err(|e| match e {
                Error::Malformed { message, .. } => Error::malformed(d + 1, message),
                e => e,
            })?;
        }
        Ok(dataset)
    }

    fn push_document(&mut self, line: &str, global: Option<&Dictionary>) -> Result<()> {
        let mut sentences = Vec::new();
        for raw in line.split('|') {
            let mut tokens = Vec::new();
            for token in raw.split_whitespace() {
                let (word, code) = token
                    .rsplit_once(':')
                    .ok_or_else(|| Error::malformed(0, format!("token `{}` lacks a category", token)))?;
                let pos = Pos::from_code(code)
                    .ok_or_else(|| Error::malformed(0, format!("unknown category in `{}`", token)))?;

                let local = match global {
                    Some(global) => match global.id(word) {
                        Some(gid) => {
                            let local = self.dict.insert(word);
                            if let Some(map) = self.id_map.as_mut() {
                                if local == map.global.len() {
                                    map.global.push(gid);
                                }
                            }
                            local
                        }
                        None => {
                            debug!("dropping `{}`: not in the trained vocabulary", word);
                            continue;
                        }
                    },
                    None => self.dict.insert(word),
                };
                self.observe(local, pos);
                tokens.push((local, pos));
            }
            sentences.push(Sentence::with_raw(tokens, raw.to_string()));
        }
        self.docs.push(Document {
            sentences,
            raw: line.to_string(),
        });
        self.vocab_size = self.dict.len();
        Ok(())
    }

    fn observe(&mut self, word: usize, pos: Pos) {
        if word >= self.presence.len() {
            self.presence.resize(word + 1, Presence::default());
        }
        let presence = &mut self.presence[word];
        match pos {
            Pos::Topical if !presence.topical => {
                presence.topical = true;
                self.topical_vocab_size += 1;
            }
            Pos::Opinion if !presence.opinion => {
                presence.opinion = true;
                self.opinion_vocab_size += 1;
            }
            _ => {}
        }
    }

    /// Rebuilds a dataset whose tokens are already ids of `dict`, as stored
    /// in an assignment snapshot. Vocabulary sizes come from the snapshot.
    pub fn from_encoded(
        docs: Vec<Vec<Vec<(usize, Pos)>>>,
        dict: Dictionary,
        vocab_size: usize,
        topical_vocab_size: usize,
        opinion_vocab_size: usize,
    ) -> Result<Dataset> {
        if dict.len() != vocab_size {
            return Err(Error::malformed(
                0,
                format!(
                    "word map holds {} words but the model declares {}",
                    dict.len(),
                    vocab_size
                ),
            ));
        }
        let mut presence = vec![Presence::default(); vocab_size];
        let mut documents = Vec::with_capacity(docs.len());
        for (d, doc) in docs.into_iter().enumerate() {
            let mut sentences = Vec::with_capacity(doc.len());
            for tokens in doc {
                for &(word, pos) in &tokens {
                    let flags = presence.get_mut(word).ok_or_else(|| {
                        Error::malformed(d + 1, format!("word id {} outside vocabulary", word))
                    })?;
                    match pos {
                        Pos::Topical => flags.topical = true,
                        Pos::Opinion => flags.opinion = true,
                    }
                }
                sentences.push(Sentence::new(tokens));
            }
            documents.push(Document {
                sentences,
                raw: String::new(),
            });
        }
        Ok(Dataset {
            docs: documents,
            dict,
            vocab_size,
            topical_vocab_size,
            opinion_vocab_size,
            presence,
            id_map: None,
        })
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// W
    pub fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    /// W0
    pub fn topical_vocab_size(&self) -> usize {
        self.topical_vocab_size
    }

    /// W1
    pub fn opinion_vocab_size(&self) -> usize {
        self.opinion_vocab_size
    }

    pub fn presence(&self, word: usize) -> Presence {
        self.presence.get(word).cloned().unwrap_or_default()
    }

    pub fn id_map(&self) -> Option<&IdMap> {
        self.id_map.as_ref()
    }

    pub fn num_sentences(&self) -> usize {
        self.docs.iter().map(Document::len).sum()
    }

    pub fn num_tokens(&self) -> usize {
        self.docs
            .iter()
            .flat_map(|doc| doc.sentences.iter())
            .map(Sentence::len)
            .sum()
    }
}
