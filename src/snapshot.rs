use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::info;
use ndarray::{Array2, Array3};

use crate::config::Hyperparameters;
use crate::corpus::{Dataset, Pos};
use crate::dictionary::Dictionary;
use crate::error::{Error, Result};
use crate::estimate::Distributions;
use crate::state::State;

pub const ASSIGN_SUFFIX: &str = ".assign";
pub const OTHERS_SUFFIX: &str = ".others";
pub const THETA_SUFFIX: &str = ".theta";
pub const PI_SUFFIX: &str = ".pi";
pub const PHI0_SUFFIX: &str = ".phi0";
pub const PHI1_SUFFIX: &str = ".phi1";
pub const TWORDS_SUFFIX: &str = ".twords";
pub const VTWORDS_SUFFIX: &str = ".vtwords";
pub const WORDMAP_SUFFIX: &str = ".wordmap";

pub fn path_for(dir: &Path, name: &str, suffix: &str) -> PathBuf {
    dir.join(format!("{}{}", name, suffix))
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|e| Error::file(path, e))
}

fn open(path: &Path) -> Result<BufReader<File>> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|e| Error::file(path, e))
}

/// Scalar parameters of a saved model (the `.others` file).
#[derive(Debug, Clone, PartialEq)]
pub struct Others {
    pub hyper: Hyperparameters,
    pub topics: usize,
    pub viewpoints: usize,
    pub docs: usize,
    pub words: usize,
    pub topical_words: usize,
    pub opinion_words: usize,
    pub perplexity: f64,
}

impl Others {
    pub fn new(dataset: &Dataset, state: &State, hyper: &Hyperparameters, perplexity: f64) -> Others {
        Others {
            hyper: *hyper,
            topics: state.num_topics(),
            viewpoints: state.num_viewpoints(),
            docs: dataset.len(),
            words: dataset.vocab_size(),
            topical_words: dataset.topical_vocab_size(),
            opinion_words: dataset.opinion_vocab_size(),
            perplexity,
        }
    }

    pub fn to_writer<W: Write>(&self, w: &mut W) -> Result<()> {
        writeln!(w, "alpha={}", self.hyper.alpha)?;
        writeln!(w, "beta0={}", self.hyper.beta0)?;
        writeln!(w, "beta1={}", self.hyper.beta1)?;
        writeln!(w, "eta={}", self.hyper.eta)?;
        writeln!(w, "ntopics={}", self.topics)?;
        writeln!(w, "nviews={}", self.viewpoints)?;
        writeln!(w, "ndocs={}", self.docs)?;
        writeln!(w, "nwords={}", self.words)?;
        writeln!(w, "ntopwords={}", self.topical_words)?;
        writeln!(w, "nopwords={}", self.opinion_words)?;
        writeln!(w, "perplexity={}", self.perplexity)?;
        Ok(())
    }

    /// Lines that are not a single `key=value` pair, and unknown keys, are
    /// skipped. Every key except `perplexity` is required.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Others> {
        let mut floats: [Option<f64>; 5] = [None; 5];
        let mut ints: [Option<usize>; 6] = [None; 6];
        for (n, line) in reader.lines().enumerate() {
            let line = line?;
            let fields: Vec<&str> = line
                .split(|c: char| c == '=' || c.is_whitespace())
                .filter(|f| !f.is_empty())
                .collect();
            let (key, value) = match fields.as_slice() {
                [key, value] => (key.to_ascii_lowercase(), *value),
                _ => continue,
            };
            let float_slot = ["alpha", "beta0", "beta1", "eta", "perplexity"]
                .iter()
                .position(|k| *k == key);
            let int_slot = ["ntopics", "nviews", "ndocs", "nwords", "ntopwords", "nopwords"]
                .iter()
                .position(|k| *k == key);
            if let Some(slot) = float_slot {
                let parsed = value
                    .parse::<f64>()
                    .map_err(|_| Error::malformed(n + 1, format!("bad value for {}: `{}`", key, value)))?;
                floats[slot] = Some(parsed);
            } else if let Some(slot) = int_slot {
                let parsed = value
                    .parse::<usize>()
                    .map_err(|_| Error::malformed(n + 1, format!("bad value for {}: `{}`", key, value)))?;
                ints[slot] = Some(parsed);
            }
        }

        let float = |slot: usize, key: &str| floats[slot].ok_or_else(|| Error::malformed(0, format!("missing {}", key)));
        let int = |slot: usize, key: &str| ints[slot].ok_or_else(|| Error::malformed(0, format!("missing {}", key)));
        Ok(Others {
            hyper: Hyperparameters {
                alpha: float(0, "alpha")?,
                beta0: float(1, "beta0")?,
                beta1: float(2, "beta1")?,
                eta: float(3, "eta")?,
            },
            topics: int(0, "ntopics")?,
            viewpoints: int(1, "nviews")?,
            docs: int(2, "ndocs")?,
            words: int(3, "nwords")?,
            topical_words: int(4, "ntopwords")?,
            opinion_words: int(5, "nopwords")?,
            perplexity: floats[4].unwrap_or(0.0),
        })
    }
}

/// Viewpoint, topics and encoded tokens of every document, as stored in an
/// `.assign` file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Assignments {
    pub viewpoints: Vec<usize>,
    pub topics: Vec<Vec<usize>>,
    pub docs: Vec<Vec<Vec<(usize, Pos)>>>,
}

pub fn write_assignments<W: Write>(w: &mut W, dataset: &Dataset, state: &State) -> Result<()> {
    for (d, doc) in dataset.docs.iter().enumerate() {
        write!(w, "{}", state.viewpoint(d))?;
        for (m, sentence) in doc.sentences.iter().enumerate() {
            let tokens: Vec<String> = sentence
                .tokens()
                .iter()
                .map(|&(word, pos)| format!("{}:{}", word, pos))
                .collect();
            write!(w, "|{};{}", tokens.join(" "), state.topic(d, m))?;
        }
        writeln!(w)?;
    }
    Ok(())
}

/// Reads `num_docs` documents, checking every value against the declared
/// model dimensions.
pub fn read_assignments<R: BufRead>(reader: R, others: &Others) -> Result<Assignments> {
    let mut assignments = Assignments::default();
    let mut lines = reader.lines();
    for d in 0..others.docs {
        let n = d + 1;
        let line = match lines.next() {
            Some(line) => line?,
            None => return Err(Error::malformed(n, format!("expected {} documents, found {}", others.docs, d))),
        };
        let mut fields = line.split('|');
        let viewpoint = fields
            .next()
            .and_then(|f| f.trim().parse::<usize>().ok())
            .filter(|&v| v < others.viewpoints)
            .ok_or_else(|| Error::malformed(n, "bad document viewpoint"))?;

        let mut topics = Vec::new();
        let mut sentences = Vec::new();
        for field in fields {
            let (words, topic) = field
                .rsplit_once(';')
                .ok_or_else(|| Error::malformed(n, format!("sentence `{}` lacks a topic", field)))?;
            let topic = topic
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|&t| t < others.topics)
                .ok_or_else(|| Error::malformed(n, format!("bad topic `{}`", topic)))?;
            let mut tokens = Vec::new();
            for token in words.split_whitespace() {
                let parsed = token.split_once(':').and_then(|(word, code)| {
                    let word = word.parse::<usize>().ok().filter(|&k| k < others.words)?;
                    Some((word, Pos::from_code(code)?))
                });
                tokens.push(parsed.ok_or_else(|| Error::malformed(n, format!("bad token `{}`", token)))?);
            }
            topics.push(topic);
            sentences.push(tokens);
        }
        assignments.viewpoints.push(viewpoint);
        assignments.topics.push(topics);
        assignments.docs.push(sentences);
    }
    Ok(assignments)
}

fn write_row<W: Write, I: IntoIterator<Item = f64>>(w: &mut W, row: I) -> Result<()> {
    let values: Vec<String> = row.into_iter().map(|x| x.to_string()).collect();
    writeln!(w, "{}", values.join(" "))?;
    Ok(())
}

pub fn write_matrix<W: Write>(w: &mut W, matrix: &Array2<f64>) -> Result<()> {
    for row in matrix.rows() {
        write_row(w, row.iter().cloned())?;
    }
    Ok(())
}

/// One block of `T` rows per viewpoint, blocks separated by a blank line.
pub fn write_tensor<W: Write>(w: &mut W, tensor: &Array3<f64>) -> Result<()> {
    for block in tensor.outer_iter() {
        for row in block.rows() {
            write_row(w, row.iter().cloned())?;
        }
        writeln!(w)?;
    }
    Ok(())
}

/// The `n` most probable words of `probs`, highest first, each surface word
/// listed once.
pub fn top_words<'a, I>(dict: &'a Dictionary, probs: I, n: usize) -> Vec<(&'a str, f64)>
where
    I: IntoIterator<Item = f64>,
{
    let mut ranked: Vec<(usize, f64)> = probs.into_iter().enumerate().collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let mut seen = HashSet::new();
    let mut top = Vec::with_capacity(n);
    for (k, p) in ranked {
        if top.len() >= n {
            break;
        }
        if let Some(word) = dict.word(k) {
            if seen.insert(word) {
                top.push((word, p));
            }
        }
    }
    top
}

pub fn write_topic_words<W: Write>(w: &mut W, dict: &Dictionary, phi0: &Array2<f64>, n: usize) -> Result<()> {
    for (j, row) in phi0.rows().into_iter().enumerate() {
        writeln!(w, "Topic {}:", j)?;
        for (word, p) in top_words(dict, row.iter().cloned(), n) {
            writeln!(w, "\t{} {}", word, p)?;
        }
    }
    Ok(())
}

pub fn write_viewpoint_topic_words<W: Write>(w: &mut W, dict: &Dictionary, phi1: &Array3<f64>, n: usize) -> Result<()> {
    for (i, block) in phi1.outer_iter().enumerate() {
        for (j, row) in block.rows().into_iter().enumerate() {
            writeln!(w, "Viewpoint {}, Topic {}:", i, j)?;
            for (word, p) in top_words(dict, row.iter().cloned(), n) {
                writeln!(w, "\t{} {}", word, p)?;
            }
        }
    }
    Ok(())
}

/// Writes the full snapshot `<dir>/<name>.*`. Top-word reports are skipped
/// when `top_words` is zero.
pub fn save(
    dir: &Path,
    name: &str,
    dataset: &Dataset,
    state: &State,
    hyper: &Hyperparameters,
    dist: &Distributions,
    top_words: usize,
) -> Result<()> {
    info!("saving model {} to {}", name, dir.display());

    let mut w = create(&path_for(dir, name, ASSIGN_SUFFIX))?;
    write_assignments(&mut w, dataset, state)?;
    w.flush()?;

    let mut w = create(&path_for(dir, name, OTHERS_SUFFIX))?;
    Others::new(dataset, state, hyper, dist.perplexity).to_writer(&mut w)?;
    w.flush()?;

    let mut w = create(&path_for(dir, name, THETA_SUFFIX))?;
    write_matrix(&mut w, &dist.theta)?;
    w.flush()?;

    let mut w = create(&path_for(dir, name, PI_SUFFIX))?;
    write_row(&mut w, dist.pi.iter().cloned())?;
    w.flush()?;

    let mut w = create(&path_for(dir, name, PHI0_SUFFIX))?;
    write_matrix(&mut w, &dist.phi0)?;
    w.flush()?;

    let mut w = create(&path_for(dir, name, PHI1_SUFFIX))?;
    write_tensor(&mut w, &dist.phi1)?;
    w.flush()?;

    if top_words > 0 {
        let n = top_words.min(dataset.vocab_size());

        let mut w = create(&path_for(dir, name, TWORDS_SUFFIX))?;
        write_topic_words(&mut w, &dataset.dict, &dist.phi0, n)?;
        w.flush()?;

        let mut w = create(&path_for(dir, name, VTWORDS_SUFFIX))?;
        write_viewpoint_topic_words(&mut w, &dataset.dict, &dist.phi1, n)?;
        w.flush()?;
    }
    Ok(())
}

/// A model restored from its `.others`, `.assign` and `.wordmap` files.
#[derive(Debug, Clone)]
pub struct SavedModel {
    pub others: Others,
    pub dataset: Dataset,
    pub state: State,
}

impl SavedModel {
    pub fn load(dir: &Path, name: &str) -> Result<SavedModel> {
        let others = Others::from_reader(open(&path_for(dir, name, OTHERS_SUFFIX))?)?;
        let assignments = read_assignments(open(&path_for(dir, name, ASSIGN_SUFFIX))?, &others)?;
        let dict = Dictionary::read(path_for(dir, name, WORDMAP_SUFFIX))?;

        let Assignments {
            viewpoints,
            topics,
            docs,
        } = assignments;
        let dataset = Dataset::from_encoded(docs, dict, others.words, others.topical_words, others.opinion_words)?;
        let state = State::from_assignments(&dataset, others.viewpoints, others.topics, viewpoints, topics);
        info!(
            "loaded model {}: D={} W={} W0={} W1={} T={} V={}",
            name, others.docs, others.words, others.topical_words, others.opinion_words, others.topics, others.viewpoints
        );
        Ok(SavedModel {
            others,
            dataset,
            state,
        })
    }
}
