use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::{Error, Result};

/// Bidirectional word <-> id mapping. Ids are dense and handed out in
/// first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dictionary {
    words: Vec<String>,
    ids: HashMap<String, usize>,
}

impl Dictionary {
    pub fn new() -> Dictionary {
        Dictionary::default()
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn id(&self, word: &str) -> Option<usize> {
        self.ids.get(word).cloned()
    }

    pub fn word(&self, id: usize) -> Option<&str> {
        self.words.get(id).map(String::as_str)
    }

    pub fn contains(&self, word: &str) -> bool {
        self.ids.contains_key(word)
    }

    /// Returns the id of `word`, adding it if unseen.
    pub fn insert(&mut self, word: &str) -> usize {
        if let Some(&id) = self.ids.get(word) {
            return id;
        }
        let id = self.words.len();
        self.words.push(word.to_string());
        self.ids.insert(word.to_string(), id);
        id
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.words.iter().enumerate().map(|(id, w)| (id, w.as_str()))
    }

    pub fn read<P: AsRef<Path>>(path: P) -> Result<Dictionary> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::file(path, e))?;
        Dictionary::from_reader(BufReader::new(file))
    }

    /// Parses `word id` lines. A first line holding a lone integer is taken
    /// as an entry count and skipped.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Dictionary> {
        let mut entries: Vec<(String, usize)> = Vec::new();
        for (n, line) in reader.lines().enumerate() {
            let line = line?;
            let fields: Vec<&str> = line.split_whitespace().collect();
            match fields.as_slice() {
                [] => continue,
                [count] if n == 0 && count.parse::<usize>().is_ok() => continue,
                [word, id] => {
                    let id = id
                        .parse::<usize>()
                        .map_err(|_| Error::malformed(n + 1, format!("bad word id `{}`", id)))?;
                    entries.push((word.to_string(), id));
                }
                _ => {
                    return Err(Error::malformed(
                        n + 1,
                        format!("expected `word id`, got `{}`", line),
                    ))
                }
            }
        }

        entries.sort_by_key(|&(_, id)| id);
        let mut dict = Dictionary::new();
        for (expected, (word, id)) in entries.into_iter().enumerate() {
            if id != expected {
                return Err(Error::malformed(
                    0,
                    format!("word ids are not dense: expected {}, found {}", expected, id),
                ));
            }
            if dict.contains(&word) {
                return Err(Error::malformed(0, format!("duplicate word `{}`", word)));
            }
            dict.insert(&word);
        }
        Ok(dict)
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| Error::file(path, e))?;
        let mut writer = BufWriter::new(file);
        self.to_writer(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    pub fn to_writer<W: Write>(&self, writer: &mut W) -> Result<()> {
        for (id, word) in self.iter() {
            writeln!(writer, "{} {}", word, id)?;
        }
        Ok(())
    }
}
