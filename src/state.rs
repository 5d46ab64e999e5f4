use ndarray::{Array1, Array2, Array3};
use rand::Rng;

use crate::corpus::{Dataset, Sentence};

/// Count tables summarizing the current assignments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Counts {
    docs_per_viewpoint: Array1<usize>,
    docs_total: usize,
    sentences_per_viewpoint_topic: Array2<usize>,
    sentences_per_viewpoint: Array1<usize>,
    topical_words: Array2<usize>,
    topical_words_per_topic: Array1<usize>,
    opinion_words: Array3<usize>,
    opinion_words_per_viewpoint_topic: Array2<usize>,
}

impl Counts {
    pub fn zeros(viewpoints: usize, topics: usize, vocab_size: usize) -> Counts {
        Counts {
            docs_per_viewpoint: Array1::zeros(viewpoints),
            docs_total: 0,
            sentences_per_viewpoint_topic: Array2::zeros((viewpoints, topics)),
            sentences_per_viewpoint: Array1::zeros(viewpoints),
            topical_words: Array2::zeros((topics, vocab_size)),
            topical_words_per_topic: Array1::zeros(topics),
            opinion_words: Array3::zeros((viewpoints, topics, vocab_size)),
            opinion_words_per_viewpoint_topic: Array2::zeros((viewpoints, topics)),
        }
    }

    /// Documents per viewpoint, `[V]`.
    pub fn docs_per_viewpoint(&self) -> &Array1<usize> {
        &self.docs_per_viewpoint
    }

    pub fn docs_total(&self) -> usize {
        self.docs_total
    }

    /// Sentences per viewpoint and topic, `[V][T]`.
    pub fn sentences_per_viewpoint_topic(&self) -> &Array2<usize> {
        &self.sentences_per_viewpoint_topic
    }

    /// `[V]`
    pub fn sentences_per_viewpoint(&self) -> &Array1<usize> {
        &self.sentences_per_viewpoint
    }

    /// Topical word occurrences per topic, `[T][W]`.
    pub fn topical_words(&self) -> &Array2<usize> {
        &self.topical_words
    }

    /// `[T]`
    pub fn topical_words_per_topic(&self) -> &Array1<usize> {
        &self.topical_words_per_topic
    }

    /// Opinion word occurrences per viewpoint and topic, `[V][T][W]`.
    pub fn opinion_words(&self) -> &Array3<usize> {
        &self.opinion_words
    }

    /// `[V][T]`
    pub fn opinion_words_per_viewpoint_topic(&self) -> &Array2<usize> {
        &self.opinion_words_per_viewpoint_topic
    }

    fn add_sentence(&mut self, sentence: &Sentence, viewpoint: usize, topic: usize) {
        for (&k, &count) in sentence.topical_counts() {
            self.topical_words[[topic, k]] += count;
            self.topical_words_per_topic[topic] += count;
        }
        self.add_opinions(sentence, viewpoint, topic);
    }

    fn remove_sentence(&mut self, sentence: &Sentence, viewpoint: usize, topic: usize) {
        for (&k, &count) in sentence.topical_counts() {
            self.topical_words[[topic, k]] -= count;
            self.topical_words_per_topic[topic] -= count;
        }
        self.remove_opinions(sentence, viewpoint, topic);
    }

    // Opinion words and the sentence marginals are the part of a sentence
    // that depends on the document viewpoint.
    fn add_opinions(&mut self, sentence: &Sentence, viewpoint: usize, topic: usize) {
        for (&k, &count) in sentence.opinion_counts() {
            self.opinion_words[[viewpoint, topic, k]] += count;
            self.opinion_words_per_viewpoint_topic[[viewpoint, topic]] += count;
        }
        self.sentences_per_viewpoint_topic[[viewpoint, topic]] += 1;
        self.sentences_per_viewpoint[viewpoint] += 1;
    }

    fn remove_opinions(&mut self, sentence: &Sentence, viewpoint: usize, topic: usize) {
        for (&k, &count) in sentence.opinion_counts() {
            self.opinion_words[[viewpoint, topic, k]] -= count;
            self.opinion_words_per_viewpoint_topic[[viewpoint, topic]] -= count;
        }
        self.sentences_per_viewpoint_topic[[viewpoint, topic]] -= 1;
        self.sentences_per_viewpoint[viewpoint] -= 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
    Sentence(usize, usize),
    Document(usize),
}

/// Sufficient-statistics store: assignments of every document viewpoint and
/// sentence topic, plus the counts they imply.
///
/// Counts are exact between sampling steps. A `retract_*` call removes one
/// unit's contribution and must be followed by the matching `commit_*`
/// before any other unit is touched.
#[derive(Debug, Clone)]
pub struct State {
    num_viewpoints: usize,
    num_topics: usize,
    viewpoints: Vec<usize>,
    topics: Vec<Vec<usize>>,
    counts: Counts,
    pending: Option<Unit>,
}

impl State {
    /// Assigns every document a uniform random viewpoint and every sentence
    /// a uniform random topic.
    pub fn random<R: Rng>(dataset: &Dataset, num_viewpoints: usize, num_topics: usize, rng: &mut R) -> State {
        let mut viewpoints = Vec::with_capacity(dataset.len());
        let mut topics = Vec::with_capacity(dataset.len());
        for doc in &dataset.docs {
            viewpoints.push(rng.gen_range(0..num_viewpoints));
            topics.push((0..doc.len()).map(|_| rng.gen_range(0..num_topics)).collect());
        }
        State::from_assignments(dataset, num_viewpoints, num_topics, viewpoints, topics)
    }

    /// Builds counts from given assignments, which must already be in range
    /// and shaped like `dataset`.
    pub fn from_assignments(
        dataset: &Dataset,
        num_viewpoints: usize,
        num_topics: usize,
        viewpoints: Vec<usize>,
        topics: Vec<Vec<usize>>,
    ) -> State {
        debug_assert_eq!(viewpoints.len(), dataset.len());
        let mut counts = Counts::zeros(num_viewpoints, num_topics, dataset.vocab_size());
        for (d, doc) in dataset.docs.iter().enumerate() {
            let viewpoint = viewpoints[d];
            counts.docs_per_viewpoint[viewpoint] += 1;
            counts.docs_total += 1;
            for (m, sentence) in doc.sentences.iter().enumerate() {
                counts.add_sentence(sentence, viewpoint, topics[d][m]);
            }
        }
        State {
            num_viewpoints,
            num_topics,
            viewpoints,
            topics,
            counts,
            pending: None,
        }
    }

    pub fn num_viewpoints(&self) -> usize {
        self.num_viewpoints
    }

    pub fn num_topics(&self) -> usize {
        self.num_topics
    }

    pub fn counts(&self) -> &Counts {
        &self.counts
    }

    pub fn viewpoint(&self, d: usize) -> usize {
        self.viewpoints[d]
    }

    pub fn topic(&self, d: usize, m: usize) -> usize {
        self.topics[d][m]
    }

    pub fn viewpoints(&self) -> &[usize] {
        &self.viewpoints
    }

    pub fn topics(&self) -> &[Vec<usize>] {
        &self.topics
    }

    /// Removes sentence `(d, m)` from the counts under its current topic and
    /// its document's current viewpoint.
    pub fn retract_sentence(&mut self, dataset: &Dataset, d: usize, m: usize) {
        debug_assert!(self.pending.is_none(), "retract while {:?} is pending", self.pending);
        let sentence = &dataset.docs[d].sentences[m];
        self.counts.remove_sentence(sentence, self.viewpoints[d], self.topics[d][m]);
        self.pending = Some(Unit::Sentence(d, m));
    }

    pub fn commit_sentence(&mut self, dataset: &Dataset, d: usize, m: usize, topic: usize) {
        debug_assert_eq!(self.pending, Some(Unit::Sentence(d, m)));
        let sentence = &dataset.docs[d].sentences[m];
        self.counts.add_sentence(sentence, self.viewpoints[d], topic);
        self.topics[d][m] = topic;
        self.pending = None;
    }

    /// Removes everything that depends on document `d`'s viewpoint: its
    /// document count, its sentence marginals and its opinion words.
    pub fn retract_document(&mut self, dataset: &Dataset, d: usize) {
        debug_assert!(self.pending.is_none(), "retract while {:?} is pending", self.pending);
        let viewpoint = self.viewpoints[d];
        for (m, sentence) in dataset.docs[d].sentences.iter().enumerate() {
            self.counts.remove_opinions(sentence, viewpoint, self.topics[d][m]);
        }
        self.counts.docs_per_viewpoint[viewpoint] -= 1;
        self.counts.docs_total -= 1;
        self.pending = Some(Unit::Document(d));
    }

    pub fn commit_document(&mut self, dataset: &Dataset, d: usize, viewpoint: usize) {
        debug_assert_eq!(self.pending, Some(Unit::Document(d)));
        for (m, sentence) in dataset.docs[d].sentences.iter().enumerate() {
            self.counts.add_opinions(sentence, viewpoint, self.topics[d][m]);
        }
        self.counts.docs_per_viewpoint[viewpoint] += 1;
        self.counts.docs_total += 1;
        self.viewpoints[d] = viewpoint;
        self.pending = None;
    }

    /// Counts rebuilt from scratch out of the current assignments.
    pub fn recount(&self, dataset: &Dataset) -> Counts {
        State::from_assignments(
            dataset,
            self.num_viewpoints,
            self.num_topics,
            self.viewpoints.clone(),
            self.topics.clone(),
        )
        .counts
    }
}
