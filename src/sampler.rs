use std::collections::BTreeMap;

use rand::distributions::Distribution;
use rand::Rng;

use crate::config::Hyperparameters;
use crate::corpus::{Bag, Dataset, IdMap, Pos, Sentence};
use crate::error::{Error, Result};
use crate::state::{Counts, State};

/// Categorical distribution over `0..n` given unnormalized log weights.
///
/// Weights are shifted by their maximum before exponentiation and kept as a
/// running sum, so a draw is a single scaled uniform and a scan.
#[derive(Debug, Clone)]
pub struct Categorical {
    cumulative: Vec<f64>,
}

impl Categorical {
    pub fn from_log_weights(log_weights: &[f64]) -> Categorical {
        let max = log_weights.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let mut sum = 0.0;
        let cumulative = log_weights
            .iter()
            .map(|&lw| {
                sum += (lw - max).exp();
                sum
            })
            .collect();
        Categorical { cumulative }
    }

    pub fn cumulative(&self) -> &[f64] {
        &self.cumulative
    }

    pub fn total(&self) -> f64 {
        self.cumulative.last().cloned().unwrap_or(0.0)
    }

    /// False when the weights carry no usable mass (empty, all underflowed,
    /// or non-finite).
    pub fn is_proper(&self) -> bool {
        let total = self.total();
        total > 0.0 && total.is_finite()
    }

    /// Smallest index whose cumulative weight exceeds `u`.
    pub fn select(&self, u: f64) -> usize {
        self.cumulative
            .iter()
            .position(|&c| c > u)
            .unwrap_or_else(|| self.cumulative.len().saturating_sub(1))
    }
}

impl Distribution<usize> for Categorical {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        let u = rng.gen::<f64>() * self.total();
        self.select(u)
    }
}

/// A trained model held fixed while new documents are sampled against it.
#[derive(Debug, Clone, Copy)]
pub struct Trained<'a> {
    pub counts: &'a Counts,
    /// The training corpus; supplies W0, W1 and word presence.
    pub corpus: &'a Dataset,
    pub ids: &'a IdMap,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Word {
    pub(crate) local: usize,
    pub(crate) global: usize,
}

/// Read-only view of the counts a conditional is computed from: the live
/// counts, plus the trained ones during inference.
pub(crate) struct Evidence<'a> {
    live: &'a Counts,
    trained: Option<Trained<'a>>,
    topical_vocab_size: f64,
    opinion_vocab_size: f64,
}

impl<'a> Evidence<'a> {
    pub(crate) fn new(live: &'a Counts, trained: Option<Trained<'a>>, dataset: &Dataset) -> Evidence<'a> {
        let vocab = trained.map_or(dataset, |t| t.corpus);
        let (w0, w1) = (vocab.topical_vocab_size(), vocab.opinion_vocab_size());
        Evidence {
            live,
            trained,
            topical_vocab_size: w0 as f64,
            opinion_vocab_size: w1 as f64,
        }
    }

    pub(crate) fn topical_vocab_size(&self) -> f64 {
        self.topical_vocab_size
    }

    pub(crate) fn opinion_vocab_size(&self) -> f64 {
        self.opinion_vocab_size
    }

    pub(crate) fn resolve(&self, local: usize) -> Option<Word> {
        match self.trained {
            Some(t) => t.ids.global(local).map(|global| Word { local, global }),
            None => Some(Word { local, global: local }),
        }
    }

    /// Whether `w` was seen as `pos` locally or, during inference, in the
    /// training corpus.
    pub(crate) fn observed(&self, dataset: &Dataset, w: Word, pos: Pos) -> bool {
        dataset.presence(w.local).has(pos) || self.trained.map_or(false, |t| t.corpus.presence(w.global).has(pos))
    }

    fn frozen<F: Fn(&Counts) -> usize>(&self, f: F) -> f64 {
        self.trained.map_or(0.0, |t| f(t.counts) as f64)
    }

    pub(crate) fn docs(&self, i: usize) -> f64 {
        self.live.docs_per_viewpoint()[i] as f64 + self.frozen(|c| c.docs_per_viewpoint()[i])
    }

    pub(crate) fn docs_total(&self) -> f64 {
        self.live.docs_total() as f64 + self.frozen(|c| c.docs_total())
    }

    pub(crate) fn sentences(&self, i: usize, j: usize) -> f64 {
        self.live.sentences_per_viewpoint_topic()[[i, j]] as f64
            + self.frozen(|c| c.sentences_per_viewpoint_topic()[[i, j]])
    }

    pub(crate) fn sentences_in(&self, i: usize) -> f64 {
        self.live.sentences_per_viewpoint()[i] as f64 + self.frozen(|c| c.sentences_per_viewpoint()[i])
    }

    pub(crate) fn topical(&self, j: usize, w: Word) -> f64 {
        self.live.topical_words()[[j, w.local]] as f64 + self.frozen(|c| c.topical_words()[[j, w.global]])
    }

    pub(crate) fn topical_in(&self, j: usize) -> f64 {
        self.live.topical_words_per_topic()[j] as f64 + self.frozen(|c| c.topical_words_per_topic()[j])
    }

    pub(crate) fn opinion(&self, i: usize, j: usize, w: Word) -> f64 {
        self.live.opinion_words()[[i, j, w.local]] as f64
            + self.frozen(|c| c.opinion_words()[[i, j, w.global]])
    }

    pub(crate) fn opinion_in(&self, i: usize, j: usize) -> f64 {
        self.live.opinion_words_per_viewpoint_topic()[[i, j]] as f64
            + self.frozen(|c| c.opinion_words_per_viewpoint_topic()[[i, j]])
    }

    /// Log-probability of drawing every word of `bag` in turn from a
    /// Dirichlet-multinomial urn whose counts are given by `count`/`total`.
    fn urn<F>(&self, bag: &Bag, prior: f64, vocab_size: f64, total: f64, count: F) -> f64
    where
        F: Fn(Word) -> f64,
    {
        let denominator = vocab_size * prior + total;
        let mut log_p = 0.0;
        let mut drawn = 0.0;
        for (&k, &occurrences) in bag {
            let w = match self.resolve(k) {
                Some(w) => w,
                None => continue,
            };
            let n = count(w);
            for t in 0..occurrences {
                log_p += (prior + n + t as f64).ln() - (denominator + drawn).ln();
                drawn += 1.0;
            }
        }
        log_p
    }

    fn topic_log_weight(&self, hyper: &Hyperparameters, sentence: &Sentence, v: usize, j: usize, num_topics: usize) -> f64 {
        let mut log_p = (hyper.alpha + self.sentences(v, j)).ln()
            - (num_topics as f64 * hyper.alpha + self.sentences_in(v)).ln();
        log_p += self.urn(
            sentence.topical_counts(),
            hyper.beta0,
            self.topical_vocab_size,
            self.topical_in(j),
            |w| self.topical(j, w),
        );
        log_p += self.urn(
            sentence.opinion_counts(),
            hyper.beta1,
            self.opinion_vocab_size,
            self.opinion_in(v, j),
            |w| self.opinion(v, j, w),
        );
        log_p
    }

    fn viewpoint_log_weight(
        &self,
        hyper: &Hyperparameters,
        summary: &DocumentSummary,
        i: usize,
        num_viewpoints: usize,
        num_topics: usize,
    ) -> f64 {
        let mut log_p = (hyper.eta + self.docs(i)).ln()
            - (num_viewpoints as f64 * hyper.eta + self.docs_total()).ln();

        let denominator = num_topics as f64 * hyper.alpha + self.sentences_in(i);
        let mut drawn = 0.0;
        for (&j, &sentences) in &summary.sentences_per_topic {
            let n = self.sentences(i, j);
            for t in 0..sentences {
                log_p += (hyper.alpha + n + t as f64).ln() - (denominator + drawn).ln();
                drawn += 1.0;
            }
        }

        for (&j, bag) in &summary.opinions_per_topic {
            log_p += self.urn(
                bag,
                hyper.beta1,
                self.opinion_vocab_size,
                self.opinion_in(i, j),
                |w| self.opinion(i, j, w),
            );
        }
        log_p
    }
}

/// Per-topic sentence counts and opinion words of one document.
#[derive(Debug, Default)]
struct DocumentSummary {
    sentences_per_topic: BTreeMap<usize, usize>,
    opinions_per_topic: BTreeMap<usize, Bag>,
}

impl DocumentSummary {
    fn new(dataset: &Dataset, state: &State, d: usize) -> DocumentSummary {
        let mut summary = DocumentSummary::default();
        for (m, sentence) in dataset.docs[d].sentences.iter().enumerate() {
            let topic = state.topic(d, m);
            *summary.sentences_per_topic.entry(topic).or_insert(0) += 1;
            let bag = summary.opinions_per_topic.entry(topic).or_insert_with(Bag::new);
            for (&k, &count) in sentence.opinion_counts() {
                *bag.entry(k).or_insert(0) += count;
            }
        }
        summary
    }
}

/// Collapsed Gibbs updates for sentence topics and document viewpoints.
pub struct Sampler<R> {
    hyper: Hyperparameters,
    rng: R,
}

impl<R: Rng> Sampler<R> {
    pub fn new(hyper: Hyperparameters, rng: R) -> Sampler<R> {
        Sampler { hyper, rng }
    }

    pub fn hyperparameters(&self) -> &Hyperparameters {
        &self.hyper
    }

    pub fn rng(&mut self) -> &mut R {
        &mut self.rng
    }

    /// Resamples the topic of sentence `(d, m)` from its full conditional.
    pub fn sample_topic(&mut self, dataset: &Dataset, state: &mut State, d: usize, m: usize) -> Result<usize> {
        self.topic_step(dataset, state, None, d, m)
    }

    /// Resamples the viewpoint of document `d` from its full conditional.
    pub fn sample_viewpoint(&mut self, dataset: &Dataset, state: &mut State, d: usize) -> Result<usize> {
        self.viewpoint_step(dataset, state, None, d)
    }

    /// Topic update for a new document; conditionals add the trained counts
    /// to the new-document counts, and only the latter change.
    pub fn infer_topic(
        &mut self,
        dataset: &Dataset,
        state: &mut State,
        trained: Trained,
        d: usize,
        m: usize,
    ) -> Result<usize> {
        self.topic_step(dataset, state, Some(trained), d, m)
    }

    pub fn infer_viewpoint(&mut self, dataset: &Dataset, state: &mut State, trained: Trained, d: usize) -> Result<usize> {
        self.viewpoint_step(dataset, state, Some(trained), d)
    }

    fn topic_step(
        &mut self,
        dataset: &Dataset,
        state: &mut State,
        trained: Option<Trained>,
        d: usize,
        m: usize,
    ) -> Result<usize> {
        let previous = state.topic(d, m);
        state.retract_sentence(dataset, d, m);

        let dist = {
            let evidence = Evidence::new(state.counts(), trained, dataset);
            let sentence = &dataset.docs[d].sentences[m];
            let v = state.viewpoint(d);
            let t = state.num_topics();
            let log_weights: Vec<f64> = (0..t)
                .map(|j| evidence.topic_log_weight(&self.hyper, sentence, v, j, t))
                .collect();
            Categorical::from_log_weights(&log_weights)
        };

        if !dist.is_proper() {
            state.commit_sentence(dataset, d, m, previous);
            return Err(Error::Degenerate {
                unit: "sentence topic",
                total: dist.total(),
            });
        }
        let topic = dist.sample(&mut self.rng);
        state.commit_sentence(dataset, d, m, topic);
        Ok(topic)
    }

    fn viewpoint_step(&mut self, dataset: &Dataset, state: &mut State, trained: Option<Trained>, d: usize) -> Result<usize> {
        let previous = state.viewpoint(d);
        state.retract_document(dataset, d);

        let dist = {
            let evidence = Evidence::new(state.counts(), trained, dataset);
            let summary = DocumentSummary::new(dataset, state, d);
            let v = state.num_viewpoints();
            let t = state.num_topics();
            let log_weights: Vec<f64> = (0..v)
                .map(|i| evidence.viewpoint_log_weight(&self.hyper, &summary, i, v, t))
                .collect();
            Categorical::from_log_weights(&log_weights)
        };

        if !dist.is_proper() {
            state.commit_document(dataset, d, previous);
            return Err(Error::Degenerate {
                unit: "document viewpoint",
                total: dist.total(),
            });
        }
        let viewpoint = dist.sample(&mut self.rng);
        state.commit_document(dataset, d, viewpoint);
        Ok(viewpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::Dictionary;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn unit_hyper() -> Hyperparameters {
        Hyperparameters {
            alpha: 1.0,
            beta0: 1.0,
            beta1: 1.0,
            eta: 1.0,
        }
    }

    #[test]
    fn cumulative_weights_are_monotone_and_sum_to_total() {
        let log_weights = [-3.0, 0.5, -700.0, 2.0, 1.0];
        let dist = Categorical::from_log_weights(&log_weights);
        let cumulative = dist.cumulative();
        assert!(cumulative.windows(2).all(|w| w[0] <= w[1]));
        let expected: f64 = log_weights.iter().map(|&lw| (lw - 2.0).exp()).sum();
        assert!((dist.total() - expected).abs() < 1e-12);
        assert!(dist.is_proper());
        // Index 3 holds the maximum, so its own mass is exactly 1.
        assert!((cumulative[3] - cumulative[2] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn select_picks_first_bucket_above_u() {
        let dist = Categorical::from_log_weights(&[0.0, 0.0, 0.0]);
        assert_eq!(dist.select(0.0), 0);
        assert_eq!(dist.select(0.999), 0);
        assert_eq!(dist.select(1.0), 1);
        assert_eq!(dist.select(2.5), 2);
        assert_eq!(dist.select(3.0), 2);
    }

    #[test]
    fn huge_log_weights_do_not_overflow() {
        let dist = Categorical::from_log_weights(&[1e6, 1e6 - 1.0]);
        assert!(dist.is_proper());
        assert!((dist.total() - (1.0 + (-1.0f64).exp())).abs() < 1e-12);
    }

    #[test]
    fn degenerate_weights_are_rejected() {
        assert!(!Categorical::from_log_weights(&[f64::NEG_INFINITY, f64::NEG_INFINITY]).is_proper());
        assert!(!Categorical::from_log_weights(&[0.0, f64::NAN]).is_proper());
        assert!(!Categorical::from_log_weights(&[]).is_proper());
    }

    #[test]
    fn draws_follow_weights() {
        let dist = Categorical::from_log_weights(&[(1.0f64).ln(), (3.0f64).ln()]);
        let mut rng = StdRng::seed_from_u64(11);
        let n = 20_000;
        let ones = (0..n).filter(|_| dist.sample(&mut rng) == 1).count();
        let freq = ones as f64 / n as f64;
        assert!((freq - 0.75).abs() < 0.02, "frequency {}", freq);
    }

    #[test]
    fn topic_weight_accounts_for_repeated_words() {
        // One sentence `a a`, T = 1: the only sampled topic sees both a's
        // drawn one after the other.
        let data = Dataset::from_documents(&["a:0 a:0", "a:0 b:0"], None).unwrap();
        let state = State::from_assignments(&data, 1, 2, vec![0, 0], vec![vec![0], vec![1]]);
        let mut retracted = state.clone();
        retracted.retract_sentence(&data, 0, 0);
        let hyper = unit_hyper();
        let evidence = Evidence::new(retracted.counts(), None, &data);
        let sentence = &data.docs[0].sentences[0];

        // Topic 1 holds {a: 1, b: 1}; W0 = 2, so
        // p = (1+1)/(2+1) * (1+1)/(2+2) * (1+2)/(2+3) and the viewpoint-topic
        // term is (1+1)/(2+1).
        let expected = (2.0f64 / 3.0).ln() + (2.0f64 / 4.0).ln() + (3.0f64 / 5.0).ln();
        let got = evidence.topic_log_weight(&hyper, sentence, 0, 1, 2);
        assert!((got - expected).abs() < 1e-12, "{} vs {}", got, expected);
    }

    #[test]
    fn single_topic_and_viewpoint_always_sample_zero() {
        let data = Dataset::from_documents(&["a:0 b:1 | c:1", "b:0"], None).unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        let mut state = State::random(&data, 1, 1, &mut rng);
        let mut sampler = Sampler::new(unit_hyper(), rng);
        for _ in 0..5 {
            assert_eq!(sampler.sample_topic(&data, &mut state, 0, 1).unwrap(), 0);
            assert_eq!(sampler.sample_viewpoint(&data, &mut state, 1).unwrap(), 0);
        }
        assert_eq!(state.counts(), &state.recount(&data));
    }

    #[test]
    fn training_sweeps_keep_counts_exact() {
        let data = Dataset::from_documents(
            &[
                "tax:0 cut:0 unfair:1 | jobs:0 good:1 good:1",
                "tax:0 good:1 | cut:0 cut:0 | unfair:1",
                "jobs:0 jobs:1 | tax:1",
            ],
            None,
        )
        .unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        let mut state = State::random(&data, 2, 3, &mut rng);
        let mut sampler = Sampler::new(unit_hyper(), rng);
        for _ in 0..20 {
            for d in 0..data.len() {
                for m in 0..data.docs[d].len() {
                    let topic = sampler.sample_topic(&data, &mut state, d, m).unwrap();
                    assert!(topic < 3);
                    assert_eq!(state.topic(d, m), topic);
                }
                let viewpoint = sampler.sample_viewpoint(&data, &mut state, d).unwrap();
                assert!(viewpoint < 2);
            }
            assert_eq!(state.counts(), &state.recount(&data));
        }
    }

    #[test]
    fn same_seed_gives_same_chain() {
        let data = Dataset::from_documents(&["a:0 b:1 | c:0", "a:1 c:0 | b:0 b:1"], None).unwrap();
        let run = |seed: u64| {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut state = State::random(&data, 2, 3, &mut rng);
            let mut sampler = Sampler::new(unit_hyper(), rng);
            for _ in 0..10 {
                for d in 0..data.len() {
                    for m in 0..data.docs[d].len() {
                        sampler.sample_topic(&data, &mut state, d, m).unwrap();
                    }
                    sampler.sample_viewpoint(&data, &mut state, d).unwrap();
                }
            }
            (state.viewpoints().to_vec(), state.topics().to_vec())
        };
        assert_eq!(run(9), run(9));
    }

    #[test]
    fn two_document_viewpoint_scenario() {
        // Vocabulary {a: 0, b: 1}, a topical and b opinion.
        let data = Dataset::from_documents(&["a:0 b:1", "a:0 b:1"], None).unwrap();
        assert_eq!(data.dict.id("a"), Some(0));
        assert_eq!(data.dict.id("b"), Some(1));
        let mut state = State::from_assignments(&data, 2, 2, vec![0, 1], vec![vec![0], vec![1]]);
        let mut sampler = Sampler::new(unit_hyper(), StdRng::seed_from_u64(2016));

        let v = sampler.sample_viewpoint(&data, &mut state, 0).unwrap();
        let counts = state.counts();

        // Topics and topical words never move with a viewpoint update.
        assert_eq!(state.topics(), &[vec![0], vec![1]]);
        assert_eq!(counts.topical_words()[[0, 0]], 1);
        assert_eq!(counts.topical_words()[[1, 0]], 1);
        assert_eq!(counts.topical_words_per_topic().to_vec(), vec![1, 1]);
        assert_eq!(counts.docs_total(), 2);

        if v == 0 {
            assert_eq!(counts.docs_per_viewpoint().to_vec(), vec![1, 1]);
            assert_eq!(counts.sentences_per_viewpoint().to_vec(), vec![1, 1]);
            assert_eq!(counts.sentences_per_viewpoint_topic()[[0, 0]], 1);
            assert_eq!(counts.sentences_per_viewpoint_topic()[[1, 1]], 1);
            assert_eq!(counts.opinion_words()[[0, 0, 1]], 1);
            assert_eq!(counts.opinion_words()[[1, 1, 1]], 1);
            assert_eq!(counts.opinion_words_per_viewpoint_topic()[[0, 0]], 1);
        } else {
            assert_eq!(v, 1);
            assert_eq!(counts.docs_per_viewpoint().to_vec(), vec![0, 2]);
            assert_eq!(counts.sentences_per_viewpoint().to_vec(), vec![0, 2]);
            assert_eq!(counts.sentences_per_viewpoint_topic()[[1, 0]], 1);
            assert_eq!(counts.sentences_per_viewpoint_topic()[[1, 1]], 1);
            assert_eq!(counts.sentences_per_viewpoint_topic().row(0).sum(), 0);
            assert_eq!(counts.opinion_words()[[1, 0, 1]], 1);
            assert_eq!(counts.opinion_words()[[1, 1, 1]], 1);
            assert_eq!(counts.opinion_words_per_viewpoint_topic().row(0).sum(), 0);
        }
        assert_eq!(counts, &state.recount(&data));
    }

    #[test]
    fn scenario_viewpoint_posterior_matches_hand_computation() {
        // Document 0 retracted: viewpoint 1 holds document 1 (topic 1, b).
        // p(v=0) ∝ (1+0)/(2+1) * (1+0)/(2+0) * (1+0)/(1+0)
        // p(v=1) ∝ (1+1)/(2+1) * (1+0)/(2+1) * (1+0)/(1+0)
        let data = Dataset::from_documents(&["a:0 b:1", "a:0 b:1"], None).unwrap();
        let mut state = State::from_assignments(&data, 2, 2, vec![0, 1], vec![vec![0], vec![1]]);
        state.retract_document(&data, 0);
        let summary = DocumentSummary::new(&data, &state, 0);
        let evidence = Evidence::new(state.counts(), None, &data);
        let hyper = unit_hyper();
        let p0 = evidence.viewpoint_log_weight(&hyper, &summary, 0, 2, 2).exp();
        let p1 = evidence.viewpoint_log_weight(&hyper, &summary, 1, 2, 2).exp();
        assert!((p0 - 1.0 / 6.0).abs() < 1e-12);
        assert!((p1 - 2.0 / 9.0).abs() < 1e-12);
    }

    #[test]
    fn inference_ignores_words_outside_trained_vocabulary() {
        let train = Dataset::from_documents(&["x:0 y:1", "y:0 x:1"], None).unwrap();
        let trained_state = State::from_assignments(&train, 2, 2, vec![0, 1], vec![vec![0], vec![1]]);

        // None of these words exist in the trained vocabulary.
        let data = Dataset::from_documents(&["p:0 q:1 | r:1"], Some(&train.dict)).unwrap();
        assert_eq!(data.vocab_size(), 0);
        let ids = data.id_map().unwrap().clone();
        let trained = Trained {
            counts: trained_state.counts(),
            corpus: &train,
            ids: &ids,
        };

        let mut rng = StdRng::seed_from_u64(1);
        let mut state = State::random(&data, 2, 2, &mut rng);
        state.retract_sentence(&data, 0, 0);
        let evidence = Evidence::new(state.counts(), Some(trained), &data);
        let hyper = unit_hyper();
        let v = state.viewpoint(0);
        for j in 0..2 {
            // Only the viewpoint-topic prior remains.
            let prior = (1.0 + evidence.sentences(v, j)).ln() - (2.0 + evidence.sentences_in(v)).ln();
            let got = evidence.topic_log_weight(&hyper, &data.docs[0].sentences[0], v, j, 2);
            assert!((got - prior).abs() < 1e-12);
        }
        let topic = state.topic(0, 0);
        state.commit_sentence(&data, 0, 0, topic);

        let mut sampler = Sampler::new(hyper, rng);
        for _ in 0..10 {
            sampler.infer_viewpoint(&data, &mut state, trained, 0).unwrap();
            sampler.infer_topic(&data, &mut state, trained, 0, 1).unwrap();
        }
        assert_eq!(state.counts(), &state.recount(&data));
    }

    #[test]
    fn inference_adds_trained_counts_through_id_map() {
        let mut global = Dictionary::new();
        let train = Dataset::from_documents(&["x:0 y:1 | x:0", "y:0 x:1"], None).unwrap();
        for (_, w) in train.dict.iter() {
            global.insert(w);
        }
        let trained_state = State::from_assignments(&train, 2, 2, vec![0, 1], vec![vec![0, 0], vec![1]]);
        let trained_before = trained_state.counts().clone();

        // Local ids are swapped relative to the trained ones: y -> 0, x -> 1.
        let data = Dataset::from_documents(&["y:1 x:0"], Some(&global)).unwrap();
        let ids = data.id_map().unwrap().clone();
        assert_eq!(ids.global(0), train.dict.id("y"));
        assert_eq!(ids.global(1), train.dict.id("x"));

        let trained = Trained {
            counts: trained_state.counts(),
            corpus: &train,
            ids: &ids,
        };
        let mut state = State::from_assignments(&data, 2, 2, vec![0], vec![vec![1]]);
        state.retract_sentence(&data, 0, 0);
        let evidence = Evidence::new(state.counts(), Some(trained), &data);
        let x = Word { local: 1, global: 0 };
        // Trained topic 0 holds two topical x.
        assert_eq!(evidence.topical(0, x), 2.0);
        assert_eq!(evidence.topical_in(0), 2.0);
        assert_eq!(evidence.sentences(0, 0), 2.0);
        drop(evidence);
        state.commit_sentence(&data, 0, 0, 1);

        let mut sampler = Sampler::new(unit_hyper(), StdRng::seed_from_u64(8));
        for _ in 0..10 {
            sampler.infer_topic(&data, &mut state, trained, 0, 0).unwrap();
            sampler.infer_viewpoint(&data, &mut state, trained, 0).unwrap();
        }
        assert_eq!(trained_state.counts(), &trained_before);
        assert_eq!(state.counts(), &state.recount(&data));
    }
}
