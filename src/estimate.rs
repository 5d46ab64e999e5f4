use log::warn;
use ndarray::{Array1, Array2, Array3};
use serde::{Deserialize, Serialize};

use crate::config::Hyperparameters;
use crate::corpus::{Dataset, Pos};
use crate::sampler::{Evidence, Trained};
use crate::state::State;

/// Point estimates read off the final counts.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Distributions {
    /// Topic distribution per viewpoint, `[V][T]`.
    pub theta: Array2<f64>,
    /// Viewpoint distribution, `[V]`.
    pub pi: Array1<f64>,
    /// Topical word distribution per topic, `[T][W]`.
    pub phi0: Array2<f64>,
    /// Opinion word distribution per viewpoint and topic, `[V][T][W]`.
    pub phi1: Array3<f64>,
    pub perplexity: f64,
}

impl Distributions {
    /// Posterior means of θ, π, φ0 and φ1 under the current counts, plus
    /// perplexity of `dataset`.
    ///
    /// With `trained`, every count is the trained count plus the live one
    /// and φ is smoothed with the trained W0/W1. A word gets φ mass for a
    /// category only if it was observed under that category.
    pub fn estimate(dataset: &Dataset, state: &State, hyper: &Hyperparameters, trained: Option<Trained>) -> Distributions {
        let v = state.num_viewpoints();
        let t = state.num_topics();
        let w = dataset.vocab_size();
        let evidence = Evidence::new(state.counts(), trained, dataset);

        let theta = Array2::from_shape_fn((v, t), |(i, j)| {
            (evidence.sentences(i, j) + hyper.alpha) / (evidence.sentences_in(i) + t as f64 * hyper.alpha)
        });
        let pi = Array1::from_shape_fn(v, |i| {
            (evidence.docs(i) + hyper.eta) / (evidence.docs_total() + v as f64 * hyper.eta)
        });
        let phi0 = Array2::from_shape_fn((t, w), |(j, k)| match evidence.resolve(k) {
            Some(word) if evidence.observed(dataset, word, Pos::Topical) => {
                (evidence.topical(j, word) + hyper.beta0)
                    / (evidence.topical_in(j) + evidence.topical_vocab_size() * hyper.beta0)
            }
            _ => 0.0,
        });
        let phi1 = Array3::from_shape_fn((v, t, w), |(i, j, k)| match evidence.resolve(k) {
            Some(word) if evidence.observed(dataset, word, Pos::Opinion) => {
                (evidence.opinion(i, j, word) + hyper.beta1)
                    / (evidence.opinion_in(i, j) + evidence.opinion_vocab_size() * hyper.beta1)
            }
            _ => 0.0,
        });

        let perplexity = perplexity(dataset, &theta, &pi, &phi0, &phi1);
        Distributions {
            theta,
            pi,
            phi0,
            phi1,
            perplexity,
        }
    }
}

fn log_sum_exp(xs: &[f64]) -> f64 {
    let max = xs.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    let sum: f64 = xs.iter().map(|&x| (x - max).exp()).sum();
    max + sum.ln()
}

/// `exp(-log p(corpus) / N)`, marginalizing each document's viewpoint and
/// each sentence's topic. NaN when the dataset has no tokens.
pub fn perplexity(
    dataset: &Dataset,
    theta: &Array2<f64>,
    pi: &Array1<f64>,
    phi0: &Array2<f64>,
    phi1: &Array3<f64>,
) -> f64 {
    let tokens = dataset.num_tokens();
    if tokens == 0 {
        warn!("perplexity is undefined for a dataset without tokens");
        return f64::NAN;
    }
    let (v, t) = theta.dim();

    let mut log_likelihood = 0.0;
    let mut per_topic = vec![0.0; t];
    let mut per_viewpoint = vec![0.0; v];
    for doc in &dataset.docs {
        for (i, lp_v) in per_viewpoint.iter_mut().enumerate() {
            *lp_v = pi[i].ln();
            for sentence in &doc.sentences {
                for (j, lp_z) in per_topic.iter_mut().enumerate() {
                    *lp_z = theta[[i, j]].ln();
                    // Every token's category is observed for its word, so
                    // the φ entries read here are positive.
                    for (&k, &count) in sentence.topical_counts() {
                        *lp_z += count as f64 * phi0[[j, k]].ln();
                    }
                    for (&k, &count) in sentence.opinion_counts() {
                        *lp_z += count as f64 * phi1[[i, j, k]].ln();
                    }
                }
                *lp_v += log_sum_exp(&per_topic);
            }
        }
        log_likelihood += log_sum_exp(&per_viewpoint);
    }

    (-log_likelihood / tokens as f64).exp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::Dictionary;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn hyper() -> Hyperparameters {
        Hyperparameters {
            alpha: 0.5,
            beta0: 0.1,
            beta1: 0.2,
            eta: 1.0,
        }
    }

    #[test]
    fn distributions_are_normalized() {
        let data = Dataset::from_documents(
            &["a:0 b:1 c:0 | c:1 a:0", "b:0 b:1 | d:0", "a:1 | d:0 c:1"],
            None,
        )
        .unwrap();
        let mut rng = StdRng::seed_from_u64(4);
        let state = State::random(&data, 2, 3, &mut rng);
        let dist = Distributions::estimate(&data, &state, &hyper(), None);

        assert!((dist.pi.sum() - 1.0).abs() < 1e-12);
        for row in dist.theta.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-12);
        }
        for row in dist.phi0.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-12);
        }
        for i in 0..2 {
            for j in 0..3 {
                let s: f64 = (0..data.vocab_size()).map(|k| dist.phi1[[i, j, k]]).sum();
                assert!((s - 1.0).abs() < 1e-12);
            }
        }
        assert!(dist.perplexity.is_finite() && dist.perplexity > 1.0);
    }

    #[test]
    fn unobserved_categories_get_no_mass() {
        let data = Dataset::from_documents(&["a:0 b:1"], None).unwrap();
        let state = State::from_assignments(&data, 1, 1, vec![0], vec![vec![0]]);
        let dist = Distributions::estimate(&data, &state, &hyper(), None);
        let a = data.dict.id("a").unwrap();
        let b = data.dict.id("b").unwrap();
        assert_eq!(dist.phi0[[0, b]], 0.0);
        assert_eq!(dist.phi1[[0, 0, a]], 0.0);
        // W0 = 1: (1 + 0.1) / (1 + 1 * 0.1)
        assert!((dist.phi0[[0, a]] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn single_viewpoint_topic_perplexity_is_unigram() {
        let docs = ["a:0 a:0 b:1 | c:0 b:1", "a:0 c:1 | c:1 c:0 a:0", "b:1"];
        let data = Dataset::from_documents(&docs, None).unwrap();
        let state = State::from_assignments(&data, 1, 1, vec![0, 0, 0], vec![vec![0, 0], vec![0, 0], vec![0]]);
        let h = hyper();
        let dist = Distributions::estimate(&data, &state, &h, None);

        // Closed form: each token scored by its smoothed corpus frequency
        // within its category.
        let mut topical = std::collections::HashMap::new();
        let mut opinion = std::collections::HashMap::new();
        for doc in &docs {
            for token in doc.split_whitespace().filter(|t| *t != "|") {
                let (word, pos) = token.split_once(':').unwrap();
                let table = if pos == "0" { &mut topical } else { &mut opinion };
                *table.entry(word).or_insert(0usize) += 1;
            }
        }
        let n0: usize = topical.values().sum();
        let n1: usize = opinion.values().sum();
        let w0 = topical.len() as f64;
        let w1 = opinion.len() as f64;
        let mut log_likelihood = 0.0;
        for (_, &c) in &topical {
            let p = (c as f64 + h.beta0) / (n0 as f64 + w0 * h.beta0);
            log_likelihood += c as f64 * p.ln();
        }
        for (_, &c) in &opinion {
            let p = (c as f64 + h.beta1) / (n1 as f64 + w1 * h.beta1);
            log_likelihood += c as f64 * p.ln();
        }
        let expected = (-log_likelihood / (n0 + n1) as f64).exp();

        assert!((dist.perplexity - expected).abs() < 1e-9, "{} vs {}", dist.perplexity, expected);
        assert!((dist.theta[[0, 0]] - 1.0).abs() < 1e-12);
        assert!((dist.pi[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn empty_dataset_has_undefined_perplexity() {
        let mut global = Dictionary::new();
        global.insert("known");
        let data = Dataset::from_documents(&["unknown:0 other:1"], Some(&global)).unwrap();
        let state = State::from_assignments(&data, 2, 2, vec![0], vec![vec![1]]);
        let dist = Distributions::estimate(&data, &state, &hyper(), None);
        assert!(dist.perplexity.is_nan());
        assert_eq!(dist.phi0.dim(), (2, 0));
    }

    #[test]
    fn inference_estimates_combine_trained_counts() {
        let train = Dataset::from_documents(&["x:0 y:1 | x:0", "y:0 x:1"], None).unwrap();
        let trained_state = State::from_assignments(&train, 2, 2, vec![0, 1], vec![vec![0, 0], vec![1]]);
        // Only x:0 survives, as local id 0.
        let data = Dataset::from_documents(&["x:0 z:1"], Some(&train.dict)).unwrap();
        let state = State::from_assignments(&data, 2, 2, vec![0], vec![vec![0]]);
        let trained = Trained {
            counts: trained_state.counts(),
            corpus: &train,
            ids: data.id_map().unwrap(),
        };
        let h = hyper();
        let dist = Distributions::estimate(&data, &state, &h, Some(trained));

        // Viewpoint 0 holds 2 trained + 1 new sentences, all topic 0.
        let expected = (3.0 + h.alpha) / (3.0 + 2.0 * h.alpha);
        assert!((dist.theta[[0, 0]] - expected).abs() < 1e-12);
        // pi[0] = (1 + 1 + eta) / (2 + 1 + 2 eta)
        assert!((dist.pi[0] - 3.0 / 5.0).abs() < 1e-12);
        // Topic 0: two trained x plus one new; training W0 = 2 (x, y).
        let expected = (3.0 + h.beta0) / (3.0 + 2.0 * h.beta0);
        assert!((dist.phi0[[0, 0]] - expected).abs() < 1e-12);
        // x was an opinion word in training, so it keeps φ1 mass here.
        assert!(dist.phi1[[1, 1, 0]] > 0.0);
        assert_eq!(dist.phi1.dim(), (2, 2, 1));
    }
}
