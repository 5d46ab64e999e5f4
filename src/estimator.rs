use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::{Config, Hyperparameters};
use crate::corpus::Dataset;
use crate::error::Result;
use crate::estimate::Distributions;
use crate::sampler::Sampler;
use crate::snapshot::{self, WORDMAP_SUFFIX};
use crate::state::State;

pub(crate) fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Trains a model on a corpus, running `chains` independent chains one
/// after another.
pub struct Estimator {
    config: Config,
    dataset: Dataset,
    state: State,
    sampler: Sampler<StdRng>,
}

impl Estimator {
    /// Reads `config.dfile` from `config.dir` and draws random initial
    /// assignments.
    pub fn new(config: Config) -> Result<Estimator> {
        config.validate()?;
        let dataset = Dataset::read(config.corpus_path(), None)?;
        Estimator::with_dataset(config, dataset)
    }

    pub fn with_dataset(config: Config, dataset: Dataset) -> Result<Estimator> {
        config.validate()?;
        let hyper = config.hyperparameters();
        info!(
            "corpus: D={} sentences={} tokens={} W={} W0={} W1={}",
            dataset.len(),
            dataset.num_sentences(),
            dataset.num_tokens(),
            dataset.vocab_size(),
            dataset.topical_vocab_size(),
            dataset.opinion_vocab_size()
        );
        info!(
            "T={} V={} alpha={} beta0={} beta1={} eta={}",
            config.topics, config.viewpoints, hyper.alpha, hyper.beta0, hyper.beta1, hyper.eta
        );

        let mut sampler = Sampler::new(hyper, seeded_rng(config.seed));
        let state = State::random(&dataset, config.viewpoints, config.topics, sampler.rng());
        Ok(Estimator {
            config,
            dataset,
            state,
            sampler,
        })
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn hyperparameters(&self) -> &Hyperparameters {
        self.sampler.hyperparameters()
    }

    /// One Gibbs sweep: every sentence topic of a document, then its
    /// viewpoint, document by document.
    pub fn sweep(&mut self) -> Result<()> {
        for d in 0..self.dataset.len() {
            for m in 0..self.dataset.docs[d].len() {
                self.sampler.sample_topic(&self.dataset, &mut self.state, d, m)?;
            }
            self.sampler.sample_viewpoint(&self.dataset, &mut self.state, d)?;
        }
        Ok(())
    }

    pub fn distributions(&self) -> Distributions {
        Distributions::estimate(&self.dataset, &self.state, self.sampler.hyperparameters(), None)
    }

    fn save(&self, name: &str, dist: &Distributions) -> Result<()> {
        snapshot::save(
            &self.config.dir,
            name,
            &self.dataset,
            &self.state,
            self.sampler.hyperparameters(),
            dist,
            self.config.top_words,
        )
    }

    /// Runs every chain to completion, saving intermediate and final
    /// snapshots, and returns the estimates of the last chain.
    pub fn estimate(&mut self) -> Result<Distributions> {
        let chains = self.config.chains;
        let iterations = self.config.iterations;
        let save_step = self.config.save_step;
        info!("sampling {} chains of {} iterations", chains, iterations);

        let mut last = None;
        for chain in 1..=chains {
            for iter in 1..=iterations {
                debug!("chain {}, iteration {}", chain, iter);
                self.sweep()?;

                if save_step > 0 && iter % save_step == 0 && iter != iterations {
                    let dist = self.distributions();
                    info!("chain {}, iteration {}: perplexity {}", chain, iter, dist.perplexity);
                    self.save(&format!("model-{:02}-{:05}", chain, iter), &dist)?;
                }
            }

            let dist = self.distributions();
            info!("chain {} finished: perplexity {}", chain, dist.perplexity);
            let name = format!("model-{:02}-final", chain);
            self.save(&name, &dist)?;
            self.dataset
                .dict
                .write(snapshot::path_for(&self.config.dir, &name, WORDMAP_SUFFIX))?;

            if chain < chains {
                self.state = State::random(
                    &self.dataset,
                    self.config.viewpoints,
                    self.config.topics,
                    self.sampler.rng(),
                );
            }
            last = Some(dist);
        }
        info!("Gibbs sampling completed");
        Ok(last.unwrap_or_else(|| self.distributions()))
    }
}
