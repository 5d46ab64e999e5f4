use log::{debug, info};
use rand::rngs::StdRng;

use crate::config::Config;
use crate::corpus::Dataset;
use crate::error::{Error, Result};
use crate::estimate::Distributions;
use crate::estimator::seeded_rng;
use crate::sampler::{Sampler, Trained};
use crate::snapshot::{self, SavedModel, WORDMAP_SUFFIX};
use crate::state::State;

/// Sampled assignments and estimates for a set of new documents.
#[derive(Debug, Clone)]
pub struct Inference {
    pub dataset: Dataset,
    pub state: State,
    pub distributions: Distributions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SweepOrder {
    ViewpointFirst,
    TopicsFirst,
}

/// Samples viewpoints and topics of new documents against a frozen trained
/// model.
pub struct Inferencer {
    config: Config,
    model: SavedModel,
    sampler: Sampler<StdRng>,
}

impl Inferencer {
    /// Loads the model `config.model_name` from `config.dir`. Its
    /// hyperparameters and dimensions override those of `config`.
    pub fn new(config: Config) -> Result<Inferencer> {
        let model = SavedModel::load(&config.dir, &config.model_name)?;
        Inferencer::with_model(config, model)
    }

    pub fn with_model(config: Config, model: SavedModel) -> Result<Inferencer> {
        model.others.hyper.validate()?;
        if model.others.topics == 0 || model.others.viewpoints == 0 {
            return Err(Error::InvalidConfig(format!(
                "trained model has T={} and V={}",
                model.others.topics, model.others.viewpoints
            )));
        }
        let sampler = Sampler::new(model.others.hyper, seeded_rng(config.seed));
        Ok(Inferencer {
            config,
            model,
            sampler,
        })
    }

    pub fn model(&self) -> &SavedModel {
        &self.model
    }

    /// Infers the corpus `config.dfile` and writes the
    /// `<model>-inference` snapshot with its word map.
    pub fn infer(&mut self) -> Result<Inference> {
        let dataset = Dataset::read(self.config.corpus_path(), Some(&self.model.dataset.dict))?;
        let inference = self.run(dataset, SweepOrder::ViewpointFirst)?;

        let name = format!("{}-inference", self.config.model_name);
        snapshot::save(
            &self.config.dir,
            &name,
            &inference.dataset,
            &inference.state,
            &self.model.others.hyper,
            &inference.distributions,
            self.config.top_words,
        )?;
        inference
            .dataset
            .dict
            .write(snapshot::path_for(&self.config.dir, &name, WORDMAP_SUFFIX))?;
        Ok(inference)
    }

    /// Infers documents given in corpus line syntax, without touching the
    /// filesystem.
    pub fn infer_documents(&mut self, docs: &[&str]) -> Result<Inference> {
        let dataset = Dataset::from_documents(docs, Some(&self.model.dataset.dict))?;
        self.run(dataset, SweepOrder::TopicsFirst)
    }

    fn run(&mut self, dataset: Dataset, order: SweepOrder) -> Result<Inference> {
        let ids = dataset
            .id_map()
            .ok_or_else(|| Error::InvalidConfig("new documents were not read against the trained word map".into()))?;
        let trained = Trained {
            counts: self.model.state.counts(),
            corpus: &self.model.dataset,
            ids,
        };
        info!(
            "inference: D={} tokens={} W={} (of {} trained)",
            dataset.len(),
            dataset.num_tokens(),
            dataset.vocab_size(),
            self.model.dataset.vocab_size()
        );

        let mut state = State::random(
            &dataset,
            self.model.others.viewpoints,
            self.model.others.topics,
            self.sampler.rng(),
        );
        for iter in 1..=self.config.iterations {
            debug!("inference iteration {}", iter);
            for d in 0..dataset.len() {
                if order == SweepOrder::ViewpointFirst {
                    self.sampler.infer_viewpoint(&dataset, &mut state, trained, d)?;
                }
                for m in 0..dataset.docs[d].len() {
                    self.sampler.infer_topic(&dataset, &mut state, trained, d, m)?;
                }
                if order == SweepOrder::TopicsFirst {
                    self.sampler.infer_viewpoint(&dataset, &mut state, trained, d)?;
                }
            }
        }

        let distributions = Distributions::estimate(&dataset, &state, &self.model.others.hyper, Some(trained));
        info!("inference completed: perplexity {}", distributions.perplexity);
        Ok(Inference {
            dataset,
            state,
            distributions,
        })
    }
}
