use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Dirichlet smoothing for the four count families.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Hyperparameters {
    /// Viewpoint-topic prior.
    pub alpha: f64,
    /// Topic-word prior for topical words.
    pub beta0: f64,
    /// Viewpoint-topic-word prior for opinion words.
    pub beta1: f64,
    /// Document-viewpoint prior.
    pub eta: f64,
}

impl Hyperparameters {
    pub fn validate(&self) -> Result<()> {
        let named = [
            ("alpha", self.alpha),
            ("beta0", self.beta0),
            ("beta1", self.beta1),
            ("eta", self.eta),
        ];
        for (name, value) in named {
            if !(value > 0.0 && value.is_finite()) {
                return Err(Error::InvalidConfig(format!(
                    "{} must be positive and finite, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    pub dir: PathBuf,
    pub dfile: String,
    pub model_name: String,
    pub topics: usize,
    pub viewpoints: usize,
    pub alpha: Option<f64>,
    pub beta0: f64,
    pub beta1: f64,
    pub eta: f64,
    pub chains: usize,
    pub iterations: usize,
    pub save_step: usize,
    pub top_words: usize,
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            dir: PathBuf::from("."),
            dfile: "trndocs.dat".to_string(),
            model_name: "model-final".to_string(),
            topics: 100,
            viewpoints: 2,
            alpha: None,
            beta0: 0.05,
            beta1: 0.05,
            eta: 0.1,
            chains: 1,
            iterations: 1000,
            save_step: 100,
            top_words: 100,
            seed: None,
        }
    }
}

impl Config {
    /// `alpha` falls back to `50 / T` when unset or negative.
    pub fn hyperparameters(&self) -> Hyperparameters {
        let alpha = match self.alpha {
            Some(a) if a >= 0.0 => a,
            _ => 50.0 / self.topics as f64,
        };
        Hyperparameters {
            alpha,
            beta0: self.beta0,
            beta1: self.beta1,
            eta: self.eta,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.topics == 0 {
            return Err(Error::InvalidConfig("number of topics must be at least 1".into()));
        }
        if self.viewpoints == 0 {
            return Err(Error::InvalidConfig("number of viewpoints must be at least 1".into()));
        }
        if self.chains == 0 {
            return Err(Error::InvalidConfig("number of chains must be at least 1".into()));
        }
        self.hyperparameters().validate()
    }

    pub fn corpus_path(&self) -> PathBuf {
        self.dir.join(&self.dfile)
    }
}
