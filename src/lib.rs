//! Viewpoint and opinion discovery: a collapsed Gibbs sampler that assigns a
//! viewpoint to each document and a topic to each sentence, with words
//! tagged as either topical or opinion-bearing.

pub mod config;
pub mod corpus;
pub mod dictionary;
pub mod error;
pub mod estimate;
pub mod estimator;
pub mod inferencer;
pub mod sampler;
pub mod snapshot;
pub mod state;

pub use config::{Config, Hyperparameters};
pub use corpus::{Dataset, Document, Pos, Sentence};
pub use dictionary::Dictionary;
pub use error::{Error, Result};
pub use estimate::Distributions;
pub use estimator::Estimator;
pub use inferencer::{Inference, Inferencer};
pub use sampler::Sampler;
pub use snapshot::SavedModel;
pub use state::{Counts, State};
