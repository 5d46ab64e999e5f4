use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgGroup, ArgMatches, Command};
use log::info;
use serde::Serialize;

use vodum::{Config, Distributions, Estimator, Hyperparameters, Inferencer};

#[derive(Serialize, Debug)]
struct Summary<'a> {
    config: &'a Config,
    hyperparameters: Hyperparameters,
    distributions: &'a Distributions,
}

fn command() -> Command {
    Command::new("VODUM")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Viewpoint and opinion discovery with collapsed Gibbs sampling")
        .arg(Arg::new("est")
             .long("est")
             .action(ArgAction::SetTrue)
             .help("Estimate a model from scratch"))
        .arg(Arg::new("inf")
             .long("inf")
             .action(ArgAction::SetTrue)
             .help("Infer viewpoints and topics of new documents with a trained model"))
        .group(ArgGroup::new("mode")
               .args(["est", "inf"])
               .required(true))
        .arg(Arg::new("dir")
             .long("dir")
             .value_name("DIR")
             .value_parser(value_parser!(PathBuf))
             .default_value(".")
             .help("Directory holding the corpus and the model files"))
        .arg(Arg::new("dfile")
             .long("dfile")
             .value_name("FILE")
             .default_value("trndocs.dat")
             .help("Corpus file name, relative to --dir"))
        .arg(Arg::new("model")
             .long("model")
             .value_name("NAME")
             .default_value("model-final")
             .help("Name of the trained model used for inference"))
        .arg(Arg::new("alpha")
             .long("alpha")
             .value_name("NUMBER")
             .value_parser(value_parser!(f64))
             .allow_negative_numbers(true)
             .help("Sentence-topic prior; defaults to 50 / ntopics"))
        .arg(Arg::new("beta0")
             .long("beta0")
             .value_name("NUMBER")
             .value_parser(value_parser!(f64))
             .default_value("0.05")
             .help("Topical word prior"))
        .arg(Arg::new("beta1")
             .long("beta1")
             .value_name("NUMBER")
             .value_parser(value_parser!(f64))
             .default_value("0.05")
             .help("Opinion word prior"))
        .arg(Arg::new("eta")
             .long("eta")
             .value_name("NUMBER")
             .value_parser(value_parser!(f64))
             .default_value("0.1")
             .help("Document-viewpoint prior"))
        .arg(Arg::new("ntopics")
             .long("ntopics")
             .value_name("NUMBER")
             .value_parser(value_parser!(usize))
             .default_value("100")
             .help("Number of topics"))
        .arg(Arg::new("nviews")
             .long("nviews")
             .value_name("NUMBER")
             .value_parser(value_parser!(usize))
             .default_value("2")
             .help("Number of viewpoints"))
        .arg(Arg::new("nchains")
             .long("nchains")
             .value_name("NUMBER")
             .value_parser(value_parser!(usize))
             .default_value("1")
             .help("Number of chains to sample"))
        .arg(Arg::new("niters")
             .long("niters")
             .value_name("NUMBER")
             .value_parser(value_parser!(usize))
             .default_value("1000")
             .help("Number of Gibbs iterations per chain"))
        .arg(Arg::new("savestep")
             .long("savestep")
             .value_name("NUMBER")
             .value_parser(value_parser!(usize))
             .default_value("100")
             .help("Save a snapshot every NUMBER iterations; 0 disables"))
        .arg(Arg::new("topwords")
             .long("topwords")
             .value_name("NUMBER")
             .value_parser(value_parser!(usize))
             .default_value("100")
             .help("Number of most likely words listed per topic"))
        .arg(Arg::new("seed")
             .long("seed")
             .value_name("NUMBER")
             .value_parser(value_parser!(u64))
             .help("Seed for the random number generator"))
        .arg(Arg::new("summary")
             .long("summary")
             .value_name("JSON-FILE")
             .value_parser(value_parser!(PathBuf))
             .help("Write the estimated distributions as JSON"))
}

fn config_from(matches: &ArgMatches) -> Config {
    let get_usize = |name: &str| matches.get_one::<usize>(name).copied().unwrap_or_default();
    let get_f64 = |name: &str| matches.get_one::<f64>(name).copied().unwrap_or_default();
    let get_string = |name: &str| matches.get_one::<String>(name).cloned().unwrap_or_default();
    Config {
        dir: matches
            .get_one::<PathBuf>("dir")
            .cloned()
            .unwrap_or_else(|| PathBuf::from(".")),
        dfile: get_string("dfile"),
        model_name: get_string("model"),
        topics: get_usize("ntopics"),
        viewpoints: get_usize("nviews"),
        alpha: matches.get_one::<f64>("alpha").copied(),
        beta0: get_f64("beta0"),
        beta1: get_f64("beta1"),
        eta: get_f64("eta"),
        chains: get_usize("nchains"),
        iterations: get_usize("niters"),
        save_step: get_usize("savestep"),
        top_words: get_usize("topwords"),
        seed: matches.get_one::<u64>("seed").copied(),
    }
}

fn write_summary(path: &Path, config: &Config, hyperparameters: Hyperparameters, distributions: &Distributions) -> Result<()> {
    let file = File::create(path).with_context(|| format!("cannot create {}", path.display()))?;
    let summary = Summary {
        config,
        hyperparameters,
        distributions,
    };
    serde_json::to_writer_pretty(BufWriter::new(file), &summary)
        .with_context(|| format!("cannot write summary to {}", path.display()))?;
    info!("summary written to {}", path.display());
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let matches = command().get_matches();
    let config = config_from(&matches);

    if matches.get_flag("est") {
        let mut estimator = Estimator::new(config.clone())
            .with_context(|| format!("cannot set up estimation from {}", config.corpus_path().display()))?;
        let distributions = estimator.estimate().context("estimation failed")?;
        if let Some(path) = matches.get_one::<PathBuf>("summary") {
            write_summary(path, &config, *estimator.hyperparameters(), &distributions)?;
        }
    } else {
        let mut inferencer = Inferencer::new(config.clone())
            .with_context(|| format!("cannot load model {} from {}", config.model_name, config.dir.display()))?;
        let inference = inferencer.infer().context("inference failed")?;
        if let Some(path) = matches.get_one::<PathBuf>("summary") {
            write_summary(path, &config, inferencer.model().others.hyper, &inference.distributions)?;
        }
    }
    Ok(())
}
