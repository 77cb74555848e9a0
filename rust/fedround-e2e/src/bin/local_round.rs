use std::{path::PathBuf, process};

use structopt::StructOpt;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::FmtSubscriber;

use fedround_e2e::Simulation;
use fedround_server::{settings::Settings, SecureAggregator};

#[derive(Debug, StructOpt)]
#[structopt(name = "local-round")]
/// Runs federated learning rounds between a coordinator and simulated participants.
struct Opt {
    /// Path of the configuration file. Without it the settings are read from the environment.
    #[structopt(short, parse(from_os_str))]
    config_path: Option<PathBuf>,

    /// Number of participants
    #[structopt(short, long, default_value = "3")]
    participants: usize,

    /// Number of rounds
    #[structopt(short, long, default_value = "1")]
    rounds: usize,

    /// Number of rows of the weight matrix
    #[structopt(long, default_value = "5")]
    rows: usize,

    /// Number of columns of the weight matrix and length of the bias vector
    #[structopt(long, default_value = "5")]
    cols: usize,

    /// Number of local epochs per round
    #[structopt(short, long, default_value = "1")]
    epochs: usize,

    /// Number of local batches per participant
    #[structopt(short, long, default_value = "2")]
    batches: usize,

    /// Seed of the initial model and of the local data
    #[structopt(short, long, default_value = "0")]
    seed: u64,
}

#[tokio::main]
async fn main() {
    let opt = Opt::from_args();

    let settings = match &opt.config_path {
        Some(path) => Settings::new(path),
        None => Settings::from_env(),
    }
    .unwrap_or_else(|err| {
        eprintln!("{}", err);
        process::exit(1);
    });
    let Settings { round, log } = settings;

    FmtSubscriber::builder()
        .with_env_filter(log.filter)
        .with_ansi(true)
        .init();

    let aggregator = SecureAggregator::from_settings(&round).unwrap_or_else(|err| {
        eprintln!("{}", err);
        process::exit(1);
    });

    let simulation = Simulation {
        participants: opt.participants,
        rounds: opt.rounds,
        rows: opt.rows,
        cols: opt.cols,
        epochs: opt.epochs,
        batches: opt.batches,
        seed: opt.seed,
    };

    tokio::select! {
        result = simulation.run(aggregator) => {
            match result {
                Ok(model) => info!(
                    tensors = model.len(),
                    elements = model.element_count(),
                    "simulation finished",
                ),
                Err(err) => {
                    eprintln!("simulation failed: {:#}", err);
                    process::exit(1);
                }
            }
        }
        _ = signal::ctrl_c() => {
            warn!("shutting down: interrupted");
        }
    }
}
