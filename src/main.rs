use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ferrite_aebigru::{
    AeBiGruClusterer, AeBiGruConfig, Clusterer, DummyClusterer, TimeSeriesBatch,
};

#[derive(Parser)]
#[command(name = "ferrite-aebigru")]
#[command(about = "Bidirectional-GRU auto-encoder clustering for time series")]
struct Cli {
    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Train on a dataset and print cluster labels and score as JSON
    Fit {
        /// JSON configuration; defaults are used for missing fields
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// JSON dataset shaped [case][channel][timepoint]
        #[arg(short, long)]
        data: PathBuf,

        /// Clustering algorithm applied to the latent codes
        #[arg(long, value_enum, default_value_t = EstimatorKind::Kmeans)]
        estimator: EstimatorKind,

        /// Number of clusters (overrides the config)
        #[arg(short, long)]
        n_clusters: Option<usize>,

        /// Number of epochs (overrides the config)
        #[arg(short, long)]
        epochs: Option<usize>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum EstimatorKind {
    Kmeans,
    Dummy,
}

fn setup_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init()
        .ok();
}

fn load_dataset(path: &Path) -> Result<TimeSeriesBatch> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("opening dataset {}", path.display()))?;
    let nested: Vec<Vec<Vec<f64>>> = serde_json::from_reader(std::io::BufReader::new(file))
        .with_context(|| format!("parsing dataset {}", path.display()))?;
    Ok(TimeSeriesBatch::from_nested(&nested)?)
}

fn run<C: Clusterer + Clone>(clusterer: &mut AeBiGruClusterer<C>, data: &TimeSeriesBatch) -> Result<serde_json::Value> {
    clusterer.fit(data).context("fitting the clusterer")?;
    let labels = clusterer.predict(data)?;
    let score = clusterer.score(data)?;
    let history = clusterer.history()?;
    Ok(serde_json::json!({
        "labels": labels,
        "score": score,
        "epochs": history.len(),
        "final_loss": history.loss().last(),
        "random_state": clusterer.fitted().and_then(|s| s.random_state),
    }))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(&cli.log_level);

    match cli.command {
        Command::Fit { config, data, estimator, n_clusters, epochs } => {
            let mut cfg = match &config {
                Some(path) => AeBiGruConfig::load_json(path)
                    .with_context(|| format!("loading config {}", path.display()))?,
                None => AeBiGruConfig::default(),
            };
            if let Some(n) = n_clusters {
                cfg.n_clusters = Some(n);
            }
            if let Some(n) = epochs {
                cfg.n_epochs = n;
            }
            let dataset = load_dataset(&data)?;

            let report = match estimator {
                EstimatorKind::Kmeans => run(&mut AeBiGruClusterer::new(cfg)?, &dataset)?,
                EstimatorKind::Dummy => {
                    let dummy = DummyClusterer::new(cfg.n_clusters.unwrap_or(2));
                    cfg.n_clusters = None;
                    run(&mut AeBiGruClusterer::with_estimator(cfg, dummy)?, &dataset)?
                }
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}
