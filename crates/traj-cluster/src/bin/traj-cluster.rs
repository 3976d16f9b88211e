use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use traj_core::FrameStore;
use traj_cluster::config::load_config;
use traj_cluster::engine::run_clustering;
use traj_cluster::error::{ClusterError, ClusterResult};
use traj_cluster::metric::MetricDistance;
use traj_cluster::output::write_run_outputs;
use traj_cluster::streaming::StreamEmitter;

#[derive(Parser)]
#[command(name = "traj-cluster", version, about = "Density-based trajectory frame clustering")]
struct Cli {
    #[arg(short, long)]
    config: PathBuf,
    /// Frames as JSON: {"frames": [[[x, y, z], ...], ...]}
    #[arg(short, long)]
    frames: PathBuf,
    /// Cluster ID series; overrides output.series from the config.
    #[arg(short, long)]
    out: Option<PathBuf>,
    #[arg(long)]
    summary: Option<PathBuf>,
    #[arg(long)]
    info: Option<PathBuf>,
    /// Emit NDJSON progress events on stderr.
    #[arg(long)]
    stream: bool,
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<(), String> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let emitter = StreamEmitter::new(cli.stream);
    if let Err(err) = run_cli(cli, emitter) {
        return Err(err.to_string());
    }
    Ok(())
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run_cli(cli: Cli, emitter: StreamEmitter) -> ClusterResult<()> {
    let mut cfg = reported(emitter, load_config(&cli.config))?;
    if let Some(path) = cli.out {
        cfg.output.series = Some(path.to_string_lossy().to_string());
    }
    if let Some(path) = cli.summary {
        cfg.output.summary = Some(path.to_string_lossy().to_string());
    }
    if let Some(path) = cli.info {
        cfg.output.info = Some(path.to_string_lossy().to_string());
    }

    let store = reported(emitter, FrameStore::read_json(&cli.frames).map_err(ClusterError::from))?;
    let dist = reported(emitter, MetricDistance::new(&store, cfg.metric))?;
    // run_clustering reports its own failures
    let run = run_clustering(&cfg, &dist, emitter)?;
    reported(emitter, write_run_outputs(&cfg.output, &run))?;
    if cfg.output.series.is_none() {
        for (frame, id) in run.output.labels.iter().enumerate() {
            println!("{frame} {id}");
        }
    }
    Ok(())
}

fn reported<T>(emitter: StreamEmitter, result: ClusterResult<T>) -> ClusterResult<T> {
    if let Err(err) = &result {
        emitter.emit_error(err.code(), &err.to_string());
    }
    result
}
