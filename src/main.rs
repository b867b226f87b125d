use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use diskgas::core::particle::DEFAULT_RADIUS;
use diskgas::output::{self, FileRecorder, SETUP_FILE};
use diskgas::{verify, SimConfig};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "diskgas", version, about = "Event-driven hard-disk gas simulator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a simulation and write setup.txt, events.txt and steps/ under the output directory
    Run {
        #[arg(short, long, default_value = "config.json")]
        config: PathBuf,
        #[arg(short, long, default_value = "output")]
        out: PathBuf,
    },
    /// Check the artifacts of a finished run
    Verify {
        #[arg(short, long, default_value = "output")]
        out: PathBuf,
        /// Threads used to load snapshots
        #[arg(short, long, default_value_t = 4)]
        workers: usize,
        /// Radius assumed for snapshots written without one
        #[arg(long, default_value_t = DEFAULT_RADIUS)]
        radius: f64,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match Cli::parse().command {
        Command::Run { config, out } => run(&config, &out),
        Command::Verify {
            out,
            workers,
            radius,
        } => verify_run(&out, workers, radius),
    }
}

fn run(config_path: &Path, out: &Path) -> Result<()> {
    let cfg = SimConfig::load(config_path)
        .with_context(|| format!("failed to load config {}", config_path.display()))?;
    let (mut sim, gap) = cfg.build_with_gap().context("failed to build initial state")?;

    let mut recorder = FileRecorder::create(out, cfg.snapshot_radius)
        .with_context(|| format!("failed to prepare output directory {}", out.display()))?;
    let setup_path = out.join(SETUP_FILE);
    let mut w = BufWriter::new(File::create(&setup_path)?);
    output::write_setup(&mut w, sim.num_particles(), gap, sim.enclosure().walls())?;
    w.flush()?;

    tracing::info!(
        particles = sim.num_particles(),
        walls = sim.enclosure().walls().len(),
        kinetic_energy = sim.kinetic_energy(),
        "starting simulation"
    );
    let summary = sim
        .run(&mut recorder, cfg.snapshot)
        .context("simulation failed")?;
    tracing::info!(
        events = summary.events,
        time = summary.time,
        stop = ?summary.stop,
        pushed = summary.queue.pushed,
        discarded = summary.queue.discarded,
        kinetic_energy = sim.kinetic_energy(),
        "wrote {}",
        out.display()
    );
    Ok(())
}

fn verify_run(out: &Path, workers: usize, default_radius: f64) -> Result<()> {
    let report = verify::verify_dir(out, workers, default_radius)
        .with_context(|| format!("failed to read artifacts under {}", out.display()))?;
    if report.problems > 0 {
        bail!("{} problem(s) found in {}", report.problems, out.display());
    }
    Ok(())
}
