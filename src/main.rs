//! Headless entry point: re-judges replays and generates autoplay runs.

use clap::{Parser, Subcommand};
use rvsrg_judge::database::{load_replay_from_path, replay_hash, save_replay};
use rvsrg_judge::models::replay::{ReplayFrame, simulate_replay_with};
use rvsrg_judge::models::settings::{GameplayConfig, load_config};
use rvsrg_judge::{Chart, autoplay, simulate_replay};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "rvsrg-judge", version, about = "VSRG judgment core")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Re-judge a replay and print the result as JSON.
    Simulate {
        /// Chart file (JSON).
        #[arg(long)]
        chart: PathBuf,
        /// Replay file (.r).
        #[arg(long)]
        replay: PathBuf,
        /// Judge with these settings instead of the recorded ones.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Play a chart perfectly and save the replay.
    Autoplay {
        #[arg(long)]
        chart: PathBuf,
        /// Directory the replay is written to.
        #[arg(long)]
        out: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print replay metadata.
    Inspect {
        #[arg(long)]
        replay: PathBuf,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    match run(args.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("MAIN: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Simulate {
            chart,
            replay,
            config,
        } => {
            let chart = Chart::load(&chart)?;
            let replay = load_replay_from_path(&replay)?;
            let result = match config {
                Some(path) => simulate_replay_with(&replay, &chart, load_config(&path)?)?,
                None => simulate_replay(&replay, &chart)?,
            };
            println!("{}", result.to_json()?);
        }
        Command::Autoplay { chart, out, config } => {
            let chart = Chart::load(&chart)?;
            let config = config_or_default(config.as_deref(), &chart)?;
            let result = autoplay(&chart, config)?;
            let hash = replay_hash(&result.replay)?;
            let path = save_replay(&out, &hash, &result.replay)?;
            println!("{}", path.display());
        }
        Command::Inspect { replay } => {
            let data = load_replay_from_path(&replay)?;
            let inputs = data
                .frames
                .iter()
                .filter(|f| matches!(f, ReplayFrame::Input { .. }))
                .count();

            println!("version:    {}", data.version);
            println!("chart:      {}", data.chart_hash);
            println!("rate:       {:.1}x", data.config.rate);
            println!("windows:    {}", data.config.hit_window.label());
            println!("lanes:      {}", data.config.lane_count);
            println!("practice:   {}", data.is_practice_mode);
            println!("checkpoints {:?}", data.checkpoints);
            println!("frames:     {} ({} inputs)", data.frames.len(), inputs);
            if let Some(end) = data.end {
                println!("end:        {:?}", end.status);
            }
        }
    }
    Ok(())
}

/// Loads `path`, or defaults matched to the chart's key mode.
fn config_or_default(
    path: Option<&Path>,
    chart: &Chart,
) -> Result<GameplayConfig, Box<dyn std::error::Error>> {
    match path {
        Some(path) => Ok(load_config(path)?),
        None => Ok(GameplayConfig {
            lane_count: chart.lane_count(),
            ..Default::default()
        }),
    }
}
