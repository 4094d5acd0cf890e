use anyhow::Result;
use clap::{Parser, Subcommand};
use ml_textloc::config::{TrainOverrides, TrainingConfig};
use ml_textloc::logging::init_logging;
use ml_textloc::modes::{EvaluateMode, ReplayConfig, ReplayMode, TrainMode};
use std::path::PathBuf;

/// Log file written into the result directory of a training run
const TRAIN_LOG_FILE: &str = "train.log";

#[derive(Parser)]
#[command(name = "ml_textloc")]
#[command(version, about = "Text localization with deep Q-learning")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Train a DQN agent
    Train {
        /// TOML configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        #[command(flatten)]
        overrides: TrainOverrides,
    },
    /// Evaluate a saved agent
    Evaluate {
        /// Directory written by a training run (agent_<timestamp>_<kind> or best)
        #[arg(long)]
        agent: PathBuf,

        /// TOML configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Number of episodes (default: eval_n_episodes from the config)
        #[arg(long)]
        episodes: Option<usize>,

        #[command(flatten)]
        overrides: TrainOverrides,
    },
    /// Rebuild evaluation scalars from a training log
    ReplayLog {
        #[arg(long)]
        log: PathBuf,

        #[arg(long)]
        eval_n_episodes: usize,

        #[arg(long)]
        eval_interval: u64,

        /// JSON-lines file receiving the scalars
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Train { config, overrides } => {
            let config = TrainingConfig::load(config.as_deref(), &overrides)?;
            let _guard = init_logging(Some(&config.resultdir_path.join(TRAIN_LOG_FILE)))?;
            TrainMode::new(config).run()?;
        }
        Command::Evaluate {
            agent,
            config,
            episodes,
            overrides,
        } => {
            let _guard = init_logging(None)?;
            let config = TrainingConfig::load(config.as_deref(), &overrides)?;
            EvaluateMode::new(config, agent, episodes).run()?;
        }
        Command::ReplayLog {
            log,
            eval_n_episodes,
            eval_interval,
            output,
        } => {
            let _guard = init_logging(None)?;
            ReplayMode::new(ReplayConfig {
                log_path: log,
                eval_n_episodes,
                eval_interval,
                output,
            })
            .run()?;
        }
    }

    Ok(())
}
