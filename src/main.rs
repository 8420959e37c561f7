use editor_sync::config::{self, error::ConfigError, Config};
use editor_sync::replay::{self, Script};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// editor-sync - collaborative editor/CRDT synchronization
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a scripted collaborative session
    Replay {
        /// Session script (TOML)
        script: PathBuf,

        /// Config directory (contains editor-sync.toml)
        #[arg(long, short = 'c', default_value = ".")]
        config_dir: PathBuf,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    match args.command {
        Commands::Replay {
            script,
            config_dir,
            json,
        } => replay_command(script, config_dir, json),
    }
}

fn init_logging(config: &Config) -> Result<()> {
    // RUST_LOG wins, then the configured level, then "warn"
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(config.log_level.as_deref().unwrap_or("warn"))
    });

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn replay_command(script_path: PathBuf, config_dir: PathBuf, json: bool) -> Result<()> {
    let (config, found) = match Config::load(&config_dir) {
        Ok(config) => (config, true),
        Err(ConfigError::NotFound(_)) => (Config::default(), false),
        Err(e) => {
            return Err(e).with_context(|| {
                format!(
                    "Failed to load {} from {}",
                    config::CONFIG_FILE,
                    config_dir.display()
                )
            })
        }
    };
    init_logging(&config)?;
    if !found {
        info!(
            "No {} found from {}, using defaults",
            config::CONFIG_FILE,
            config_dir.display()
        );
    }

    let script = Script::load(&script_path)
        .with_context(|| format!("Failed to load script: {}", script_path.display()))?;

    info!("Replaying {} on {}", script_path.display(), config.document_key);
    let outcome = replay::run(&config, &script).context("Replay failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    for participant in &outcome.participants {
        let status = if participant.attached { "" } else { " (detached)" };
        println!("{}{}: {}", participant.name, status, participant.text);
    }
    if !outcome.converged {
        anyhow::bail!("Participants did not converge on {}", outcome.document_key);
    }

    Ok(())
}
