//! bulkstore - bulk single-item storage units
//!
//! Headless driver: loads the storage config and block info, plays a command
//! script against the storage controllers and prints a JSON report.

mod command_script;
mod commands;
mod config;
mod session;

use anyhow::{Context, Result};
use bulkstore_world::{BlockInfoFile, MemoryBlockInfo};
use command_script::CommandScriptPlayer;
use config::StorageConfig;
use session::StorageSession;
use std::{env, fs, path::PathBuf};
use tracing::info;

fn main() -> Result<()> {
    // Initialize tracing with WARN level by default (can be overridden via RUST_LOG env var)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Starting bulkstore v{}", env!("CARGO_PKG_VERSION"));

    let cli = CliOptions::parse(env::args().skip(1));
    let mut config = match &cli.config {
        Some(path) => StorageConfig::load_from_path(path),
        None => StorageConfig::load(),
    };
    if cli.id_seed.is_some() {
        config.id_seed = cli.id_seed;
    }

    if let Some(path) = &cli.write_config {
        config.save_to_path(path)?;
        info!(path = %path.display(), "storage config written");
    }

    let block_info = cli
        .save_dir
        .as_ref()
        .map(BlockInfoFile::new)
        .transpose()
        .context("failed to open save directory")?;
    let store = match (&block_info, cli.reset) {
        (Some(file), false) => file.load_or_default()?,
        _ => MemoryBlockInfo::new(),
    };

    let mut session = StorageSession::new(&config, store);
    match &cli.command_script {
        Some(path) => {
            let mut script = CommandScriptPlayer::from_path(path)?;
            info!(
                path = %path.display(),
                last_tick = script.last_tick().map_or(0, |tick| tick.0),
                "running command script"
            );
            session.run(&mut script, cli.max_ticks);
            info!(tick = session.tick().0, "command script finished");
        }
        None => {
            for _ in 0..cli.max_ticks.unwrap_or(0) {
                session.step();
            }
        }
    }

    if let Some(file) = &block_info {
        file.save(session.store())?;
        info!(path = %file.path().display(), "block info saved");
    }

    let report = serde_json::to_string_pretty(&session.report())?;
    match &cli.report {
        Some(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, report)
                .with_context(|| format!("failed to write report {}", path.display()))?;
        }
        None => println!("{report}"),
    }

    info!("bulkstore shutting down");
    Ok(())
}

#[derive(Clone, Default)]
struct CliOptions {
    config: Option<PathBuf>,
    save_dir: Option<PathBuf>,
    reset: bool,
    command_script: Option<PathBuf>,
    max_ticks: Option<u64>,
    id_seed: Option<u64>,
    report: Option<PathBuf>,
    write_config: Option<PathBuf>,
}

impl CliOptions {
    fn parse<I: Iterator<Item = String>>(mut args: I) -> Self {
        let mut opts = CliOptions::default();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => match args.next() {
                    Some(path) => opts.config = Some(PathBuf::from(path)),
                    None => tracing::error!("--config requires a file path"),
                },
                "--save-dir" => match args.next() {
                    Some(path) => opts.save_dir = Some(PathBuf::from(path)),
                    None => tracing::error!("--save-dir requires a directory path"),
                },
                "--reset" => opts.reset = true,
                "--command-script" => match args.next() {
                    Some(path) => opts.command_script = Some(PathBuf::from(path)),
                    None => tracing::error!("--command-script requires a file path"),
                },
                "--max-ticks" => opts.max_ticks = parse_u64(args.next(), "--max-ticks"),
                "--id-seed" => opts.id_seed = parse_u64(args.next(), "--id-seed"),
                "--report" => match args.next() {
                    Some(path) => opts.report = Some(PathBuf::from(path)),
                    None => tracing::error!("--report requires a file path"),
                },
                "--write-config" => match args.next() {
                    Some(path) => opts.write_config = Some(PathBuf::from(path)),
                    None => tracing::error!("--write-config requires a file path"),
                },
                other => tracing::warn!(arg = %other, "ignoring unknown argument"),
            }
        }

        opts
    }
}

fn parse_u64(raw: Option<String>, flag: &str) -> Option<u64> {
    let Some(raw) = raw else {
        tracing::error!("{flag} requires an integer");
        return None;
    };
    match raw.parse::<u64>() {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::error!(%err, value = %raw, "{flag} must be an integer");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliOptions {
        CliOptions::parse(args.iter().map(|arg| arg.to_string()))
    }

    #[test]
    fn parses_paths_and_numbers() {
        let opts = parse(&[
            "--config",
            "cfg.toml",
            "--command-script",
            "script.json",
            "--max-ticks",
            "20",
            "--id-seed",
            "7",
            "--reset",
        ]);
        assert_eq!(opts.config, Some(PathBuf::from("cfg.toml")));
        assert_eq!(opts.command_script, Some(PathBuf::from("script.json")));
        assert_eq!(opts.max_ticks, Some(20));
        assert_eq!(opts.id_seed, Some(7));
        assert!(opts.reset);
    }

    #[test]
    fn bad_values_are_dropped() {
        let opts = parse(&["--max-ticks", "soon", "--save-dir"]);
        assert_eq!(opts.max_ticks, None);
        assert_eq!(opts.save_dir, None);
    }
}
