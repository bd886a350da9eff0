//! Void Sequencer CLI
//!
//! Loads a sequence document and drives it headless: ticks at a fixed step, applies
//! scripted commands at given times and logs every event.
//!
//! Run with: cargo run -p void_sequencer_cli -- run npc.json --seconds 10 \
//!     --command "2.0:route wave" --save out.json

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use void_sequencer::prelude::*;

#[derive(Parser)]
#[command(name = "sequencer")]
#[command(about = "Run and inspect character sequence documents", long_about = None)]
struct Cli {
    /// TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Tick a document for a while
    Run {
        /// Document to load (.json or .seq)
        document: PathBuf,

        /// Seconds to simulate
        #[arg(short, long, default_value = "10.0")]
        seconds: f32,

        /// Tick length in seconds
        #[arg(long, default_value = "0.1")]
        dt: f32,

        /// Scripted command as `<time>:<command>`, e.g. `2.5:route wave`
        #[arg(long = "command")]
        commands: Vec<String>,

        /// Write the final document here
        #[arg(long)]
        save: Option<PathBuf>,
    },

    /// Print the states of a document
    Inspect {
        /// Document to load (.json or .seq)
        document: PathBuf,
    },

    /// Print the shortest route between two states
    Route {
        /// Document to load (.json or .seq)
        document: PathBuf,
        from: String,
        to: String,
    },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Persist(#[from] PersistError),

    #[error(transparent)]
    Sequencer(#[from] SequencerError),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("Invalid scripted command '{0}': expected <time>:<command>")]
    Script(String),

    #[error("Tick length must be positive")]
    InvalidStep,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = SequencerConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            document,
            seconds,
            dt,
            commands,
            save,
        } => simulate(config, document, seconds, dt, &commands, save),
        Commands::Inspect { document } => inspect(config, document),
        Commands::Route { document, from, to } => route(config, document, &from, &to),
    }
}

fn load(config: SequencerConfig, document: &Path) -> Result<Sequencer, CliError> {
    let doc = SequenceDocument::load_from_path(document)?;
    let mut sequencer = Sequencer::new(config);
    let report = sequencer.restore(&doc);
    if !report.is_clean() {
        log::warn!("Document loaded with omissions: {:?}", report);
    }
    Ok(sequencer)
}

fn parse_script(commands: &[String]) -> Result<Vec<(f32, Command)>, CliError> {
    let mut script = commands
        .iter()
        .map(|entry| {
            let (time, text) = entry
                .split_once(':')
                .ok_or_else(|| CliError::Script(entry.clone()))?;
            let time: f32 = time
                .trim()
                .parse()
                .map_err(|_| CliError::Script(entry.clone()))?;
            Ok((time, text.parse::<Command>()?))
        })
        .collect::<Result<Vec<_>, CliError>>()?;
    script.sort_by(|a, b| a.0.total_cmp(&b.0));
    Ok(script)
}

fn simulate(
    config: SequencerConfig,
    document: PathBuf,
    seconds: f32,
    dt: f32,
    commands: &[String],
    save: Option<PathBuf>,
) -> Result<(), CliError> {
    if dt <= 0.0 {
        return Err(CliError::InvalidStep);
    }

    let mut script = parse_script(commands)?.into_iter().peekable();
    let mut sequencer = load(config, &document)?;
    let sender = sequencer.command_sender();

    log::info!(
        "Simulating {} for {:.1}s (current: {})",
        document.display(),
        seconds,
        sequencer.current_name().unwrap_or("none")
    );

    let mut time = 0.0f32;
    while time < seconds {
        while let Some((_, command)) = script.next_if(|(at, _)| *at <= time) {
            log::info!("[{:6.2}] posting '{}'", time, command);
            sender.send(command)?;
        }

        sequencer.tick(dt);
        time += dt;

        for event in sequencer.drain_events() {
            match event {
                SequencerEvent::Progress { .. } => log::trace!("[{:6.2}] {:?}", time, event),
                _ => log::info!("[{:6.2}] {:?}", time, event),
            }
        }
    }

    if let Some(path) = save {
        sequencer.snapshot().save_to_path(&path)?;
        log::info!("Saved document to {}", path.display());
    }
    Ok(())
}

fn inspect(config: SequencerConfig, document: PathBuf) -> Result<(), CliError> {
    let sequencer = load(config, &document)?;
    let graph = sequencer.graph();

    for group in graph.groups() {
        println!("[{}]", group);
        for id in graph.states_in_group(group) {
            let Some(state) = graph.get(id) else {
                continue;
            };
            let targets: Vec<&str> = state
                .transitions()
                .iter()
                .filter_map(|&t| graph.name_of(t))
                .collect();
            println!(
                "  {:<24} {:<8} {:>6.2}s  flags: {:<16} -> {}",
                state.name(),
                state.kind,
                state.duration,
                state.set_flags,
                targets.join(", ")
            );
        }
    }

    println!(
        "current: {} (clock {:.2}/{:.2})",
        sequencer.current_name().unwrap_or("none"),
        sequencer.clock(),
        sequencer.duration()
    );
    Ok(())
}

fn route(config: SequencerConfig, document: PathBuf, from: &str, to: &str) -> Result<(), CliError> {
    let sequencer = load(config, &document)?;
    let graph = sequencer.graph();
    let start = graph.resolve(from)?;
    let target = graph.resolve(to)?;

    let path = find_route(graph, start, target).ok_or_else(|| SequencerError::NoRoute {
        from: from.to_string(),
        to: to.to_string(),
    })?;

    let hops: Vec<&str> = std::iter::once(start)
        .chain(path)
        .filter_map(|id| graph.name_of(id))
        .collect();
    println!("{}", hops.join(" -> "));
    Ok(())
}
