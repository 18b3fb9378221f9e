use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::{Level, event};

use suitcast_core::snapshot::EngineSnapshot;
use suitcast_relay::config::RelayConfig;
use suitcast_relay::feed::FeedReader;
use suitcast_relay::logging::init_logging;
use suitcast_relay::outbox::{JsonlOutbox, OutboxOp, read_records};
use suitcast_relay::runner::{Channels, FeedRunner};
use suitcast_relay::store::StateStore;

/// Card-suit prediction relay.
#[derive(Debug, Parser)]
#[command(
    name = "suitcast",
    author,
    version,
    about = "Learns trigger cards from a result feed and announces suit predictions"
)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "suitcast.yaml")]
    config: PathBuf,

    /// Override the state document path.
    #[arg(long, value_name = "FILE")]
    state: Option<PathBuf>,

    /// Override the feed path.
    #[arg(long, value_name = "FILE")]
    feed: Option<PathBuf>,

    /// Exit after validating the configuration.
    #[arg(long)]
    validate_only: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Process the feed and write announcements to the outbox (default).
    Run,
    /// Print rules, quarantine and prediction totals from the saved state.
    Status {
        /// Emit the report as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Recompute rules from the saved observations and enable learned mode.
    Refresh,
    /// Switch between learned and static matching.
    Mode {
        #[arg(value_parser = ["learned", "static"])]
        mode: String,
    },
    /// Clear every learned rule and prediction from the saved state.
    Reset,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = RelayConfig::from_path(&cli.config)?;

    if let Some(state) = cli.state {
        config.state.path = state;
    }

    if let Some(feed) = cli.feed {
        config.feed.path = feed;
    }

    config.validate()?;
    let engine_config = config.engine_config()?;

    if cli.validate_only {
        println!(
            "Configuration {} is valid: feed {} (chat {}), outbox {} (chat {})",
            cli.config.display(),
            config.feed.path.display(),
            config.feed.source_channel,
            config.outbox.path.display(),
            config.outbox.prediction_channel
        );
        return Ok(());
    }

    let _logging_guard = init_logging(&config.logging)?;
    let store = StateStore::new(&config.state.path);
    let (snapshot, restore_report) = store
        .load()
        .with_context(|| format!("loading state from {}", store.path().display()))?;
    if !restore_report.is_clean() {
        event!(
            target: "suitcast_relay::main",
            Level::WARN,
            path = %store.path().display(),
            discarded = %restore_report.discarded.join(", "),
            "saved state partially discarded"
        );
    }
    let mut engine = snapshot.restore(engine_config);

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => {
            let feed = FeedReader::open(&config.feed.path)
                .with_context(|| format!("opening feed {}", config.feed.path.display()))?;
            let outbox = JsonlOutbox::open(&config.outbox.path)
                .with_context(|| format!("opening outbox {}", config.outbox.path.display()))?;
            let channels = Channels {
                source: config.feed.source_channel,
                prediction: config.outbox.prediction_channel,
            };
            let mut runner =
                FeedRunner::new(engine, outbox, store, channels, config.state.save_every);
            let summary = runner.run(feed)?;
            println!(
                "Processed {} events ({} ignored, {} malformed): {} announced, {} edited, {} delivery failures",
                summary.events,
                summary.ignored,
                summary.malformed,
                summary.announced,
                summary.edited,
                summary.egress_failures
            );
            println!("State saved to {}", summary.state_path.display());
        }
        Command::Status { json } => {
            let report = engine.status(Utc::now());
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{report}");
                if config.outbox.path.exists() {
                    let records = read_records(&config.outbox.path)?;
                    let sends = records.iter().filter(|r| r.op == OutboxOp::Send).count();
                    println!(
                        "outbox: {sends} sent, {} edits",
                        records.len() - sends
                    );
                }
            }
        }
        Command::Refresh => {
            if engine.refresh_rules(Utc::now(), true) {
                println!(
                    "Rules refreshed: {} in pool, {} active",
                    engine.pool().len(),
                    engine.active_rules().len()
                );
            } else {
                println!(
                    "Not enough observations to learn rules ({} collected)",
                    engine.store().observations().len()
                );
            }
            store.save(&EngineSnapshot::capture(&engine))?;
        }
        Command::Mode { mode } => {
            engine.set_learned_mode(mode == "learned");
            store.save(&EngineSnapshot::capture(&engine))?;
            println!("Matching mode set to {mode}");
        }
        Command::Reset => {
            engine.reset();
            store.save(&EngineSnapshot::capture(&engine))?;
            println!("State reset at {}", store.path().display());
        }
    }

    Ok(())
}
