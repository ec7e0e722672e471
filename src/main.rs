//! Reconciler simulator: replays scripted cycles against an in-memory object

use clap::Parser;
use reconciler::{CycleOutcome, MemoryStore, ObjectWorker, ScriptedHandler};
use reconciler_core::{Body, Settings};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "reconciler-sim",
    about = "Replay scripted reconciliation cycles against an in-memory object"
)]
struct Cli {
    /// Object body as JSON
    #[arg(short, long)]
    object: PathBuf,
    /// Cycle script: a JSON array of {patch, delays, fail}
    #[arg(short, long)]
    script: PathBuf,
    /// Settings file (TOML); defaults are used if omitted or missing
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Stop after this many cycles even if the object has not settled
    #[arg(long, default_value_t = 100)]
    max_cycles: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    let body: Body = serde_json::from_str(&std::fs::read_to_string(&cli.object)?)?;
    let handler = Arc::new(ScriptedHandler::from_json(&std::fs::read_to_string(
        &cli.script,
    )?)?);
    let store = Arc::new(
        MemoryStore::new(body).with_collapsing(settings.effects.known_inconsistencies.clone()),
    );
    let mut worker = ObjectWorker::new(handler.clone(), store.clone(), &settings);

    for cycle in 1..=cli.max_cycles {
        let Some(body) = store.body().await else {
            info!("Object is gone, stopping");
            break;
        };
        let outcome = worker.run_cycle(&body).await?;
        info!(cycle, %outcome, "Cycle finished");
        if outcome == CycleOutcome::Applied && handler.remaining().await == 0 {
            break;
        }
    }

    if let Some(body) = store.body().await {
        println!("{}", serde_json::to_string_pretty(body.as_value())?);
    }
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reconciler=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
