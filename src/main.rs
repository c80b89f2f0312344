//! Binary entry point: CLI parsing, logging, hotkey manager setup, and the
//! single-threaded event loop.

use std::path::PathBuf;
use std::sync::mpsc;

use anyhow::Context;
use clap::Parser;
use global_hotkey::GlobalHotKeyManager;
use tracing::info;

use numpad_prompter::app::{forward_hotkey_events, forward_stdin_requests, App};
use numpad_prompter::broadcast::StdoutSink;
use numpad_prompter::paste::SystemClipboard;
use numpad_prompter::logging;
use numpad_prompter::store::ConfigStore;

#[derive(Parser, Debug)]
#[command(name = "numpad-prompter", about = "Dynamic key-binding engine", version)]
struct Cli {
    /// Path to the persisted config document (overrides the stored dataPath).
    #[arg(long)]
    data_path: Option<PathBuf>,

    /// Log filter, e.g. "debug" or "numpad_prompter=trace" (overrides RUST_LOG).
    #[arg(long)]
    log_filter: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _logging_guard = logging::init(cli.log_filter.as_deref());

    let store = ConfigStore::open(cli.data_path);
    info!(
        profiles = store.profiles().len(),
        active = %store.active_profile_id(),
        "Loaded configuration"
    );

    // The hotkey manager must live on the thread that runs the loop; events
    // arrive on the crate's global receiver and are forwarded into our
    // channel from a helper thread.
    let manager = GlobalHotKeyManager::new().context("failed to initialize hotkey manager")?;

    let (tx, rx) = mpsc::channel();
    forward_hotkey_events(tx.clone());
    forward_stdin_requests(tx.clone());

    let mut app = App::new(store, manager, SystemClipboard, StdoutSink::new(), tx);
    app.bootstrap();
    app.run(rx);

    info!("Exited cleanly");
    Ok(())
}
