use std::io::{self, Write};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use alloy::primitives::Address;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use anvil_lens::config;
use anvil_lens::refresh::{self, FragmentSource, NodeFragmentSource, UserInput};
use anvil_lens::server::{self, AppState};
use anvil_lens::view::FragmentEntry;
use anvil_lens::{AlloyClient, NodeClient};

#[derive(Debug, Parser)]
#[command(
    name = "anvil-lens",
    version,
    about = "Anvil Lens: live chain-state view for a local EVM node"
)]
struct Args {
    /// HTTP JSON-RPC endpoint (e.g. http://localhost:8545)
    #[arg(long)]
    rpc: Option<String>,

    /// Account whose balance the dashboard shows
    #[arg(long)]
    account: Option<String>,

    /// Recent-block window size
    #[arg(long)]
    window: Option<u64>,

    /// Listen address for the dashboard server
    #[arg(long)]
    listen: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the dashboard over HTTP (default)
    Serve,
    /// Follow the recent-block window in the terminal
    Watch,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = config::load();

    let rpc = normalize_http_endpoint(&args.rpc.unwrap_or(config.rpc));
    let account: Address = args
        .account
        .unwrap_or(config.account)
        .parse()
        .context("Invalid account address")?;
    let window = args.window.unwrap_or(config.window).max(1);
    let listen = args.listen.unwrap_or(config.listen);

    let client: Arc<dyn NodeClient> = Arc::new(AlloyClient::connect(&rpc)?);

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => run_serve(client, account, window, &listen).await,
        Command::Watch => run_watch(client, window).await,
    }
}

async fn run_serve(
    client: Arc<dyn NodeClient>,
    account: Address,
    window: u64,
    listen: &str,
) -> Result<()> {
    let endpoint = client.endpoint_name();
    let state = AppState {
        client,
        account,
        window,
    };
    let app = server::create_router().with_state(state);

    let listener = TcpListener::bind(listen)
        .await
        .with_context(|| format!("Failed to bind {listen}"))?;
    info!("Dashboard for {endpoint} listening on http://{listen}");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn run_watch(client: Arc<dyn NodeClient>, window: u64) -> Result<()> {
    let prefs = refresh::prefs::load();
    let source: Arc<dyn FragmentSource> = Arc::new(NodeFragmentSource::new(client, window));

    let (input_tx, input_rx) = mpsc::channel::<UserInput>(8);
    let (update_tx, mut update_rx) = mpsc::unbounded_channel::<Vec<FragmentEntry>>();

    enable_raw_mode()?;
    let key_thread = thread::spawn(move || key_loop(input_tx));

    let printer = tokio::spawn(async move {
        while let Some(entries) = update_rx.recv().await {
            draw_entries(&entries);
        }
    });

    refresh::run_refresh_loop(source, prefs, input_rx, update_tx).await;

    printer.abort();
    disable_raw_mode()?;
    let _ = key_thread.join();
    Ok(())
}

/// Blocking key reader feeding the refresh loop; runs on its own
/// thread like the TUI input side of the runtime bridge.
fn key_loop(input_tx: mpsc::Sender<UserInput>) {
    loop {
        match event::poll(Duration::from_millis(200)) {
            Ok(true) => {}
            Ok(false) => continue,
            Err(_) => break,
        }
        let key = match event::read() {
            Ok(Event::Key(key)) => key,
            Ok(_) => continue,
            Err(_) => break,
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        let input = match (key.code, key.modifiers) {
            (KeyCode::Char('r'), _) => UserInput::ToggleRefresh,
            (KeyCode::Char('f'), _) => UserInput::ToggleFilter,
            (KeyCode::Char('q'), _) | (KeyCode::Esc, _) => UserInput::Quit,
            (KeyCode::Char('c'), mods) if mods.contains(KeyModifiers::CONTROL) => UserInput::Quit,
            _ => continue,
        };
        let quit = input == UserInput::Quit;
        if input_tx.blocking_send(input).is_err() || quit {
            break;
        }
    }
}

fn draw_entries(entries: &[FragmentEntry]) {
    let mut out = io::stdout();
    // Raw mode needs explicit carriage returns.
    let _ = write!(
        out,
        "\r\n── recent blocks ({} shown) ──  r: toggle refresh  f: toggle filter  q: quit\r\n",
        entries.len()
    );
    for entry in entries {
        let _ = write!(
            out,
            "#{:<10} {:>3} tx  {}\r\n",
            entry.number, entry.tx_count, entry.hash
        );
    }
    let _ = out.flush();
}

fn normalize_http_endpoint(endpoint: &str) -> String {
    let trimmed = endpoint.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}
