//! LED Remote Control
//!
//! Serves the control screen, or watches / commands the LED from the terminal.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use led_remote_control::{
    api, bus, config,
    screen::LedController,
    Command, LedEvent, ScreenView,
};

#[derive(Parser)]
#[command(name = "led-remote-control", version, about = "Mirror and toggle a remote ESP32 LED")]
struct Cli {
    /// Config file (defaults to config.toml in the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Cmd>,
}

#[derive(Subcommand)]
enum Cmd {
    /// Serve the control screen and API (default)
    Serve {
        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Print LED state changes until interrupted
    Watch,
    /// Write a single command ("on" or "off")
    Send { command: Command },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "led_remote_control=debug,tower_http=debug,axum::rejection=trace".into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = config::load_config(cli.config.as_deref())?;
    tracing::info!(?config, "Configuration loaded");

    let paths = config.led_paths()?;
    let command = cli.command.unwrap_or(Cmd::Serve { port: None });

    // The screen reports a broken store itself; the terminal commands fail fast
    let store = match command {
        Cmd::Serve { .. } => config.build_store_or_unconfigured(),
        Cmd::Watch | Cmd::Send { .. } => config.build_store()?,
    };
    tracing::info!(
        store = store.name(),
        command_path = %paths.command,
        state_path = %paths.state,
        "Store initialized"
    );
    let controller = Arc::new(LedController::new(store, paths, bus::create_bus()));

    match command {
        Cmd::Serve { port } => serve(controller, port.unwrap_or(config.port)).await,
        Cmd::Watch => watch(controller).await,
        Cmd::Send { command } => send(controller, command).await,
    }
}

async fn serve(controller: Arc<LedController>, port: u16) -> Result<()> {
    let app = api::router(api::AppState::new(controller.clone()));

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Listening on {}", addr);

    // Serve the loading view while the subscription is being opened
    let mounting = {
        let controller = controller.clone();
        tokio::spawn(async move {
            if let Err(e) = controller.mount().await {
                tracing::warn!("LED state subscription not started: {}", e);
            }
        })
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    mounting.abort();
    controller.unmount().await;
    tracing::info!("Shut down");
    Ok(())
}

async fn watch(controller: Arc<LedController>) -> Result<()> {
    let mut rx = controller.bus().subscribe();
    controller.mount().await?;

    let result = loop {
        tokio::select! {
            _ = shutdown_signal() => break Ok(()),
            event = rx.recv() => match event {
                Ok(LedEvent::ViewChanged(snapshot)) => match snapshot.view {
                    ScreenView::Loading => println!("loading..."),
                    ScreenView::Ready { led_state } => println!("LED: {}", led_state.display_label()),
                    ScreenView::Error { message } => {
                        println!("error: {}", message);
                        break Err(anyhow::anyhow!(message));
                    }
                },
                Ok(_) => {}
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    tracing::debug!("Watcher lagged by {} events", n);
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break Ok(()),
            },
        }
    };

    controller.unmount().await;
    result
}

async fn send(controller: Arc<LedController>, command: Command) -> Result<()> {
    let notice = controller.send_command(command).await;
    println!("{}: {}", notice.title, notice.message);
    if notice.is_success() {
        Ok(())
    } else {
        Err(anyhow::anyhow!(notice.message))
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Ctrl-C received, shutting down");
}
