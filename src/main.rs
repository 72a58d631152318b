use std::sync::Arc;
use std::sync::atomic::Ordering;

use vulture::config::RelayConfig;
use vulture::error::{Error, Result};
use vulture::pidfile::PidFile;
use vulture::relay::{RelayPoller, spawn_relay_poller};
use vulture::slack::SlackClient;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        if matches!(e, Error::Config(_)) {
            eprintln!("  export SLACK_BOT_TOKEN=xoxb-...");
            eprintln!("  export VULTURE_MONITOR_CHANNEL=C0123456789");
            eprintln!("  export VULTURE_NOTIFY_CHANNEL=C9876543210");
            eprintln!("  export VULTURE_TRIGGER_WORDS=urgent,outage");
        }
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let config = RelayConfig::from_env()?;

    let pid_path = config.pid_file_path();
    let _pid_file = PidFile::acquire(&pid_path)?;

    eprintln!("🦅 Vulture v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Watching: {}", config.monitor_channel);
    eprintln!("   Relaying to: {}", config.notify_channel);
    eprintln!(
        "   Triggers: {} ({})",
        config.trigger_words.join(", "),
        if config.case_insensitive {
            "case-insensitive"
        } else {
            "case-sensitive"
        }
    );
    eprintln!("   Poll interval: {}s", config.poll_interval.as_secs());
    eprintln!("   PID file: {}\n", pid_path.display());

    let client = Arc::new(SlackClient::from_config(&config)?);
    let mut poller = RelayPoller::from_config(&config, client.clone());
    if config.resolve_users {
        poller = poller.with_user_directory(client);
    }

    let (handle, shutdown) = spawn_relay_poller(poller);

    shutdown_signal().await?;
    tracing::info!("Shutdown signal received, finishing current poll");
    shutdown.store(true, Ordering::Relaxed);
    handle.await?;

    Ok(())
}

/// Resolve on Ctrl-C or SIGTERM.
#[cfg(unix)]
async fn shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut term = signal(SignalKind::terminate())?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => res,
        _ = term.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
