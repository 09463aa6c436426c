#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "mic_monitor_rs=info";

fn main() -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    run()
}

#[cfg(windows)]
fn run() -> anyhow::Result<()> {
    use mic_monitor_rs::{app, MonitorConfig, RegistryPreferences};
    use tracing::{info, warn};

    let preferences = RegistryPreferences::new();
    let config = match preferences.load() {
        Ok(config) => config,
        Err(e) => {
            warn!(error = %e, "Using default preferences");
            MonitorConfig::default()
        }
    };

    // Write back so every value is present in the registry for editing
    if let Err(e) = preferences.save(&config) {
        warn!(error = %e, "Failed to save preferences");
    }
    info!(?config, "Starting microphone monitor");

    app::run(config)
}

#[cfg(not(windows))]
fn run() -> anyhow::Result<()> {
    anyhow::bail!("Microphone Monitor only runs on Windows")
}
