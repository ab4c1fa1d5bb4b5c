/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 *
 * (c) 2024 The Nightjar Authors.
 */

//! Entry point: parse the CLI (§6), open the data directory, wire up the
//! session-source connection and raw injection socket, and either run the
//! epoch loop in the foreground or service a one-shot operator command.

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use nightjar_service::control_loop;
use nightjar_service::datadir::DataDir;
use nightjar_service::engine::Engine;
use nightjar_service::firmware_recovery::{FirmwareRecovery, NullRecovery, ShellScriptRecovery};
use nightjar_service::persistence;
use nightjar_service::settings::{Cli, Command};

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

fn build_firmware_recovery(script: Option<&str>) -> Arc<dyn FirmwareRecovery + Send + Sync> {
    match script {
        Some(path) => Arc::new(ShellScriptRecovery::new(path)),
        None => Arc::new(NullRecovery),
    }
}

/// Connect to the session source's Unix domain socket (§6). Failing to open
/// this connection, like failing to open the raw injection socket, is one of
/// the two fatal startup conditions named in §7.
async fn connect_session_source(socket_path: &str) -> std::io::Result<Arc<dyn nightjar_session::SessionSource + Send + Sync>> {
    let stream = tokio::net::UnixStream::connect(socket_path).await?;
    Ok(Arc::new(nightjar_session::TextLineSessionSource::new(stream)))
}

#[cfg(target_os = "linux")]
fn build_injector(interface: &str) -> Result<Arc<dyn nightjar_session::RawInjector + Send + Sync>, nightjar_session::InjectError> {
    Ok(Arc::new(nightjar_session::PacketSocketInjector::bind(interface)?))
}

#[cfg(not(target_os = "linux"))]
fn build_injector(_interface: &str) -> Result<Arc<dyn nightjar_session::RawInjector + Send + Sync>, nightjar_session::InjectError> {
    Ok(Arc::new(nightjar_session::NullInjector::default()))
}

async fn build_engine(data_dir: &DataDir) -> std::io::Result<Engine> {
    let config = data_dir.config().await.clone();

    let session = connect_session_source(&config.session_socket_path).await?;
    let injector = build_injector(&config.monitor_interface).map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    let firmware_recovery = build_firmware_recovery(config.firmware_recovery_script.as_deref());

    let crack_state_path = data_dir.crack_state_path();
    let crack_state = nightjar_crack::CrackState::load(&crack_state_path).unwrap_or_else(|err| {
        tracing::warn!(%err, "crack state file unreadable; starting with an empty history");
        nightjar_crack::CrackState::empty(&crack_state_path)
    });
    let (totals, mode_bandit, loaded_entities) = persistence::load_or_default(&data_dir.bandit_state_path());

    Ok(Engine::new(config, session, injector, firmware_recovery, crack_state, totals, mode_bandit, loaded_entities))
}

async fn run(base_path: std::path::PathBuf) -> i32 {
    let data_dir = match DataDir::open(&base_path).await {
        Ok(d) => d,
        Err(err) => {
            tracing::error!(%err, path = %base_path.display(), "failed to open data directory");
            return 1;
        }
    };

    let mut engine = match build_engine(&data_dir).await {
        Ok(e) => e,
        Err(err) => {
            tracing::error!(%err, "failed to start: session source or raw injection socket unavailable");
            return 1;
        }
    };

    let shutdown = tokio::signal::ctrl_c();
    tokio::select! {
        _ = control_loop::run(&mut engine, &data_dir) => {}
        _ = shutdown => {
            tracing::info!("interrupt received, shutting down");
            engine.running = false;
        }
    }
    0
}

async fn status(base_path: std::path::PathBuf) -> i32 {
    let path = base_path.join("bandits.tsbr");
    let (totals, _mode_bandit, entities) = persistence::load_or_default(&path);
    let snapshot = serde_json::json!({
        "epoch_num": totals.epoch_num,
        "total_handshakes": totals.total_handshakes,
        "entities_tracked": entities.len(),
    });
    println!("{}", serde_json::to_string_pretty(&snapshot).unwrap_or_default());
    0
}

async fn reset_bandits(base_path: std::path::PathBuf) -> i32 {
    let path = base_path.join("bandits.tsbr");
    match std::fs::remove_file(&path) {
        Ok(()) => {
            println!("bandit state reset to neutral priors");
            0
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            println!("no bandit state file found; already neutral");
            0
        }
        Err(err) => {
            eprintln!("failed to remove {}: {err}", path.display());
            1
        }
    }
}

async fn async_main(cli: Cli) -> i32 {
    let base_path = cli.base_path();
    match cli.command() {
        Command::Run => run(base_path).await,
        Command::Status => status(base_path).await,
        Command::ResetBandits => reset_bandits(base_path).await,
    }
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let code = tokio::runtime::Builder::new_multi_thread().enable_all().build().unwrap().block_on(async_main(cli));
    std::process::exit(code);
}
