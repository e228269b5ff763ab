// SPDX-FileCopyrightText: 2026 Modelgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! modelgate - a self-hosted LLM gateway.
//!
//! Binary entry point. `modelgate start` launches the proxy. Exit codes:
//! 0 normal, 64 configuration error, 70 fatal runtime error.

use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, info};

const EXIT_CONFIG: u8 = 64;
const EXIT_RUNTIME: u8 = 70;

/// modelgate - a self-hosted LLM gateway.
#[derive(Parser, Debug)]
#[command(name = "modelgate", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the gateway proxy.
    Start,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Start => start().await,
    }
}

async fn start() -> ExitCode {
    let config = match modelgate_config::load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    init_tracing(&config.server.log_level);

    let routing = match modelgate_config::validate_config(&config) {
        Ok(routing) => routing,
        Err(errors) => {
            for message in &errors {
                error!("configuration error: {message}");
            }
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    info!(
        provider = %routing.primary,
        mode = ?routing.mode,
        tier_routing = routing.tiers.is_some(),
        fallback = ?routing.fallback,
        "starting modelgate"
    );

    let prometheus_render = match modelgate_prometheus::PrometheusRecorder::install() {
        Ok(recorder) => {
            let recorder = Arc::new(recorder);
            Some(Arc::new(move || recorder.render()) as Arc<dyn Fn() -> String + Send + Sync>)
        }
        Err(e) => {
            error!("metrics disabled: {e}");
            None
        }
    };

    let host = config.server.host.clone();
    let port = config.server.port;
    let memory_config = config.memory.clone();

    let state = match modelgate_gateway::build_state(config, routing, prometheus_render).await {
        Ok(state) => state,
        Err(e) => {
            error!("failed to build gateway: {e}");
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    let _maintenance = state.memory.as_ref().map(|memory| {
        modelgate_memory::spawn_maintenance_task(Arc::clone(&memory.store), memory_config)
    });

    match modelgate_gateway::start_server(&host, port, state).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("fatal: {e}");
            ExitCode::from(EXIT_RUNTIME)
        }
    }
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("modelgate={log_level},info")));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_start() {
        let cli = Cli::try_parse_from(["modelgate", "start"]).unwrap();
        assert!(matches!(cli.command, Commands::Start));
    }

    #[test]
    fn cli_rejects_unknown_subcommand() {
        assert!(Cli::try_parse_from(["modelgate", "launch"]).is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn exit_codes_follow_sysexits() {
        assert_eq!(EXIT_CONFIG, 64);
        assert_eq!(EXIT_RUNTIME, 70);
    }
}
