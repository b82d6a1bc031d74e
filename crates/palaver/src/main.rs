// SPDX-FileCopyrightText: 2026 Palaver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Palaver - a terminal chat client over a hosted backend.
//!
//! This is the binary entry point.

mod shell;

use clap::{Parser, Subcommand};
use palaver_config::PalaverConfig;

/// Palaver - a terminal chat client over a hosted backend.
#[derive(Parser, Debug)]
#[command(name = "palaver", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Launch the interactive chat shell (the default).
    Shell,
    /// Print the resolved configuration, with keys redacted.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load and validate configuration at startup.
    let config = match palaver_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            palaver_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config);

    let result = match cli.command.unwrap_or(Commands::Shell) {
        Commands::Shell => shell::run_shell(config).await,
        Commands::Config => print_config(&config),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

/// Installs the log subscriber. `RUST_LOG` wins over the configured level.
fn init_tracing(config: &PalaverConfig) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.app.log_level.clone()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_config(config: &PalaverConfig) -> Result<(), palaver_core::PalaverError> {
    let rendered = toml::to_string_pretty(&redacted(config))
        .map_err(|e| palaver_core::PalaverError::Internal(format!("unrenderable config: {e}")))?;
    println!("{rendered}");
    Ok(())
}

/// A copy safe to print: keys are replaced, never shown.
fn redacted(config: &PalaverConfig) -> PalaverConfig {
    let mut copy = config.clone();
    if copy.backend.anon_key.is_some() {
        copy.backend.anon_key = Some("<set>".to_string());
    }
    if copy.backend.service_role_key.is_some() {
        copy.backend.service_role_key = Some("<set>".to_string());
    }
    copy
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn binary_loads_config_defaults() {
        // Verify config loads with defaults (no config file needed).
        let config = palaver_config::load_and_validate().expect("default config should be valid");
        assert_eq!(config.app.name, "palaver");
    }

    #[test]
    fn redaction_hides_keys_but_keeps_structure() {
        let mut config = PalaverConfig::default();
        config.backend.anon_key = Some("real-anon".to_string());
        config.backend.service_role_key = Some("real-service".to_string());

        let safe = redacted(&config);
        assert_eq!(safe.backend.anon_key.as_deref(), Some("<set>"));
        assert_eq!(safe.backend.service_role_key.as_deref(), Some("<set>"));
        assert_eq!(safe.backend.url, config.backend.url);

        // Unset keys stay unset rather than gaining a marker.
        let safe = redacted(&PalaverConfig::default());
        assert!(safe.backend.anon_key.is_none());
    }
}
