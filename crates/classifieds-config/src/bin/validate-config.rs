//! Config validation CLI tool
//!
//! Validates a classifiedsd configuration file and reports any errors.

use classifieds_util::{default_config_path, format_duration};
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let config_path = match args.get(1) {
        Some(path) => PathBuf::from(path),
        None => {
            let default_path = default_config_path();
            eprintln!("Usage: validate-config [config-file]");
            eprintln!();
            eprintln!("Validates a classifiedsd configuration file.");
            eprintln!();
            eprintln!("If no path is provided, uses: {}", default_path.display());
            return ExitCode::from(2);
        }
    };

    if !config_path.exists() {
        eprintln!("Error: Configuration file not found: {}", config_path.display());
        return ExitCode::from(1);
    }

    match classifieds_config::load_config(&config_path) {
        Ok(config) => {
            let lifecycle = &config.lifecycle;
            println!("✓ Configuration is valid");
            println!();
            println!("Summary:");
            println!("  Config version: {}", classifieds_config::CURRENT_CONFIG_VERSION);
            println!("  Sweep interval: {}s", config.service.sweep_interval.as_secs());
            println!("  Workers: {}", config.service.workers);
            println!("  Listing grace: {}", format_duration(lifecycle.listing_grace));
            println!("  Store grace: {}", format_duration(lifecycle.store_grace));
            println!(
                "  Store archive after: {}",
                format_duration(lifecycle.store_archive_after)
            );
            println!(
                "  Payments: {}",
                config.payments.endpoint.as_deref().unwrap_or("(not configured)")
            );

            println!();
            println!("Packages:");
            for package in lifecycle.packages() {
                println!(
                    "  - {} [{}]: {}{}",
                    package.ad_type,
                    format_duration(package.duration),
                    package.price,
                    if package.allows_promotion { ", promotable" } else { "" }
                );
            }

            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed");
            eprintln!();
            match &e {
                classifieds_config::ConfigError::ReadError(io_err) => {
                    eprintln!("Failed to read file: {}", io_err);
                }
                classifieds_config::ConfigError::ParseError(parse_err) => {
                    eprintln!("TOML parse error:");
                    eprintln!("  {}", parse_err);
                }
                classifieds_config::ConfigError::ValidationFailed { errors } => {
                    eprintln!("Validation errors ({}):", errors.len());
                    for err in errors {
                        eprintln!("  - {}", err);
                    }
                }
                classifieds_config::ConfigError::UnsupportedVersion(ver) => {
                    eprintln!(
                        "Unsupported config version: {} (expected {})",
                        ver,
                        classifieds_config::CURRENT_CONFIG_VERSION
                    );
                }
            }
            ExitCode::from(1)
        }
    }
}
