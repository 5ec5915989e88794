use anyhow::Result;
use console::style;
use std::path::PathBuf;

use crate::core::config::AppConfig;
use crate::core::store::Store;
use crate::core::terminal::{print_error, print_info, print_status, print_success, print_warn};
use crate::core::training::provider::HttpProvider;
use crate::core::training::{Outcome, reconcile_with_provider};
use crate::interfaces::web;
use crate::logging;

pub async fn run_main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();

    match args.get(1).map(String::as_str) {
        None | Some("serve") => serve(&args).await,
        Some("reconcile") => reconcile(&args).await,
        Some("help" | "--help" | "-h") => {
            print_guide();
            Ok(())
        }
        Some(other) => {
            print_error(&format!("Unknown command '{}'. Try 'faceforge help'.", other));
            std::process::exit(2);
        }
    }
}

fn parse_flags(args: &[String], from: usize) -> Result<AppConfig> {
    let mut config_path: Option<PathBuf> = None;
    let mut api_host: Option<String> = None;
    let mut api_port: Option<u16> = None;

    let mut i = from;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 2;
                } else {
                    i += 1;
                }
            }
            "--api-host" => {
                if i + 1 < args.len() {
                    api_host = Some(args[i + 1].clone());
                    i += 2;
                } else {
                    i += 1;
                }
            }
            "--api-port" => {
                if i + 1 < args.len() {
                    api_port = args[i + 1].parse().ok();
                    i += 2;
                } else {
                    i += 1;
                }
            }
            _ => i += 1,
        }
    }

    let mut config = AppConfig::load(config_path.as_deref())?;
    if let Some(host) = api_host {
        config.api_host = host;
    }
    if let Some(port) = api_port {
        config.api_port = port;
    }
    Ok(config)
}

async fn serve(args: &[String]) -> Result<()> {
    logging::init_tracing();
    let config = parse_flags(args, 2)?;

    print_status("store", &config.db_path().display().to_string());
    print_status("provider", &config.provider.base_url);
    web::serve(config).await
}

/// Force a polling pass for one job, regardless of staleness. Useful when a
/// webhook delivery is known to have been missed.
async fn reconcile(args: &[String]) -> Result<()> {
    logging::init_tracing();
    let Some(job_id) = args.get(2).filter(|a| !a.starts_with("--")) else {
        print_error("Usage: faceforge reconcile <job-id>");
        std::process::exit(2);
    };

    let config = parse_flags(args, 3)?;

    let store = Store::open(config.db_path())?;
    let provider = HttpProvider::new(&config.provider)?;
    let now = chrono::Utc::now().timestamp();

    match reconcile_with_provider(&store, &provider, job_id, now).await? {
        Outcome::Transitioned(status) => {
            print_success(&format!("Job {} transitioned to {}", job_id, status.as_str()));
        }
        Outcome::StillProcessing => {
            print_info(&format!("Job {} is still processing at the provider", job_id));
        }
        Outcome::AlreadyTerminal => {
            print_warn(&format!("Job {} was already in a terminal state", job_id));
        }
    }
    Ok(())
}

fn print_guide() {
    println!("{}", style("faceforge - personalized model training backend").bold());
    println!();
    println!("Usage: faceforge <command> [flags]");
    println!();
    println!("Commands:");
    println!("  serve               Run the API server (default)");
    println!("  reconcile <job-id>  Force a provider poll for one training job");
    println!("  help                Show this guide");
    println!();
    println!("Flags:");
    println!("  --config <path>     Config file (default: ./faceforge.toml)");
    println!("  --api-host <host>   Bind host (default: 127.0.0.1)");
    println!("  --api-port <port>   Bind port (default: 8920)");
}
