use std::env;
use std::path::PathBuf;
use tracing::{error, info};

use review_export::jobs::JobOperation;
use review_export::remote::RemoteManager;
use review_export::review::VersionPublisher;
use review_export::Config;

#[tokio::main]
async fn main() {
    // Use RUST_LOG env var if set, otherwise default to info level
    let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt().with_env_filter(log_filter).init();

    let args: Vec<String> = env::args().collect();

    let mut job_path: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--job" | "--config" => {
                if i + 1 >= args.len() {
                    error!("{} requires a file path", args[i]);
                    print_usage(&args[0]);
                    std::process::exit(2);
                }
                let path = PathBuf::from(&args[i + 1]);
                if args[i] == "--job" {
                    job_path = Some(path);
                } else {
                    config_path = Some(path);
                }
                i += 2;
            }
            _ => {
                error!("Unknown argument: {}", args[i]);
                print_usage(&args[0]);
                std::process::exit(2);
            }
        }
    }

    let Some(job_path) = job_path else {
        error!("No job file specified");
        print_usage(&args[0]);
        std::process::exit(2);
    };

    let config = match &config_path {
        Some(path) => Config::from_json_file(path),
        None => Config::load(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(2);
        }
    };

    let operation: JobOperation = match std::fs::read_to_string(&job_path)
        .map_err(|e| e.to_string())
        .and_then(|content| serde_json::from_str(&content).map_err(|e| e.to_string()))
    {
        Ok(operation) => operation,
        Err(e) => {
            error!("Failed to read job {}: {}", job_path.display(), e);
            std::process::exit(2);
        }
    };

    let remote = match RemoteManager::new(&config.remote_url, config.api_key.clone()) {
        Ok(remote) => remote,
        Err(e) => {
            error!("Failed to create remote client: {}", e);
            std::process::exit(2);
        }
    };

    let publisher = VersionPublisher::from_config(&config, remote);

    match operation {
        JobOperation::PublishVersion(payload) => {
            match publisher.publish(&payload.asset, &payload.comment).await {
                Ok(outcome) => {
                    info!(
                        "Published version {} under {} {}",
                        outcome.version.id, outcome.parent.entity_type, outcome.parent.id
                    );
                }
                Err(e) => {
                    error!("Publish failed: {}", e);
                    // 75 (EX_TEMPFAIL) tells the job service a retry may succeed
                    std::process::exit(if e.is_retryable() { 75 } else { 1 });
                }
            }
        }
    }
}

fn print_usage(program_name: &str) {
    eprintln!("Usage:");
    eprintln!("  {} --job <job.json> [--config <config.json>]", program_name);
    eprintln!();
    eprintln!("The job file holds a serialized publish operation, e.g.");
    eprintln!(r#"  {{"operation": "publish_version", "arguments": {{"asset": {{...}}, "comment": "..."}}}}"#);
}
