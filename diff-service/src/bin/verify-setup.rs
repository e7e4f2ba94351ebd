//! Checks that the configured bucket can be written to and cleaned up.
//!
//! Run with the same environment as the service:
//! `cargo run -p diff-service --bin verify-setup`

use diff_service::config::DiffConfig;
use diff_service::services::setup_check::{run_setup_check, TEST_OBJECT_NAME};
use diff_service::startup::build_storage_from_config;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    println!("--- Running setup check ---");

    let config = match DiffConfig::load() {
        Ok(config) => config,
        Err(e) => {
            println!("ERROR: could not load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    println!(
        "- Project '{}', region '{}', storage backend {:?}",
        config.gcp.project_id, config.gcp.region, config.storage.backend
    );

    let store = match build_storage_from_config(&config).await {
        Ok(store) => store,
        Err(e) => {
            println!("ERROR: could not create storage client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    println!("- Checking access to bucket '{}'...", config.storage.bucket);
    match run_setup_check(store.as_ref()).await {
        Ok(steps) => {
            for step in steps {
                println!("  - {}: ok", step.describe());
            }
            println!();
            println!("Setup verification successful.");
            println!("- Uploaded, found and deleted '{}'.", TEST_OBJECT_NAME);
            ExitCode::SUCCESS
        }
        Err(failure) => {
            println!("ERROR: {}", failure);
            println!(
                "Check the bucket name and that the service account can create and delete objects."
            );
            ExitCode::FAILURE
        }
    }
}
