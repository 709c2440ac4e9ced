#![deny(clippy::pedantic, clippy::all, clippy::nursery)]
#![allow(clippy::must_use_candidate)]

use popgate::{config::Config, controller::Controller};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = find_config_file()?;
    let config = Config::from_file(&config_path)?;

    Controller::from(config).run().await
}

/// Find the configuration file using the following precedence:
/// 1. `POPGATE_CONFIG` environment variable
/// 2. ./popgate.toml (current working directory)
/// 3. /etc/popgate/popgate.toml (system-wide config)
fn find_config_file() -> anyhow::Result<std::path::PathBuf> {
    if let Ok(env_path) = std::env::var("POPGATE_CONFIG") {
        let path = std::path::PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        anyhow::bail!(
            "POPGATE_CONFIG points to non-existent file: {}",
            path.display()
        );
    }

    let default_paths = vec![
        std::path::PathBuf::from("./popgate.toml"),
        std::path::PathBuf::from("/etc/popgate/popgate.toml"),
    ];

    for path in &default_paths {
        if path.exists() {
            return Ok(path.clone());
        }
    }

    let paths_tried = default_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    anyhow::bail!(
        "No configuration file found. Tried:\n  - POPGATE_CONFIG environment variable\n{paths_tried}"
    )
}
