//! # Command Line Interface
//!
//! Runs a single rotation step, either from flags or from a scheduler event
//! file:
//!
//! ```text
//! db-secret-rotator --secret-id db/app --token 3f2a... --step createSecret
//! db-secret-rotator --event event.json
//! ```

use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};

use crate::domain::{RotationRequest, RotationStep};

#[derive(Parser, Debug)]
#[command(name = "db-secret-rotator")]
#[command(about = "Rotate a database credential held in a versioned secret store")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Scheduler event JSON (`ClientRequestToken`, `SecretId`, `Step`)
    #[arg(long, conflicts_with_all = ["secret_id", "token", "step"])]
    pub event: Option<PathBuf>,

    /// Secret identifier or ARN
    #[arg(long, required_unless_present = "event")]
    pub secret_id: Option<String>,

    /// Client request token of the rotation attempt
    #[arg(long, required_unless_present = "event")]
    pub token: Option<String>,

    /// Step to run (createSecret, setSecret, testSecret, finishSecret)
    #[arg(long, required_unless_present = "event", value_parser = parse_step)]
    pub step: Option<RotationStep>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

fn parse_step(value: &str) -> Result<RotationStep, String> {
    value.parse().map_err(|e: crate::Error| e.to_string())
}

impl Cli {
    /// Build the step request from the event file or the flags
    pub fn request(&self) -> anyhow::Result<RotationRequest> {
        if let Some(path) = &self.event {
            return load_event(path);
        }

        match (&self.secret_id, &self.token, self.step) {
            (Some(secret_id), Some(token), Some(step)) => {
                Ok(RotationRequest::new(secret_id, token, step))
            }
            _ => anyhow::bail!("--secret-id, --token and --step are required without --event"),
        }
    }
}

/// Read a scheduler event from a JSON file
pub fn load_event(path: &Path) -> anyhow::Result<RotationRequest> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read event file {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Invalid rotation event in {}", path.display()))
}

/// Run one rotation step against AWS Secrets Manager
#[cfg(feature = "aws")]
pub async fn run_cli() -> anyhow::Result<()> {
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;
    use tracing::{info, warn};

    use crate::config::RotatorConfig;
    use crate::engines::EngineRotatorRegistry;
    use crate::observability::{init_logging, RotationMetrics};
    use crate::rotation::SecretRotator;
    use crate::secrets::AwsSecretsManagerStore;

    let cli = Cli::parse();
    let request = cli.request()?;

    let mut config = RotatorConfig::from_env().context("Invalid configuration")?;
    if cli.verbose {
        config.observability.log_level = "debug".to_string();
    }
    init_logging(&config.observability)?;

    let store = AwsSecretsManagerStore::from_config(&config.store).await?;
    let rotator = SecretRotator::new(
        Arc::new(store),
        EngineRotatorRegistry::with_defaults(&config.engines),
        config.password.clone(),
    )
    .with_metrics(RotationMetrics::from_config(&config.observability));

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling rotation step");
            on_signal.cancel();
        }
    });

    let outcome = rotator.handle_with_cancellation(&request, &cancel).await?;
    info!(
        secret_id = %request.secret_id,
        step = %request.step,
        outcome = %outcome,
        "Done"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;
    use std::io::Write;

    #[test]
    fn test_request_from_flags() {
        let cli = Cli::try_parse_from([
            "db-secret-rotator",
            "--secret-id",
            "db/app",
            "--token",
            "t-1",
            "--step",
            "testSecret",
        ])
        .unwrap();

        let request = cli.request().unwrap();
        assert_eq!(request, RotationRequest::new("db/app", "t-1", RotationStep::TestSecret));
    }

    #[test]
    fn test_rejects_unknown_step() {
        let result = Cli::try_parse_from([
            "db-secret-rotator",
            "--secret-id",
            "db/app",
            "--token",
            "t-1",
            "--step",
            "rollbackSecret",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_event_conflicts_with_flags() {
        let result = Cli::try_parse_from([
            "db-secret-rotator",
            "--event",
            "event.json",
            "--step",
            "setSecret",
        ]);
        assert!(result.is_err());

        let result = Cli::try_parse_from(["db-secret-rotator", "--secret-id", "db/app"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_request_from_event_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"ClientRequestToken":"t-9","SecretId":"arn:aws:secretsmanager:eu-west-1:1:secret:db","Step":"finishSecret"}}"#
        )
        .unwrap();

        let cli = Cli::try_parse_from([
            OsStr::new("db-secret-rotator"),
            OsStr::new("--event"),
            file.path().as_os_str(),
        ])
        .unwrap();
        let request = cli.request().unwrap();

        assert_eq!(request.step, RotationStep::FinishSecret);
        assert_eq!(request.client_request_token, "t-9");
    }

    #[test]
    fn test_invalid_event_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"SecretId":"db/app","Step":"fixSecret"}}"#).unwrap();

        let err = load_event(file.path()).unwrap_err();
        assert!(err.to_string().contains("Invalid rotation event"));

        assert!(load_event(Path::new("/nonexistent/event.json")).is_err());
    }
}
