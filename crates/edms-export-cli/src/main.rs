//! edms-export - export ASEE EDMS report queries to CSV from the command line.
//!
//! Uses the session cookie saved from the previous run and logs in again
//! (once) when the server has expired it.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use edms_export_core::{
    run_export, ApiClient, Config, ConfigFile, CredentialStore, Credentials, ExportRequest,
    QuerySpec,
};

/// Environment variable overriding the configured username
const USERNAME_ENV: &str = "EDMS_USERNAME";

/// Environment variable overriding the configured password
const PASSWORD_ENV: &str = "EDMS_PASSWORD";

/// Export a stored EDMS report query to a CSV file
#[derive(Parser, Debug)]
#[command(name = "edms-export")]
#[command(version)]
#[command(about = "Export ASEE EDMS report query results to CSV")]
struct Args {
    /// Model id of the report (prompted for when omitted)
    #[arg(short, long)]
    model_id: Option<String>,

    /// Query id of the report (prompted for when omitted)
    #[arg(short, long)]
    query_id: Option<String>,

    /// Output file; relative names go under the configured output_dir
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Path to the configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Also write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Save a prompted password in the OS keychain after a successful export
    #[arg(long)]
    save_password: bool,
}

/// Where the password came from, so a prompted one can be saved afterwards
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PasswordSource {
    Environment,
    ConfigFile,
    Keychain,
    Prompt,
}

/// Initialize the tracing subscriber for logging.
/// Use RUST_LOG to control the level (e.g., RUST_LOG=debug).
fn init_tracing(log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let stderr_layer = fmt::layer().with_writer(io::stderr);

    let Some(path) = log_file else {
        tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer)
            .init();
        return Ok(None);
    };

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("--log-file must name a file: {}", path.display()))?;

    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .init();

    Ok(Some(guard))
}

fn prompt_line(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

/// Use the value given on the command line, or ask for it
fn value_or_prompt(value: Option<String>, label: &str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => prompt_line(label),
    }
}

/// Environment first, then the config file, then the keychain, then a prompt
fn resolve_credentials(config: &Config) -> Result<(Credentials, PasswordSource)> {
    let username = match std::env::var(USERNAME_ENV)
        .ok()
        .filter(|u| !u.is_empty())
        .or_else(|| config.username.clone())
    {
        Some(username) => username,
        None => prompt_line("Username: ")?,
    };

    if let Some(password) = std::env::var(PASSWORD_ENV).ok().filter(|p| !p.is_empty()) {
        return Ok((Credentials::new(username, password), PasswordSource::Environment));
    }
    if let Some(ref password) = config.password {
        return Ok((
            Credentials::new(username, password.clone()),
            PasswordSource::ConfigFile,
        ));
    }
    if let Ok(password) = CredentialStore::get_password(&username) {
        return Ok((Credentials::new(username, password), PasswordSource::Keychain));
    }

    let password = rpassword::prompt_password("Password: ")?;
    Ok((Credentials::new(username, password), PasswordSource::Prompt))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    let _log_guard = init_tracing(args.log_file.as_deref())?;
    info!("edms-export starting");

    let mut config_file = match args.config {
        Some(ref path) => ConfigFile::open(path)?,
        None => ConfigFile::open_default()?,
    };

    let model_id = value_or_prompt(args.model_id, "Enter your model_id: ")?;
    let query_id = value_or_prompt(args.query_id, "Enter your query_id: ")?;
    let output = value_or_prompt(
        args.output.map(|p| p.to_string_lossy().into_owned()),
        "Enter your output filename: ",
    )?;
    if output.is_empty() {
        anyhow::bail!("An output filename is required");
    }

    let request = ExportRequest {
        query: QuerySpec::new(model_id, query_id)?,
        destination: config_file.config.resolve_output(Path::new(&output)),
    };

    let (credentials, password_source) = resolve_credentials(&config_file.config)?;

    let client = ApiClient::with_endpoints(
        config_file.config.endpoints(),
        config_file.config.request_timeout(),
    )?;

    println!(
        "Exporting results for model_id {} and query_id {}",
        request.query.model_id(),
        request.query.query_id()
    );

    let cached = config_file.config.session.clone();
    let outcome = match run_export(&client, &credentials, cached.as_ref(), &request, &mut config_file).await {
        Ok(outcome) => outcome,
        Err(e) => {
            if e.is_query_failure() {
                eprintln!(
                    "There was an error in your query. Please check that your model_id and query_id are correct."
                );
            }
            return Err(e).context("Export failed");
        }
    };

    if outcome.refreshed_token.is_some() {
        if outcome.persisted {
            println!(
                "Session cookie was refreshed and saved to {}",
                config_file.path().display()
            );
        } else {
            eprintln!(
                "Session cookie was refreshed but could not be saved to {}; the next run will log in again",
                config_file.path().display()
            );
        }
    }

    if args.save_password && password_source == PasswordSource::Prompt {
        if let Err(e) = CredentialStore::store(&credentials.username, &credentials.password) {
            warn!(error = %e, "Failed to store password in keychain");
        }
    }

    println!(
        "Export complete. Results can be found in {}",
        outcome.summary.destination.display()
    );
    info!(rows = outcome.summary.rows, "edms-export finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parse_all_flags() {
        let args = Args::try_parse_from([
            "edms-export",
            "--model-id",
            "m1",
            "--query-id",
            "q1",
            "--output",
            "report.csv",
            "--config",
            "/tmp/config.json",
            "--save-password",
        ])
        .expect("args parse");

        assert_eq!(args.model_id.as_deref(), Some("m1"));
        assert_eq!(args.query_id.as_deref(), Some("q1"));
        assert_eq!(args.output, Some(PathBuf::from("report.csv")));
        assert_eq!(args.config, Some(PathBuf::from("/tmp/config.json")));
        assert!(args.save_password);
        assert!(args.log_file.is_none());
    }

    #[test]
    fn test_args_all_optional() {
        let args = Args::try_parse_from(["edms-export"]).expect("args parse");
        assert!(args.model_id.is_none());
        assert!(args.query_id.is_none());
        assert!(args.output.is_none());
        assert!(!args.save_password);
    }

    #[test]
    fn test_value_or_prompt_uses_given_value() {
        let value = value_or_prompt(Some("m1".to_string()), "unused: ").expect("value");
        assert_eq!(value, "m1");
    }
}
