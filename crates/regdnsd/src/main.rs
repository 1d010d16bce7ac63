// # regdnsd - regdns host adapter
//
// Serves the reconciliation engine to a deployment host over stdio:
// requests arrive as JSON lines on stdin, responses leave as JSON lines on
// stdout, logs go to stderr.
//
// The daemon is a THIN layer. Resource semantics live in regdns-core and
// all HTTP traffic in regdns-client.
//
// ## Configuration
//
// Environment variables supply defaults; the `configure` request may
// override the credential and endpoint.
//
// - `REGDNS_API_TOKEN`: pre-issued bearer token
// - `REGDNS_PRIVATE_KEY`: hex Ed25519 private key (wins over the token)
// - `REGDNS_API_URL`: registrar base URL (default https://api.regdns.net)
// - `REGDNS_HTTP_TIMEOUT_SECS`: HTTP timeout in seconds (default 30)
// - `REGDNS_LOG_LEVEL`: trace, debug, info, warn, error (default info)
//
// ## Example
//
// ```bash
// export REGDNS_PRIVATE_KEY=9d61b19d...
// echo '{"id":1,"method":"configure"}' | regdnsd
// ```

mod protocol;
mod server;

use anyhow::Result;
use std::env;
use std::process::ExitCode;
use tokio::io::BufReader;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

use server::{Server, Settings, Stopped};

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum RegdnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<RegdnsExitCode> for ExitCode {
    fn from(code: RegdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
struct Config {
    api_token: Option<String>,
    private_key: Option<String>,
    api_url: Option<String>,
    timeout_secs: Option<String>,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Self {
            api_token: non_empty("REGDNS_API_TOKEN"),
            private_key: non_empty("REGDNS_PRIVATE_KEY"),
            api_url: non_empty("REGDNS_API_URL"),
            timeout_secs: non_empty("REGDNS_HTTP_TIMEOUT_SECS"),
            log_level: non_empty("REGDNS_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        }
    }

    /// Validate the configuration and produce the server settings
    ///
    /// Credentials are not required here: the host may pass them with
    /// `configure`.
    fn validate(&self) -> Result<Settings> {
        if let Some(ref url) = self.api_url {
            if !url.starts_with("https://") && !url.starts_with("http://") {
                anyhow::bail!("REGDNS_API_URL must use HTTP or HTTPS scheme. Got: {}", url);
            }
        }

        let timeout_secs = match self.timeout_secs {
            Some(ref raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if (1..=600).contains(&secs) => Some(secs),
                _ => anyhow::bail!(
                    "REGDNS_HTTP_TIMEOUT_SECS must be between 1 and 600 seconds. Got: {}",
                    raw
                ),
            },
            None => None,
        };

        self.log_level()?;

        Ok(Settings {
            api_token: self.api_token.clone(),
            private_key: self.private_key.clone(),
            api_url: self.api_url.clone(),
            timeout_secs,
        })
    }

    fn log_level(&self) -> Result<Level> {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Ok(Level::TRACE),
            "debug" => Ok(Level::DEBUG),
            "info" => Ok(Level::INFO),
            "warn" => Ok(Level::WARN),
            "error" => Ok(Level::ERROR),
            _ => anyhow::bail!(
                "REGDNS_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }
    }
}

fn main() -> ExitCode {
    let config = Config::from_env();

    let settings = match config.validate() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration validation error: {}", e);
            return RegdnsExitCode::ConfigError.into();
        }
    };

    // stdout carries protocol traffic, so logs go to stderr
    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level().unwrap_or(Level::INFO))
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return RegdnsExitCode::ConfigError.into();
    }

    info!("Starting regdnsd {}", regdns_core::engine::schema::VERSION);

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return RegdnsExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        match run_daemon(settings).await {
            Ok(Stopped::InputClosed) | Ok(Stopped::Shutdown) => RegdnsExitCode::CleanShutdown,
            Ok(Stopped::ConfigureFailed(_)) => RegdnsExitCode::ConfigError,
            Err(e) => {
                error!("Daemon error: {}", e);
                RegdnsExitCode::RuntimeError
            }
        }
    });

    result.into()
}

/// Run the daemon
async fn run_daemon(settings: Settings) -> Result<Stopped> {
    let shutdown = async {
        match wait_for_shutdown().await {
            Ok(signal) => info!("Received shutdown signal: {}", signal),
            Err(e) => {
                error!("Shutdown handler error: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    let stopped = Server::new(settings)
        .serve(
            BufReader::new(tokio::io::stdin()),
            tokio::io::stdout(),
            shutdown,
        )
        .await?;

    match &stopped {
        Stopped::InputClosed => info!("Input closed, shutting down"),
        Stopped::Shutdown => info!("Shutting down daemon"),
        Stopped::ConfigureFailed(e) => error!("Exiting after configuration failure: {}", e),
    }
    Ok(stopped)
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let config = config(&[]);
        let settings = config.validate().unwrap();

        assert_eq!(config.log_level().unwrap(), Level::INFO);
        assert!(settings.api_token.is_none());
        assert!(settings.private_key.is_none());
        assert!(settings.api_url.is_none());
        assert!(settings.timeout_secs.is_none());
    }

    #[test]
    fn reads_credentials_and_endpoint() {
        let settings = config(&[
            ("REGDNS_API_TOKEN", "tok"),
            ("REGDNS_PRIVATE_KEY", "  "),
            ("REGDNS_API_URL", "http://localhost:8080"),
            ("REGDNS_HTTP_TIMEOUT_SECS", "12"),
            ("REGDNS_LOG_LEVEL", "DEBUG"),
        ])
        .validate()
        .unwrap();

        assert_eq!(settings.api_token.as_deref(), Some("tok"));
        assert!(settings.private_key.is_none(), "blank counts as unset");
        assert_eq!(settings.api_url.as_deref(), Some("http://localhost:8080"));
        assert_eq!(settings.timeout_secs, Some(12));
    }

    #[test]
    fn rejects_bad_values() {
        for vars in [
            [("REGDNS_API_URL", "ftp://registrar")],
            [("REGDNS_HTTP_TIMEOUT_SECS", "0")],
            [("REGDNS_HTTP_TIMEOUT_SECS", "soon")],
            [("REGDNS_LOG_LEVEL", "loud")],
        ] {
            assert!(config(&vars).validate().is_err(), "{vars:?}");
        }
    }

    #[test]
    fn settings_debug_hides_secrets() {
        let settings = config(&[("REGDNS_PRIVATE_KEY", "deadbeef")]).validate().unwrap();
        let debug = format!("{settings:?}");
        assert!(!debug.contains("deadbeef"));
        assert!(debug.contains("<REDACTED>"));
    }
}
