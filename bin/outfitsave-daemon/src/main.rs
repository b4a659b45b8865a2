use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{ArgAction, Parser};
use outfitsave_config::{load_default, load_from_path, OutfitSaveConfig};
use outfitsave_core::{InMemoryOutfitStore, OutfitSaveError, OutfitStore};
use outfitsave_server::{OutfitSaveServer, ServerConfig};

/// outfitsaved - outfitsave share service daemon
///
/// Configuration discovery rules:
/// 1. If `--config PATH` (or `-c PATH`) is provided, that path is used.
/// 2. Otherwise, `outfitsave_config::load_default()` is used, which probes:
///    - `/etc/outfitsave/outfitsave.toml`
///    - `./outfitsave.toml`
///
/// `OUTFITSAVE_BASE_URL`, when set, replaces `share.base_url`.
#[derive(Debug, Parser)]
#[command(
    name = "outfitsaved",
    version,
    about = "outfitsave daemon",
    long_about = "outfitsaved serves the outfitsave outfit and share-link API.",
    disable_help_subcommand = true
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long = "config", short = 'c', value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log level (overrides `telemetry.log_level` and RUST_LOG).
    ///
    /// Accepts standard tracing levels (trace, debug, info, warn, error) or a
    /// full filter expression (e.g. "info,outfitsave_core=debug").
    #[arg(long = "log-level", short = 'L', value_name = "LEVEL")]
    log_level: Option<String>,

    /// Print loaded configuration summary and exit.
    #[arg(long = "print-config", action = ArgAction::SetTrue)]
    print_config: bool,

    /// Address for the HTTP server to bind on (overrides `server.bind_addr`).
    #[arg(long = "bind-addr", value_name = "ADDR")]
    bind_addr: Option<String>,

    /// Validate configuration and exit without starting the daemon.
    #[arg(long = "check-config", action = ArgAction::SetTrue)]
    check_config: bool,
}

fn main() {
    let cli = Cli::parse();

    // Logging is not up yet, so config errors before init go to stderr.
    let config = match load_config(&cli) {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("outfitsaved: {}", err);
            process::exit(1);
        }
    };

    let level = cli.log_level.as_deref().or_else(|| {
        config
            .telemetry
            .as_ref()
            .and_then(|t| t.log_level.as_deref())
    });
    if let Err(err) = outfitsave_telemetry::init(level) {
        eprintln!("outfitsaved: failed to initialise telemetry: {}", err);
        process::exit(1);
    }

    match &cli.config {
        Some(path) => tracing::info!("loaded configuration from {}", path.display()),
        None => tracing::info!("loaded configuration from default locations"),
    }

    if let Err(err) = config.validate() {
        tracing::error!("configuration validation failed: {}", err);
        process::exit(1);
    }

    if cli.check_config {
        tracing::info!("configuration is valid");
        return;
    }

    if cli.print_config {
        print_config_summary(&config);
        return;
    }

    let bind_addr = match resolve_bind_addr(&cli, &config) {
        Ok(addr) => addr,
        Err(err) => {
            tracing::error!("invalid bind address: {}", err);
            process::exit(1);
        }
    };

    let store: Arc<dyn OutfitStore> = Arc::new(InMemoryOutfitStore::new());
    let server = match OutfitSaveServer::new(ServerConfig::from_config(&config, bind_addr), store)
    {
        Ok(server) => server,
        Err(err) => {
            tracing::error!("failed to set up HTTP server: {}", err);
            process::exit(1);
        }
    };

    tracing::info!(
        "starting outfitsave HTTP server on {} (max_attempts={}, suffix_len={})",
        bind_addr,
        config.share.max_attempts,
        config.share.suffix_len
    );

    if let Err(err) = run_server_blocking(server) {
        tracing::error!("outfitsave HTTP server terminated with error: {}", err);
        process::exit(1);
    }
}

/// Load configuration from `--config` or the default locations and apply
/// environment overrides.
fn load_config(cli: &Cli) -> Result<OutfitSaveConfig, OutfitSaveError> {
    let mut config = match cli.config.as_ref() {
        Some(path) => load_from_path(path)?,
        None => load_default()?,
    };
    config.apply_env_overrides();
    apply_cli_overrides(cli, &mut config);
    Ok(config)
}

/// Fold command-line overrides into the loaded configuration so validation
/// checks the values the daemon will actually use.
fn apply_cli_overrides(cli: &Cli, cfg: &mut OutfitSaveConfig) {
    if let Some(addr) = cli.bind_addr.as_deref() {
        cfg.server.bind_addr = addr.trim().to_string();
    }
}

/// Resolve the bind address: `--bind-addr` first, then `server.bind_addr`.
fn resolve_bind_addr(cli: &Cli, cfg: &OutfitSaveConfig) -> Result<SocketAddr, String> {
    if let Some(addr_str) = cli.bind_addr.as_deref() {
        return addr_str
            .parse::<SocketAddr>()
            .map_err(|e| format!("failed to parse --bind-addr '{}': {}", addr_str, e));
    }

    cfg.bind_addr().map_err(|e| e.to_string())
}

/// Run the HTTP server on a multi-threaded Tokio runtime.
///
/// This helper exists so `main` can remain synchronous while the server
/// runs asynchronously under the hood.
fn run_server_blocking(server: OutfitSaveServer) -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    rt.block_on(async move { server.run().await })?;

    Ok(())
}

/// Print a concise summary of the loaded configuration.
fn print_config_summary(cfg: &OutfitSaveConfig) {
    println!("outfitsaved configuration summary:");
    println!("  server.bind_addr    = {}", cfg.server.bind_addr);
    println!("  share.base_url      = {}", cfg.share.base_url);
    println!("  share.path_prefix   = {}", cfg.share.path_prefix);
    println!("  share.max_attempts  = {}", cfg.share.max_attempts);
    println!("  share.suffix_len    = {}", cfg.share.suffix_len);
    println!(
        "  telemetry.log_level = {}",
        cfg.telemetry
            .as_ref()
            .and_then(|t| t.log_level.as_deref())
            .unwrap_or("<default>")
    );
    println!(
        "  metrics             = {}",
        if cfg.metrics_enabled() {
            "enabled"
        } else {
            "disabled"
        }
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("outfitsaved").chain(args.iter().copied()))
    }

    fn config() -> OutfitSaveConfig {
        outfitsave_config::parse(
            r#"
[server]
bind_addr = "127.0.0.1:4000"

[share]
base_url = "https://outfitsave.app"
"#,
        )
        .unwrap()
    }

    #[test]
    fn bind_addr_flag_wins() {
        let addr = resolve_bind_addr(&cli(&["--bind-addr", "0.0.0.0:9999"]), &config()).unwrap();
        assert_eq!(addr, "0.0.0.0:9999".parse().unwrap());
    }

    #[test]
    fn bind_addr_falls_back_to_config() {
        let addr = resolve_bind_addr(&cli(&[]), &config()).unwrap();
        assert_eq!(addr, "127.0.0.1:4000".parse().unwrap());
    }

    #[test]
    fn bad_bind_addr_flag_is_rejected() {
        assert!(resolve_bind_addr(&cli(&["--bind-addr", "nope"]), &config()).is_err());
    }

    #[test]
    fn bind_addr_flag_replaces_bad_config_value() {
        let mut cfg = config();
        cfg.server.bind_addr = "not-an-addr".to_string();
        assert!(cfg.validate().is_err());

        let cli = cli(&["--bind-addr", "127.0.0.1:5000"]);
        apply_cli_overrides(&cli, &mut cfg);

        assert!(cfg.validate().is_ok());
        let addr = resolve_bind_addr(&cli, &cfg).unwrap();
        assert_eq!(addr, "127.0.0.1:5000".parse().unwrap());
    }

    #[test]
    fn cli_parses_flags() {
        let parsed = cli(&["-c", "/tmp/o.toml", "-L", "debug", "--check-config"]);
        assert_eq!(parsed.config, Some(PathBuf::from("/tmp/o.toml")));
        assert_eq!(parsed.log_level.as_deref(), Some("debug"));
        assert!(parsed.check_config);
        assert!(!parsed.print_config);
    }
}
