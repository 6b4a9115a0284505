use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::net::IpAddr;

use seefood::config::{format_config, Config, CONFIG_KEYS};
use seefood::logging::{init_logging, LogConfig, Verbosity};
use seefood::server::{run_server, ServerConfig};
use seefood::share::{ttl_from_secs, MAX_TTL_SECS};

#[derive(Parser)]
#[command(name = "seefood")]
#[command(version)]
#[command(about = "Hot dog or not hot dog, with shareable results")]
#[command(
    long_about = "Serves the SeeFood hot dog detector. Photos are classified in the browser; results can be shared through short-lived links held in server memory."
)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Also write debug logs to this file
    #[arg(long, global = true)]
    log_file: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the web server
    Serve {
        /// Port to start the server on (default: 3000)
        #[arg(short, long)]
        port: Option<u16>,

        /// Address to bind (default: 127.0.0.1)
        #[arg(long)]
        host: Option<IpAddr>,

        /// Public base URL used in share links, e.g. https://hotdogdetector.com
        #[arg(long)]
        public_url: Option<String>,

        /// Seconds a share stays viewable (default: 3600, max: one year)
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..=MAX_TTL_SECS))]
        ttl: Option<u64>,

        /// Don't open browser automatically
        #[arg(long)]
        no_browser: bool,
    },
    /// Show or change the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the current configuration
    Show,
    /// Print the configuration file path
    Path,
    /// Set a configuration value
    Set {
        /// One of: default_port, host, public_url, ttl_secs, max_body_bytes
        key: String,
        value: String,
    },
    /// Remove a configuration value
    Unset {
        key: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let _log_guard = init_logging(&LogConfig {
        verbosity: Verbosity::from_occurrences(cli.verbose, cli.quiet),
        log_file: cli.log_file,
    });

    match cli.command {
        Commands::Serve {
            port,
            host,
            public_url,
            ttl,
            no_browser,
        } => {
            let config = Config::load().context("Failed to load configuration")?;
            let ttl_secs = config.effective_ttl_secs(ttl);
            let share_ttl = ttl_from_secs(ttl_secs).context("Invalid share TTL")?;

            let server_config = ServerConfig {
                host: config.effective_host(host),
                base_port: config.effective_port(port),
                open_browser: !no_browser,
                public_url: config.effective_public_url(public_url),
                ttl: share_ttl,
                max_body_bytes: config.effective_max_body_bytes(),
            };

            tracing::info!(
                ttl_secs,
                public_url = server_config.public_url.as_deref().unwrap_or("(request host)"),
                "Starting SeeFood"
            );
            run_server(server_config).await?;
        }
        Commands::Config { action } => run_config(action)?,
    }

    Ok(())
}

fn run_config(action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = Config::load().context("Failed to load configuration")?;
            println!("{}", format_config(&config));
        }
        ConfigAction::Path => {
            println!("{}", Config::config_path()?.display());
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load().context("Failed to load configuration")?;
            config
                .set(&key, &value)
                .with_context(|| format!("Valid keys: {}", CONFIG_KEYS.join(", ")))?;
            config.save().context("Failed to save configuration")?;
            println!("Set {} = {}", key, value);
        }
        ConfigAction::Unset { key } => {
            let mut config = Config::load().context("Failed to load configuration")?;
            config
                .unset(&key)
                .with_context(|| format!("Valid keys: {}", CONFIG_KEYS.join(", ")))?;
            config.save().context("Failed to save configuration")?;
            println!("Unset {}", key);
        }
    }
    Ok(())
}
