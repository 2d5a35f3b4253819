use clap::Parser;
use rtcache::cli::{Cli, Commands};
use rtcache::types::config::Config;
use rtcache::RuntimeCacheResult;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> RuntimeCacheResult<()> {
    let cli = Cli::parse();

    // Load configuration first (no logging yet). An existing file must parse
    // and validate.
    let config = if cli.config.exists() {
        Config::load(&cli.config)?
    } else {
        Config::default()
    };

    // CLI flags take precedence over config
    let log_level = if cli.quiet {
        "error".to_string()
    } else if cli.verbose {
        "debug".to_string()
    } else {
        config.general.log_level.clone()
    };

    let filter = EnvFilter::from_default_env().add_directive(
        format!("rtcache={}", log_level)
            .parse()
            .unwrap_or_else(|_| "rtcache=info".parse().expect("fallback directive is valid")),
    );

    if config.general.log_format == "json" {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .init();
    }

    tracing::debug!("Configuration file: {}", cli.config.display());

    match cli.command {
        Commands::Init { path } => {
            rtcache::cli::commands::init(path)?;
        }
        Commands::Key {
            segments,
            encoding,
            all,
        } => {
            rtcache::cli::commands::key(&segments, encoding, all, &config)?;
        }
        Commands::Config { json } => {
            rtcache::cli::commands::config_cmd(&cli.config, &config, json)?;
        }
        Commands::Version => {
            rtcache::cli::commands::version();
        }
    }

    Ok(())
}
