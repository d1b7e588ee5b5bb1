use clap::Parser;
use screenshot_service::{setup_logging, Cli, CliRunner, Commands, Config};
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Cli::parse();

    // Setup logging
    setup_logging(args.verbose)?;

    let config = match load_config(&args).await {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {:#}", e);
            std::process::exit(1);
        }
    };

    let runner = CliRunner::new(config);
    if let Err(e) = runner.run(args.command).await {
        error!("{:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

async fn load_config(args: &Cli) -> anyhow::Result<Config> {
    let mut config = match (&args.command, &args.config) {
        // Job processes receive the parent's fully resolved configuration
        (
            Commands::Crawl {
                config_json: Some(json),
                ..
            },
            _,
        ) => serde_json::from_str(json)?,
        (_, Some(config_path)) => {
            let config_content = tokio::fs::read_to_string(config_path).await?;
            serde_json::from_str(&config_content)?
        }
        _ => Config::default(),
    };

    config.apply_env();
    args.apply_overrides(&mut config);
    config.validate()?;

    if !matches!(args.command, Commands::Crawl { .. }) {
        info!("Starting screenshot-service v{}", env!("CARGO_PKG_VERSION"));
        info!("Screenshot directory: {}", config.screenshot_dir.display());
        info!("Database: {}", config.database_url);
    }

    Ok(config)
}
