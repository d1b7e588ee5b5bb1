use crate::{
    install_prometheus, AppState, ChromeLauncher, Config, CrawlJob, Crawler, Metrics,
    ScreenshotService, SqliteRecordStore,
};
use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tracing::info;

#[derive(Parser)]
#[command(name = "screenshot-service")]
#[command(about = "Crawl web pages and screenshot the links they contain")]
#[command(version = "0.1.0")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, help = "Configuration file path")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, help = "Directory screenshots are written to")]
    pub screenshot_dir: Option<PathBuf>,

    #[arg(long, help = "Record store connection URL")]
    pub database_url: Option<String>,

    #[arg(long, help = "Chrome executable path")]
    pub chrome_path: Option<String>,

    #[arg(long, help = "Server port")]
    pub port: Option<u16>,

    #[arg(long, help = "Bind address")]
    pub bind: Option<String>,
}

impl Cli {
    /// Apply command-line overrides on top of file and environment settings.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(dir) = &self.screenshot_dir {
            config.screenshot_dir = dir.clone();
        }
        if let Some(url) = &self.database_url {
            config.database_url = url.clone();
        }
        if let Some(chrome_path) = &self.chrome_path {
            config.chrome_path = Some(chrome_path.clone());
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(bind) = &self.bind {
            config.bind = bind.clone();
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP service
    Serve {
        #[arg(long, help = "Expose Prometheus metrics on /metrics")]
        metrics: bool,
    },

    /// Run one crawl job in this process
    #[command(hide = true)]
    Crawl {
        #[arg(long)]
        job_id: String,

        #[arg(long, allow_hyphen_values = true)]
        start_url: String,

        #[arg(long, allow_negative_numbers = true)]
        num_links: i64,

        #[arg(long, hide = true, help = "Resolved configuration as JSON")]
        config_json: Option<String>,
    },

    /// Take a single screenshot
    Single {
        #[arg(short, long, help = "URL to screenshot (blank page when omitted)")]
        url: Option<String>,
    },

    /// Validate configuration
    Validate {
        #[arg(help = "Configuration file to validate")]
        config: PathBuf,
    },
}

pub struct CliRunner {
    pub config: Config,
}

impl CliRunner {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub async fn run(&self, command: Commands) -> anyhow::Result<()> {
        match command {
            Commands::Serve { metrics } => self.run_server(metrics).await,
            Commands::Crawl {
                job_id,
                start_url,
                num_links,
                ..
            } => {
                self.run_crawl(CrawlJob {
                    job_id,
                    start_url,
                    num_links,
                })
                .await
            }
            Commands::Single { url } => self.run_single(url).await,
            Commands::Validate { config } => self.validate_config(config).await,
        }
    }

    pub async fn run_server(&self, metrics: bool) -> anyhow::Result<()> {
        // The recorder has to exist before any metric handle is registered
        let prometheus = if metrics {
            Some(install_prometheus()?)
        } else {
            None
        };

        let service =
            ScreenshotService::from_config(&self.config, Arc::new(Metrics::new())).await?;
        let state = AppState {
            service: Arc::new(service),
            metrics: prometheus,
        };

        info!(
            "Writing screenshots to {}",
            self.config.screenshot_dir.display()
        );
        crate::serve(&self.config.bind_address(), state).await?;
        Ok(())
    }

    /// Entry point of an isolated job process. Fails unless the job completed.
    pub async fn run_crawl(&self, job: CrawlJob) -> anyhow::Result<()> {
        fs::create_dir_all(&self.config.screenshot_dir).await?;

        let store = Arc::new(SqliteRecordStore::connect(&self.config.database_url).await?);
        let crawler = Crawler::new(
            Arc::new(ChromeLauncher::new(self.config.clone())),
            store.clone(),
            self.config.screenshot_dir.clone(),
            Arc::new(Metrics::new()),
        );

        let completed = crawler.run_logged(&job).await;
        store.close().await;

        if !completed {
            bail!("Crawl job {} did not complete", job.job_id);
        }
        Ok(())
    }

    pub async fn run_single(&self, url: Option<String>) -> anyhow::Result<()> {
        let service =
            ScreenshotService::from_config(&self.config, Arc::new(Metrics::new())).await?;

        let path = service.capture_single(url.as_deref()).await?;

        println!("Screenshot captured successfully:");
        println!("  URL: {}", url.as_deref().unwrap_or("about:blank"));
        println!("  Output: {path}");
        Ok(())
    }

    pub async fn validate_config(&self, config_path: PathBuf) -> anyhow::Result<()> {
        println!("Validating configuration: {}", config_path.display());

        let config_content = fs::read_to_string(&config_path)
            .await
            .with_context(|| format!("Failed to read {}", config_path.display()))?;
        let config: Config = serde_json::from_str(&config_content)?;
        config.validate()?;

        println!("Configuration is valid:");
        println!("  Screenshot dir: {}", config.screenshot_dir.display());
        println!("  Database: {}", config.database_url);
        println!("  Listen: {}", config.bind_address());
        println!("  Isolation: {:?}", config.isolation);
        println!(
            "  Viewport: {}x{}",
            config.viewport.width, config.viewport.height
        );

        Ok(())
    }
}

pub fn setup_logging(verbose: bool) -> anyhow::Result<()> {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Isolation;

    #[test]
    fn test_parse_crawl_command() {
        let cli = Cli::try_parse_from([
            "screenshot-service",
            "crawl",
            "--job-id",
            "run-1",
            "--start-url",
            "http://example.com",
            "--num-links",
            "3",
            "--config-json",
            "{}",
        ])
        .unwrap();

        match cli.command {
            Commands::Crawl {
                job_id,
                start_url,
                num_links,
                config_json,
            } => {
                assert_eq!(job_id, "run-1");
                assert_eq!(start_url, "http://example.com");
                assert_eq!(num_links, 3);
                assert_eq!(config_json.as_deref(), Some("{}"));
            }
            _ => panic!("expected crawl command"),
        }
    }

    #[test]
    fn test_parse_hyphenated_values() {
        let cli = Cli::try_parse_from([
            "screenshot-service",
            "crawl",
            "--job-id=run-2",
            "--start-url=--help",
            "--num-links=-1",
        ])
        .unwrap();

        match cli.command {
            Commands::Crawl {
                start_url,
                num_links,
                config_json,
                ..
            } => {
                assert_eq!(start_url, "--help");
                assert_eq!(num_links, -1);
                assert!(config_json.is_none());
            }
            _ => panic!("expected crawl command"),
        }

        let spaced = Cli::try_parse_from([
            "screenshot-service",
            "crawl",
            "--job-id",
            "run-3",
            "--start-url",
            "-x",
            "--num-links",
            "-2",
        ])
        .unwrap();
        assert!(matches!(
            spaced.command,
            Commands::Crawl { ref start_url, num_links: -2, .. } if start_url == "-x"
        ));
    }

    #[test]
    fn test_overrides() {
        let cli = Cli::try_parse_from([
            "screenshot-service",
            "--port",
            "8080",
            "--screenshot-dir",
            "/var/shots",
            "serve",
            "--metrics",
        ])
        .unwrap();

        let mut config = Config::default();
        cli.apply_overrides(&mut config);

        assert_eq!(config.port, 8080);
        assert_eq!(config.screenshot_dir, PathBuf::from("/var/shots"));
        assert_eq!(config.bind, "0.0.0.0");
        assert!(matches!(cli.command, Commands::Serve { metrics: true }));
    }

    #[tokio::test]
    async fn test_validate_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"port": 9000, "isolation": "task"}"#).unwrap();

        let runner = CliRunner::new(Config::default());
        runner.validate_config(path).await.unwrap();

        let parsed: Config =
            serde_json::from_str(r#"{"port": 9000, "isolation": "task"}"#).unwrap();
        assert_eq!(parsed.isolation, Isolation::Task);
    }

    #[tokio::test]
    async fn test_validate_rejects_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"port": 0}"#).unwrap();

        let runner = CliRunner::new(Config::default());
        assert!(runner.validate_config(path).await.is_err());
    }
}
