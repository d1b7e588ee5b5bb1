//! # Screenshot Service
//!
//! A small crawl-and-capture service. A client submits a start URL and a link
//! count; the service returns a job id at once and, in an isolated process or
//! task, screenshots the start page, collects the anchors it renders, and
//! screenshots up to that many links. The resulting file paths are stored in
//! SQLite and can be polled by job id.
//!
//! ## HTTP API
//!
//! | Method | Path | Result |
//! |--------|------|--------|
//! | `GET` | `/isalive` | `{"status": "alive"}` |
//! | `GET` | `/screenshot[?url=...]` | one synchronous screenshot |
//! | `POST` | `/screenshots` | `{"status": "success", "run_id": ...}` |
//! | `GET` | `/screenshots/{run_id}` | stored screenshot paths for the job |
//! | `GET` | `/metrics` | Prometheus text, with `serve --metrics` |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use screenshot_service::{Config, Metrics, ScreenshotService};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let service = ScreenshotService::from_config(&config, Arc::new(Metrics::new())).await?;
//!
//!     let run_id = service.submit(&serde_json::json!({
//!         "start_url": "https://example.com",
//!         "num_links": 3,
//!     }))?;
//!     println!("Started job {run_id}");
//!
//!     Ok(())
//! }
//! ```
//!
//! ## CLI Usage
//!
//! ```bash
//! screenshot-service serve --metrics
//! screenshot-service single --url https://example.com
//! screenshot-service validate config.json
//! ```

/// Browser abstraction and the Chrome implementation
pub mod browser;

/// Screenshot paths and the fail-fast capture loop
pub mod capture;

/// Command-line interface implementation
pub mod cli;

/// Configuration and settings for the service
pub mod config;

/// Crawl orchestration for a single job
pub mod crawler;

/// Job validation, id minting and isolated execution
pub mod dispatcher;

/// Error types and error handling utilities
pub mod error;

/// Anchor extraction and link normalization
pub mod links;

/// Performance metrics collection and export
pub mod metrics;

/// Screenshot records and crawl jobs
pub mod model;

/// HTTP routes
pub mod server;

/// Facade shared by the HTTP layer and the CLI
pub mod service;

/// SQLite-backed record persistence
pub mod store;

#[cfg(test)]
mod testing;


pub use browser::*;
pub use capture::*;
pub use cli::*;
pub use config::*;
pub use crawler::*;
pub use dispatcher::*;
pub use error::*;
pub use links::*;
pub use metrics::*;
pub use model::*;
pub use server::*;
pub use service::*;
pub use store::*;
