//! WordPress Fingerprint - evidence-based WordPress fingerprinting service
//!
//! Detects whether a site runs WordPress and identifies its core version,
//! plugins and theme from passive page signals plus a bounded set of probes.
//!
//! # Example
//!
//! ```no_run
//! use wordpress_fingerprint::Scanner;
//!
//! #[tokio::main]
//! async fn main() -> wordpress_fingerprint::Result<()> {
//!     let scanner = Scanner::builder().build()?;
//!     let report = scanner.scan("https://example.com").await?;
//!     println!("WordPress: {:?}", report.wp_version);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod fingerprints;
pub mod probe;
pub mod registry;
pub mod report;
pub mod resolve;
pub mod retry;
pub mod scanner;
pub mod server;
pub mod signal;
pub mod slug;
pub mod summary;
pub mod version;

pub use config::{Config, ScanConfig, SummaryConfig};
pub use error::{Error, Result};
pub use report::{Plugin, SiteReport, Theme};
pub use retry::RetryConfig;
pub use scanner::{Scanner, ScannerBuilder};
pub use server::{AppState, router};
pub use summary::Summarizer;
