//! WordPress site fingerprinting
//!
//! A scan runs in fixed phases: the primary page fetch and in-page
//! extraction, site-wide discovery probes, per-candidate corroboration and
//! finally registry currency lookups. Each phase's signals are folded into
//! one [`Resolver`] before the next phase starts.

use crate::config::ScanConfig;
use crate::error::Result;
use crate::extract;
use crate::fetch::Fetcher;
use crate::probe::Prober;
use crate::registry::Registry;
use crate::report::{self, SiteReport};
use crate::resolve::Resolver;
use tracing::{debug, info};

/// WordPress scanner
#[derive(Debug, Clone)]
pub struct Scanner {
    fetcher: Fetcher,
    registry: Registry,
    config: ScanConfig,
}

/// Builder for configuring a Scanner with options
#[derive(Debug, Clone, Default)]
pub struct ScannerBuilder {
    config: ScanConfig,
}

impl ScannerBuilder {
    /// Start from default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow scanning private/internal IP addresses (localhost, 192.168.x.x, etc.)
    ///
    /// By default, SSRF protection blocks requests to internal networks.
    pub fn allow_private(mut self, allow: bool) -> Self {
        self.config.allow_private = allow;
        self
    }

    /// Registry base URL used for latest-version lookups
    pub fn registry_url(mut self, url: impl Into<String>) -> Self {
        self.config.registry_url = url.into();
        self
    }

    /// Core version considered current
    pub fn core_baseline(mut self, version: impl Into<String>) -> Self {
        self.config.core_baseline = version.into();
        self
    }

    /// Maximum in-flight requests per probe phase
    pub fn probe_concurrency(mut self, limit: usize) -> Self {
        self.config.probe_concurrency = limit;
        self
    }

    /// Build the Scanner with the configured options
    pub fn build(self) -> Result<Scanner> {
        Scanner::new(self.config)
    }
}

impl Scanner {
    /// Create a scanner from explicit settings
    pub fn new(config: ScanConfig) -> Result<Self> {
        let fetcher = Fetcher::new(&config)?;
        let registry = Registry::new(
            fetcher.clone(),
            &config.registry_url,
            config.probe_concurrency,
        );
        Ok(Self {
            fetcher,
            registry,
            config,
        })
    }

    /// Create a builder for configuring scanner options
    ///
    /// # Example
    ///
    /// ```no_run
    /// use wordpress_fingerprint::Scanner;
    ///
    /// let scanner = Scanner::builder().allow_private(true).build()?;
    /// # Ok::<(), wordpress_fingerprint::Error>(())
    /// ```
    pub fn builder() -> ScannerBuilder {
        ScannerBuilder::new()
    }

    /// Settings this scanner was built with
    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Fingerprint the site at `target`.
    ///
    /// Fails only when the target is rejected or its primary page cannot be
    /// fetched with a 2xx status. Every later request is best-effort.
    pub async fn scan(&self, target: &str) -> Result<SiteReport> {
        let url = self.fetcher.validate_target(target).await?;
        info!(url = %url, "scan started");

        let page = self.fetcher.fetch_ok(&url).await?;
        let (meta, signals) = extract::analyze_page(&page.body, &page.headers);
        debug!(signals = signals.len(), "page analyzed");

        let mut resolver = Resolver::new();
        resolver.fold(signals);

        let prober = Prober::new(&self.fetcher, &url, self.config.probe_concurrency);
        let discovered = prober.discover(resolver.has_core_version()).await;
        resolver.fold(discovered);

        let unconfirmed = resolver.unconfirmed_plugins();
        let theme = resolver.theme().map(|t| t.name.clone());
        debug!(unconfirmed = unconfirmed.len(), "corroborating candidates");
        let corroborated = prober.corroborate(unconfirmed, theme.as_deref()).await;
        resolver.fold(corroborated);

        let resolved = resolver.finish();
        info!(
            wordpress = resolved.is_wordpress,
            core = resolved.core_version.as_deref().unwrap_or("unknown"),
            plugins = resolved.plugins.len(),
            "identity resolved"
        );

        let currency = self.registry.check(&resolved).await;

        let report = report::assemble(
            url.as_str(),
            meta,
            resolved,
            currency,
            &self.config.core_baseline,
        );
        info!(
            url = %report.url,
            outdated = report.outdated_plugins().count(),
            "scan finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use tokio_test::assert_err;

    #[test]
    fn builder_sets_options() {
        let scanner = Scanner::builder()
            .allow_private(true)
            .registry_url("http://127.0.0.1:9/")
            .core_baseline("6.5")
            .probe_concurrency(2)
            .build()
            .unwrap();
        assert!(scanner.config().allow_private);
        assert_eq!(scanner.config().core_baseline, "6.5");
        assert_eq!(scanner.config().probe_concurrency, 2);
    }

    #[tokio::test]
    async fn rejects_invalid_url() {
        let scanner = Scanner::builder().build().unwrap();
        let err = assert_err!(scanner.scan("not a url").await);
        assert!(matches!(err, Error::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn blocks_private_targets_by_default() {
        let scanner = Scanner::builder().build().unwrap();
        let err = assert_err!(scanner.scan("http://127.0.0.1:8080/").await);
        assert!(matches!(err, Error::InvalidUrl(_)));
    }
}
