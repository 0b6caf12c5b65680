//! Latest-version lookups against the WordPress.org registry

use crate::fetch::Fetcher;
use crate::resolve::Resolved;
use futures::stream::{self, StreamExt};
use serde::Deserialize;
use tracing::debug;
use url::Url;

/// WordPress.org plugin/theme API response
#[derive(Debug, Deserialize)]
struct InfoResponse {
    version: Option<String>,
}

/// Latest versions for a resolved site
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Currency {
    /// Latest plugin versions, index-aligned with `Resolved::plugins`
    pub plugins: Vec<Option<String>>,
    /// Latest version of the active theme
    pub theme: Option<String>,
}

/// Registry client
#[derive(Debug, Clone)]
pub struct Registry {
    fetcher: Fetcher,
    base_url: String,
    concurrency: usize,
}

impl Registry {
    /// Create a registry client rooted at `base_url`
    pub fn new(fetcher: Fetcher, base_url: &str, concurrency: usize) -> Self {
        Self {
            fetcher,
            base_url: base_url.trim_end_matches('/').to_string(),
            concurrency: concurrency.max(1),
        }
    }

    /// `info/1.2` endpoint URL with the slug encoded into the query
    fn info_url(&self, kind: &str, action: &str, slug: &str) -> Option<Url> {
        let mut url = Url::parse(&format!("{}/{}/info/1.2/", self.base_url, kind)).ok()?;
        url.query_pairs_mut()
            .append_pair("action", action)
            .append_pair("slug", slug);
        Some(url)
    }

    /// Fetch latest plugin version; `None` on any failure
    pub async fn latest_plugin_version(&self, slug: &str) -> Option<String> {
        let url = self.info_url("plugins", "plugin_information", slug)?;
        let version = self
            .fetcher
            .probe_json::<InfoResponse>(url.as_str())
            .await?
            .version;
        debug!(slug, latest = ?version, "plugin registry lookup");
        version
    }

    /// Fetch latest theme version; `None` on any failure
    pub async fn latest_theme_version(&self, slug: &str) -> Option<String> {
        let url = self.info_url("themes", "theme_information", slug)?;
        let version = self
            .fetcher
            .probe_json::<InfoResponse>(url.as_str())
            .await?
            .version;
        debug!(slug, latest = ?version, "theme registry lookup");
        version
    }

    /// Look up every resolved plugin and the theme concurrently
    pub async fn check(&self, resolved: &Resolved) -> Currency {
        let slugs: Vec<String> = resolved.plugins.iter().map(|p| p.slug.clone()).collect();
        let plugins = stream::iter(slugs)
            .map(|slug| async move { self.latest_plugin_version(&slug).await })
            .buffered(self.concurrency)
            .collect::<Vec<_>>();

        let theme = async {
            match &resolved.theme {
                Some(theme) => self.latest_theme_version(&theme.name).await,
                None => None,
            }
        };

        let (plugins, theme) = tokio::join!(plugins, theme);
        Currency { plugins, theme }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScanConfig;

    fn registry() -> Registry {
        let fetcher = Fetcher::new(&ScanConfig::default()).unwrap();
        Registry::new(fetcher, "https://api.example.org/", 4)
    }

    #[test]
    fn info_url_shape() {
        let url = registry()
            .info_url("plugins", "plugin_information", "akismet")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.org/plugins/info/1.2/?action=plugin_information&slug=akismet"
        );
    }

    #[test]
    fn slug_cannot_inject_query_parameters() {
        let url = registry()
            .info_url("themes", "theme_information", "x&action=other%20#frag")
            .unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("action".to_string(), "theme_information".to_string()),
                ("slug".to_string(), "x&action=other%20#frag".to_string()),
            ]
        );
        assert_eq!(url.fragment(), None);
    }
}
