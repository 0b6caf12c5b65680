//! Active probing
//!
//! Two phases, each launched in full before any of it is awaited:
//!
//! 1. [`Prober::discover`]: site-wide sources that can reveal plugins the
//!    homepage does not mention (REST index, plugin directory listing,
//!    feeds, error pages for invalid URLs, core readme).
//! 2. [`Prober::corroborate`]: per-candidate version probes (main file,
//!    readme.txt, changelogs) for every plugin without a confirmed version,
//!    plus the active theme's stylesheet header.
//!
//! A failed probe contributes nothing. Probes are never retried.

use crate::extract::plugin_paths_in;
use crate::fetch::Fetcher;
use crate::fingerprints::{is_core_namespace, namespace_plugin};
use crate::signal::{PluginCandidate, PluginLocation, Signal, Source, ThemeCandidate};
use futures::future::join_all;
use futures::stream::{self, StreamExt};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::debug;
use url::Url;

/// REST discovery document
const REST_INDEX_PATH: &str = "/wp-json/";

/// Plugin root, listed when the server has indexes enabled
const PLUGIN_ROOT_PATH: &str = "/wp-content/plugins/";

/// Theme root
const THEME_ROOT_PATH: &str = "/wp-content/themes/";

/// Core readme
const CORE_README_PATH: &str = "/readme.html";

/// RSS and Atom feeds
const FEED_PATHS: &[&str] = &["/feed/", "/feed/atom/", "/comments/feed/"];

/// Plugin directory name that never exists; used to provoke error pages
const NONEXISTENT_PLUGIN: &str = "wpfp-nonexistent-plugin";

/// Deliberately invalid URLs whose error pages may leak plugin paths
const INVALID_PATHS: &[&str] = &[
    "/wp-content/plugins/wpfp-nonexistent-plugin/readme.txt",
    "/?p=2147483647",
    "/wpfp-nonexistent-page/",
];

/// Conventional changelog filenames, in preference order
const CHANGELOG_FILES: &[&str] = &["changelog.txt", "CHANGELOG.md", "changelog.md", "CHANGELOG.txt"];

static HEADER_VERSION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?mi)^[\s*#@/]*Version:\s*([0-9][0-9a-zA-Z.+-]*)").expect("valid version header regex")
});

static STABLE_TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?mi)^\s*Stable tag:\s*([0-9][0-9a-zA-Z.+-]*)").expect("valid stable tag regex")
});

static README_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*===\s*(.+?)\s*===\s*$").expect("valid readme name regex"));

static CHANGELOG_VERSION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?mi)^\s*(?:[=#*]+\s*)?(?:v(?:ersion)?\s*)?\[?(\d+\.\d+(?:\.\d+)*)")
        .expect("valid changelog regex")
});

static LISTING_ENTRY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<a\s+href\s*=\s*["']([^"'?/][^"'/]*)/["']"#).expect("valid listing regex")
});

static FEED_GENERATOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"wordpress\.org/\?v=(\d+(?:\.\d+)+[0-9a-zA-Z.-]*)").expect("valid feed generator regex")
});

static CORE_README_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Version\s+(\d+(?:\.\d+)+)").expect("valid core readme regex"));

static THEME_TEMPLATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?mi)^[\s*]*Template:\s*([^\s*]+)").expect("valid theme template regex")
});

/// WordPress REST API root response
#[derive(Debug, Deserialize)]
struct RestIndex {
    name: Option<String>,
    url: Option<String>,
    #[serde(default)]
    namespaces: Vec<String>,
}

/// Issues secondary requests against one target
#[derive(Debug, Clone, Copy)]
pub struct Prober<'a> {
    fetcher: &'a Fetcher,
    base: &'a Url,
    concurrency: usize,
}

impl<'a> Prober<'a> {
    /// Create a prober for `base`, running at most `concurrency` candidate
    /// groups at once
    pub fn new(fetcher: &'a Fetcher, base: &'a Url, concurrency: usize) -> Self {
        Self {
            fetcher,
            base,
            concurrency: concurrency.max(1),
        }
    }

    fn url(&self, path: &str) -> Option<Url> {
        self.base.join(path).ok()
    }

    /// `<root><dir>/<file>` with `dir` and `file` escaped as path segments
    fn content_url(&self, root: &str, dir: &str, file: &str) -> Option<Url> {
        let mut url = self.url(root)?;
        url.path_segments_mut().ok()?.pop_if_empty().push(dir).push(file);
        Some(url)
    }

    async fn get(&self, path: &str) -> Option<String> {
        let url = self.url(path)?;
        self.get_url(&url).await
    }

    async fn get_url(&self, url: &Url) -> Option<String> {
        self.fetcher.probe(url).await.map(|page| page.body)
    }

    async fn plugin_file(&self, plugin: &PluginLocation, file: &str) -> Option<String> {
        let url = self.content_url(PLUGIN_ROOT_PATH, &plugin.dir, file)?;
        self.get_url(&url).await
    }

    /// Site-wide discovery probes. `core_known` skips the core readme.
    pub async fn discover(&self, core_known: bool) -> Vec<Signal> {
        let core_readme = async {
            if core_known {
                Vec::new()
            } else {
                self.core_readme().await
            }
        };

        let (rest, listing, feeds, errors, readme) = tokio::join!(
            self.rest_index(),
            self.directory_listing(),
            self.feeds(),
            self.error_pages(),
            core_readme,
        );

        debug!(
            rest = rest.len(),
            listing = listing.len(),
            feeds = feeds.len(),
            errors = errors.len(),
            readme = readme.len(),
            "discovery probes finished"
        );

        [rest, listing, feeds, errors, readme].concat()
    }

    /// Per-candidate version probes plus the theme stylesheet
    pub async fn corroborate(&self, plugins: Vec<PluginLocation>, theme: Option<&str>) -> Vec<Signal> {
        let plugins = stream::iter(plugins)
            .map(|plugin| async move { self.plugin_probes(&plugin).await })
            .buffered(self.concurrency)
            .collect::<Vec<_>>();

        let theme = async {
            match theme {
                Some(name) => self.theme_stylesheet(name).await,
                None => Vec::new(),
            }
        };

        let (plugins, theme) = tokio::join!(plugins, theme);
        let mut signals: Vec<Signal> = plugins.into_iter().flatten().collect();
        signals.extend(theme);
        signals
    }

    /// All version probes for one plugin, in precedence order
    async fn plugin_probes(&self, plugin: &PluginLocation) -> Vec<Signal> {
        let (main, readme, changelog) = tokio::join!(
            self.main_file(plugin),
            self.readme(plugin),
            self.changelog(plugin),
        );

        [main, readme, changelog].into_iter().flatten().collect()
    }

    async fn main_file(&self, plugin: &PluginLocation) -> Option<Signal> {
        let body = self
            .plugin_file(plugin, &format!("{}.php", plugin.dir))
            .await?;
        let version = parse_header_version(&body)?;
        Some(Signal::plugin_version(&plugin.slug, version, Source::MainFile))
    }

    async fn readme(&self, plugin: &PluginLocation) -> Option<Signal> {
        let body = self.plugin_file(plugin, "readme.txt").await?;
        parse_readme(&plugin.slug, &body).map(Signal::Plugin)
    }

    async fn changelog(&self, plugin: &PluginLocation) -> Option<Signal> {
        let bodies = join_all(
            CHANGELOG_FILES
                .iter()
                .map(|file| async move { self.plugin_file(plugin, file).await }),
        )
        .await;

        let version = bodies.iter().flatten().find_map(|b| parse_changelog(b))?;
        Some(Signal::plugin_version(&plugin.slug, version, Source::Changelog))
    }

    async fn rest_index(&self) -> Vec<Signal> {
        match self.get(REST_INDEX_PATH).await {
            Some(body) => parse_rest_index(&body),
            None => Vec::new(),
        }
    }

    async fn directory_listing(&self) -> Vec<Signal> {
        match self.get(PLUGIN_ROOT_PATH).await {
            Some(body) => parse_directory_listing(&body),
            None => Vec::new(),
        }
    }

    async fn feeds(&self) -> Vec<Signal> {
        let bodies = join_all(FEED_PATHS.iter().map(|path| self.get(path))).await;
        bodies.iter().flatten().flat_map(|b| parse_feed(b)).collect()
    }

    async fn error_pages(&self) -> Vec<Signal> {
        let pages = join_all(INVALID_PATHS.iter().map(|path| async move {
            let url = self.url(path)?;
            self.fetcher.probe_any(&url).await
        }))
        .await;

        pages
            .iter()
            .flatten()
            .flat_map(|page| plugin_paths_in(&page.body, Source::ErrorPage))
            .filter(|s| !matches!(s, Signal::Plugin(p) if p.slug == NONEXISTENT_PLUGIN))
            .collect()
    }

    async fn core_readme(&self) -> Vec<Signal> {
        self.get(CORE_README_PATH)
            .await
            .and_then(|body| CORE_README_RE.captures(&body).map(|c| c[1].to_string()))
            .map(|v| vec![Signal::CoreVersion(v, Source::CoreReadme)])
            .unwrap_or_default()
    }

    async fn theme_stylesheet(&self, name: &str) -> Vec<Signal> {
        let Some(url) = self.content_url(THEME_ROOT_PATH, name, "style.css") else {
            return Vec::new();
        };
        let Some(body) = self.get_url(&url).await else {
            return Vec::new();
        };

        vec![Signal::Theme(ThemeCandidate {
            name: name.to_string(),
            version: parse_header_version(&body),
            parent: THEME_TEMPLATE_RE.captures(&body).map(|c| c[1].to_string()),
        })]
    }
}

/// `Version:` field of a plugin or theme file header
pub fn parse_header_version(body: &str) -> Option<String> {
    HEADER_VERSION_RE.captures(body).map(|c| c[1].to_string())
}

/// Version and display name from a plugin readme.txt.
/// `Stable tag:` is preferred over `Version:`.
pub fn parse_readme(slug: &str, body: &str) -> Option<PluginCandidate> {
    let version = STABLE_TAG_RE
        .captures(body)
        .or_else(|| HEADER_VERSION_RE.captures(body))
        .map(|c| c[1].to_string());
    let name = README_NAME_RE.captures(body).map(|c| c[1].to_string());

    if version.is_none() && name.is_none() {
        return None;
    }

    let candidate = PluginCandidate::new(slug, version, Source::Readme);
    Some(match name {
        Some(name) => candidate.with_display_name(name),
        None => candidate,
    })
}

/// First version token at the start of a changelog line
pub fn parse_changelog(body: &str) -> Option<String> {
    CHANGELOG_VERSION_RE.captures(body).map(|c| c[1].to_string())
}

/// Plugins registering non-core REST namespaces
pub fn parse_rest_index(body: &str) -> Vec<Signal> {
    let Ok(index) = serde_json::from_str::<RestIndex>(body) else {
        return Vec::new();
    };

    let is_wordpress = index.name.is_some()
        || index.url.is_some()
        || index.namespaces.iter().any(|ns| ns.starts_with("wp/"));
    if !is_wordpress {
        return Vec::new();
    }

    let mut signals = vec![Signal::WordPress];
    signals.extend(
        index
            .namespaces
            .iter()
            .filter_map(|ns| ns.split('/').next())
            .filter(|root| !root.is_empty() && !is_core_namespace(root))
            .map(|root| Signal::plugin(namespace_plugin(root), Source::RestApi)),
    );
    signals
}

/// Subdirectories of an open plugin-root listing
pub fn parse_directory_listing(body: &str) -> Vec<Signal> {
    let is_listing = body.contains("Index of") || body.contains("Parent Directory");
    if !is_listing {
        return Vec::new();
    }

    let mut signals = vec![Signal::WordPress];
    signals.extend(
        LISTING_ENTRY_RE
            .captures_iter(body)
            .map(|c| c[1].to_string())
            .filter(|entry| entry != ".." && entry != ".")
            .map(|entry| Signal::plugin_at(&entry, Source::DirectoryListing)),
    );
    signals
}

/// Core version and plugin paths from a feed body
pub fn parse_feed(body: &str) -> Vec<Signal> {
    let mut signals = Vec::new();
    if let Some(caps) = FEED_GENERATOR_RE.captures(body) {
        signals.push(Signal::CoreVersion(caps[1].to_string(), Source::Feed));
    }
    signals.extend(plugin_paths_in(body, Source::Feed));
    signals
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slugs(signals: &[Signal]) -> Vec<String> {
        signals
            .iter()
            .filter_map(|s| match s {
                Signal::Plugin(p) => Some(p.slug.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn main_file_header() {
        let body = "<?php\n/**\n * Plugin Name: Akismet Anti-spam\n * Version: 5.3.1\n */";
        assert_eq!(parse_header_version(body).as_deref(), Some("5.3.1"));
        assert_eq!(parse_header_version(""), None);
    }

    #[test]
    fn readme_prefers_stable_tag() {
        let body = "=== Contact Form 7 ===\nContributors: takayukister\nRequires at least: 6.3\nStable tag: 5.8.4\nVersion: 5.0\n";
        let candidate = parse_readme("contact-form-7", body).unwrap();
        assert_eq!(candidate.version.as_deref(), Some("5.8.4"));
        assert!(candidate.version_confirmed);
        assert_eq!(candidate.display_name.as_deref(), Some("Contact Form 7"));
    }

    #[test]
    fn readme_trunk_falls_back_to_version() {
        let body = "=== Foo ===\nStable tag: trunk\nVersion: 1.4.2\n";
        let candidate = parse_readme("foo", body).unwrap();
        assert_eq!(candidate.version.as_deref(), Some("1.4.2"));
    }

    #[test]
    fn readme_without_evidence() {
        assert_eq!(parse_readme("foo", "<html>soft 404</html>"), None);
    }

    #[test]
    fn changelog_leading_version() {
        assert_eq!(
            parse_changelog("# Changelog\n\n## 2.3.1 - 2024-01-02\n* Fix\n\n## 2.3.0\n").as_deref(),
            Some("2.3.1")
        );
        assert_eq!(
            parse_changelog("== Changelog ==\n= v1.9 =\n* Tweak").as_deref(),
            Some("1.9")
        );
        assert_eq!(
            parse_changelog("Version 4.0.2 (2023)\n").as_deref(),
            Some("4.0.2")
        );
        assert_eq!(parse_changelog("nothing here"), None);
    }

    #[test]
    fn rest_index_namespaces() {
        let body = r#"{"name":"Blog","url":"https://example.com","namespaces":["oembed/1.0","wp/v2","wp-site-health/v1","wc/v3","wc/store/v1","yoast/v1","contact-form-7/v1","my-plugin/v2"]}"#;
        let signals = parse_rest_index(body);
        assert_eq!(signals[0], Signal::WordPress);
        assert_eq!(
            slugs(&signals),
            vec!["woocommerce", "woocommerce", "wordpress-seo", "contact-form-7", "my-plugin"]
        );
    }

    #[test]
    fn rest_index_rejects_other_json() {
        assert!(parse_rest_index(r#"{"hello":"world"}"#).is_empty());
        assert!(parse_rest_index("<html>not json</html>").is_empty());
    }

    #[test]
    fn directory_listing_entries() {
        let body = r#"<html><head><title>Index of /wp-content/plugins</title></head><body>
            <a href="?C=N;O=D">Name</a>
            <a href="/wp-content/">Parent Directory</a>
            <a href="akismet/">akismet/</a>
            <a href="classic-editor/">classic-editor/</a>
            <a href="index.php">index.php</a>
        </body></html>"#;
        let signals = parse_directory_listing(body);
        assert_eq!(signals[0], Signal::WordPress);
        assert_eq!(slugs(&signals), vec!["akismet", "classic-editor"]);
    }

    #[test]
    fn content_paths_escape_directory_names() {
        let fetcher = Fetcher::new(&crate::config::ScanConfig::default()).unwrap();
        let base = Url::parse("https://example.com/blog").unwrap();
        let prober = Prober::new(&fetcher, &base, 1);

        let url = prober
            .content_url(THEME_ROOT_PATH, "a%b?c#d", "style.css")
            .unwrap();
        assert_eq!(url.path(), "/wp-content/themes/a%25b%3Fc%23d/style.css");
        assert_eq!(url.query(), None);

        let url = prober
            .content_url(PLUGIN_ROOT_PATH, "js_composer", "readme.txt")
            .unwrap();
        assert_eq!(url.as_str(), "https://example.com/wp-content/plugins/js_composer/readme.txt");
    }

    #[test]
    fn non_listing_ignored() {
        assert!(parse_directory_listing("<html>Forbidden</html>").is_empty());
    }

    #[test]
    fn feed_generator_and_paths() {
        let body = r#"<rss><channel><generator>https://wordpress.org/?v=6.4.2</generator>
            <item><description><![CDATA[<img src="https://example.com/wp-content/plugins/jetpack/img.png">]]></description></item>
            </channel></rss>"#;
        let signals = parse_feed(body);
        assert_eq!(signals[0], Signal::CoreVersion("6.4.2".into(), Source::Feed));
        assert_eq!(slugs(&signals), vec!["jetpack"]);
    }
}
