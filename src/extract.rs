//! Passive signal extraction
//!
//! Each extractor is a pure function over the parsed homepage, its raw
//! markup and its response headers. Extractors never touch the network
//! and never see each other's output; [`analyze_page`] runs them all and
//! concatenates their signals in table order.

use crate::fingerprints::{GENERATOR_PLUGINS, PREMIUM_PLUGINS};
use crate::signal::{PluginCandidate, Signal, Source, ThemeCandidate};
use crate::slug;
use crate::version::normalize_version;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::HeaderMap;
use scraper::{Html, Selector};
use tracing::debug;

/// Plugin directory names that are not plugins
pub const SKIP_PLUGIN_SLUGS: &[&str] = &["index", "cache"];

/// Plugin slug from a plugin-content URL path (plugins and mu-plugins)
pub static PLUGIN_PATH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/wp-content/(?:mu-)?plugins/([a-zA-Z0-9_.-]+)/").expect("valid plugin path regex")
});

/// Same as [`PLUGIN_PATH_RE`] but tolerates JSON-escaped slashes
static ESCAPED_PLUGIN_PATH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\\?/wp-content\\?/(?:mu-)?plugins\\?/([a-zA-Z0-9_-]+)\\?/")
        .expect("valid escaped plugin path regex")
});

/// Theme slug from a theme-content URL path
pub static THEME_PATH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"/wp-content/themes/([^/?#"'\s]+)/"#).expect("valid theme path regex")
});

/// Asset version recognisers, tried in order: query parameter beats filename
static ASSET_VERSION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"[?&]ver=([0-9a-zA-Z._-]+)",
        r"[-_.]v?(\d+\.\d+(?:\.\d+)*)(?:\.min)?\.(?:js|css)(?:[?#]|$)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid asset version regex"))
    .collect()
});

static WP_GENERATOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*WordPress\s+([0-9][0-9a-zA-Z.-]*)").expect("valid generator regex")
});

static DOTTED_VERSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)+)").expect("valid dotted version regex"));

static PHP_HEADER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)PHP/([0-9][0-9a-zA-Z.+-]*)").expect("valid php header regex"));

/// Plugin header block embedded in markup
static PLUGIN_HEADER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)Plugin Name:\s*([^\r\n*]+?)\s*[\r\n*].{0,400}?Version:\s*(\d+(?:\.\d+)+)")
        .expect("valid plugin header regex")
});

static HTML_COMMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<!--(.*?)-->").expect("valid comment regex"));

/// Comment annotations, tried in order per comment: (name, version) captures
static COMMENT_VERSION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)optimized with the (.+?) plugin v(\d+(?:\.\d+)+)",
        r"(?i)^\s*([A-Za-z][A-Za-z0-9 ._-]{1,60}?)\s+(?:plugin\s+v?|v)(\d+\.\d+(?:\.\d+)*)\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid comment version regex"))
    .collect()
});

/// Words that mark a comment as a status line rather than a plugin name
const STATUS_WORDS: &[&str] = &["generated", "cached", "served", "compressed", "minified", "by"];

/// WordPress-only markers in page markup
const WP_MARKUP_MARKERS: &[&str] = &["/wp-content/", "/wp-includes/", "api.w.org", "wp-json"];

/// Cookie name fragments set by WordPress
const WP_COOKIE_MARKERS: &[&str] = &["wordpress_", "wp-settings", "wp_lang"];

/// Everything an extractor may look at
pub struct PageContext<'a> {
    /// Parsed homepage
    pub document: &'a Html,
    /// Raw homepage markup
    pub raw: &'a str,
    /// Homepage response headers
    pub headers: &'a HeaderMap,
}

/// Extractor signature
pub type Extractor = fn(&PageContext<'_>) -> Vec<Signal>;

/// All extractors, in the order their output is merged
pub const EXTRACTORS: &[(&str, Extractor)] = &[
    ("generator", generator_signals),
    ("markers", wordpress_markers),
    ("asset-paths", asset_path_signals),
    ("inline-comments", inline_comment_signals),
    ("premium-fingerprints", premium_signals),
    ("content-paths", content_path_signals),
    ("theme", theme_signals),
];

/// Title and description of the homepage
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageMeta {
    /// `<title>` text
    pub title: Option<String>,
    /// Meta description, falling back to og:description
    pub description: Option<String>,
}

/// Parse the homepage and run every extractor over it
pub fn analyze_page(raw: &str, headers: &HeaderMap) -> (PageMeta, Vec<Signal>) {
    let document = Html::parse_document(raw);
    let ctx = PageContext {
        document: &document,
        raw,
        headers,
    };

    let meta = page_meta(&document);
    let signals = EXTRACTORS
        .iter()
        .flat_map(|(name, extractor)| {
            let found = extractor(&ctx);
            debug!(extractor = *name, signals = found.len(), "extractor finished");
            found
        })
        .collect();

    (meta, signals)
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid CSS selector")
}

fn non_empty(text: &str) -> Option<String> {
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!text.is_empty()).then_some(text)
}

/// Extract title and meta description
pub fn page_meta(document: &Html) -> PageMeta {
    let title = document
        .select(&selector("title"))
        .next()
        .and_then(|t| non_empty(&t.text().collect::<String>()));

    let description = document
        .select(&selector("meta[name], meta[property]"))
        .filter(|m| {
            let key = m
                .value()
                .attr("name")
                .or_else(|| m.value().attr("property"))
                .unwrap_or_default();
            key.eq_ignore_ascii_case("description") || key.eq_ignore_ascii_case("og:description")
        })
        // `description` wins over `og:description` regardless of order
        .min_by_key(|m| m.value().attr("name").is_none())
        .and_then(|m| m.value().attr("content"))
        .and_then(non_empty);

    PageMeta { title, description }
}

/// Generator meta tags and platform headers
pub fn generator_signals(ctx: &PageContext<'_>) -> Vec<Signal> {
    let mut signals = Vec::new();

    for element in ctx.document.select(&selector("meta[name]")) {
        let is_generator = element
            .value()
            .attr("name")
            .is_some_and(|n| n.eq_ignore_ascii_case("generator"));
        let Some(content) = element.value().attr("content").filter(|_| is_generator) else {
            continue;
        };

        if content.trim_start().to_ascii_lowercase().starts_with("wordpress") {
            signals.push(Signal::WordPress);
            if let Some(caps) = WP_GENERATOR_RE.captures(content) {
                signals.push(Signal::CoreVersion(caps[1].to_string(), Source::Generator));
            }
            continue;
        }

        if let Some((prefix, plugin)) = GENERATOR_PLUGINS
            .iter()
            .find(|(prefix, _)| content.trim_start().starts_with(prefix))
        {
            let rest = &content.trim_start()[prefix.len()..];
            let version = DOTTED_VERSION_RE
                .captures(rest)
                .map(|caps| caps[1].to_string());
            signals.push(Signal::Plugin(PluginCandidate::new(
                plugin,
                version,
                Source::Generator,
            )));
        }
    }

    if let Some(powered_by) = header(ctx.headers, "x-powered-by")
        && let Some(caps) = PHP_HEADER_RE.captures(powered_by)
    {
        signals.push(Signal::PhpVersion(caps[1].to_string()));
    }

    if let Some(server) = header(ctx.headers, "server").and_then(non_empty) {
        signals.push(Signal::WebServer(server));
    }

    let wp_cookie = ctx
        .headers
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|c| WP_COOKIE_MARKERS.iter().any(|m| c.contains(m)));
    let wp_link = header(ctx.headers, "link").is_some_and(|l| l.contains("api.w.org"));
    let pingback = header(ctx.headers, "x-pingback").is_some_and(|p| p.contains("xmlrpc.php"));
    if wp_cookie || wp_link || pingback {
        signals.push(Signal::WordPress);
    }

    signals
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// WordPress-specific paths in the markup
pub fn wordpress_markers(ctx: &PageContext<'_>) -> Vec<Signal> {
    if WP_MARKUP_MARKERS.iter().any(|m| ctx.raw.contains(m)) {
        vec![Signal::WordPress]
    } else {
        Vec::new()
    }
}

/// Version from an asset URL: first matching pattern wins
pub fn asset_version(url: &str) -> Option<String> {
    ASSET_VERSION_PATTERNS
        .iter()
        .find_map(|re| re.captures(url))
        .map(|caps| normalize_version(&caps[1]))
}

/// Plugin slug from a URL containing a plugin-content path
pub fn plugin_slug_from_path(url: &str) -> Option<&str> {
    let slug = PLUGIN_PATH_RE.captures(url)?.get(1)?.as_str();
    (!SKIP_PLUGIN_SLUGS.contains(&slug)).then_some(slug)
}

/// Stylesheets and scripts served from plugin directories
pub fn asset_path_signals(ctx: &PageContext<'_>) -> Vec<Signal> {
    let asset_selector = selector("link[href], script[src]");
    let assets = ctx
        .document
        .select(&asset_selector)
        .filter_map(|e| e.value().attr("href").or_else(|| e.value().attr("src")));

    assets
        .filter_map(|url| {
            let slug = plugin_slug_from_path(url)?;
            Some(Signal::Plugin(
                PluginCandidate::new(slug, asset_version(url), Source::AssetPath).with_dir(slug),
            ))
        })
        .collect()
}

/// Any plugin-content path anywhere in the markup, name only
pub fn content_path_signals(ctx: &PageContext<'_>) -> Vec<Signal> {
    plugin_paths_in(ctx.raw, Source::ContentPath)
}

/// Name-only signals for every plugin-content path in `text`
pub fn plugin_paths_in(text: &str, source: Source) -> Vec<Signal> {
    ESCAPED_PLUGIN_PATH_RE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|s| !SKIP_PLUGIN_SLUGS.contains(s))
        .map(|s| Signal::plugin_at(s, source))
        .collect()
}

/// Developer annotations in comments and inline scripts
pub fn inline_comment_signals(ctx: &PageContext<'_>) -> Vec<Signal> {
    let mut signals: Vec<Signal> = PLUGIN_HEADER_RE
        .captures_iter(ctx.raw)
        .map(|caps| annotated(&caps[1], &caps[2]))
        .collect();

    for comment in HTML_COMMENT_RE.captures_iter(ctx.raw) {
        let body = &comment[1];
        if let Some(caps) = COMMENT_VERSION_PATTERNS.iter().find_map(|re| re.captures(body))
            && !is_status_line(&caps[1])
        {
            signals.push(annotated(&caps[1], &caps[2]));
        }
    }

    // Core's own "WordPress x.y" annotations are not plugins
    signals.retain(|s| !matches!(s, Signal::Plugin(p) if p.slug.is_empty() || p.slug == "wordpress"));
    signals
}

fn is_status_line(name: &str) -> bool {
    name.split_whitespace()
        .any(|word| STATUS_WORDS.iter().any(|w| word.eq_ignore_ascii_case(w)))
}

fn annotated(name: &str, version: &str) -> Signal {
    Signal::Plugin(
        PluginCandidate::new(name, Some(version.to_string()), Source::InlineComment)
            .with_display_name(name),
    )
}

/// Known premium plugins matched against the markup and inline scripts
pub fn premium_signals(ctx: &PageContext<'_>) -> Vec<Signal> {
    let inline_scripts: Vec<String> = ctx
        .document
        .select(&selector("script:not([src])"))
        .map(|s| s.text().collect())
        .collect();

    let mut sources: Vec<&str> = vec![ctx.raw];
    sources.extend(inline_scripts.iter().map(String::as_str));

    PREMIUM_PLUGINS
        .iter()
        .filter_map(|fp| {
            fp.patterns.iter().find_map(|re| {
                sources.iter().find_map(|text| {
                    re.captures(text).map(|caps| {
                        let version = caps.get(1).map(|m| m.as_str().to_string());
                        Signal::Plugin(PluginCandidate::new(fp.slug, version, Source::Fingerprint))
                    })
                })
            })
        })
        .collect()
}

/// Theme slug and `?ver=` from a URL under a theme-content path
pub fn theme_from_url(url: &str) -> Option<(String, Option<String>)> {
    let slug = THEME_PATH_RE.captures(url)?.get(1)?.as_str().to_string();
    let version = ASSET_VERSION_PATTERNS[0]
        .captures(url)
        .map(|caps| normalize_version(&caps[1]));
    Some((slug, version))
}

/// Active theme from theme-content stylesheets.
///
/// The first stylesheet names the theme; a later stylesheet from a
/// different theme directory marks it as a child of that theme.
pub fn theme_signals(ctx: &PageContext<'_>) -> Vec<Signal> {
    let mut theme: Option<ThemeCandidate> = None;

    let link_selector = selector("link[href]");
    let stylesheets = ctx
        .document
        .select(&link_selector)
        .filter(|e| {
            e.value()
                .attr("rel")
                .is_some_and(|r| r.split_whitespace().any(|t| t.eq_ignore_ascii_case("stylesheet")))
        })
        .filter_map(|e| e.value().attr("href"));

    for href in stylesheets {
        let Some((name, version)) = theme_from_url(href) else {
            continue;
        };
        match theme.as_mut() {
            None => {
                theme = Some(ThemeCandidate {
                    name,
                    version,
                    parent: None,
                })
            }
            Some(active) if active.name != name => {
                active.parent = Some(name);
                break;
            }
            Some(_) => {}
        }
    }

    // Fall back to any theme path in the markup, name only
    if theme.is_none()
        && let Some(caps) = THEME_PATH_RE.captures(ctx.raw)
    {
        theme = Some(ThemeCandidate {
            name: caps[1].to_string(),
            ..ThemeCandidate::default()
        });
    }

    theme
        .filter(|t| !slug::normalize(&t.name).is_empty())
        .map(Signal::Theme)
        .into_iter()
        .collect()
}
