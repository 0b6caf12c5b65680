//! Candidate facts emitted by extractors and probes

use crate::slug;
use crate::version;

/// Where a piece of evidence came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// `<meta name="generator">` or response headers
    Generator,
    /// Stylesheet or script URL
    AssetPath,
    /// Any plugin-content path in page markup
    ContentPath,
    /// Developer comment or inline script annotation
    InlineComment,
    /// Premium plugin fingerprint table
    Fingerprint,
    /// Plugin main PHP file header
    MainFile,
    /// Plugin readme.txt
    Readme,
    /// Plugin changelog
    Changelog,
    /// REST discovery document namespace
    RestApi,
    /// Open directory listing of the plugin root
    DirectoryListing,
    /// RSS/Atom feed body
    Feed,
    /// Error page for a deliberately invalid URL
    ErrorPage,
    /// Core readme.html
    CoreReadme,
}

/// A provisionally identified plugin
#[derive(Debug, Clone, PartialEq)]
pub struct PluginCandidate {
    /// Normalized slug, the merge key
    pub slug: String,
    /// Human-readable name, when a source provides one
    pub display_name: Option<String>,
    /// Version, if the source carried one
    pub version: Option<String>,
    /// Whether `version` validates as a dotted version
    pub version_confirmed: bool,
    /// Evidence source
    pub source: Source,
    /// Directory name as it appears under `wp-content/plugins/`
    pub dir: Option<String>,
}

impl PluginCandidate {
    /// Build a candidate; the slug is normalized and the version checked
    pub fn new(raw_slug: &str, version: Option<String>, source: Source) -> Self {
        let version = version
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        let version_confirmed = version.as_deref().is_some_and(version::is_valid);

        Self {
            slug: slug::normalize(raw_slug),
            display_name: None,
            version,
            version_confirmed,
            source,
            dir: None,
        }
    }

    /// Name-only candidate
    pub fn named(raw_slug: &str, source: Source) -> Self {
        Self::new(raw_slug, None, source)
    }

    /// Record the directory the plugin was seen under. Names that are not
    /// plain path segments are ignored.
    pub fn with_dir(mut self, dir: &str) -> Self {
        let plain = !dir.is_empty()
            && !dir.starts_with('.')
            && dir
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
        if plain {
            self.dir = Some(dir.to_string());
        }
        self
    }

    /// Attach a display name
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        let name = name.trim();
        if !name.is_empty() {
            self.display_name = Some(name.to_string());
        }
        self
    }
}

/// Where to look for a plugin's files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginLocation {
    /// Normalized slug evidence is reported under
    pub slug: String,
    /// Directory under `wp-content/plugins/`
    pub dir: String,
}

/// A provisionally identified theme
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ThemeCandidate {
    /// Theme directory name
    pub name: String,
    /// Version, if known
    pub version: Option<String>,
    /// Parent theme directory name, for child themes
    pub parent: Option<String>,
}

/// One fact about the target site
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    /// Something on the site is WordPress-specific
    WordPress,
    /// WordPress core version
    CoreVersion(String, Source),
    /// PHP version from headers
    PhpVersion(String),
    /// Web server software from headers
    WebServer(String),
    /// Plugin evidence
    Plugin(PluginCandidate),
    /// Theme evidence
    Theme(ThemeCandidate),
}

impl Signal {
    /// Shorthand for a name-only plugin signal
    pub fn plugin(raw_slug: &str, source: Source) -> Self {
        Self::Plugin(PluginCandidate::named(raw_slug, source))
    }

    /// Name-only plugin signal from a `wp-content/plugins/<dir>/` path
    pub fn plugin_at(dir: &str, source: Source) -> Self {
        Self::Plugin(PluginCandidate::named(dir, source).with_dir(dir))
    }

    /// Shorthand for a plugin signal with a version
    pub fn plugin_version(raw_slug: &str, version: impl Into<String>, source: Source) -> Self {
        Self::Plugin(PluginCandidate::new(raw_slug, Some(version.into()), source))
    }
}
