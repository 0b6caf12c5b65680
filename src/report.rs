//! Site report assembly

use crate::extract::PageMeta;
use crate::fingerprints::is_security_plugin;
use crate::registry::Currency;
use crate::resolve::Resolved;
use crate::version::is_current;
use serde::{Deserialize, Serialize};

/// Placeholder for unknown plugin versions
pub const UNKNOWN_VERSION: &str = "unknown";

/// One installed plugin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plugin {
    /// Normalized slug
    #[serde(default)]
    pub slug: String,
    /// Display name (slug when no better name was found)
    pub name: String,
    /// Detected version or `"unknown"`
    #[serde(default = "unknown_version")]
    pub version: String,
    /// Whether the version is a confirmed, well-formed version
    #[serde(default)]
    pub version_detected: bool,
    /// Latest registry version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_version: Option<String>,
    /// Currency; absent when it cannot be determined
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_up_to_date: Option<bool>,
}

fn unknown_version() -> String {
    UNKNOWN_VERSION.to_string()
}

/// Active theme
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    /// Theme directory name
    pub name: String,
    /// Version, if known
    #[serde(default)]
    pub version: Option<String>,
    /// Whether this is a child theme
    #[serde(default)]
    pub is_child: bool,
    /// Parent theme for child themes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_theme: Option<String>,
    /// Latest registry version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_version: Option<String>,
    /// Currency; absent when it cannot be determined
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_up_to_date: Option<bool>,
}

/// Complete fingerprint of one site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteReport {
    /// Target URL
    #[serde(default)]
    pub url: String,
    /// Page title
    #[serde(default)]
    pub title: Option<String>,
    /// Meta description
    #[serde(default)]
    pub meta_description: Option<String>,
    /// Whether the site runs WordPress
    #[serde(default, rename = "isWordPress")]
    pub is_wordpress: bool,
    /// Core version
    #[serde(default, rename = "wpVersion")]
    pub wp_version: Option<String>,
    /// Core currency against the baseline; null when undeterminable
    #[serde(default, rename = "isWPUpToDate")]
    pub is_wp_up_to_date: Option<bool>,
    /// Baseline the core version was compared against
    #[serde(default, rename = "latestWpVersion")]
    pub latest_wp_version: String,
    /// PHP version
    #[serde(default)]
    pub php_version: Option<String>,
    /// Web server software
    #[serde(default)]
    pub web_server: Option<String>,
    /// Installed plugins
    #[serde(default)]
    pub plugins: Vec<Plugin>,
    /// Active theme
    #[serde(default)]
    pub theme: Option<Theme>,
    /// Whether a known security plugin is installed
    #[serde(default)]
    pub has_security_plugin: bool,
}

impl SiteReport {
    /// Plugins known to be behind the registry
    pub fn outdated_plugins(&self) -> impl Iterator<Item = &Plugin> {
        self.plugins.iter().filter(|p| p.is_up_to_date == Some(false))
    }
}

/// Merge page metadata, resolved identity and currency into a report
pub fn assemble(
    url: &str,
    meta: PageMeta,
    resolved: Resolved,
    currency: Currency,
    core_baseline: &str,
) -> SiteReport {
    let mut latest_plugins = currency.plugins.into_iter();

    let plugins: Vec<Plugin> = resolved
        .plugins
        .into_iter()
        .map(|candidate| {
            let latest_version = latest_plugins.next().flatten();
            let is_up_to_date = if candidate.version_confirmed {
                is_current(candidate.version.as_deref(), latest_version.as_deref())
            } else {
                None
            };
            Plugin {
                name: candidate.display_name.unwrap_or_else(|| candidate.slug.clone()),
                slug: candidate.slug,
                version: candidate.version.unwrap_or_else(unknown_version),
                version_detected: candidate.version_confirmed,
                latest_version,
                is_up_to_date,
            }
        })
        .collect();

    let theme = resolved.theme.map(|t| {
        let is_up_to_date = is_current(t.version.as_deref(), currency.theme.as_deref());
        Theme {
            is_child: t.parent.is_some(),
            name: t.name,
            version: t.version,
            parent_theme: t.parent,
            latest_version: currency.theme,
            is_up_to_date,
        }
    });

    let has_security_plugin = plugins.iter().any(|p| is_security_plugin(&p.slug));

    SiteReport {
        url: url.to_string(),
        title: meta.title,
        meta_description: meta.description,
        is_wordpress: resolved.is_wordpress,
        is_wp_up_to_date: is_current(resolved.core_version.as_deref(), Some(core_baseline)),
        wp_version: resolved.core_version,
        latest_wp_version: core_baseline.to_string(),
        php_version: resolved.php_version,
        web_server: resolved.web_server,
        plugins,
        theme,
        has_security_plugin,
    }
}
