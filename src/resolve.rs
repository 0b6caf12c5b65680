//! Identity resolution
//!
//! Signals from every phase are folded, one phase at a time, into a single
//! [`Resolver`]. Plugins are keyed by normalized slug; the first confirmed
//! version for a slug is final.

use crate::signal::{PluginCandidate, PluginLocation, Signal, Source, ThemeCandidate};
use std::collections::HashMap;
use tracing::debug;

/// Merged view of everything known about the site
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    wordpress: bool,
    core_version: Option<String>,
    php_version: Option<String>,
    web_server: Option<String>,
    plugins: Vec<PluginCandidate>,
    index: HashMap<String, usize>,
    theme: Option<ThemeCandidate>,
}

/// Final resolved identity
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolved {
    /// Whether any WordPress evidence was seen
    pub is_wordpress: bool,
    /// Core version, if found
    pub core_version: Option<String>,
    /// PHP version, if disclosed
    pub php_version: Option<String>,
    /// Web server software, if disclosed
    pub web_server: Option<String>,
    /// Plugins in discovery order, unique by slug
    pub plugins: Vec<PluginCandidate>,
    /// Active theme
    pub theme: Option<ThemeCandidate>,
}

impl Resolver {
    /// Create an empty resolver
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a batch of signals in order
    pub fn fold(&mut self, signals: impl IntoIterator<Item = Signal>) {
        for signal in signals {
            self.apply(signal);
        }
    }

    fn apply(&mut self, signal: Signal) {
        match signal {
            Signal::WordPress => self.wordpress = true,
            Signal::CoreVersion(version, source) => {
                self.wordpress = true;
                if self.core_version.is_none() {
                    debug!(version = %version, ?source, "core version found");
                    self.core_version = Some(version);
                }
            }
            Signal::PhpVersion(version) => {
                self.php_version.get_or_insert(version);
            }
            Signal::WebServer(server) => {
                self.web_server.get_or_insert(server);
            }
            Signal::Plugin(candidate) => self.merge_plugin(candidate),
            Signal::Theme(candidate) => self.merge_theme(candidate),
        }
    }

    /// Merge one plugin candidate into the set.
    ///
    /// A new slug is appended. For a known slug the existing record keeps a
    /// confirmed version forever; otherwise a confirmed version replaces an
    /// unconfirmed one, and any version fills an empty one.
    pub fn merge_plugin(&mut self, candidate: PluginCandidate) {
        if candidate.slug.is_empty() {
            return;
        }

        let Some(&i) = self.index.get(&candidate.slug) else {
            debug!(slug = %candidate.slug, source = ?candidate.source, "plugin discovered");
            self.index.insert(candidate.slug.clone(), self.plugins.len());
            self.plugins.push(candidate);
            return;
        };

        let existing = &mut self.plugins[i];

        if existing.dir.is_none() {
            existing.dir = candidate.dir;
        }

        if !existing.version_confirmed {
            if candidate.version_confirmed {
                debug!(
                    slug = %existing.slug,
                    version = candidate.version.as_deref().unwrap_or_default(),
                    source = ?candidate.source,
                    "plugin version confirmed"
                );
                existing.version = candidate.version;
                existing.version_confirmed = true;
                existing.source = candidate.source;
            } else if existing.version.is_none() && candidate.version.is_some() {
                existing.version = candidate.version;
                existing.source = candidate.source;
            }
        }

        // Readme names are canonical; other sources only fill gaps
        match (candidate.display_name, candidate.source) {
            (Some(name), Source::Readme) => existing.display_name = Some(name),
            (Some(name), _) if existing.display_name.is_none() => {
                existing.display_name = Some(name)
            }
            _ => {}
        }
    }

    /// Merge a theme candidate: the first theme's identity is final, later
    /// ones for the same theme may only fill missing version or parent.
    pub fn merge_theme(&mut self, candidate: ThemeCandidate) {
        match self.theme.as_mut() {
            None => {
                debug!(theme = %candidate.name, "theme discovered");
                self.wordpress = true;
                self.theme = Some(candidate);
            }
            Some(theme) if theme.name == candidate.name => {
                if theme.version.is_none() {
                    theme.version = candidate.version;
                }
                if theme.parent.is_none() {
                    theme.parent = candidate.parent.filter(|p| *p != theme.name);
                }
            }
            Some(theme) => {
                debug!(kept = %theme.name, ignored = %candidate.name, "conflicting theme ignored");
            }
        }
    }

    /// Whether a core version is known
    pub fn has_core_version(&self) -> bool {
        self.core_version.is_some()
    }

    /// Plugins still lacking a confirmed version, located by the directory
    /// seen on the site or by slug when no path was seen
    pub fn unconfirmed_plugins(&self) -> Vec<PluginLocation> {
        self.plugins
            .iter()
            .filter(|p| !p.version_confirmed)
            .map(|p| PluginLocation {
                slug: p.slug.clone(),
                dir: p.dir.clone().unwrap_or_else(|| p.slug.clone()),
            })
            .collect()
    }

    /// Current theme, if any
    pub fn theme(&self) -> Option<&ThemeCandidate> {
        self.theme.as_ref()
    }

    /// Finish resolution
    pub fn finish(self) -> Resolved {
        let is_wordpress = self.wordpress || !self.plugins.is_empty();
        Resolved {
            is_wordpress,
            core_version: self.core_version,
            php_version: self.php_version,
            web_server: self.web_server,
            plugins: self.plugins,
            theme: self.theme,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plugin(slug: &str, version: Option<&str>, source: Source) -> Signal {
        Signal::Plugin(PluginCandidate::new(slug, version.map(str::to_string), source))
    }

    fn only(resolved: &Resolved, slug: &str) -> PluginCandidate {
        let matching: Vec<_> = resolved.plugins.iter().filter(|p| p.slug == slug).collect();
        assert_eq!(matching.len(), 1, "expected exactly one {slug}");
        matching[0].clone()
    }

    #[test]
    fn dedupes_by_normalized_slug() {
        let mut resolver = Resolver::new();
        resolver.fold([
            plugin("Contact Form 7", None, Source::InlineComment),
            plugin("contact-form-7", Some("5.8"), Source::AssetPath),
            plugin("contact_form_7", None, Source::RestApi),
        ]);
        let resolved = resolver.finish();
        assert_eq!(resolved.plugins.len(), 1);
        assert_eq!(only(&resolved, "contact-form-7").version.as_deref(), Some("5.8"));
    }

    #[test]
    fn confirmed_replaces_unconfirmed() {
        let mut resolver = Resolver::new();
        resolver.fold([
            plugin("foo", Some("1748271784"), Source::AssetPath),
            plugin("foo", Some("2.1.0"), Source::Readme),
        ]);
        let foo = only(&resolver.finish(), "foo");
        assert_eq!(foo.version.as_deref(), Some("2.1.0"));
        assert!(foo.version_confirmed);
        assert_eq!(foo.source, Source::Readme);
    }

    #[test]
    fn first_confirmed_version_wins() {
        let mut resolver = Resolver::new();
        resolver.fold([
            plugin("foo", Some("1.0.0"), Source::AssetPath),
            plugin("foo", Some("1.2.0"), Source::MainFile),
            plugin("foo", Some("trunk"), Source::Readme),
            plugin("foo", None, Source::DirectoryListing),
        ]);
        let foo = only(&resolver.finish(), "foo");
        assert_eq!(foo.version.as_deref(), Some("1.0.0"));
        assert!(foo.version_confirmed);
    }

    #[test]
    fn unconfirmed_fills_empty_only() {
        let mut resolver = Resolver::new();
        resolver.fold([
            plugin("foo", None, Source::RestApi),
            plugin("foo", Some("abcdef12"), Source::AssetPath),
            plugin("foo", Some("trunk"), Source::Readme),
        ]);
        let foo = only(&resolver.finish(), "foo");
        assert_eq!(foo.version.as_deref(), Some("abcdef12"));
        assert!(!foo.version_confirmed);
    }

    #[test]
    fn readme_name_is_canonical() {
        let mut resolver = Resolver::new();
        resolver.merge_plugin(
            PluginCandidate::named("wordpress-seo", Source::AssetPath).with_display_name("wpseo"),
        );
        resolver.merge_plugin(
            PluginCandidate::named("wordpress-seo", Source::Readme).with_display_name("Yoast SEO"),
        );
        resolver.merge_plugin(
            PluginCandidate::named("wordpress-seo", Source::InlineComment)
                .with_display_name("Something Else"),
        );
        let seo = only(&resolver.finish(), "wordpress-seo");
        assert_eq!(seo.display_name.as_deref(), Some("Yoast SEO"));
    }

    #[test]
    fn ignores_empty_slugs() {
        let mut resolver = Resolver::new();
        resolver.fold([plugin("---", Some("1.0"), Source::InlineComment)]);
        assert!(resolver.finish().plugins.is_empty());
    }

    #[test]
    fn unconfirmed_plugins_listed_in_order() {
        let mut resolver = Resolver::new();
        resolver.fold([
            plugin("b", None, Source::ContentPath),
            plugin("a", Some("1.0"), Source::AssetPath),
            plugin("c", Some("latest"), Source::AssetPath),
        ]);
        let slugs: Vec<_> = resolver.unconfirmed_plugins().into_iter().map(|p| p.slug).collect();
        assert_eq!(slugs, vec!["b".to_string(), "c".to_string()]);
    }

    #[test]
    fn observed_directory_survives_merge() {
        let mut resolver = Resolver::new();
        resolver.fold([
            Signal::plugin("my-plugin", Source::RestApi),
            Signal::plugin_at("my_plugin", Source::ContentPath),
            Signal::plugin_at("My_Plugin", Source::ErrorPage),
            Signal::plugin("other", Source::RestApi),
        ]);
        assert_eq!(
            resolver.unconfirmed_plugins(),
            vec![
                PluginLocation {
                    slug: "my-plugin".into(),
                    dir: "my_plugin".into(),
                },
                PluginLocation {
                    slug: "other".into(),
                    dir: "other".into(),
                },
            ]
        );
    }

    #[test]
    fn theme_first_found_wins() {
        let mut resolver = Resolver::new();
        resolver.fold([
            Signal::Theme(ThemeCandidate {
                name: "astra-child".into(),
                version: None,
                parent: None,
            }),
            Signal::Theme(ThemeCandidate {
                name: "other".into(),
                version: Some("9.9".into()),
                parent: None,
            }),
            Signal::Theme(ThemeCandidate {
                name: "astra-child".into(),
                version: Some("1.0.2".into()),
                parent: Some("astra".into()),
            }),
            Signal::Theme(ThemeCandidate {
                name: "astra-child".into(),
                version: Some("2.0".into()),
                parent: Some("divi".into()),
            }),
        ]);
        let theme = resolver.finish().theme.unwrap();
        assert_eq!(theme.name, "astra-child");
        assert_eq!(theme.version.as_deref(), Some("1.0.2"));
        assert_eq!(theme.parent.as_deref(), Some("astra"));
    }

    #[test]
    fn core_version_first_wins_and_implies_wordpress() {
        let mut resolver = Resolver::new();
        resolver.fold([
            Signal::CoreVersion("6.2".into(), Source::Generator),
            Signal::CoreVersion("6.4.1".into(), Source::Feed),
            Signal::PhpVersion("8.1".into()),
            Signal::PhpVersion("7.4".into()),
        ]);
        let resolved = resolver.finish();
        assert!(resolved.is_wordpress);
        assert_eq!(resolved.core_version.as_deref(), Some("6.2"));
        assert_eq!(resolved.php_version.as_deref(), Some("8.1"));
    }
}
