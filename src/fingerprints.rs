//! Fixed lookup tables used by the extractors and the report

use once_cell::sync::Lazy;
use regex::Regex;

/// A commercial plugin recognised by markup it injects rather than by an
/// asset path with a readable slug.
#[derive(Debug)]
pub struct PremiumFingerprint {
    /// Registry slug the plugin is reported under
    pub slug: &'static str,
    /// Tried in order; capture group 1, when present, is the version
    pub patterns: Vec<Regex>,
}

fn premium(slug: &'static str, patterns: &[&str]) -> PremiumFingerprint {
    PremiumFingerprint {
        slug,
        patterns: patterns
            .iter()
            .map(|p| Regex::new(p).expect("valid fingerprint regex"))
            .collect(),
    }
}

/// Premium plugins, each with an ordered list of recognisers
pub static PREMIUM_PLUGINS: Lazy<Vec<PremiumFingerprint>> = Lazy::new(|| {
    vec![
        premium(
            "elementor-pro",
            &[
                r#"/elementor-pro/[^"'\s]*\?ver=([0-9][0-9a-zA-Z._-]*)"#,
                r#"ElementorProFrontendConfig\s*=\s*\{[^;]*?"version":"([0-9][^"]*)""#,
                r"ElementorProFrontendConfig",
            ],
        ),
        premium(
            "wp-rocket",
            &[
                r"<!--[^>]*WP Rocket[^>]*?(\d+\.\d+(?:\.\d+)*)",
                r"<!--\s*This website is like a Rocket",
                r"/wp-content/cache/wp-rocket/",
            ],
        ),
        premium(
            "gravityforms",
            &[
                r#"/gravityforms/[^"'\s]*\?ver=([0-9][0-9a-zA-Z._-]*)"#,
                r#"gform_wrapper"#,
                r#"var gf_global\s*="#,
            ],
        ),
        premium(
            "advanced-custom-fields-pro",
            &[
                r#"/advanced-custom-fields-pro/[^"'\s]*\?ver=([0-9][0-9a-zA-Z._-]*)"#,
                r"acf-pro",
            ],
        ),
        premium(
            "sitepress-multilingual-cms",
            &[
                r#"<meta name="generator" content="WPML ver:([0-9][0-9.]*)"#,
                r"/sitepress-multilingual-cms/",
                r"var icl_vars\s*=",
            ],
        ),
        premium(
            "revslider",
            &[
                r#"Powered by Slider Revolution ([0-9][0-9.]*)"#,
                r#"/revslider/[^"'\s]*\?ver=([0-9][0-9a-zA-Z._-]*)"#,
                r"window\.RS_MODULES",
                r"rev_slider_wrapper",
            ],
        ),
        premium(
            "js-composer",
            &[
                r#"Powered by WPBakery Page Builder[^"]*?([0-9][0-9.]*)?""#,
                r#"/js_composer/[^"'\s]*\?ver=([0-9][0-9a-zA-Z._-]*)"#,
                r#"class="[^"]*\bvc_row\b"#,
            ],
        ),
        premium(
            "layerslider",
            &[
                r#"/LayerSlider/[^"'\s]*\?ver=([0-9][0-9a-zA-Z._-]*)"#,
                r"LS_Meta\s*=\s*\{[^}]*?v:\s*'([0-9][0-9.]*)'",
                r"layerslider",
            ],
        ),
        premium(
            "divi-builder",
            &[
                r#"/divi-builder/[^"'\s]*\?ver=([0-9][0-9a-zA-Z._-]*)"#,
                r#"et_pb_custom\s*="#,
                r#"class="[^"]*\bet_pb_section\b"#,
            ],
        ),
        premium(
            "wp-all-import-pro",
            &[r"/wp-all-import-pro/"],
        ),
        premium(
            "searchwp",
            &[
                r#"/searchwp/[^"'\s]*\?ver=([0-9][0-9a-zA-Z._-]*)"#,
                r"searchwp-live-search",
            ],
        ),
        premium(
            "memberpress",
            &[
                r#"/memberpress/[^"'\s]*\?ver=([0-9][0-9a-zA-Z._-]*)"#,
                r"mepr-signup-form",
            ],
        ),
    ]
});

/// Slugs of plugins whose presence counts as a hardening measure
pub const SECURITY_PLUGINS: &[&str] = &[
    "wordfence",
    "sucuri-scanner",
    "better-wp-security",
    "all-in-one-wp-security-and-firewall",
    "ithemes-security-pro",
    "wp-cerber",
    "bulletproof-security",
    "malcare-security",
    "defender-security",
    "wp-simple-firewall",
    "security-ninja",
    "ninjafirewall",
    "wp-defender",
    "jetpack-protect",
    "wps-hide-login",
    "limit-login-attempts-reloaded",
    "loginizer",
    "two-factor",
    "wp-2fa",
    "cleantalk-spam-protect",
];

/// Whether `slug` names a known security plugin
pub fn is_security_plugin(slug: &str) -> bool {
    SECURITY_PLUGINS.contains(&slug)
}

/// REST namespace roots shipped with WordPress core
const CORE_NAMESPACES: &[&str] = &[
    "wp",
    "oembed",
    "wp-site-health",
    "wp-block-editor",
    "wp-abilities",
];

/// Whether a REST namespace root belongs to core
pub fn is_core_namespace(root: &str) -> bool {
    CORE_NAMESPACES.contains(&root)
}

/// REST namespace roots that differ from the plugin's registry slug
const NAMESPACE_ALIASES: &[(&str, &str)] = &[
    ("wc", "woocommerce"),
    ("wc-admin", "woocommerce"),
    ("wc-analytics", "woocommerce"),
    ("wc-telemetry", "woocommerce"),
    ("wccom-site", "woocommerce"),
    ("wc-store", "woocommerce"),
    ("yoast", "wordpress-seo"),
    ("contact-form-7", "contact-form-7"),
    ("jetpack", "jetpack"),
    ("wpcom", "jetpack"),
    ("elementor", "elementor"),
    ("wordfence", "wordfence"),
    ("redirection", "redirection"),
    ("aioseo", "all-in-one-seo-pack"),
    ("rankmath", "seo-by-rank-math"),
    ("litespeed", "litespeed-cache"),
    ("wpforms", "wpforms-lite"),
    ("mc4wp", "mailchimp-for-wp"),
    ("google-site-kit", "google-site-kit"),
    ("regenerate-thumbnails", "regenerate-thumbnails"),
];

/// Map a REST namespace root to the slug of the plugin that registers it
pub fn namespace_plugin(root: &str) -> &str {
    NAMESPACE_ALIASES
        .iter()
        .find(|(ns, _)| *ns == root)
        .map(|(_, slug)| *slug)
        .unwrap_or(root)
}

/// Generator meta values emitted by plugins: (prefix, slug)
pub const GENERATOR_PLUGINS: &[(&str, &str)] = &[
    ("WooCommerce", "woocommerce"),
    ("Elementor", "elementor"),
    ("Site Kit by Google", "google-site-kit"),
    ("Powered by Slider Revolution", "revslider"),
    ("Powered by WPBakery Page Builder", "js-composer"),
    ("Redux", "redux-framework"),
    ("MasterSlider", "master-slider"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn premium_patterns_compile() {
        assert!(PREMIUM_PLUGINS.iter().all(|p| !p.patterns.is_empty()));
    }

    #[test]
    fn core_namespaces() {
        assert!(is_core_namespace("wp"));
        assert!(is_core_namespace("oembed"));
        assert!(is_core_namespace("wp-site-health"));
        assert!(is_core_namespace("wp-block-editor"));
        assert!(!is_core_namespace("wc"));
        assert!(!is_core_namespace("yoast"));
        assert!(!is_core_namespace("wpforms"));
        assert!(!is_core_namespace("wp-rocket"));
    }

    #[test]
    fn namespace_aliases() {
        assert_eq!(namespace_plugin("wc"), "woocommerce");
        assert_eq!(namespace_plugin("yoast"), "wordpress-seo");
        assert_eq!(namespace_plugin("my-plugin"), "my-plugin");
    }

    #[test]
    fn security_membership() {
        assert!(is_security_plugin("wordfence"));
        assert!(!is_security_plugin("akismet"));
    }
}
