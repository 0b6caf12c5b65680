//! Version strings: validation, comparison and currency

use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;

/// Dotted numeric version with optional pre-release and build suffixes
static VERSION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^v?\d+(?:\.\d+){1,3}(?:-[0-9A-Za-z.-]+)?(?:\+[0-9A-Za-z.-]+)?$")
        .expect("valid version regex")
});

/// Whether `version` is a well-formed dotted version (`1.2`, `6.4.2`,
/// `7.0-alpha`). Placeholders, timestamps, hashes and bare integers are not.
pub fn is_valid(version: &str) -> bool {
    VERSION_RE.is_match(version.trim())
}

/// Compare two version strings semantically
/// Returns Ordering::Greater if current > latest (ahead/dev version)
/// Returns Ordering::Less if current < latest (outdated)
/// Returns Ordering::Equal if they match
pub fn compare_versions(current: &str, latest: &str) -> Ordering {
    // Split off any suffix like -alpha, -beta, -rc
    fn parse_version(v: &str) -> (Vec<u64>, bool) {
        let v = v.trim().trim_start_matches('v');
        let pos = v.find(|c: char| c == '-' || c == '+' || c.is_ascii_alphabetic());
        let version_part = match pos {
            Some(p) => &v[..p],
            None => v,
        };
        let has_suffix = pos.is_some_and(|p| !v[p..].starts_with('+'));

        let parts: Vec<u64> = version_part
            .split('.')
            .filter_map(|p| p.parse().ok())
            .collect();

        (parts, has_suffix)
    }

    let (current_parts, current_has_suffix) = parse_version(current);
    let (latest_parts, latest_has_suffix) = parse_version(latest);

    let max_len = current_parts.len().max(latest_parts.len());
    for i in 0..max_len {
        let c = current_parts.get(i).copied().unwrap_or(0);
        let l = latest_parts.get(i).copied().unwrap_or(0);
        match c.cmp(&l) {
            Ordering::Equal => continue,
            other => return other,
        }
    }

    // A version without suffix is newer than one with suffix (7.0 > 7.0-alpha)
    match (current_has_suffix, latest_has_suffix) {
        (false, true) => Ordering::Greater,
        (true, false) => Ordering::Less,
        _ => Ordering::Equal,
    }
}

/// Three-valued currency check.
///
/// `Some(true)` when `installed` is at or ahead of `latest`, `Some(false)`
/// when behind, `None` when either side is absent or not a valid version.
pub fn is_current(installed: Option<&str>, latest: Option<&str>) -> Option<bool> {
    let installed = installed.filter(|v| is_valid(v))?;
    let latest = latest.filter(|v| is_valid(v))?;
    Some(compare_versions(installed, latest) != Ordering::Less)
}

/// Normalize version string - detect timestamps and hashes
pub fn normalize_version(version: &str) -> String {
    // Unix timestamp detection (10 digits, starts with 1 or 2)
    if version.len() == 10
        && version.chars().all(|c| c.is_ascii_digit())
        && version.starts_with(['1', '2'])
    {
        return format!("(timestamp:{})", version);
    }

    // Git commit hash detection (7+ hex chars, not all digits)
    if version.len() >= 7
        && version.chars().all(|c| c.is_ascii_hexdigit())
        && !version.chars().all(|c| c.is_ascii_digit())
    {
        return format!("(hash:{})", &version[..7]);
    }

    version.to_string()
}
