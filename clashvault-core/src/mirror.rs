//! GitHub mirror proxy rewriting for download URLs.

use reqwest::Url;

const GITHUB_DOMAINS: &[&str] = &[
    "github.com",
    "api.github.com",
    "raw.githubusercontent.com",
    "gist.githubusercontent.com",
    "objects.githubusercontent.com",
    "codeload.github.com",
];

/// Prefix a GitHub URL with a mirror proxy, if one is configured.
///
/// Non-GitHub URLs, unparsable URLs, and blank mirrors pass through
/// unchanged.
pub fn apply(url: &str, mirror: Option<&str>) -> String {
    let Some(mirror) = mirror.map(str::trim).filter(|m| !m.is_empty()) else {
        return url.to_string();
    };

    let Ok(parsed) = Url::parse(url) else {
        return url.to_string();
    };
    let Some(host) = parsed.host_str() else {
        return url.to_string();
    };

    let host = host.to_ascii_lowercase();
    let is_github = GITHUB_DOMAINS
        .iter()
        .any(|domain| host == *domain || host.ends_with(&format!(".{domain}")));
    if !is_github {
        return url.to_string();
    }

    if mirror.ends_with('/') {
        format!("{mirror}{url}")
    } else {
        format!("{mirror}/{url}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes_github_urls() {
        assert_eq!(
            apply(
                "https://gist.githubusercontent.com/u/abc/raw/f.enc",
                Some("https://ghfast.top")
            ),
            "https://ghfast.top/https://gist.githubusercontent.com/u/abc/raw/f.enc"
        );
    }

    #[test]
    fn mirror_trailing_slash_is_normalized() {
        assert_eq!(
            apply("https://github.com/a/b", Some("https://ghfast.top/")),
            "https://ghfast.top/https://github.com/a/b"
        );
    }

    #[test]
    fn non_github_urls_pass_through() {
        assert_eq!(
            apply("https://example.com/file", Some("https://ghfast.top")),
            "https://example.com/file"
        );
    }

    #[test]
    fn subdomains_are_matched() {
        assert_eq!(
            apply("https://codeload.github.com/x", Some("https://m.example")),
            "https://m.example/https://codeload.github.com/x"
        );
    }

    #[test]
    fn blank_mirror_is_ignored() {
        assert_eq!(apply("https://github.com/a", Some("  ")), "https://github.com/a");
        assert_eq!(apply("https://github.com/a", None), "https://github.com/a");
    }

    #[test]
    fn lookalike_host_is_not_matched() {
        assert_eq!(
            apply("https://notgithub.com/a", Some("https://m.example")),
            "https://notgithub.com/a"
        );
    }
}
