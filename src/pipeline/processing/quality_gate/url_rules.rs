//! Syntactic, blacklist and authority checks for source URLs.

use url::Url;

/// Why a source URL failed the syntax check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlSyntaxError {
    Unparseable(String),
    UnsupportedScheme(String),
    MissingHost,
}

impl std::fmt::Display for UrlSyntaxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UrlSyntaxError::Unparseable(e) => write!(f, "unparseable URL: {}", e),
            UrlSyntaxError::UnsupportedScheme(s) => write!(f, "unsupported scheme '{}'", s),
            UrlSyntaxError::MissingHost => f.write_str("URL has no host"),
        }
    }
}

/// Parse a source URL, accepting only http(s) with a non-empty host
pub fn parse_source_url(raw: &str) -> Result<Url, UrlSyntaxError> {
    let url = Url::parse(raw.trim()).map_err(|e| UrlSyntaxError::Unparseable(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(UrlSyntaxError::UnsupportedScheme(other.to_string())),
    }
    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(UrlSyntaxError::MissingHost),
    }
}

/// Pattern tables used to judge source credibility
#[derive(Debug, Clone)]
pub struct SourcePatterns {
    blacklist: Vec<String>,
    authoritative_suffixes: Vec<String>,
    official_hosts: Vec<String>,
}

impl SourcePatterns {
    pub fn new(
        blacklist: &[String],
        authoritative_suffixes: &[String],
        official_hosts: &[String],
    ) -> Self {
        Self {
            blacklist: lower(blacklist),
            authoritative_suffixes: lower(authoritative_suffixes),
            official_hosts: lower(official_hosts),
        }
    }

    pub fn blacklist_patterns(&self) -> &[String] {
        &self.blacklist
    }

    /// First blacklist pattern contained anywhere in the URL, case-insensitively
    pub fn blacklist_match(&self, raw_url: &str) -> Option<&str> {
        let lowered = raw_url.to_lowercase();
        self.blacklist
            .iter()
            .find(|pattern| lowered.contains(pattern.as_str()))
            .map(String::as_str)
    }

    /// Government, academic, reference or whitelisted official host
    pub fn is_authoritative(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.to_lowercase();
        let host = host.strip_prefix("www.").unwrap_or(&host);

        let suffix_match = self.authoritative_suffixes.iter().any(|suffix| {
            host.ends_with(suffix.as_str()) || host == suffix.trim_start_matches('.')
        });
        let official_match = self
            .official_hosts
            .iter()
            .any(|official| host == official.as_str() || host.ends_with(&format!(".{}", official)));

        suffix_match || official_match
    }
}

fn lower(items: &[String]) -> Vec<String> {
    items
        .iter()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}
