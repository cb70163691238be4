/// Defaults shared by the validator configuration and the CLI.
/// Everything here can be overridden through `config.toml`.

/// Source URL fragments that mark placeholder or fabricated citations
pub const DEFAULT_BLACKLIST_PATTERNS: &[&str] = &[
    "example.com",
    "placeholder",
    "test.com",
    "localhost",
    "127.0.0.1",
    "dummy",
    "fake",
];

/// Host suffixes of government, academic and reference domains.
/// Matched against the lowercased host, so `.gov` also covers `www.usa.gov`.
pub const DEFAULT_AUTHORITATIVE_HOST_SUFFIXES: &[&str] = &[
    ".gov",
    ".gov.uk",
    ".gouv.fr",
    ".gv.at",
    ".admin.ch",
    ".europa.eu",
    ".bund.de",
    ".bundesregierung.de",
    ".bundestag.de",
    ".baden-wuerttemberg.de",
    ".bayern.de",
    ".berlin.de",
    ".brandenburg.de",
    ".bremen.de",
    ".hamburg.de",
    ".hessen.de",
    ".niedersachsen.de",
    ".nrw.de",
    ".rlp.de",
    ".saarland.de",
    ".sachsen.de",
    ".sachsen-anhalt.de",
    ".schleswig-holstein.de",
    ".thueringen.de",
    ".mv-regierung.de",
    ".edu",
    ".ac.uk",
    ".wikipedia.org",
    ".wikidata.org",
];

/// Explicitly whitelisted official hosts that don't follow a government suffix
pub const DEFAULT_OFFICIAL_HOSTS: &[&str] = &[
    "landtag-bw.de",
    "destatis.de",
    "statistik-bw.de",
    "service-bw.de",
];

/// Phrases that show up when a research agent crashed instead of answering
pub const AGENT_ERROR_SENTINELS: &[&str] = &[
    "error occurred during execution",
    "an error occurred while",
    "agent stopped due to",
    "traceback (most recent call last)",
];

pub const DEFAULT_REJECTION_THRESHOLD: f64 = 0.3;
pub const DEFAULT_MIN_NAME_CHARS: usize = 2;
pub const DEFAULT_MIN_DESCRIPTION_CHARS: usize = 10;

pub const DEFAULT_URL_CHECK_CONCURRENCY: usize = 10;
pub const DEFAULT_URL_CHECK_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_SCHEMA_CHECK_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_USER_AGENT: &str = "sachstand-url-check/0.1";

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";
pub const CONFIG_PATH_ENV: &str = "SACHSTAND_CONFIG";
pub const METRICS_ADDR_ENV: &str = "SACHSTAND_METRICS_ADDR";

pub const SCHEMA_ORG_CONTEXT: &str = "https://schema.org";
pub const DOCUMENT_TYPE: &str = "ResearchReport";
pub const CITATION_TYPE: &str = "WebPage";
pub const WIKIDATA_ENTITY_PREFIX: &str = "https://www.wikidata.org/wiki/";
