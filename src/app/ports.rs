use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::UrlVerification;
use crate::pipeline::processing::assemble::Sachstand;

/// Live accessibility check for source URLs
#[async_trait]
pub trait UrlVerifierPort: Send + Sync {
    async fn verify_urls(&self, urls: &[String]) -> anyhow::Result<VerifyUrlsResponse>;
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VerifyUrlsResponse {
    pub results: Vec<UrlCheckResult>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UrlCheckResult {
    pub url: String,
    /// Syntactically usable http(s) URL
    pub valid: bool,
    /// The server answered with a success or redirect status
    pub accessible: bool,
    pub status_code: Option<u16>,
    pub issue: Option<String>,
}

impl UrlCheckResult {
    /// Map a check result onto the verification status sources carry
    pub fn verification(&self) -> UrlVerification {
        if self.accessible {
            return UrlVerification::Accessible;
        }
        match self.status_code {
            Some(404) | Some(410) => UrlVerification::Unreachable,
            _ => UrlVerification::Unverified,
        }
    }
}

/// Advisory structural check of one rendered entity node
#[async_trait]
pub trait SchemaValidatorPort: Send + Sync {
    async fn validate_schema(&self, entity: &Value) -> anyhow::Result<SchemaReport>;
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaReport {
    pub valid: bool,
    pub issues: Vec<String>,
    /// Field -> suggested value
    pub corrections: Vec<SchemaCorrection>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SchemaCorrection {
    pub field: String,
    pub suggested: Value,
}

/// Where finished documents go
#[async_trait]
pub trait DocumentOutputPort: Send + Sync {
    async fn write_document(&self, document: &Sachstand) -> anyhow::Result<()>;
}
