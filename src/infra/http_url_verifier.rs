use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::debug;

use crate::app::ports::{UrlCheckResult, UrlVerifierPort, VerifyUrlsResponse};
use crate::config::UrlCheckConfig;
use crate::error::Result;
use crate::pipeline::processing::quality_gate::url_rules::parse_source_url;

/// HEAD-request URL verifier with bounded concurrency and a per-request timeout
pub struct ReqwestUrlVerifier {
    client: reqwest::Client,
    timeout: Duration,
    max_concurrency: usize,
}

impl ReqwestUrlVerifier {
    pub fn new(config: &UrlCheckConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;
        Ok(Self::with_client(client, config.timeout(), config.max_concurrency))
    }

    pub fn with_client(client: reqwest::Client, timeout: Duration, max_concurrency: usize) -> Self {
        Self {
            client,
            timeout,
            max_concurrency: max_concurrency.max(1),
        }
    }
}

/// Map an HTTP status onto a check result. 404 and 410 mean the page is gone;
/// anything else that isn't a success stays inconclusive.
pub fn classify_status(url: &str, status: u16) -> UrlCheckResult {
    let accessible = (200..400).contains(&status);
    let issue = match status {
        _ if accessible => None,
        404 | 410 => Some(format!("page not found (HTTP {})", status)),
        _ => Some(format!("inconclusive response (HTTP {})", status)),
    };
    UrlCheckResult {
        url: url.to_string(),
        valid: true,
        accessible,
        status_code: Some(status),
        issue,
    }
}

fn inconclusive(url: &str, valid: bool, issue: String) -> UrlCheckResult {
    UrlCheckResult {
        url: url.to_string(),
        valid,
        accessible: false,
        status_code: None,
        issue: Some(issue),
    }
}

async fn check_one(client: &reqwest::Client, url: &str, timeout: Duration) -> UrlCheckResult {
    if let Err(e) = parse_source_url(url) {
        return inconclusive(url, false, e.to_string());
    }

    match tokio::time::timeout(timeout, client.head(url).send()).await {
        Ok(Ok(response)) => classify_status(url, response.status().as_u16()),
        Ok(Err(e)) => {
            debug!(url, error = %e, "URL check failed on the network");
            inconclusive(url, true, format!("request failed: {}", e))
        }
        Err(_) => {
            debug!(url, "URL check timed out");
            inconclusive(url, true, format!("timed out after {}s", timeout.as_secs_f64()))
        }
    }
}

#[async_trait]
impl UrlVerifierPort for ReqwestUrlVerifier {
    async fn verify_urls(&self, urls: &[String]) -> anyhow::Result<VerifyUrlsResponse> {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks = JoinSet::new();

        for (index, url) in urls.iter().cloned().enumerate() {
            let semaphore = semaphore.clone();
            let client = self.client.clone();
            let timeout = self.timeout;
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                (index, check_one(&client, &url, timeout).await)
            });
        }

        let mut slots: Vec<Option<UrlCheckResult>> = vec![None; urls.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(e) => debug!(error = %e, "URL check task did not complete"),
            }
        }

        let results = slots
            .into_iter()
            .zip(urls)
            .map(|(slot, url)| slot.unwrap_or_else(|| inconclusive(url, true, "check aborted".to_string())))
            .collect();
        Ok(VerifyUrlsResponse { results })
    }
}
