//! Inscription content digests
//!
//! Fetches raw inscription content from an ordered list of ordinals content
//! gateways (`<gateway>/<inscription id>`) and hashes it with SHA-256. The
//! first gateway answering HTTP 200 wins; the rest are only tried on failure.

use crate::errors::{Result, TeleburnError};
use crate::identifier::InscriptionId;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Per-gateway request timeout
pub const DEFAULT_CONTENT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentDigest {
    pub inscription_id: String,
    /// Lowercase hex SHA-256 of the raw content bytes
    pub sha256: String,
    pub length: usize,
    pub content_type: Option<String>,
    /// URL the content was served from
    pub source: String,
}

impl ContentDigest {
    /// Case-insensitive comparison against a recorded hex digest
    pub fn matches(&self, recorded_sha256: &str) -> bool {
        self.sha256.eq_ignore_ascii_case(recorded_sha256.trim())
    }
}

/// Source of inscription content digests
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch_digest(&self, id: &InscriptionId) -> Result<ContentDigest>;
}

pub fn content_sha256(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

pub struct HttpContentFetcher {
    client: Client,
    gateways: Vec<String>,
}

impl HttpContentFetcher {
    pub fn new(gateways: Vec<String>, timeout: Duration) -> std::result::Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            gateways: gateways
                .into_iter()
                .map(|g| g.trim_end_matches('/').to_string())
                .collect(),
        })
    }

    pub fn gateways(&self) -> &[String] {
        &self.gateways
    }

    async fn fetch_from(&self, url: &str, id: &InscriptionId) -> std::result::Result<ContentDigest, String> {
        let response = self.client.get(url).send().await.map_err(|e| e.to_string())?;
        let status = response.status();
        if !status.is_success() {
            return Err(format!("HTTP {}", status.as_u16()));
        }
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await.map_err(|e| e.to_string())?;

        Ok(ContentDigest {
            inscription_id: id.to_string(),
            sha256: content_sha256(&bytes),
            length: bytes.len(),
            content_type,
            source: url.to_string(),
        })
    }
}

#[async_trait]
impl ContentFetcher for HttpContentFetcher {
    async fn fetch_digest(&self, id: &InscriptionId) -> Result<ContentDigest> {
        let mut attempts = Vec::with_capacity(self.gateways.len());

        for gateway in &self.gateways {
            let url = format!("{}/{}", gateway, id);
            debug!(url = %url, "Fetching inscription content");
            match self.fetch_from(&url, id).await {
                Ok(digest) => {
                    info!(
                        inscription = %id,
                        source = %digest.source,
                        length = digest.length,
                        sha256 = %digest.sha256,
                        "Inscription content hashed"
                    );
                    return Ok(digest);
                }
                Err(reason) => {
                    warn!(url = %url, reason = %reason, "Content gateway failed");
                    attempts.push(format!("{}: {}", gateway, reason));
                }
            }
        }

        Err(TeleburnError::EndpointUnavailable {
            operation: "fetch_inscription_content".to_string(),
            attempts,
        })
    }
}
