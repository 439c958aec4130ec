use crate::{Block, LedgerError};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum PeerError {
    #[error("could not build http client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request to {address} failed: {source}")]
    Transport {
        address: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{address} replied with status {status}")]
    Status { address: String, status: u16 },
    #[error("could not decode chain from {address}: {source}")]
    Decode {
        address: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Body of a node's `GET /chain`. `length` is informational only.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChainResponse {
    pub chain: Vec<Block>,
    #[serde(default)]
    pub length: usize,
}

// What a peer's `/chain` is decoded as: `length` may be missing or out of range.
#[derive(Deserialize)]
struct RemoteChain {
    chain: Vec<Block>,
    #[serde(default)]
    length: serde_json::Value,
}

impl ChainResponse {
    pub fn new(chain: Vec<Block>) -> Self {
        let length = chain.len();
        Self { chain, length }
    }
}

/// Source of remote chains during conflict resolution.
#[async_trait]
pub trait PeerClient: Send + Sync {
    /// The peer's full chain, or an error; never a partial chain.
    async fn fetch_chain(&self, address: &str) -> Result<Vec<Block>, PeerError>;
}

#[derive(Clone, Debug)]
pub struct HttpPeerClient {
    http: Client,
}

impl HttpPeerClient {
    pub fn new(timeout: Duration) -> Result<Self, PeerError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(PeerError::Client)?;
        Ok(Self { http })
    }
}

#[async_trait]
impl PeerClient for HttpPeerClient {
    async fn fetch_chain(&self, address: &str) -> Result<Vec<Block>, PeerError> {
        let url = format!("http://{address}/chain");
        let res = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|source| PeerError::Transport {
                address: address.to_string(),
                source,
            })?;

        let status = res.status();
        if !status.is_success() {
            return Err(PeerError::Status {
                address: address.to_string(),
                status: status.as_u16(),
            });
        }

        let body: RemoteChain = res.json().await.map_err(|source| PeerError::Decode {
            address: address.to_string(),
            source,
        })?;
        if body.length.as_u64() != Some(body.chain.len() as u64) {
            debug!(
                peer = %address,
                reported = %body.length,
                actual = body.chain.len(),
                "peer reported a length that does not match its chain"
            );
        }
        Ok(body.chain)
    }
}

/// Reduces `host:port` or a URL such as `http://host:port/` to `host:port`.
/// Peers are always fetched over plain http, so other schemes are refused.
pub fn normalize_address(raw: &str) -> Result<String, LedgerError> {
    let malformed = || LedgerError::MalformedAddress(raw.to_string());
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(malformed());
    }

    if trimmed.contains("://") {
        let url = Url::parse(trimmed).map_err(|_| malformed())?;
        if url.scheme() != "http" {
            return Err(malformed());
        }
        let host = url.host_str().ok_or_else(malformed)?;
        return Ok(match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        });
    }

    if trimmed.chars().any(|c| c == '/' || c.is_whitespace()) {
        return Err(malformed());
    }
    Ok(trimmed.to_string())
}
