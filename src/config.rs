//! Configuration module for the teleburn engine
//!
//! This module handles configuration loading from TOML files and
//! environment variables, and provides structured configuration types.

use crate::derivation::DEFAULT_DOMAIN_TAG;
use crate::rpc_manager::FailoverSettings;
use anyhow::{bail, Context};
use nonempty::NonEmpty;
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::path::Path;
use std::time::Duration;

/// Main configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeleburnConfig {
    /// Ledger endpoints and per-call limits
    pub rpc: RpcConfig,

    /// Transaction construction
    #[serde(default)]
    pub builder: BuilderConfig,

    /// Verification service
    #[serde(default)]
    pub verification: VerificationConfig,

    /// Boundary rate limiting
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Ordinals content gateways, tried in order
    #[serde(default = "default_content_gateways")]
    pub content_gateways: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcConfig {
    /// Ordered endpoint list; the first entry is tried first
    pub endpoints: NonEmpty<String>,

    /// Per-call timeout in milliseconds
    #[serde(default = "default_rpc_timeout_ms")]
    pub timeout_ms: u64,

    /// Outbound requests per second per endpoint (0 = unlimited)
    #[serde(default)]
    pub rate_limit_rps: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuilderConfig {
    /// Priority fee in micro-lamports per compute unit (0 = no fee instruction)
    #[serde(default = "default_priority_fee")]
    pub priority_fee_micro_lamports: u64,

    /// Compute unit limit (0 = no limit instruction)
    #[serde(default = "default_compute_unit_limit")]
    pub compute_unit_limit: u32,

    /// Retire the whole balance even when it is not exactly one unit
    #[serde(default)]
    pub allow_non_unit_balance: bool,

    /// Domain separation tag for derived bindings
    #[serde(default = "default_domain_tag")]
    pub domain_tag: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationConfig {
    /// How many recent signatures of the mint to scan for memos
    #[serde(default = "default_signature_limit")]
    pub signature_limit: usize,

    /// Domain tags accepted when re-deriving bindings
    #[serde(default = "default_accepted_domains")]
    pub accepted_domain_tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Requests per identity per window
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

// Default value functions
fn default_rpc_timeout_ms() -> u64 { 10_000 }
fn default_priority_fee() -> u64 { 5_000 }
fn default_compute_unit_limit() -> u32 { 60_000 }
fn default_domain_tag() -> String { DEFAULT_DOMAIN_TAG.to_string() }
fn default_signature_limit() -> usize { 25 }
fn default_accepted_domains() -> Vec<String> { vec![DEFAULT_DOMAIN_TAG.to_string()] }
fn default_max_requests() -> u32 { 30 }
fn default_window_secs() -> u64 { 60 }
fn default_content_gateways() -> Vec<String> {
    vec![
        "https://ordinals.com/content".to_string(),
        "https://ord.io/content".to_string(),
        "https://ordiscan.com/content".to_string(),
    ]
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            priority_fee_micro_lamports: default_priority_fee(),
            compute_unit_limit: default_compute_unit_limit(),
            allow_non_unit_balance: false,
            domain_tag: default_domain_tag(),
        }
    }
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            signature_limit: default_signature_limit(),
            accepted_domain_tags: default_accepted_domains(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
        }
    }
}

impl Default for TeleburnConfig {
    fn default() -> Self {
        Self {
            rpc: RpcConfig {
                endpoints: NonEmpty::new("https://api.mainnet-beta.solana.com".to_string()),
                timeout_ms: default_rpc_timeout_ms(),
                rate_limit_rps: 0,
            },
            builder: BuilderConfig::default(),
            verification: VerificationConfig::default(),
            limits: LimitsConfig::default(),
            content_gateways: default_content_gateways(),
        }
    }
}

impl TeleburnConfig {
    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: TeleburnConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML in {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with `.env` and environment variable overrides
    pub fn from_file_with_env(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let mut config = Self::from_file(path)?;
        config.apply_env()?;
        Ok(config)
    }

    /// Apply `TELEBURN_RPC_ENDPOINTS` (comma separated) and `TELEBURN_PRIORITY_FEE`
    pub fn apply_env(&mut self) -> anyhow::Result<()> {
        if let Ok(raw) = std::env::var("TELEBURN_RPC_ENDPOINTS") {
            self.rpc.endpoints = parse_endpoint_list(&raw)?;
        }
        if let Ok(raw) = std::env::var("TELEBURN_PRIORITY_FEE") {
            self.builder.priority_fee_micro_lamports = raw
                .trim()
                .parse()
                .with_context(|| format!("TELEBURN_PRIORITY_FEE is not a number: {}", raw))?;
        }
        self.validate()
    }

    /// Replace the endpoint list (e.g. from a CLI override)
    pub fn override_endpoints(&mut self, raw: &str) -> anyhow::Result<()> {
        self.rpc.endpoints = parse_endpoint_list(raw)?;
        self.validate()
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        let mut seen = std::collections::HashSet::new();
        for url in self.rpc.endpoints.iter() {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                bail!("Invalid RPC URL format: {}", url);
            }
            if !seen.insert(url) {
                bail!("Duplicate RPC URL: {}", url);
            }
        }
        if self.rpc.timeout_ms == 0 {
            bail!("rpc.timeout_ms must be > 0");
        }
        if self.builder.domain_tag.trim().is_empty() {
            bail!("builder.domain_tag must not be empty");
        }
        if self.verification.signature_limit == 0 || self.verification.signature_limit > 1000 {
            bail!("verification.signature_limit must be between 1 and 1000");
        }
        if self.limits.window_secs == 0 {
            bail!("limits.window_secs must be > 0");
        }
        Ok(())
    }

    pub fn failover_settings(&self) -> FailoverSettings {
        FailoverSettings {
            call_timeout: Duration::from_millis(self.rpc.timeout_ms),
            requests_per_second: NonZeroU32::new(self.rpc.rate_limit_rps),
        }
    }
}

fn parse_endpoint_list(raw: &str) -> anyhow::Result<NonEmpty<String>> {
    let urls: Vec<String> = raw
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    NonEmpty::from_vec(urls).context("No RPC endpoints provided")
}
