//! Teleburn command line
//!
//! Thin wrapper over the library: builds unsigned transactions, runs dry
//! runs and resolves teleburn status. Output is JSON on stdout; logs go to
//! stderr.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;
use std::time::Duration;
use teleburn::config::TeleburnConfig;
use teleburn::derivation;
use teleburn::dry_run::{DryRunParams, SimulationOrchestrator};
use teleburn::inscription::{ContentFetcher, HttpContentFetcher, DEFAULT_CONTENT_TIMEOUT};
use teleburn::memo;
use teleburn::metrics::metrics;
use teleburn::resilience::{BoundaryGuard, RateLimiter, ShutdownGate};
use teleburn::rpc_manager::FailoverLedger;
use teleburn::tx_builder::{TransactionConfig, TxBuilder};
use teleburn::verification::VerificationService;
use teleburn::{InscriptionId, RetireMethod};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "teleburn.toml")]
    config: String,

    /// Comma-separated RPC endpoints, overriding the configuration
    #[arg(long)]
    rpc: Option<String>,

    /// Priority fee in micro-lamports per compute unit
    #[arg(long)]
    priority_fee: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, default_value_t = cfg!(feature = "json-logs"))]
    json_logs: bool,

    /// Print Prometheus metrics to stderr after the command
    #[arg(long)]
    print_metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Derive the off-curve binding address for an inscription
    Derive {
        inscription: String,
        #[arg(long)]
        domain: Option<String>,
    },
    /// Encode or decode teleburn memos
    Memo {
        #[command(subcommand)]
        action: MemoCommand,
    },
    /// Build an unsigned seal transaction
    Seal {
        #[arg(long)]
        payer: Pubkey,
        #[arg(long)]
        mint: Pubkey,
        #[arg(long)]
        inscription: String,
    },
    /// Build an unsigned retire transaction
    Retire {
        #[command(flatten)]
        target: RetireTarget,
    },
    /// Simulate seal and retire without broadcasting
    DryRun {
        #[command(flatten)]
        target: RetireTarget,
    },
    /// Resolve the teleburn status of a mint
    Verify {
        mint: String,
        /// Cross-check recorded media digests against inscription content
        #[arg(long)]
        check_media: bool,
    },
    /// SHA-256 of an inscription's content
    Hash { inscription: String },
}

#[derive(Subcommand, Debug)]
enum MemoCommand {
    Encode { inscription: String },
    Decode { raw: String },
}

#[derive(clap::Args, Debug)]
struct RetireTarget {
    #[arg(long)]
    payer: Pubkey,
    /// Token owner; defaults to the payer
    #[arg(long)]
    owner: Option<Pubkey>,
    #[arg(long)]
    mint: Pubkey,
    #[arg(long)]
    inscription: String,
    #[arg(long, default_value = "direct-burn")]
    method: RetireMethod,
    /// Retire the whole balance even when it is not exactly one unit
    #[arg(long)]
    allow_non_unit_balance: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose, args.json_logs)?;

    let mut config = load_config(&args.config)?;
    if let Some(rpc) = &args.rpc {
        config.override_endpoints(rpc)?;
    }
    if let Some(fee) = args.priority_fee {
        config.builder.priority_fee_micro_lamports = fee;
    }

    let guard = BoundaryGuard::new(
        ShutdownGate::new(),
        RateLimiter::in_memory(
            config.limits.max_requests,
            Duration::from_secs(config.limits.window_secs),
        ),
    );
    guard.admit("cli").await?;

    run(args.command, &config).await?;

    if args.print_metrics {
        eprintln!("{}", metrics().export());
    }
    Ok(())
}

async fn run(command: Command, config: &TeleburnConfig) -> Result<()> {
    match command {
        Command::Derive { inscription, domain } => {
            let id = InscriptionId::parse(&inscription)?;
            let domain = domain.unwrap_or_else(|| config.builder.domain_tag.clone());
            let derived = derivation::derive(&id, &domain)?;
            print_json(&serde_json::json!({
                "inscription": id.to_string(),
                "domain": domain,
                "address": derived.address.to_string(),
                "bump": derived.bump,
            }))
        }
        Command::Memo { action } => match action {
            MemoCommand::Encode { inscription } => {
                let memo = memo::encode_str(&inscription)?;
                print_json(&serde_json::json!({ "memo": memo, "bytes": memo.len() }))
            }
            MemoCommand::Decode { raw } => print_json(&memo::decode(&raw)?),
        },
        Command::Seal {
            payer,
            mint,
            inscription,
        } => {
            let built = builder(config, false).build_seal(&payer, &mint, &inscription).await?;
            print_json(&built.summary()?)
        }
        Command::Retire { target } => {
            let built = builder(config, target.allow_non_unit_balance)
                .build_retire(
                    &target.payer,
                    &target.owner.unwrap_or(target.payer),
                    &target.mint,
                    &target.inscription,
                    target.method,
                )
                .await?;
            print_json(&built.summary()?)
        }
        Command::DryRun { target } => {
            let orchestrator =
                SimulationOrchestrator::new(builder(config, target.allow_non_unit_balance));
            let report = orchestrator
                .run(&DryRunParams {
                    payer: target.payer,
                    owner: target.owner.unwrap_or(target.payer),
                    mint: target.mint,
                    identifier: target.inscription,
                    method: target.method,
                    metadata_update: None,
                })
                .await;
            for warning in &report.warnings {
                warn!("{}", warning);
            }
            print_json(&report)
        }
        Command::Verify { mint, check_media } => {
            let mut service = VerificationService::new(
                ledger(config),
                config.verification.signature_limit,
            )
            .with_accepted_domain_tags(config.verification.accepted_domain_tags.clone());
            if check_media {
                service = service.with_content_fetcher(Arc::new(content_fetcher(config)?));
            }
            print_json(&service.resolve_address(&mint).await?)
        }
        Command::Hash { inscription } => {
            let id = InscriptionId::parse(&inscription)?;
            let digest = content_fetcher(config)?.fetch_digest(&id).await?;
            print_json(&digest)
        }
    }
}

fn ledger(config: &TeleburnConfig) -> Arc<FailoverLedger> {
    info!(endpoints = ?config.rpc.endpoints, "Using RPC endpoints");
    Arc::new(FailoverLedger::from_urls(
        &config.rpc.endpoints,
        config.failover_settings(),
    ))
}

fn builder(config: &TeleburnConfig, allow_non_unit_balance: bool) -> TxBuilder {
    let mut tx_config = TransactionConfig::from(&config.builder);
    tx_config.allow_non_unit_balance |= allow_non_unit_balance;
    TxBuilder::new(ledger(config), tx_config)
}

fn content_fetcher(config: &TeleburnConfig) -> Result<HttpContentFetcher> {
    HttpContentFetcher::new(config.content_gateways.clone(), DEFAULT_CONTENT_TIMEOUT)
        .context("Failed to build HTTP client")
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Initialize logging subsystem
fn init_logging(verbose: bool, json: bool) -> Result<()> {
    let env_filter = if verbose {
        "teleburn=debug,info"
    } else {
        "teleburn=info,warn"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| env_filter.into());

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
    Ok(())
}

/// Load configuration from file with fallback to defaults
fn load_config(path: &str) -> Result<TeleburnConfig> {
    if std::path::Path::new(path).exists() {
        TeleburnConfig::from_file_with_env(path)
            .with_context(|| format!("Failed to load config from {}", path))
    } else {
        let mut config = TeleburnConfig::default();
        dotenvy::dotenv().ok();
        config.apply_env()?;
        Ok(config)
    }
}
