//! Teleburn protocol engine
//!
//! Retires a Solana token while recording a verifiable link to a Bitcoin
//! Ordinals inscription. The library builds unsigned transactions, simulates
//! them and resolves teleburn status; it never signs or broadcasts.
//!
//! Components, leaves first:
//! - [`identifier`] / [`memo`]: inscription ids and the on-chain proof string
//! - [`derivation`]: off-curve address derivation for bindings
//! - [`rpc_manager`]: ledger access with sequential endpoint failover
//! - [`tx_builder`]: seal / retire construction
//! - [`dry_run`]: pre-flight simulation orchestrator
//! - [`verification`]: status resolution with a confidence rating
//! - [`resilience`]: rate limiting and the shutdown gate

pub mod config;
pub mod derivation;
pub mod dry_run;
pub mod errors;
pub mod identifier;
pub mod inscription;
pub mod memo;
pub mod metrics;
pub mod resilience;
pub mod structured_logging;
pub mod test_utils;
pub mod tx_builder;
pub mod types;
pub mod verification;

// Component modules with non-standard paths (directories with spaces)
#[path = "rpc manager/mod.rs"]
pub mod rpc_manager;

pub use errors::{Result, TeleburnError};
pub use identifier::InscriptionId;
pub use types::RetireMethod;
