//! Multi-threaded proof-of-work miner for 112-byte block headers.
//!
//! This crate provides:
//! - Header layout, compact-bits targets and reference double-SHA256
//! - A midstate-cached double-SHA256 engine hashing 1-4 nonces per call
//! - Per-thread nonce search with periodic resync and cooperative stop
//! - Round coordination over a thread pool and block submission
//! - A solo mining session loop driven by any [`Node`]

pub mod block;
pub mod config;
pub mod coordinator;
pub mod difficulty;
pub mod engine;
pub mod error;
pub mod filter;
pub mod hash;
pub mod local;
pub mod midstate;
pub mod miner;
pub mod node;
pub mod round;
mod sha256;
pub mod stats;
pub mod worker;

pub use block::{BlockHeader, HeaderError, HeaderTemplate, WorkTemplate};
pub use config::MinerConfig;
pub use coordinator::{MiningCoordinator, SubmitOutcome};
pub use difficulty::{bits_to_difficulty, bits_to_target, hash_meets_target, Target};
pub use engine::{Digest, Engine, LaneWidth};
pub use error::MinerError;
pub use hash::{double_sha256, BlockHash};
pub use local::LocalNode;
pub use miner::Miner;
pub use node::{Node, NodeError};
pub use round::{Interrupt, RoundOutcome, Solution};
pub use stats::{HashRate, RoundReport, SessionStats};
pub use worker::SearchRange;
