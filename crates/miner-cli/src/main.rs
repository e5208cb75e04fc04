use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use log::info;
use serde::Serialize;

use miner_core::{
    BlockHash, Interrupt, LaneWidth, LocalNode, Miner, MinerConfig, Node, SessionStats,
};

/// Solo miner for 112-byte headers, mining against an in-process node
#[derive(Parser, Debug)]
#[command(name = "bleminer")]
#[command(about = "Midstate-batched SHA256d header miner", long_about = None)]
struct Args {
    /// JSON configuration file; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of worker threads (default: all cores)
    #[arg(short, long)]
    threads: Option<usize>,

    /// Nonces per engine call, 1 to 4 (default: detected)
    #[arg(long, value_parser = parse_lanes)]
    lanes: Option<LaneWidth>,

    /// Payout destination committed to in every template
    #[arg(short, long)]
    payout: Option<String>,

    /// Stop after this many rounds
    #[arg(short, long)]
    rounds: Option<u64>,

    /// Compact difficulty bits of the local chain
    #[arg(short, long, default_value = "207fffff", value_parser = parse_bits)]
    bits: u32,

    /// Starting chain tip (display hex)
    #[arg(long)]
    tip: Option<String>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[derive(Serialize)]
struct Summary<'a> {
    config: &'a MinerConfig,
    height: u64,
    tip: BlockHash,
    stats: SessionStats,
}

fn parse_lanes(s: &str) -> Result<LaneWidth, String> {
    let count: usize = s.parse().map_err(|e| format!("{e}"))?;
    LaneWidth::try_from(count)
}

fn parse_bits(s: &str) -> Result<u32, String> {
    u32::from_str_radix(s.trim_start_matches("0x"), 16).map_err(|e| format!("{e}"))
}

fn load_config(args: &Args) -> Result<MinerConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
        None => MinerConfig::default(),
    };
    if args.threads.is_some() {
        config.threads = args.threads;
    }
    if args.lanes.is_some() {
        config.lanes = args.lanes;
    }
    if let Some(payout) = &args.payout {
        config.payout = payout.clone();
    }
    if args.rounds.is_some() {
        config.max_rounds = args.rounds;
    }
    config.validate()?;
    Ok(config)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(args.log_level.parse()?)
        .init();

    let config = load_config(&args)?;
    info!(
        "bleminer starting: {} threads, {} lanes, payout {}",
        config.threads(),
        config.lane_width().count(),
        config.payout
    );

    let tip = match &args.tip {
        Some(hex) => BlockHash::from_display_hex(hex)?,
        None => BlockHash::ZERO,
    };
    let node = Arc::new(LocalNode::with_tip(tip, 0, args.bits));

    let interrupt = Interrupt::new();
    let handler = interrupt.clone();
    ctrlc::set_handler(move || {
        info!("shutdown requested, finishing current round");
        handler.trigger();
    })?;

    let miner = Miner::new(node.clone(), config.clone(), interrupt)?;
    let stats = miner.run()?;

    let summary = Summary {
        config: &config,
        height: node.chain_height(),
        tip: node.tip(),
        stats,
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
