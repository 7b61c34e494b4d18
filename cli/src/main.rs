//! ChainEscrow CLI: serve the milestone read API or query it directly.
//!
//! # Commands
//! ```
//! chainescrow serve         --port 8080
//! chainescrow milestones    [--from-block N] [--to-block N] [--address 0x…] [--variant full|recent|list]
//! chainescrow reputation
//! chainescrow open-escrows  --owner 0x…
//! chainescrow decimals
//! chainescrow info
//! ```

use std::collections::HashMap;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;

use chainescrow_api::{run_server, ApiConfig};
use chainescrow_evm::{EngineConfig, MilestoneQuery};

mod logging;
mod settings;

use logging::{init_tracing, LogConfig};
use settings::NodeSettings;

#[derive(Parser)]
#[command(
    name = "chainescrow",
    about = "Milestone read model over EVM settlement and payment-rail ledgers",
    long_about = "
ChainEscrow CLI: rebuilds milestone state from ledger logs on every query.

ENVIRONMENT VARIABLES:
  CHAINESCROW_RPC_URL          JSON-RPC endpoint
  CHAINESCROW_CHAIN_ID         Chain id used to pick addresses
  CHAINESCROW_ADDRESSES        Local address file (JSON)
  CHAINESCROW_ESCROW           Settlement ledger address
  CHAINESCROW_PRIMARY_RAIL     Primary rail ledger address
  CHAINESCROW_ALTERNATE_RAIL   Alternate rail ledger address
  CHAINESCROW_REPUTATION       Reputation ledger address (optional)
  CHAINESCROW_TOKEN            Payment token address (optional)
",
    version
)]
struct Cli {
    #[command(flatten)]
    node: NodeArgs,

    /// Log level or directive list, e.g. `info,chainescrow_evm=debug`
    #[arg(long, global = true, env = "CHAINESCROW_LOG", default_value = "info")]
    log_level: String,

    /// Emit JSON structured logs
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct NodeArgs {
    /// JSON-RPC endpoint URL
    #[arg(long, global = true, env = "CHAINESCROW_RPC_URL", default_value = "http://127.0.0.1:8545")]
    rpc_url: String,

    /// Chain id used to select contract addresses
    #[arg(long, global = true, env = "CHAINESCROW_CHAIN_ID", default_value_t = 31337)]
    chain_id: u64,

    /// Local address file: a flat entry or entries keyed by chain id
    #[arg(long, global = true, env = "CHAINESCROW_ADDRESSES")]
    addresses: Option<String>,

    /// Blocks below the head covered when no start block is given
    #[arg(long, global = true, env = "CHAINESCROW_WINDOW", default_value_t = chainescrow_evm::engine::DEFAULT_WINDOW)]
    window: u64,

    /// Deadline for all node calls of one query, in milliseconds
    #[arg(long, global = true, env = "CHAINESCROW_DEADLINE_MS", default_value_t = 20_000)]
    deadline_ms: u64,

    /// Split eth_getLogs ranges larger than this many blocks
    #[arg(long, global = true, env = "CHAINESCROW_MAX_BLOCK_RANGE")]
    max_block_range: Option<u64>,

    /// Retry transient transport failures this many times (0 = off)
    #[arg(long, global = true, env = "CHAINESCROW_RETRIES", default_value_t = 0)]
    retries: u32,

    /// Per-request HTTP timeout, in milliseconds
    #[arg(long, global = true, default_value_t = 30_000)]
    request_timeout_ms: u64,
}

impl NodeArgs {
    fn settings(&self) -> NodeSettings {
        NodeSettings {
            rpc_url: self.rpc_url.clone(),
            chain_id: self.chain_id,
            addresses: self.addresses.clone(),
            retries: self.retries,
            request_timeout_ms: self.request_timeout_ms,
            engine: EngineConfig {
                window: self.window,
                deadline_ms: self.deadline_ms,
                max_block_range: self.max_block_range,
                ..EngineConfig::default()
            },
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP read API
    Serve {
        #[arg(long, env = "CHAINESCROW_HOST", default_value = "0.0.0.0")]
        host: String,
        #[arg(long, env = "CHAINESCROW_PORT", default_value_t = 8080)]
        port: u16,
        /// Disable permissive CORS headers
        #[arg(long)]
        no_cors: bool,
        /// Cache max-age for milestone responses, in seconds
        #[arg(long, default_value_t = 30)]
        cache_max_age: u32,
        /// Cache max-age for the reputation feed, in seconds
        #[arg(long, default_value_t = 15)]
        reputation_cache_max_age: u32,
    },

    /// Print the milestone view as JSON
    Milestones {
        #[arg(long)]
        from_block: Option<u64>,
        #[arg(long)]
        to_block: Option<u64>,
        /// Only milestones where this address is client or worker
        #[arg(long)]
        address: Option<String>,
        #[arg(long, value_enum, default_value_t = Variant::Full)]
        variant: Variant,
    },

    /// Print the newest reputation proofs as JSON
    Reputation,

    /// Print open escrows for an owner as JSON
    #[command(name = "open-escrows")]
    OpenEscrows {
        #[arg(long)]
        owner: String,
    },

    /// Print the payment token's decimals
    Decimals,

    /// Show the resolved configuration without touching the network
    Info,
}

#[derive(Clone, Copy, ValueEnum)]
enum Variant {
    /// Milestones and their full visible history
    Full,
    /// History capped to the newest events
    Recent,
    /// Bare milestone list
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&LogConfig::from_flag(&cli.log_level, cli.log_json));

    // One snapshot of the process environment, resolved once.
    let env: HashMap<String, String> = std::env::vars().collect();
    let node = cli.node.settings();

    match cli.command {
        Commands::Serve {
            host,
            port,
            no_cors,
            cache_max_age,
            reputation_cache_max_age,
        } => {
            let engine = settings::engine(&node, &env)?;
            let config = ApiConfig {
                host,
                port,
                enable_cors: !no_cors,
                cache_max_age,
                reputation_cache_max_age,
            };
            run_server(config, engine).await.map_err(|e| anyhow::anyhow!(e))
        }

        Commands::Milestones {
            from_block,
            to_block,
            address,
            variant,
        } => {
            let engine = settings::engine(&node, &env)?;
            let query = MilestoneQuery {
                from_block,
                to_block,
                address,
            };
            match variant {
                Variant::Full => print_json(&engine.milestones(&query).await?),
                Variant::Recent => print_json(&engine.recent(&query).await?),
                Variant::List => print_json(&engine.list(&query).await?),
            }
        }

        Commands::Reputation => {
            let engine = settings::engine(&node, &env)?;
            print_json(&engine.reputation().await?)
        }

        Commands::OpenEscrows { owner } => {
            let engine = settings::engine(&node, &env)?;
            print_json(&engine.open_escrows(&owner).await?)
        }

        Commands::Decimals => {
            let engine = settings::engine(&node, &env)?;
            println!("{}", engine.token_decimals().await?);
            Ok(())
        }

        Commands::Info => cmd_info(&node, &env),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_info(node: &NodeSettings, env: &HashMap<String, String>) -> Result<()> {
    let book = settings::address_book(node, env)?;
    println!("chainescrow {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("  RPC URL:          {}", node.rpc_url);
    println!("  Chain id:         {}", book.chain_id);
    println!("  Settlement:       {}", book.escrow);
    for rail in &book.rails {
        println!("  Rail ({:<9}):  {}", rail.name, rail.address);
    }
    println!("  Reputation:       {}", book.reputation.as_deref().unwrap_or("-"));
    println!("  Token:            {}", book.token.as_deref().unwrap_or("-"));
    println!();
    println!("  Window:           {} blocks", node.engine.window);
    println!("  Deadline:         {}ms", node.engine.deadline_ms);
    match node.engine.max_block_range {
        Some(max) => println!("  Max block range:  {max}"),
        None => println!("  Max block range:  unlimited"),
    }
    println!("  Retries:          {}", node.retries);
    Ok(())
}
