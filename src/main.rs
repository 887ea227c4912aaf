use clap::{Parser, Subcommand};
use hashchain::config::ChainConfig;
use hashchain::miner::spawn_miner;
use hashchain::shared::SharedChain;
use hashchain::store::ChainStore;
use hashchain::{Chain, ChainError, MiningControl};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "hashchain",
    version,
    about = "Append-only proof-of-work hash chain"
)]
struct Cli {
    /// TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Chain file (overrides config; default: ./hashchain.json)
    #[arg(long)]
    data: Option<PathBuf>,

    /// Required leading zero hex characters (used by `init`)
    #[arg(long)]
    difficulty: Option<u32>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the genesis block
    Init,
    /// Queue one or more transactions
    Queue {
        #[arg(required = true)]
        transactions: Vec<String>,
    },
    /// Mine pending transactions into a block
    Mine {
        /// Give up after N seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
    /// Show blocks, newest first
    Log {
        /// Max entries to show
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },
    /// Print one block as JSON
    Show { index: usize },
    /// List pending transactions
    Pending,
    /// Re-verify every link and proof
    Verify,
    /// Show chain statistics
    Stats,
}

type CmdResult = Result<(), Box<dyn std::error::Error>>;

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = load_config(&cli).and_then(|config| {
        let store = ChainStore::open(&config.data_path)?;
        match cli.command {
            Commands::Init => cmd_init(&store, config.difficulty),
            Commands::Queue { transactions } => cmd_queue(&store, transactions),
            Commands::Mine { timeout_secs } => cmd_mine(
                &store,
                timeout_secs
                    .map(Duration::from_secs)
                    .or_else(|| config.mining_timeout()),
            ),
            Commands::Log { limit } => cmd_log(&store, limit),
            Commands::Show { index } => cmd_show(&store, index),
            Commands::Pending => cmd_pending(&store),
            Commands::Verify => cmd_verify(&store),
            Commands::Stats => cmd_stats(&store),
        }
    });

    if let Err(e) = result {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn load_config(cli: &Cli) -> Result<ChainConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => ChainConfig::load(path)?,
        None => ChainConfig::default(),
    };
    if let Some(data) = &cli.data {
        config.data_path = data.clone();
    }
    if let Some(difficulty) = cli.difficulty {
        config.difficulty = difficulty;
    }
    Ok(config)
}

fn cmd_init(store: &ChainStore, difficulty: u32) -> CmdResult {
    if store.exists() {
        return Err(ChainError::AlreadyInitialized.into());
    }
    let mut chain: Chain<String> = Chain::new(difficulty)?;
    chain.create_genesis()?;
    store.save(&chain)?;
    let genesis = chain.last_block()?;
    println!(
        "Initialized chain at {} (difficulty {}, genesis {})",
        store.path().display(),
        difficulty,
        genesis.short_hash(),
    );
    Ok(())
}

fn cmd_queue(store: &ChainStore, transactions: Vec<String>) -> CmdResult {
    let mut chain: Chain<String> = store.load()?;
    let count = transactions.len();
    for tx in transactions {
        chain.queue_transaction(tx);
    }
    store.save(&chain)?;
    println!(
        "Queued {} transaction(s), {} pending",
        count,
        chain.pending_transactions().len()
    );
    Ok(())
}

fn cmd_mine(store: &ChainStore, timeout: Option<Duration>) -> CmdResult {
    let chain: Chain<String> = store.load()?;
    let shared = SharedChain::new(chain);
    let control = match timeout {
        Some(t) => MiningControl::with_timeout(t),
        None => MiningControl::unbounded(),
    };

    let block = spawn_miner(shared.clone(), control)?.join()?;
    shared.with_chain(|chain| store.save(chain))?;
    println!(
        "[{}] #{} nonce={} txs={}",
        block.short_hash(),
        shared.len() - 1,
        block.nonce,
        block.transactions.len(),
    );
    Ok(())
}

fn cmd_log(store: &ChainStore, limit: usize) -> CmdResult {
    let chain: Chain<String> = store.load()?;
    for (index, block) in chain.blocks().iter().enumerate().rev().take(limit) {
        println!(
            "#{} {} {} nonce={} txs={}",
            index,
            block.short_hash(),
            block.timestamp.format("%Y-%m-%d %H:%M:%S"),
            block.nonce,
            block.transactions.len(),
        );
    }
    Ok(())
}

fn cmd_show(store: &ChainStore, index: usize) -> CmdResult {
    let chain: Chain<String> = store.load()?;
    let block = chain
        .block(index)
        .ok_or_else(|| format!("no block at index {} (height {})", index, chain.len()))?;
    println!("{}", serde_json::to_string_pretty(block)?);
    Ok(())
}

fn cmd_pending(store: &ChainStore) -> CmdResult {
    let chain: Chain<String> = store.load()?;
    if chain.pending_transactions().is_empty() {
        println!("(no pending transactions)");
    }
    for tx in chain.pending_transactions() {
        println!("{}", tx);
    }
    Ok(())
}

fn cmd_verify(store: &ChainStore) -> CmdResult {
    let chain: Chain<String> = store.load()?;
    println!("OK: {} block(s) verified", chain.len());
    Ok(())
}

fn cmd_stats(store: &ChainStore) -> CmdResult {
    let chain: Chain<String> = store.load()?;
    let tip = chain.last_block()?;
    println!("Height:     {}", chain.len());
    println!("Difficulty: {}", chain.difficulty());
    println!("Pending:    {}", chain.pending_transactions().len());
    println!("Tip:        {}", tip.hash.as_deref().unwrap_or("unsealed"));
    Ok(())
}
