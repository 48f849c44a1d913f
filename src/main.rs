//! Mempool flood tool - Main CLI Entry Point

use anyhow::{bail, Context, Result};
use clap::Parser;

use txflood::commands::*;
use txflood::rpc::NodeClient;
use txflood::types::{Chain, Params};

const ABOUT: &str = "Spam a bitcoin-family chain with cheap transactions.

By default the program will:

1. Consolidate the entire balance into one UTXO. This step is skipped
   if the balance is already consolidated
2. Split the entire balance into as many UTXOs as possible in a single
   transaction
3. Take each UTXO and create chains of dependent txs submitted to the
   mempool in a loop until the program is terminated or the dust limit
   has been reached on all utxos";

#[derive(Parser, Debug)]
#[command(name="txflood", about="Flood a mempool with chains of cheap dependent transactions", long_about=ABOUT)]
struct Cli {
    /// Chain fork to target: "btc", "bch", or "bsv"
    #[arg(long, default_value="btc")] chain: String,
    /// Fee rate for spam in sat/byte
    #[arg(long, default_value_t=1)] feerate: u64,
    /// Number of parallel chain-building workers
    #[arg(long, default_value_t=4)] workers: usize,
    /// Submit spam to a live node instead of local regtest nodes
    #[arg(long)] live: bool,
    /// Only do one pass of spamming (instead of loop)
    #[arg(long)] onepass: bool,
    /// Wallet node JSON-RPC endpoint
    #[arg(long, default_value="http://127.0.0.1:18443")] rpc_url: String,
    /// RPC basic-auth user (with --rpc-pass)
    #[arg(long)] rpc_user: Option<String>,
    /// RPC basic-auth password (with --rpc-user)
    #[arg(long)] rpc_pass: Option<String>,
    /// Separate regtest node that mines confirmations on demand
    #[arg(long)] miner_url: Option<String>,
    #[command(subcommand)]
    command: Option<Phase>,
}

#[derive(clap::Subcommand, Debug)]
enum Phase {
    /// Only consolidate the entire balance back into 1 UTXO. This can be
    /// called after spamming.
    Consolidate,
    /// Only split the balance into many UTXOs
    Split,
    /// Start spamming on all existing UTXOs
    Spam,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let chain = match cli.chain.to_ascii_lowercase().as_str() {
        "btc" => Chain::Btc,
        "bch" => Chain::Bch,
        "bsv" => Chain::Bsv,
        other => bail!("--chain must be btc|bch|bsv, got \"{other}\""),
    };
    let auth = match (cli.rpc_user, cli.rpc_pass) {
        (Some(user), Some(pass)) => Some((user, pass)),
        (None, None) => None,
        _ => bail!("--rpc-user and --rpc-pass must be given together"),
    };

    let params = Params::new(chain, cli.feerate, cli.live);
    let wallet = NodeClient::new(&cli.rpc_url, auth.clone(), chain);
    // A miner node only makes sense on regtest; live confirmations come from
    // the real network
    let miner = match cli.miner_url {
        Some(url) if !cli.live => Some(NodeClient::new(&url, auth, chain)),
        _ => None,
    };

    wallet
        .ping()
        .context("cannot reach the node; is the daemon running and the RPC endpoint correct?")?;

    print_runtime_settings(&params, cli.workers);

    match cli.command {
        Some(Phase::Consolidate) => {
            run_consolidate(&params, &wallet, miner.as_ref())?;
        }
        Some(Phase::Split) => {
            run_split(&params, &wallet, miner.as_ref())?;
        }
        Some(Phase::Spam) => {
            run_spam(&params, &wallet, miner.as_ref(), cli.onepass, cli.workers)?.print();
        }
        None => {
            run_consolidate(&params, &wallet, miner.as_ref())?;
            run_split(&params, &wallet, miner.as_ref())?;
            run_spam(&params, &wallet, miner.as_ref(), cli.onepass, cli.workers)?.print();
        }
    }

    eprintln!("Done!");
    Ok(())
}

fn print_runtime_settings(params: &Params, workers: usize) {
    eprintln!("----------- Runtime Settings -----------");
    eprintln!(
        "Using chain {} ({} MB blocks) with feerate {} sat/byte",
        params.chain.name(),
        params.chain.max_block_size() / 1_000_000,
        params.fee_rate
    );
    eprintln!("A one input -> one output tx is {} bytes", params.weights.size(1, 1));
    eprintln!("Default fee per tx is {} sat", params.flat_fee.to_sat());
    eprintln!(
        "Max number of outputs per tx is {}, and max number of inputs is {}",
        params.max_outputs, params.max_inputs
    );
    eprintln!(
        "The cost to make a chain of {} mempool txs is {} satoshis",
        params.ancestor_limit,
        params.chain_cost.to_sat()
    );
    eprintln!(
        "A chain of {} txs for {} outputs is {} MB, built by {} workers",
        params.ancestor_limit,
        params.max_outputs,
        params.spam_bytes_per_output_set() / 1_000_000.0,
        workers
    );
    eprintln!("----------------------------------------\n");
}
