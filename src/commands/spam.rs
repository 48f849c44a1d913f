//! Spam command: chains of dependent txs from every spendable output
//!
//! Each eligible utxo seeds one chain: every tx spends the previous tx's sole
//! output, so the whole chain sits unconfirmed in the mempool until a block
//! picks it up. Chains run in parallel on a bounded worker pool; a pass ends
//! when every dispatched chain has reached a terminal state.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use bitcoin::{Amount, Txid};
use rayon::prelude::*;

use crate::rpc::{RpcError, WalletRpc};
use crate::types::{ChainLink, Params, Unspent};

use super::wait_for_confirmation;

// ── Chain builder ────────────────────────────────────────────────────────────

/// Terminal state of one chain-building run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChainEnd {
    /// The next output would fall under the dust floor.
    Exhausted { spends: u32 },
    /// The unconfirmed-ancestor cap was reached.
    Capped { spends: u32 },
    /// An external call was rejected; the rest of the chain is abandoned.
    Failed { spends: u32 },
}

impl ChainEnd {
    pub fn spends(self) -> u32 {
        match self {
            ChainEnd::Exhausted { spends }
            | ChainEnd::Capped { spends }
            | ChainEnd::Failed { spends } => spends,
        }
    }
}

fn submit_spend<W: WalletRpc>(
    wallet: &W,
    prev: &ChainLink,
    to_send: Amount,
) -> Result<Txid, RpcError> {
    let to = wallet.new_address()?;
    let mut outputs = BTreeMap::new();
    outputs.insert(to, to_send);
    let raw = wallet.create_raw_transaction(&[(prev.txid, prev.vout)], &outputs)?;
    let signed = wallet.sign_raw_transaction(&raw)?;
    wallet.send_raw_transaction(&signed)
}

/// Spend `start` through a chain of up to `ancestor_limit` dependent txs,
/// each paying the whole remaining value minus the flat fee to a fresh
/// address. Purely sequential: tx N+1 spends tx N's output, so it is never
/// submitted before N's id is known.
///
/// Errors never propagate out of a chain; one chain's failure must not abort
/// its siblings.
pub fn build_chain<W: WalletRpc>(wallet: &W, params: &Params, start: &Unspent) -> ChainEnd {
    let mut current = ChainLink {
        txid: start.txid,
        vout: start.vout,
        value: start.amount,
    };
    let mut spends = 0u32;

    while spends < params.ancestor_limit {
        let to_send = match current.value.checked_sub(params.flat_fee) {
            Some(value) if value >= params.dust => value,
            // Dust floor hit: this output's chain is done
            _ => return ChainEnd::Exhausted { spends },
        };
        match submit_spend(wallet, &current, to_send) {
            Ok(txid) => {
                // The new tx's sole output becomes the next thing to spend
                current = ChainLink {
                    txid,
                    vout: 0,
                    value: to_send,
                };
                spends += 1;
            }
            Err(err) => {
                eprintln!(
                    "Had a problem making chain from {}:{} after {} spends: {}",
                    start.txid, start.vout, spends, err
                );
                return ChainEnd::Failed { spends };
            }
        }
    }
    ChainEnd::Capped { spends }
}

// ── Orchestrator ─────────────────────────────────────────────────────────────

/// Totals across a spam run, tallied from per-chain terminal states.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SpamReport {
    pub passes: u64,
    pub chains: u64,
    pub exhausted: u64,
    pub capped: u64,
    pub failed: u64,
    pub spends: u64,
}

impl SpamReport {
    fn tally(&mut self, ends: &[ChainEnd]) {
        self.chains += ends.len() as u64;
        for end in ends {
            self.spends += end.spends() as u64;
            match end {
                ChainEnd::Exhausted { .. } => self.exhausted += 1,
                ChainEnd::Capped { .. } => self.capped += 1,
                ChainEnd::Failed { .. } => self.failed += 1,
            }
        }
    }

    pub fn print(&self) {
        eprintln!("\n=== Spam Report ===");
        eprintln!("Passes: {}", self.passes);
        eprintln!("Chains built: {}", self.chains);
        eprintln!("Transactions broadcast: {}", self.spends);
        eprintln!(
            "Chains capped / exhausted / failed: {} / {} / {}",
            self.capped, self.exhausted, self.failed
        );
    }
}

/// Spam until every output has reached the dust floor, or for a single pass.
///
/// Each pass partitions the unspent set into eligible and dust outputs,
/// dispatches one chain per eligible output across `workers` threads, and
/// joins them all before looking at the wallet again. Chains never share a
/// starting output, so they are independent by construction.
pub fn run_spam<W: WalletRpc>(
    params: &Params,
    wallet: &W,
    miner: Option<&W>,
    one_pass: bool,
    workers: usize,
) -> Result<SpamReport> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .context("building the spam worker pool")?;

    let init_set_size = wallet.list_unspent(1)?.len();
    let mut report = SpamReport::default();

    loop {
        let unspent = wallet.list_unspent(1)?;
        // An output must cover one more spend and still stay above dust
        let floor = params.dust + params.flat_fee;
        let eligible: Vec<Unspent> = unspent.iter().filter(|u| u.amount > floor).cloned().collect();
        let num_dust = unspent.len() - eligible.len();

        if !eligible.is_empty() {
            eprintln!(
                "Creating chains of {} txs for {} utxos with {} workers, this may take some time...",
                params.ancestor_limit,
                eligible.len(),
                workers
            );
            let ends: Vec<ChainEnd> = pool.install(|| {
                eligible
                    .par_iter()
                    .map(|utxo| build_chain(wallet, params, utxo))
                    .collect()
            });
            report.tally(&ends);
            report.passes += 1;

            match wallet.mempool_info() {
                Ok(info) => eprintln!(
                    "Have mempool of {} transactions and {:.3} MB",
                    info.size,
                    info.bytes as f64 / 1_048_576.0
                ),
                Err(err) => eprintln!("Could not read mempool info: {}", err),
            }
        } else if unspent.len() == init_set_size {
            eprintln!("All outputs have reached dust limit!");
            break;
        }

        eprintln!(
            "{} utxos have reached dust limit, {} remaining",
            num_dust,
            init_set_size.saturating_sub(num_dust)
        );

        if one_pass {
            eprintln!("Finished one pass of spamming");
            break;
        }

        // Once a fresh chain-generated output confirms there is something to
        // spend again
        wait_for_confirmation(wallet, miner, num_dust + 1, params.poll_interval)?;
    }

    Ok(report)
}
