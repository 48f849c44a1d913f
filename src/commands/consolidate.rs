//! Consolidate command: collapse the whole balance into a single utxo
//!
//! Scattered deposits first get merged in batches of at most `max_inputs`
//! inputs per aggregation tx, then one final sweep sends everything to a
//! fresh address. Splitting starts from that single output.

use std::collections::BTreeMap;

use anyhow::{anyhow, Result};
use bitcoin::{Amount, Txid};

use crate::rpc::{WalletRpc, WEEK_CONF_TARGET};
use crate::types::Params;

use super::wait_for_confirmation;

/// Returns the confirmed single-output balance. No-op when the wallet already
/// holds at most one utxo.
pub fn run_consolidate<W: WalletRpc>(
    params: &Params,
    wallet: &W,
    miner: Option<&W>,
) -> Result<Amount> {
    // Count unconfirmed deposits too, then wait until everything observed is
    // spendable.
    let utxos = wallet.list_unspent(0)?;
    let num_unspent = utxos.len();
    wait_for_confirmation(wallet, miner, num_unspent, params.poll_interval)?;

    if num_unspent <= 1 {
        let balance = wallet.balance(1)?;
        eprintln!("Starting with {} UTXO(s) and balance {}", num_unspent, balance);
        return Ok(balance);
    }

    if num_unspent > params.max_inputs {
        let num_batches = num_unspent.div_ceil(params.max_inputs);
        eprintln!(
            "Have {} outputs that can be consolidated into {} transactions",
            num_unspent, num_batches
        );
        // Each batch pays for a full-size tx at the configured rate
        let batch_fee = Amount::from_sat(params.max_tx_size * params.fee_rate);
        for batch in utxos.chunks(params.max_inputs) {
            let total: Amount = batch.iter().map(|u| u.amount).sum();
            let amount = total.checked_sub(batch_fee).ok_or_else(|| {
                anyhow!(
                    "batch of {} utxos holds {} which cannot cover the {} aggregation fee",
                    batch.len(),
                    total,
                    batch_fee
                )
            })?;
            let inputs: Vec<(Txid, u32)> = batch.iter().map(|u| (u.txid, u.vout)).collect();
            let to = wallet.new_address()?;
            let mut outputs = BTreeMap::new();
            outputs.insert(to, amount);

            let raw = wallet.create_raw_transaction(&inputs, &outputs)?;
            let signed = wallet.sign_raw_transaction(&raw)?;
            let txid = wallet.send_raw_transaction(&signed)?;
            eprintln!("Aggregation transaction has txid {}", txid);
        }
        wait_for_confirmation(wallet, miner, num_batches, params.poll_interval)?;
    }

    let balance = wallet.balance(1)?;
    let sweep_addr = wallet.new_address()?;
    eprintln!("Aggregating all coins to {}", sweep_addr);
    // Fee comes out of the swept amount, amortized over a week-long
    // confirmation target where the node accepts one.
    wallet.send_to_address(&sweep_addr, balance, true, Some(WEEK_CONF_TARGET))?;
    wait_for_confirmation(wallet, miner, 1, params.poll_interval)?;
    eprintln!("Sent all {} coins to {}", balance, sweep_addr);

    Ok(balance)
}
