//! Split command: fan the consolidated balance out into many even outputs

use std::collections::BTreeMap;

use anyhow::{ensure, Result};

use crate::planner::plan_split;
use crate::rpc::{WalletRpc, WEEK_CONF_TARGET};
use crate::types::Params;

use super::wait_for_confirmation;

/// One transaction splitting the entire wallet balance between as many fresh
/// addresses as the plan allows. The network fee is shaved off the outputs
/// themselves, so each lands a few satoshi under the planned amount; the
/// chain builder tolerates that.
pub fn run_split<W: WalletRpc>(params: &Params, wallet: &W, miner: Option<&W>) -> Result<()> {
    let balance = wallet.balance(1)?;
    let plan = plan_split(balance, params)?;
    eprintln!(
        "Making transaction with {} outputs of {} each, which can take some time...",
        plan.num_outputs, plan.amount_each
    );

    let mut outputs = BTreeMap::new();
    let mut subtract_from = Vec::with_capacity(plan.num_outputs as usize);
    for _ in 0..plan.num_outputs {
        let addr = wallet.new_address()?;
        outputs.insert(addr.clone(), plan.amount_each);
        subtract_from.push(addr);
    }
    ensure!(
        outputs.len() as u64 == plan.num_outputs,
        "wallet returned duplicate addresses: got {} distinct of {} requested",
        outputs.len(),
        plan.num_outputs
    );

    let txid = wallet.send_many(&outputs, 1, &subtract_from, Some(WEEK_CONF_TARGET))?;
    eprintln!("Transaction has txid {}", txid);
    wait_for_confirmation(wallet, miner, 1, params.poll_interval)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::mock::{seed_utxo, MockWallet};
    use crate::types::Chain;
    use bitcoin::Amount;

    #[test]
    fn splits_balance_across_planned_outputs() {
        // 0.5 BTC over 5 outputs, fee shaved from every output
        let wallet = MockWallet::with_utxos(vec![seed_utxo(1, 50_000_000)]);
        let mut p = Params::new(Chain::Btc, 1, false);
        p.max_outputs = 5;

        run_split(&p, &wallet, None).unwrap();

        let sends = wallet.many_sends();
        assert_eq!(sends.len(), 1);
        let send = &sends[0];
        assert_eq!(send.outputs.len(), 5);
        assert_eq!(send.min_conf, 1);
        assert_eq!(send.subtract_fee_from.len(), 5);
        for amount in send.outputs.values() {
            assert_eq!(*amount, Amount::from_sat(10_000_000));
        }
    }

    #[test]
    fn empty_wallet_is_fatal_before_any_send() {
        let wallet = MockWallet::with_utxos(vec![]);
        let p = Params::new(Chain::Btc, 1, false);
        assert!(run_split(&p, &wallet, None).is_err());
        assert!(wallet.many_sends().is_empty());
    }
}
