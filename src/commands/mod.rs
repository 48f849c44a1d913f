//! Command handlers for each phase of the pipeline

use std::thread;
use std::time::Duration;

use crate::rpc::{RpcError, WalletRpc};

pub mod consolidate;
pub mod spam;
pub mod split;

pub use consolidate::*;
pub use spam::*;
pub use split::*;

/// Block until at least `want` outputs are confirmed unspent.
///
/// Busy-poll with a fixed delay; the node offers no push notifications. With
/// a regtest miner attached a block is mined per poll, so confirmations are
/// deterministic. No timeout: on a live network this waits as long as the
/// network takes.
pub fn wait_for_confirmation<W: WalletRpc>(
    wallet: &W,
    miner: Option<&W>,
    want: usize,
    poll: Duration,
) -> Result<(), RpcError> {
    while wallet.list_unspent(1)?.len() < want {
        if let Some(miner) = miner {
            miner.generate_blocks(1)?;
        }
        eprintln!("Waiting for confirmation of one or more txs...");
        thread::sleep(poll);
    }
    Ok(())
}
