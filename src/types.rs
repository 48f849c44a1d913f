//! Shared data structures, chain presets, and protocol constants

use std::time::Duration;

use bitcoin::{Amount, Txid};
use serde::Deserialize;

use crate::fees::TxWeights;

// ── Constants ────────────────────────────────────────────────────────────────

/// Minimum output value the network will relay (p2pkh dust limit).
pub const DUST_FLOOR: Amount = Amount::from_sat(546);
/// Max standard tx size in bytes / vbytes.
pub const MAX_STANDARD_TX_SIZE: u64 = 100_000;
/// The mempool allows a tx at most this many unconfirmed ancestors.
pub const DEFAULT_ANCESTOR_LIMIT: u32 = 25;

/// Confirmation poll delay when a regtest miner can produce blocks on demand.
pub const REGTEST_POLL: Duration = Duration::from_secs(3);
/// Confirmation poll delay against a live network.
pub const LIVE_POLL: Duration = Duration::from_secs(60);

// ── Chain presets ────────────────────────────────────────────────────────────

/// Target chain fork. Presets differ in block-size ceiling, default address
/// type, and the argument form their node RPC accepts for sends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Chain {
    Btc,
    Bch,
    Bsv,
}

impl Chain {
    pub fn name(self) -> &'static str {
        match self {
            Chain::Btc => "BTC",
            Chain::Bch => "BCH",
            Chain::Bsv => "BSV",
        }
    }

    /// Block size ceiling, in (v)bytes.
    pub fn max_block_size(self) -> u64 {
        match self {
            Chain::Btc => 1_000_000,
            Chain::Bch => 32_000_000,
            Chain::Bsv => 128_000_000,
        }
    }

    /// BTC and BSV nodes take the extended send/broadcast argument forms
    /// (confirmation target, maxfeerate); BCH nodes stop at subtractfeefrom.
    pub fn has_extended_send_args(self) -> bool {
        matches!(self, Chain::Btc | Chain::Bsv)
    }
}

// ── Run parameters ───────────────────────────────────────────────────────────

/// Protocol parameters fixed for one run, derived once at startup.
#[derive(Clone, Debug)]
pub struct Params {
    pub chain: Chain,
    /// Desired fee rate in satoshi per (v)byte.
    pub fee_rate: u64,
    pub weights: TxWeights,
    pub dust: Amount,
    pub ancestor_limit: u32,
    pub max_tx_size: u64,
    /// Fee for a one input -> one output tx at `fee_rate`.
    pub flat_fee: Amount,
    /// Minimum value an output needs to fund a full ancestor-length chain
    /// and still end above the dust floor.
    pub chain_cost: Amount,
    /// Most outputs a single standard splitting tx can carry.
    pub max_outputs: usize,
    /// Most inputs a single standard aggregation tx can carry.
    pub max_inputs: usize,
    pub poll_interval: Duration,
}

impl Params {
    pub fn new(chain: Chain, fee_rate: u64, live: bool) -> Params {
        // Only a live BTC wallet hands out bech32 addresses by default;
        // everything else is sized as p2pkh.
        let weights = if chain == Chain::Btc && live {
            TxWeights::SEGWIT
        } else {
            TxWeights::LEGACY
        };
        let flat_fee = weights.fee(1, 1, fee_rate);
        Params {
            chain,
            fee_rate,
            weights,
            dust: DUST_FLOOR,
            ancestor_limit: DEFAULT_ANCESTOR_LIMIT,
            max_tx_size: MAX_STANDARD_TX_SIZE,
            flat_fee,
            chain_cost: flat_fee * DEFAULT_ANCESTOR_LIMIT as u64 + DUST_FLOOR,
            max_outputs: weights.max_outputs(MAX_STANDARD_TX_SIZE),
            max_inputs: weights.max_inputs(MAX_STANDARD_TX_SIZE),
            poll_interval: if live { LIVE_POLL } else { REGTEST_POLL },
        }
    }

    /// Bytes of spam one full pass generates: a chain of `ancestor_limit`
    /// 1-to-1 txs for every output of a max-size split.
    pub fn spam_bytes_per_output_set(&self) -> f64 {
        self.ancestor_limit as f64 * self.max_outputs as f64 * self.weights.size(1, 1)
    }
}

// ── Wallet types ─────────────────────────────────────────────────────────────

/// One row of the wallet's unspent-output listing. Immutable once observed.
#[derive(Clone, Debug, Deserialize)]
pub struct Unspent {
    pub txid: Txid,
    pub vout: u32,
    #[serde(default)]
    pub address: String,
    #[serde(with = "bitcoin::amount::serde::as_btc")]
    pub amount: Amount,
    pub confirmations: i64,
}

/// Cursor over the output a chain will spend next. Replaced after every
/// successful spend; lives only for the duration of one chain-building run.
#[derive(Clone, Debug)]
pub struct ChainLink {
    pub txid: Txid,
    pub vout: u32,
    pub value: Amount,
}
