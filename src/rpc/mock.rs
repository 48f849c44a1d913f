//! In-memory wallet used by the unit tests
//!
//! Hands out deterministic addresses and txids, and records every
//! build/sign/broadcast so tests can assert on the exact transaction
//! sequences the core produced.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use bitcoin::hashes::Hash;
use bitcoin::{Amount, Txid};

use crate::types::Unspent;

use super::{MempoolInfo, RpcError, WalletRpc};

/// One broadcast raw transaction.
#[derive(Clone, Debug)]
pub struct Broadcast {
    pub txid: Txid,
    pub inputs: Vec<(Txid, u32)>,
    pub outputs: Vec<(String, Amount)>,
}

/// One sendtoaddress call.
#[derive(Clone, Debug)]
pub struct AddressSend {
    pub address: String,
    pub amount: Amount,
    pub subtract_fee: bool,
}

/// One sendmany call.
#[derive(Clone, Debug)]
pub struct ManySend {
    pub outputs: BTreeMap<String, Amount>,
    pub min_conf: u32,
    pub subtract_fee_from: Vec<String>,
}

#[derive(Default)]
struct MockState {
    utxos: Vec<Unspent>,
    next_addr: u64,
    next_txid: u64,
    next_raw: u64,
    pending: HashMap<u64, (Vec<(Txid, u32)>, Vec<(String, Amount)>)>,
    broadcasts: Vec<Broadcast>,
    address_sends: Vec<AddressSend>,
    many_sends: Vec<ManySend>,
    refused_spends: HashSet<(Txid, u32)>,
}

pub struct MockWallet {
    state: Mutex<MockState>,
}

/// Deterministic txid from a counter.
pub fn seed_txid(n: u64) -> Txid {
    let mut bytes = [0u8; 32];
    bytes[..8].copy_from_slice(&n.to_le_bytes());
    Txid::from_byte_array(bytes)
}

/// A confirmed seed utxo with the given id and value.
pub fn seed_utxo(n: u64, sat: u64) -> Unspent {
    Unspent {
        txid: seed_txid(n),
        vout: 0,
        address: format!("seedaddr{n}"),
        amount: Amount::from_sat(sat),
        confirmations: 6,
    }
}

impl MockWallet {
    pub fn with_utxos(utxos: Vec<Unspent>) -> MockWallet {
        MockWallet {
            state: Mutex::new(MockState {
                utxos,
                // Seed txids start at 0; keep generated ones far away
                next_txid: 1_000_000,
                ..MockState::default()
            }),
        }
    }

    /// Make every broadcast spending `outpoint` fail with a policy rejection.
    pub fn refuse_spends_of(&self, outpoint: (Txid, u32)) {
        self.state.lock().unwrap().refused_spends.insert(outpoint);
    }

    pub fn broadcasts(&self) -> Vec<Broadcast> {
        self.state.lock().unwrap().broadcasts.clone()
    }

    pub fn address_sends(&self) -> Vec<AddressSend> {
        self.state.lock().unwrap().address_sends.clone()
    }

    pub fn many_sends(&self) -> Vec<ManySend> {
        self.state.lock().unwrap().many_sends.clone()
    }
}

impl WalletRpc for MockWallet {
    fn list_unspent(&self, _min_conf: u32) -> Result<Vec<Unspent>, RpcError> {
        Ok(self.state.lock().unwrap().utxos.clone())
    }

    fn balance(&self, _min_conf: u32) -> Result<Amount, RpcError> {
        Ok(self.state.lock().unwrap().utxos.iter().map(|u| u.amount).sum())
    }

    fn new_address(&self) -> Result<String, RpcError> {
        let mut state = self.state.lock().unwrap();
        state.next_addr += 1;
        Ok(format!("mockaddr{}", state.next_addr))
    }

    fn create_raw_transaction(
        &self,
        inputs: &[(Txid, u32)],
        outputs: &BTreeMap<String, Amount>,
    ) -> Result<String, RpcError> {
        let mut state = self.state.lock().unwrap();
        state.next_raw += 1;
        let id = state.next_raw;
        let outs = outputs.iter().map(|(a, v)| (a.clone(), *v)).collect();
        state.pending.insert(id, (inputs.to_vec(), outs));
        Ok(format!("raw:{id}"))
    }

    fn sign_raw_transaction(&self, raw_hex: &str) -> Result<String, RpcError> {
        match raw_hex.strip_prefix("raw:") {
            Some(id) => Ok(format!("signed:{id}")),
            None => Err(RpcError::IncompleteSignature("unknown raw tx".into())),
        }
    }

    fn send_raw_transaction(&self, signed_hex: &str) -> Result<Txid, RpcError> {
        let id: u64 = signed_hex
            .strip_prefix("signed:")
            .and_then(|id| id.parse().ok())
            .expect("broadcast of a tx the mock never built");
        let mut state = self.state.lock().unwrap();
        let (inputs, outputs) = state
            .pending
            .remove(&id)
            .expect("broadcast of a tx the mock never built");
        if inputs.iter().any(|op| state.refused_spends.contains(op)) {
            return Err(RpcError::Node {
                method: "sendrawtransaction",
                code: -26,
                message: "dust".into(),
            });
        }
        state.next_txid += 1;
        let txid = seed_txid(state.next_txid);
        state.broadcasts.push(Broadcast {
            txid,
            inputs,
            outputs,
        });
        Ok(txid)
    }

    fn send_to_address(
        &self,
        address: &str,
        amount: Amount,
        subtract_fee: bool,
        _conf_target: Option<u32>,
    ) -> Result<Txid, RpcError> {
        let mut state = self.state.lock().unwrap();
        state.address_sends.push(AddressSend {
            address: address.to_string(),
            amount,
            subtract_fee,
        });
        state.next_txid += 1;
        Ok(seed_txid(state.next_txid))
    }

    fn send_many(
        &self,
        outputs: &BTreeMap<String, Amount>,
        min_conf: u32,
        subtract_fee_from: &[String],
        _conf_target: Option<u32>,
    ) -> Result<Txid, RpcError> {
        let mut state = self.state.lock().unwrap();
        state.many_sends.push(ManySend {
            outputs: outputs.clone(),
            min_conf,
            subtract_fee_from: subtract_fee_from.to_vec(),
        });
        state.next_txid += 1;
        Ok(seed_txid(state.next_txid))
    }

    fn mempool_info(&self) -> Result<MempoolInfo, RpcError> {
        let state = self.state.lock().unwrap();
        Ok(MempoolInfo {
            size: state.broadcasts.len() as u64,
            bytes: state.broadcasts.len() as u64 * 192,
        })
    }

    fn generate_blocks(&self, _count: u32) -> Result<(), RpcError> {
        Ok(())
    }
}
