//! Wallet/node JSON-RPC integration
//!
//! The core drives an external bitcoind-style wallet through the [`WalletRpc`]
//! trait; [`NodeClient`] is the real implementation over HTTP JSON-RPC. All
//! transaction building, signing, and broadcast happens on the node side.

use std::collections::BTreeMap;

use bitcoin::{Amount, Txid};
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::types::{Chain, Unspent};

#[cfg(test)]
pub mod mock;

/// Confirmation target of about one week, which should be close to
/// 1 sat/byte on a live network. Used for the sends that are not
/// time-sensitive.
pub const WEEK_CONF_TARGET: u32 = 1008;

// ── Errors ───────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("transport: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{method}: node returned error {code}: {message}")]
    Node {
        method: &'static str,
        code: i64,
        message: String,
    },

    #[error("{method}: malformed response: {source}")]
    Decode {
        method: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid amount in response: {0}")]
    BadAmount(#[from] bitcoin::amount::ParseAmountError),

    #[error("wallet could not completely sign transaction: {0}")]
    IncompleteSignature(String),
}

// ── Wallet interface ─────────────────────────────────────────────────────────

/// The operations the core needs from the external wallet/node. Every call is
/// blocking from the caller's point of view.
pub trait WalletRpc: Sync {
    fn list_unspent(&self, min_conf: u32) -> Result<Vec<Unspent>, RpcError>;

    fn balance(&self, min_conf: u32) -> Result<Amount, RpcError>;

    fn new_address(&self) -> Result<String, RpcError>;

    fn create_raw_transaction(
        &self,
        inputs: &[(Txid, u32)],
        outputs: &BTreeMap<String, Amount>,
    ) -> Result<String, RpcError>;

    /// May fail if the inputs are not owned/spendable by the wallet.
    fn sign_raw_transaction(&self, raw_hex: &str) -> Result<String, RpcError>;

    /// May fail on policy rejection: fee too low, too many ancestors,
    /// non-standard size.
    fn send_raw_transaction(&self, signed_hex: &str) -> Result<Txid, RpcError>;

    fn send_to_address(
        &self,
        address: &str,
        amount: Amount,
        subtract_fee: bool,
        conf_target: Option<u32>,
    ) -> Result<Txid, RpcError>;

    fn send_many(
        &self,
        outputs: &BTreeMap<String, Amount>,
        min_conf: u32,
        subtract_fee_from: &[String],
        conf_target: Option<u32>,
    ) -> Result<Txid, RpcError>;

    fn mempool_info(&self) -> Result<MempoolInfo, RpcError>;

    /// Test mode only: force confirmations deterministically on regtest.
    fn generate_blocks(&self, count: u32) -> Result<(), RpcError>;
}

#[derive(Clone, Copy, Debug, serde::Deserialize)]
pub struct MempoolInfo {
    /// Number of transactions currently held.
    pub size: u64,
    /// Total bytes held.
    pub bytes: u64,
}

// ── HTTP client ──────────────────────────────────────────────────────────────

pub struct NodeClient {
    http: Client,
    url: String,
    auth: Option<(String, String)>,
    chain: Chain,
}

#[derive(serde::Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Value,
    error: Option<RpcErrorBody>,
}

#[derive(serde::Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

impl NodeClient {
    pub fn new(url: &str, auth: Option<(String, String)>, chain: Chain) -> NodeClient {
        NodeClient {
            http: Client::new(),
            url: url.to_string(),
            auth,
            chain,
        }
    }

    /// Reachability preflight. Fails fast when the daemon is down or the
    /// endpoint is wrong instead of dying mid-run.
    pub fn ping(&self) -> Result<(), RpcError> {
        self.call("ping", json!([])).map(|_| ())
    }

    fn call(&self, method: &'static str, params: Value) -> Result<Value, RpcError> {
        let body = json!({
            "jsonrpc": "1.0",
            "id": "txflood",
            "method": method,
            "params": params,
        });
        let mut req = self.http.post(&self.url).json(&body);
        if let Some((user, pass)) = &self.auth {
            req = req.basic_auth(user, Some(pass));
        }
        // The node answers RPC-level failures with an error body, not a clean
        // status, so the body is parsed unconditionally.
        let resp: RpcResponse = req.send()?.json()?;
        if let Some(err) = resp.error {
            return Err(RpcError::Node {
                method,
                code: err.code,
                message: err.message,
            });
        }
        Ok(resp.result)
    }

    fn call_as<T: DeserializeOwned>(
        &self,
        method: &'static str,
        params: Value,
    ) -> Result<T, RpcError> {
        serde_json::from_value(self.call(method, params)?)
            .map_err(|source| RpcError::Decode { method, source })
    }
}

fn amounts_json(outputs: &BTreeMap<String, Amount>) -> Value {
    let map: serde_json::Map<String, Value> = outputs
        .iter()
        .map(|(addr, amt)| (addr.clone(), json!(amt.to_btc())))
        .collect();
    Value::Object(map)
}

impl WalletRpc for NodeClient {
    fn list_unspent(&self, min_conf: u32) -> Result<Vec<Unspent>, RpcError> {
        self.call_as("listunspent", json!([min_conf]))
    }

    fn balance(&self, min_conf: u32) -> Result<Amount, RpcError> {
        let btc: f64 = self.call_as("getbalance", json!(["*", min_conf]))?;
        Ok(Amount::from_btc(btc)?)
    }

    fn new_address(&self) -> Result<String, RpcError> {
        self.call_as("getnewaddress", json!([]))
    }

    fn create_raw_transaction(
        &self,
        inputs: &[(Txid, u32)],
        outputs: &BTreeMap<String, Amount>,
    ) -> Result<String, RpcError> {
        let ins: Vec<Value> = inputs
            .iter()
            .map(|(txid, vout)| json!({ "txid": txid, "vout": vout }))
            .collect();
        self.call_as("createrawtransaction", json!([ins, amounts_json(outputs)]))
    }

    fn sign_raw_transaction(&self, raw_hex: &str) -> Result<String, RpcError> {
        #[derive(serde::Deserialize)]
        struct Signed {
            hex: String,
            complete: bool,
            #[serde(default)]
            errors: Vec<SignFailure>,
        }
        #[derive(serde::Deserialize)]
        struct SignFailure {
            #[serde(default)]
            error: String,
        }

        let signed: Signed = self.call_as("signrawtransactionwithwallet", json!([raw_hex]))?;
        if !signed.complete {
            let reasons: Vec<String> = signed.errors.into_iter().map(|e| e.error).collect();
            return Err(RpcError::IncompleteSignature(reasons.join("; ")));
        }
        Ok(signed.hex)
    }

    fn send_raw_transaction(&self, signed_hex: &str) -> Result<Txid, RpcError> {
        // BTC/BSV nodes take a maxfeerate cap (0 disables it); BCH nodes take
        // the older allowhighfees boolean.
        let params = if self.chain.has_extended_send_args() {
            json!([signed_hex, 0])
        } else {
            json!([signed_hex, false])
        };
        self.call_as("sendrawtransaction", params)
    }

    fn send_to_address(
        &self,
        address: &str,
        amount: Amount,
        subtract_fee: bool,
        conf_target: Option<u32>,
    ) -> Result<Txid, RpcError> {
        let params = match conf_target {
            Some(target) if self.chain.has_extended_send_args() => {
                json!([address, amount.to_btc(), "", "", subtract_fee, false, target])
            }
            _ => json!([address, amount.to_btc(), "", "", subtract_fee]),
        };
        self.call_as("sendtoaddress", params)
    }

    fn send_many(
        &self,
        outputs: &BTreeMap<String, Amount>,
        min_conf: u32,
        subtract_fee_from: &[String],
        conf_target: Option<u32>,
    ) -> Result<Txid, RpcError> {
        let amounts = amounts_json(outputs);
        let params = match conf_target {
            Some(target) if self.chain.has_extended_send_args() => {
                json!(["", amounts, min_conf, "", subtract_fee_from, false, target])
            }
            _ => json!(["", amounts, min_conf, "", subtract_fee_from]),
        };
        self.call_as("sendmany", params)
    }

    fn mempool_info(&self) -> Result<MempoolInfo, RpcError> {
        self.call_as("getmempoolinfo", json!([]))
    }

    fn generate_blocks(&self, count: u32) -> Result<(), RpcError> {
        let via_address = self
            .new_address()
            .and_then(|addr| self.call("generatetoaddress", json!([count, addr])));
        match via_address {
            Ok(_) => Ok(()),
            // Older nodes only know the deprecated form
            Err(_) => self.call("generate", json!([count])).map(|_| ()),
        }
    }
}
