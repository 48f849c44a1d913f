//! Budget planner: how many outputs a splitting tx should carry
//!
//! Given the confirmed balance and the run parameters, pick the output count
//! and per-output value so that every output can fund a full ancestor-length
//! chain of spends before it falls under the dust floor.

use bitcoin::Amount;

use crate::types::Params;

/// Split plan: derived from the balance, recomputed whenever it changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Plan {
    pub num_outputs: u64,
    pub amount_each: Amount,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    /// The balance cannot fund even one full chain. Aborts the run before any
    /// transaction is built.
    #[error("balance {balance} cannot fund a single chain of spends (need at least {chain_cost})")]
    InsufficientFunds { balance: Amount, chain_cost: Amount },
    /// The parameters themselves degenerate to a zero output count. Distinct
    /// from lack of funds: this means the size/fee configuration is broken.
    #[error("planned output count is zero; check tx size limit and fee settings")]
    NoOutputs,
}

/// Pick the number of outputs and the value each receives.
///
/// Starts from the byte-size-derived maximum and divides the balance evenly.
/// If that leaves each output unable to pay for `ancestor_limit` spends plus
/// the dust floor, the count is reduced until every output can; the count is
/// never raised past the byte-size maximum.
pub fn plan_split(balance: Amount, params: &Params) -> Result<Plan, PlanError> {
    let max_outputs = params.max_outputs as u64;
    if max_outputs == 0 || params.chain_cost == Amount::ZERO {
        return Err(PlanError::NoOutputs);
    }

    let mut num_outputs = max_outputs;
    let mut amount_each = balance / num_outputs;

    if amount_each < params.chain_cost {
        num_outputs = balance.to_sat() / params.chain_cost.to_sat();
        if num_outputs == 0 {
            return Err(PlanError::InsufficientFunds {
                balance,
                chain_cost: params.chain_cost,
            });
        }
        amount_each = balance / num_outputs;
    }

    Ok(Plan {
        num_outputs,
        amount_each,
    })
}
