//! Mempool stress tester: consolidate a wallet balance, split it into as many
//! outputs as a standard transaction can carry, then spend each output down to
//! the dust floor through chains of dependent unconfirmed transactions.

pub mod commands;
pub mod fees;
pub mod planner;
pub mod rpc;
pub mod types;
