//! Transaction size and fee estimation
//!
//! A linear model over input/output counts: `bytes = ins*IN + outs*OUT + OVERHEAD`.
//! Two presets: native-segwit shapes measured in vbytes (witness discount),
//! legacy p2pkh shapes in raw bytes.

use bitcoin::Amount;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TxWeights {
    input: f64,
    output: f64,
    overhead: f64,
    // Packing constants for filling a standard tx to its byte limit. The
    // reserve is headroom held back from the byte budget so an input of a
    // heavier script type does not push the tx over the limit.
    split_reserve: f64,
    split_cost: f64,
    merge_reserve: f64,
    merge_cost: f64,
}

impl TxWeights {
    /// Native segwit (bech32) preset, vbytes.
    pub const SEGWIT: TxWeights = TxWeights {
        input: 68.5,
        output: 31.0,
        overhead: 10.5,
        split_reserve: 220.0,
        split_cost: 32.0,
        merge_reserve: 41.0,
        merge_cost: 68.5,
    };

    /// Legacy p2pkh preset, raw bytes.
    pub const LEGACY: TxWeights = TxWeights {
        input: 148.0,
        output: 34.0,
        overhead: 10.0,
        split_reserve: 400.0,
        split_cost: 34.0,
        merge_reserve: 44.0,
        merge_cost: 148.0,
    };

    /// Estimated size of a tx with the given shape, in (v)bytes.
    pub fn size(&self, num_inputs: usize, num_outputs: usize) -> f64 {
        num_inputs as f64 * self.input + num_outputs as f64 * self.output + self.overhead
    }

    /// Fee for the given shape at `rate` sat per (v)byte, truncated to whole
    /// satoshis. Truncating keeps the paid rate at or below the configured
    /// rate; rounding up would overshoot it.
    pub fn fee(&self, num_inputs: usize, num_outputs: usize, rate: u64) -> Amount {
        Amount::from_sat((self.size(num_inputs, num_outputs) * rate as f64) as u64)
    }

    /// Most outputs a single-input tx can carry without crossing `size_limit`.
    pub fn max_outputs(&self, size_limit: u64) -> usize {
        ((size_limit as f64 - self.split_reserve) / self.split_cost) as usize
    }

    /// Most inputs a single-output tx can carry without crossing `size_limit`.
    pub fn max_inputs(&self, size_limit: u64) -> usize {
        ((size_limit as f64 - self.merge_reserve) / self.merge_cost) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_is_monotonic_in_both_shapes() {
        for w in [TxWeights::SEGWIT, TxWeights::LEGACY] {
            for n in 1..100 {
                assert!(w.size(n + 1, 1) > w.size(n, 1));
                assert!(w.size(1, n + 1) > w.size(1, n));
            }
        }
    }

    #[test]
    fn one_to_one_sizes_match_presets() {
        assert_eq!(TxWeights::SEGWIT.size(1, 1), 110.0);
        assert_eq!(TxWeights::LEGACY.size(1, 1), 192.0);
    }

    #[test]
    fn fee_truncates_toward_zero() {
        // 2-in-1-out segwit is 178.5 vbytes: the half-vbyte must never round up
        assert_eq!(TxWeights::SEGWIT.fee(2, 1, 1), Amount::from_sat(178));
        assert_eq!(TxWeights::SEGWIT.fee(2, 1, 2), Amount::from_sat(357));
        assert_eq!(TxWeights::LEGACY.fee(1, 1, 3), Amount::from_sat(576));
    }

    #[test]
    fn fee_is_monotonic_in_shape_and_rate() {
        let w = TxWeights::LEGACY;
        assert!(w.fee(2, 1, 1) > w.fee(1, 1, 1));
        assert!(w.fee(1, 2, 1) > w.fee(1, 1, 1));
        assert!(w.fee(1, 1, 5) > w.fee(1, 1, 4));
    }

    #[test]
    fn packing_limits_for_standard_txs() {
        assert_eq!(TxWeights::LEGACY.max_outputs(100_000), 2929);
        assert_eq!(TxWeights::LEGACY.max_inputs(100_000), 675);
        assert_eq!(TxWeights::SEGWIT.max_outputs(100_000), 3118);
        assert_eq!(TxWeights::SEGWIT.max_inputs(100_000), 1459);
    }

    #[test]
    fn packed_shapes_stay_under_the_limit() {
        for w in [TxWeights::SEGWIT, TxWeights::LEGACY] {
            let outs = w.max_outputs(100_000);
            assert!(w.size(1, outs) <= 100_000.0);
            let ins = w.max_inputs(100_000);
            assert!(w.size(ins, 1) <= 100_000.0);
        }
    }
}
