// Copyright 2015-2020 Parity Technologies (UK) Ltd.
// This file is part of OpenEthereum.

// OpenEthereum is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// OpenEthereum is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.

// You should have received a copy of the GNU General Public License
// along with OpenEthereum.  If not, see <http://www.gnu.org/licenses/>.

//! Gas computations that don't belong to any one opcode handler: EIP-2200 SSTORE pricing,
//! EIP-150 call-gas forwarding, and the refund counter.

use crate::error::{Error, Result};
use crate::schedule::{
    Schedule, SSTORE_CLEAN_GAS_EIP2200, SSTORE_CLEAN_REFUND_EIP2200, SSTORE_CLEAR_REFUND_EIP2200,
    SSTORE_DIRTY_GAS_EIP2200, SSTORE_INIT_GAS_EIP2200, SSTORE_INIT_REFUND_EIP2200, SSTORE_SENTRY_GAS_EIP2200,
};
use ethereum_types::{H256, U256};

/// Net gas charge and refund delta for one `SSTORE`, computed per EIP-2200/EIP-1283.
/// `refund_delta` may be negative (a dirty slot that un-clears itself pays back a refund it
/// had already earned).
pub struct SstoreOutcome {
    pub gas_cost: u64,
    pub refund_delta: i64,
}

/// `orig` is the value at the top of the enclosing top-level call, `curr` is the cache's
/// present value, `new` is what the opcode is writing.
pub fn sstore_outcome(schedule: &Schedule, gas_remaining: u64, orig: H256, curr: H256, new: H256) -> Result<SstoreOutcome> {
    if !schedule.eip2200 {
        return Ok(legacy_sstore_outcome(schedule, curr, new));
    }
    if gas_remaining <= SSTORE_SENTRY_GAS_EIP2200 as u64 {
        return Err(Error::InsufficientGas);
    }
    if new == curr {
        return Ok(SstoreOutcome {
            gas_cost: schedule.sload_gas as u64,
            refund_delta: 0,
        });
    }
    if orig == curr {
        if orig.is_zero() {
            return Ok(SstoreOutcome {
                gas_cost: SSTORE_INIT_GAS_EIP2200 as u64,
                refund_delta: 0,
            });
        }
        let refund = if new.is_zero() { SSTORE_CLEAR_REFUND_EIP2200 as i64 } else { 0 };
        return Ok(SstoreOutcome {
            gas_cost: SSTORE_CLEAN_GAS_EIP2200 as u64,
            refund_delta: refund,
        });
    }
    // Slot already dirtied earlier in this call.
    let mut refund_delta = 0i64;
    if !orig.is_zero() {
        if curr.is_zero() {
            refund_delta -= SSTORE_CLEAR_REFUND_EIP2200 as i64;
        } else if new.is_zero() {
            refund_delta += SSTORE_CLEAR_REFUND_EIP2200 as i64;
        }
    }
    if new == orig {
        refund_delta += if orig.is_zero() {
            SSTORE_INIT_REFUND_EIP2200 as i64
        } else {
            SSTORE_CLEAN_REFUND_EIP2200 as i64
        };
    }
    Ok(SstoreOutcome {
        gas_cost: SSTORE_DIRTY_GAS_EIP2200 as u64,
        refund_delta,
    })
}

/// Pre-EIP-2200 legacy pricing, kept for `Schedule`s older than Istanbul.
fn legacy_sstore_outcome(schedule: &Schedule, curr: H256, new: H256) -> SstoreOutcome {
    if curr.is_zero() && !new.is_zero() {
        SstoreOutcome {
            gas_cost: schedule.sstore_set_gas as u64,
            refund_delta: 0,
        }
    } else if !curr.is_zero() && new.is_zero() {
        SstoreOutcome {
            gas_cost: schedule.sstore_reset_gas as u64,
            refund_delta: schedule.sstore_refund_gas as i64,
        }
    } else {
        SstoreOutcome {
            gas_cost: schedule.sstore_reset_gas as u64,
            refund_delta: 0,
        }
    }
}

/// EIP-150: forwarded gas is `min(requested, remaining - remaining/64)`, after a flat
/// deduction for the `CALL`-family opcode's own base cost has already been paid by the
/// caller. `remaining` here is what's left *after* that base cost.
pub fn call_gas_forwarded(schedule: &Schedule, requested: U256, remaining: u64) -> u64 {
    match schedule.sub_gas_cap_divisor {
        Some(divisor) => {
            let cap = remaining - remaining / divisor as u64;
            let requested = if requested > U256::from(u64::max_value()) {
                u64::max_value()
            } else {
                requested.low_u64()
            };
            requested.min(cap)
        }
        None => {
            if requested > U256::from(remaining) {
                remaining
            } else {
                requested.low_u64()
            }
        }
    }
}

/// Additional gas for `EXP`: `exp_byte_gas` per significant byte of the exponent.
pub fn exp_byte_cost(schedule: &Schedule, exponent: U256) -> u64 {
    let bytes = (exponent.bits() + 7) / 8;
    schedule.exp_byte_gas as u64 * bytes as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sstore_noop_charges_sload() {
        let schedule = Schedule::new_istanbul();
        let outcome = sstore_outcome(&schedule, 10_000, H256::zero(), H256::zero(), H256::zero()).unwrap();
        assert_eq!(outcome.gas_cost, schedule.sload_gas as u64);
        assert_eq!(outcome.refund_delta, 0);
    }

    #[test]
    fn sstore_first_dirty_from_zero_charges_init() {
        let schedule = Schedule::new_istanbul();
        let outcome = sstore_outcome(
            &schedule,
            10_000,
            H256::zero(),
            H256::zero(),
            H256::from_low_u64_be(1),
        )
        .unwrap();
        assert_eq!(outcome.gas_cost, SSTORE_INIT_GAS_EIP2200 as u64);
        assert_eq!(outcome.refund_delta, 0);
    }

    #[test]
    fn sstore_clearing_nonzero_refunds() {
        let schedule = Schedule::new_istanbul();
        let nonzero = H256::from_low_u64_be(1);
        let outcome = sstore_outcome(&schedule, 10_000, nonzero, nonzero, H256::zero()).unwrap();
        assert_eq!(outcome.gas_cost, SSTORE_CLEAN_GAS_EIP2200 as u64);
        assert_eq!(outcome.refund_delta, SSTORE_CLEAR_REFUND_EIP2200 as i64);
    }

    #[test]
    fn sstore_below_sentry_fails() {
        let schedule = Schedule::new_istanbul();
        let err = sstore_outcome(
            &schedule,
            SSTORE_SENTRY_GAS_EIP2200 as u64,
            H256::zero(),
            H256::zero(),
            H256::from_low_u64_be(1),
        )
        .unwrap_err();
        assert_eq!(err, Error::InsufficientGas);
    }

    #[test]
    fn sstore_dirty_slot_restored_to_original_refunds_init() {
        let schedule = Schedule::new_istanbul();
        let one = H256::from_low_u64_be(1);
        // orig=0, curr=1 (already dirtied), new=0 (restored)
        let outcome = sstore_outcome(&schedule, 10_000, H256::zero(), one, H256::zero()).unwrap();
        assert_eq!(outcome.gas_cost, SSTORE_DIRTY_GAS_EIP2200 as u64);
        assert_eq!(outcome.refund_delta, SSTORE_INIT_REFUND_EIP2200 as i64);
    }

    #[test]
    fn eip150_call_gas_caps_at_63_64() {
        let schedule = Schedule::new_istanbul();
        let forwarded = call_gas_forwarded(&schedule, U256::from(u64::max_value()), 6400);
        assert_eq!(forwarded, 6400 - 6400 / 64);
    }

    #[test]
    fn eip150_call_gas_respects_request_below_cap() {
        let schedule = Schedule::new_istanbul();
        let forwarded = call_gas_forwarded(&schedule, U256::from(100), 6400);
        assert_eq!(forwarded, 100);
    }
}
