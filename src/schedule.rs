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

//! Cost schedule and other parameterisations for the EVM.

/// Gas for the SSTORE sentry check (EIP-2200): SSTORE below this remaining gas always fails.
pub const SSTORE_SENTRY_GAS_EIP2200: usize = 2300;
/// Gas charged for a dirty-slot SSTORE under EIP-2200.
pub const SSTORE_SET_GAS_EIP2200: usize = 20000;
/// Gas charged when a slot is first dirtied from a zero original value.
pub const SSTORE_INIT_GAS_EIP2200: usize = 20000;
/// Gas charged when a slot is first dirtied from a non-zero original value.
pub const SSTORE_CLEAN_GAS_EIP2200: usize = 5000;
/// Gas charged for any further write to an already-dirty slot.
pub const SSTORE_DIRTY_GAS_EIP2200: usize = 800;
/// Refund earned when a slot's original value is restored to zero.
pub const SSTORE_CLEAR_REFUND_EIP2200: usize = 15000;
/// Refund earned when a dirty slot is set back to a zero original value.
pub const SSTORE_INIT_REFUND_EIP2200: usize = 19800;
/// Refund earned when a dirty slot is set back to a non-zero original value.
pub const SSTORE_CLEAN_REFUND_EIP2200: usize = 4800;
/// Gas used in transaction divided by this number is the maximum refundable amount.
pub const MAX_REFUND_QUOTIENT: usize = 2;

/// Definition of the cost schedule and other parameterisations for the EVM.
#[derive(Debug, Clone)]
pub struct Schedule {
    /// Does it have a `DELEGATECALL` instruction
    pub have_delegate_call: bool,
    /// Does it have a `CREATE2` instruction
    pub have_create2: bool,
    /// Does it have a `REVERT` instruction
    pub have_revert: bool,
    /// Does it have an `EXTCODEHASH` instruction
    pub have_extcodehash: bool,
    /// VM stack limit
    pub stack_limit: usize,
    /// Max number of nested calls/creates
    pub max_depth: usize,
    /// Gas prices for instructions in all tiers
    pub tier_step_gas: [usize; 8],
    /// Gas price for `EXP` opcode
    pub exp_gas: usize,
    /// Additional gas for `EXP` opcode for each byte of exponent
    pub exp_byte_gas: usize,
    /// Gas price for `SHA3` opcode
    pub sha3_gas: usize,
    /// Additional gas for `SHA3` opcode for each word of hashed memory
    pub sha3_word_gas: usize,
    /// Gas price for loading from storage
    pub sload_gas: usize,
    /// Gas price for setting new value to storage (`storage==0`, `new!=0`)
    pub sstore_set_gas: usize,
    /// Gas price for altering value in storage
    pub sstore_reset_gas: usize,
    /// Gas refund for `SSTORE` clearing (when `storage!=0`, `new==0`)
    pub sstore_refund_gas: usize,
    /// Gas price for `JUMPDEST` opcode
    pub jumpdest_gas: usize,
    /// Gas price for `LOG*`
    pub log_gas: usize,
    /// Additional gas for data in `LOG*`
    pub log_data_gas: usize,
    /// Additional gas for each topic in `LOG*`
    pub log_topic_gas: usize,
    /// Gas price for `CREATE` opcode
    pub create_gas: usize,
    /// Gas price for `*CALL*` opcodes
    pub call_gas: usize,
    /// Stipend for transfer for `CALL|CALLCODE` opcode when `value>0`
    pub call_stipend: usize,
    /// Additional gas required for value transfer (`CALL|CALLCODE`)
    pub call_value_transfer_gas: usize,
    /// Additional gas for creating new account (`CALL|CALLCODE`)
    pub call_new_account_gas: usize,
    /// Refund for `SELFDESTRUCT`
    pub suicide_refund_gas: usize,
    /// Gas for used memory
    pub memory_gas: usize,
    /// Coefficient used to convert memory size to gas price for memory
    pub quad_coeff_div: usize,
    /// Cost per byte of deployed code when executing `CREATE`/`CREATE2`
    pub create_data_gas: usize,
    /// Maximum code size when creating a contract.
    pub create_data_limit: usize,
    /// Gas price for copying memory
    pub copy_gas: usize,
    /// Price of `EXTCODESIZE`
    pub extcodesize_gas: usize,
    /// Base price of `EXTCODECOPY`
    pub extcodecopy_base_gas: usize,
    /// Price of `BALANCE`
    pub balance_gas: usize,
    /// Price of `EXTCODEHASH`
    pub extcodehash_gas: usize,
    /// Price of `SELFDESTRUCT`
    pub suicide_gas: usize,
    /// Amount of additional gas to pay when `SELFDESTRUCT` credits a non-existent account
    pub suicide_to_new_account_cost: usize,
    /// `let limit = gas * (x - 1) / x; forwarded = min(requested, limit)` (EIP-150)
    pub sub_gas_cap_divisor: Option<usize>,
    /// Don't charge `call_new_account_gas` when sending/suiciding a zero value.
    pub no_empty: bool,
    /// Kill empty accounts if touched.
    pub kill_empty: bool,
    /// `BLOCKHASH` instruction gas cost.
    pub blockhash_gas: usize,
    /// Static Call opcode enabled.
    pub have_static_call: bool,
    /// `RETURNDATA`/`RETURNDATASIZE`/`RETURNDATACOPY` opcodes enabled.
    pub have_return_data: bool,
    /// `SHL`, `SHR`, `SAR` opcodes enabled.
    pub have_bitwise_shifting: bool,
    /// `CHAINID` opcode enabled.
    pub have_chain_id: bool,
    /// `SELFBALANCE` opcode enabled.
    pub have_selfbalance: bool,
    /// `BASEFEE` opcode enabled.
    pub have_basefee: bool,
    /// Kill basic accounts below this balance if touched.
    pub kill_dust: CleanDustMode,
    /// Enable EIP-1283/EIP-2200 SSTORE net-gas-metering rules.
    pub eip1283: bool,
    /// Enable EIP-2200 sentry-gas rule (supersedes EIP-1706 in this schedule).
    pub eip2200: bool,
    /// Maximum code size for `CREATE`/`CREATE2` deployments.
    pub max_code_size: usize,
    /// Gas used in transaction divided by this number is the maximum refundable amount.
    pub max_refund_quotient: usize,
}

/// Dust accounts cleanup mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanDustMode {
    /// Dust cleanup is disabled.
    Off,
    /// Basic dust accounts will be removed.
    BasicOnly,
    /// Basic and contract dust accounts will be removed.
    WithCodeAndStorage,
}

impl Schedule {
    /// Schedule for the Frontier era of the Ethereum main net.
    pub fn new_frontier() -> Schedule {
        Self::new(false, 21000, false)
    }

    /// Schedule for the Homestead era of the Ethereum main net.
    pub fn new_homestead() -> Schedule {
        Self::new(true, 53000, false)
    }

    /// Schedule for the post-EIP-150 era of the Ethereum main net.
    pub fn new_post_eip150(max_code_size: usize, no_empty: bool, kill_empty: bool) -> Schedule {
        let mut schedule = Self::new(true, 53000, true);
        schedule.no_empty = no_empty;
        schedule.kill_empty = kill_empty;
        schedule.create_data_limit = max_code_size;
        schedule.max_code_size = max_code_size;
        schedule.sload_gas = 200;
        schedule.extcodesize_gas = 700;
        schedule.extcodecopy_base_gas = 700;
        schedule.balance_gas = 400;
        schedule.suicide_gas = 5000;
        schedule.suicide_to_new_account_cost = 25000;
        schedule.call_gas = 700;
        schedule
    }

    /// Schedule for the Byzantium fork of the Ethereum main net.
    pub fn new_byzantium() -> Schedule {
        let mut schedule = Self::new_post_eip150(24576, true, true);
        schedule.have_create2 = true;
        schedule.have_revert = true;
        schedule.have_static_call = true;
        schedule.have_return_data = true;
        schedule
    }

    /// Schedule for the Constantinople fork of the Ethereum main net.
    pub fn new_constantinople() -> Schedule {
        let mut schedule = Self::new_byzantium();
        schedule.have_bitwise_shifting = true; // EIP-145
        schedule.have_extcodehash = true; // EIP-1052
        schedule
    }

    /// Schedule for the Istanbul fork of the Ethereum main net. This is the default schedule
    /// used when a host does not select a specific era.
    pub fn new_istanbul() -> Schedule {
        let mut schedule = Self::new_constantinople();
        schedule.have_chain_id = true; // EIP-1344
        schedule.sload_gas = 800; // EIP-1884
        schedule.balance_gas = 700; // EIP-1884
        schedule.extcodehash_gas = 400;
        schedule.have_selfbalance = true; // EIP-1884
        schedule.eip1283 = true; // EIP-2200
        schedule.eip2200 = true;
        schedule.sstore_set_gas = SSTORE_SET_GAS_EIP2200;
        schedule
    }

    /// Schedule for the London fork of the Ethereum main net.
    pub fn new_london() -> Schedule {
        let mut schedule = Self::new_istanbul();
        schedule.have_basefee = true; // EIP-3198
        schedule
    }

    fn new(have_delegate_call: bool, _tx_create_gas: usize, exceptional: bool) -> Schedule {
        Schedule {
            have_delegate_call,
            have_create2: false,
            have_revert: false,
            have_extcodehash: false,
            stack_limit: 1024,
            max_depth: 1024,
            tier_step_gas: [0, 2, 3, 5, 8, 10, 20, 0],
            exp_gas: 10,
            exp_byte_gas: if exceptional { 50 } else { 10 },
            sha3_gas: 30,
            sha3_word_gas: 6,
            sload_gas: 50,
            sstore_set_gas: 20000,
            sstore_reset_gas: 5000,
            sstore_refund_gas: 15000,
            jumpdest_gas: 1,
            log_gas: 375,
            log_data_gas: 8,
            log_topic_gas: 375,
            create_gas: 32000,
            call_gas: 40,
            call_stipend: 2300,
            call_value_transfer_gas: 9000,
            call_new_account_gas: 25000,
            suicide_refund_gas: 24000,
            memory_gas: 3,
            quad_coeff_div: 512,
            create_data_gas: 200,
            create_data_limit: usize::max_value(),
            copy_gas: 3,
            extcodesize_gas: 20,
            extcodecopy_base_gas: 20,
            extcodehash_gas: 400,
            balance_gas: 20,
            suicide_gas: 0,
            suicide_to_new_account_cost: 0,
            sub_gas_cap_divisor: if exceptional { Some(64) } else { None },
            no_empty: false,
            kill_empty: false,
            blockhash_gas: 20,
            have_static_call: false,
            have_return_data: false,
            have_bitwise_shifting: false,
            have_chain_id: false,
            have_selfbalance: false,
            have_basefee: false,
            kill_dust: CleanDustMode::Off,
            eip1283: false,
            eip2200: false,
            max_code_size: usize::max_value(),
            max_refund_quotient: MAX_REFUND_QUOTIENT,
        }
    }
}

impl Default for Schedule {
    fn default() -> Self {
        Schedule::new_istanbul()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_evm_assumptions() {
        let s1 = Schedule::new_frontier();
        let s2 = Schedule::new_homestead();

        // Division by a power of two is assumed when costing memory expansion.
        assert_eq!(s1.quad_coeff_div, 512);
        assert_eq!(s2.quad_coeff_div, 512);
    }

    #[test]
    fn istanbul_enables_eip2200() {
        let s = Schedule::new_istanbul();
        assert!(s.eip1283);
        assert!(s.eip2200);
        assert!(s.have_chain_id);
        assert!(s.have_selfbalance);
    }

    #[test]
    fn default_is_istanbul() {
        let s = Schedule::default();
        assert_eq!(s.sload_gas, 800);
    }
}
