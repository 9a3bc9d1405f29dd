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

//! Capability boundaries the host supplies to the engine: persistence, address policy,
//! and precompiled contracts. The interpreter never reaches past these traits.

use crate::account::Account;
use crate::error::Result;
use crate::log::LogEntry;
use ethereum_types::{Address, H256, U256};

/// Chain-level facts and address-derivation policy supplied by the host.
pub trait Blockchain {
    /// Hash of a historical block, or `H256::zero()` if out of the 256-block window.
    fn block_hash(&self, number: u64) -> H256;

    /// Overrides `CREATE` address derivation. Returning `None` selects the default
    /// (RLP(caller, nonce) keccak, low 20 bytes).
    fn create_address(&self, _caller: Address, _nonce: u64) -> Option<Address> {
        None
    }

    /// Overrides `CREATE2` address derivation. Returning `None` selects the default
    /// (`keccak256(0xff || caller || salt || keccak256(init_code))`, low 20 bytes).
    fn create2_address(&self, _caller: Address, _salt: H256, _init_code: &[u8]) -> Option<Address> {
        None
    }
}

/// Read-only access to committed account and storage state.
pub trait Store {
    fn exists(&self, address: &Address) -> bool;
    fn account(&self, address: &Address) -> Account;
    /// Raw storage read; an absent slot is conventionally all-zero.
    fn storage_at(&self, address: &Address, key: &H256) -> H256;
    fn new_write_batch(&self) -> Box<dyn WriteBatch>;
}

/// Buffered mutations applied to the store at the end of a successful top-level call.
pub trait WriteBatch {
    fn update_account(&mut self, address: &Address, account: &Account);
    fn set_storage(&mut self, address: &Address, key: H256, value: H256);
    fn remove_account(&mut self, address: &Address);
    fn add_log(&mut self, log: LogEntry);
}

/// A single precompiled contract, resolved by fixed address 0x01..0x09.
pub trait Precompile: Send + Sync {
    fn required_gas(&self, input: &[u8]) -> u64;
    fn run(&self, input: &[u8]) -> Result<Vec<u8>>;
}

/// Resolves a callee address to a precompile implementation, if any.
pub trait Precompiles {
    fn get(&self, address: &Address) -> Option<&dyn Precompile>;
}

/// A `Precompiles` implementation with no precompiles registered, for hosts or tests that
/// disable native builtins entirely.
pub struct NoPrecompiles;

impl Precompiles for NoPrecompiles {
    fn get(&self, _address: &Address) -> Option<&dyn Precompile> {
        None
    }
}

/// Converts a raw `U256` word into `u64`, the width storage-slot keys and a handful of
/// environment values are ultimately expressed in at the host boundary.
pub fn word_to_u64_saturating(word: U256) -> u64 {
    if word > U256::from(u64::max_value()) {
        u64::max_value()
    } else {
        word.low_u64()
    }
}
