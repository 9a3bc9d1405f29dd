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

//! Per-top-level-call environment: block metadata and transaction pricing.

use ethereum_types::{Address, U256};

/// Environment available to every opcode in a top-level call, analogous to the host's
/// `EnvInfo`. Constructed once by the embedder and shared by reference across all nested
/// frames of a single `Engine::call`/`Engine::create`.
#[derive(Debug, Clone)]
pub struct Context {
    /// Height of the block this execution is part of.
    pub number: u64,
    /// Unix timestamp of the block.
    pub timestamp: u64,
    /// Block difficulty (pre-merge) or zero (post-merge, superseded by prevrandao).
    pub difficulty: U256,
    /// Block gas limit.
    pub gas_limit: U256,
    /// Address credited with the block's fees.
    pub coinbase: Address,
    /// Chain id surfaced by the `CHAINID` opcode.
    pub chain_id: u64,
    /// Gas price of the top-level call, surfaced by `GASPRICE`.
    pub gas_price: U256,
    /// Base fee per gas, surfaced by `BASEFEE` when the schedule enables it.
    pub base_fee: U256,
}

impl Context {
    pub fn new(number: u64, timestamp: u64, gas_limit: U256, coinbase: Address, chain_id: u64, gas_price: U256) -> Context {
        Context {
            number,
            timestamp,
            difficulty: U256::zero(),
            gas_limit,
            coinbase,
            chain_id,
            gas_price,
            base_fee: U256::zero(),
        }
    }
}

/// Looks up a historical block hash. The default rule (zero for out-of-range) matches
/// `BLOCKHASH`'s behavior when a host has no 256-block window available; a host backed by
/// real chain data supplies a `Blockchain` capability (see `interfaces.rs`) that overrides
/// this per call.
pub fn blockhash_in_range(current: u64, requested: u64) -> bool {
    requested < current && current.saturating_sub(requested) <= 256
}
