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

//! One nested invocation's execution context.

use ethereum_types::{Address, U256};
use parity_bytes::Bytes;
use std::sync::Arc;

/// Which of the four call opcodes (or top-level entry) produced this frame, since it
/// changes how `address`/`sender`/`value` relate to the parent and whether writes are
/// permitted at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    /// Top-level call or a plain `CALL`.
    Call,
    /// `CALLCODE`: executes the callee's code against the caller's own storage/address.
    CallCode,
    /// `DELEGATECALL`: as `CALLCODE`, and additionally preserves caller/value from the
    /// grandparent frame.
    DelegateCall,
    /// `STATICCALL`: as `Call`, with writes forbidden.
    StaticCall,
}

/// Execution context for a single frame: who is calling whom, with what, and how much gas
/// is left to spend. `depth` is 1 at the top level.
pub struct CallFrame {
    pub kind: CallKind,
    /// Address whose code is executing (`address` in EVM terms).
    pub address: Address,
    /// Address storage operations apply to (same as `address`, except under
    /// `DELEGATECALL`/`CALLCODE` where it is the parent's own address).
    pub storage_address: Address,
    pub sender: Address,
    pub origin: Address,
    pub code: Arc<Bytes>,
    pub input: Bytes,
    pub value: U256,
    pub gas: u64,
    pub depth: usize,
    /// True inside a `STATICCALL` or any frame nested under one: storage writes, log
    /// emission, sub-creation, and value-transferring calls are all forbidden.
    pub is_static: bool,
}

impl CallFrame {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        kind: CallKind,
        address: Address,
        storage_address: Address,
        sender: Address,
        origin: Address,
        code: Arc<Bytes>,
        input: Bytes,
        value: U256,
        gas: u64,
        depth: usize,
        is_static: bool,
    ) -> CallFrame {
        CallFrame {
            kind,
            address,
            storage_address,
            sender,
            origin,
            code,
            input,
            value,
            gas,
            depth,
            is_static,
        }
    }
}
