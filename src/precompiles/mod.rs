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

//! The nine standard precompiled contracts, resolved by fixed address `0x01..0x09`.

mod bigmodexp;
mod blake2f;
mod bn256;
mod ecrecover;
mod identity;
mod ripemd160;
mod sha256;

use crate::interfaces::{Precompile, Precompiles};
use ethereum_types::Address;

/// Ceiling division by 32, the word-rounding used in every precompile's per-word gas term.
fn words(len: usize) -> u64 {
    ((len + 31) / 32) as u64
}

/// Registry mapping the nine reserved low addresses to their implementations. A host that
/// wants to disable specific builtins (or add chain-specific ones at other addresses) can
/// implement `Precompiles` itself instead of using this default set.
pub struct StandardPrecompiles {
    ecrecover: ecrecover::EcRecover,
    sha256: sha256::Sha256,
    ripemd160: ripemd160::Ripemd160,
    identity: identity::Identity,
    bigmodexp: bigmodexp::BigModExp,
    bn256_add: bn256::Bn256Add,
    bn256_mul: bn256::Bn256ScalarMul,
    bn256_pairing: bn256::Bn256Pairing,
    blake2f: blake2f::Blake2F,
}

impl StandardPrecompiles {
    pub fn new() -> StandardPrecompiles {
        StandardPrecompiles {
            ecrecover: ecrecover::EcRecover,
            sha256: sha256::Sha256,
            ripemd160: ripemd160::Ripemd160,
            identity: identity::Identity,
            bigmodexp: bigmodexp::BigModExp,
            bn256_add: bn256::Bn256Add,
            bn256_mul: bn256::Bn256ScalarMul,
            bn256_pairing: bn256::Bn256Pairing,
            blake2f: blake2f::Blake2F,
        }
    }
}

impl Default for StandardPrecompiles {
    fn default() -> Self {
        StandardPrecompiles::new()
    }
}

impl Precompiles for StandardPrecompiles {
    fn get(&self, address: &Address) -> Option<&dyn Precompile> {
        if address[0..19] != [0u8; 19] {
            return None;
        }
        match address[19] {
            0x01 => Some(&self.ecrecover),
            0x02 => Some(&self.sha256),
            0x03 => Some(&self.ripemd160),
            0x04 => Some(&self.identity),
            0x05 => Some(&self.bigmodexp),
            0x06 => Some(&self.bn256_add),
            0x07 => Some(&self.bn256_mul),
            0x08 => Some(&self.bn256_pairing),
            0x09 => Some(&self.blake2f),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_all_nine_reserved_addresses() {
        let precompiles = StandardPrecompiles::new();
        for i in 1u8..=9 {
            let addr = Address::from_low_u64_be(i as u64);
            assert!(precompiles.get(&addr).is_some(), "address {i} should resolve");
        }
    }

    #[test]
    fn address_zero_and_ten_are_not_precompiles() {
        let precompiles = StandardPrecompiles::new();
        assert!(precompiles.get(&Address::zero()).is_none());
        assert!(precompiles.get(&Address::from_low_u64_be(10)).is_none());
    }
}
