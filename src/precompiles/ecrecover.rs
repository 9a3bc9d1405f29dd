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

//! Address `0x01`: `ECRECOVER`, recovering the signer address from a secp256k1 signature.
//!
//! Unlike the other eight builtins, a malformed input here is not a precompile failure —
//! it is defined to yield an empty (all-zero) output, matching every production client's
//! `ECRECOVER` behavior so that contracts checking the zero-address sentinel work the same
//! way here as on any real chain.

use crate::error::Result;
use crate::interfaces::Precompile;
use keccak_hash::keccak;
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::Message;

pub struct EcRecover;

impl Precompile for EcRecover {
    fn required_gas(&self, _input: &[u8]) -> u64 {
        3000
    }

    fn run(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut padded = [0u8; 128];
        let len = input.len().min(128);
        padded[..len].copy_from_slice(&input[..len]);

        let hash = &padded[0..32];
        let v_bytes = &padded[32..64];
        let r = &padded[64..96];
        let s = &padded[96..128];

        // The recovery id lives in the low byte of a 32-byte big-endian field; every
        // other byte of it must be zero for the input to be well-formed.
        if v_bytes[..31].iter().any(|&b| b != 0) {
            return Ok(Vec::new());
        }
        let v = v_bytes[31];
        if v != 27 && v != 28 {
            return Ok(Vec::new());
        }

        let recovered = recover(hash, r, s, v - 27);
        Ok(recovered.unwrap_or_default())
    }
}

fn recover(hash: &[u8], r: &[u8], s: &[u8], recovery_id: u8) -> Option<Vec<u8>> {
    let message = Message::from_digest_slice(hash).ok()?;
    let id = RecoveryId::from_i32(recovery_id as i32).ok()?;
    let mut signature_bytes = [0u8; 64];
    signature_bytes[..32].copy_from_slice(r);
    signature_bytes[32..].copy_from_slice(s);
    let signature = RecoverableSignature::from_compact(&signature_bytes, id).ok()?;

    let public_key = secp256k1::SECP256K1.recover_ecdsa(&message, &signature).ok()?;
    let uncompressed = public_key.serialize_uncompressed();
    // Drop the leading 0x04 tag; the address is the low 20 bytes of keccak256 over the
    // remaining 64-byte (x, y) pair.
    let hash = keccak(&uncompressed[1..]);
    let mut output = vec![0u8; 32];
    output[12..].copy_from_slice(&hash.as_bytes()[12..]);
    Some(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_recovery_byte() {
        let mut input = vec![0u8; 128];
        input[63] = 29; // neither 27 nor 28
        assert_eq!(EcRecover.run(&input).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn flat_gas_cost() {
        assert_eq!(EcRecover.required_gas(&[]), 3000);
        assert_eq!(EcRecover.required_gas(&[0; 1000]), 3000);
    }
}
