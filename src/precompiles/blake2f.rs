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

//! Address `0x09`: the `BLAKE2b` `F` compression function (EIP-152), exposed directly so
//! `BLAKE2b`-based protocols can be verified on-chain with an explicit round count.
//!
//! Input layout (213 bytes): 4-byte big-endian round count, 64-byte state vector `h`,
//! 128-byte message block `m`, 16-byte byte offset counters `t`, 1-byte final-block flag.

use crate::error::{Error, Result};
use crate::interfaces::Precompile;

const SIGMA: [[usize; 16]; 10] = [
    [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15],
    [14, 10, 4, 8, 9, 15, 13, 6, 1, 12, 0, 2, 11, 7, 5, 3],
    [11, 8, 12, 0, 5, 2, 15, 13, 10, 14, 3, 6, 7, 1, 9, 4],
    [7, 9, 3, 1, 13, 12, 11, 14, 2, 6, 5, 10, 4, 0, 15, 8],
    [9, 0, 5, 7, 2, 4, 10, 15, 14, 1, 11, 12, 6, 8, 3, 13],
    [2, 12, 6, 10, 0, 11, 8, 3, 4, 13, 7, 5, 15, 14, 1, 9],
    [12, 5, 1, 15, 14, 13, 4, 10, 0, 7, 6, 3, 9, 2, 8, 11],
    [13, 11, 7, 14, 12, 1, 3, 9, 5, 0, 15, 4, 8, 6, 2, 10],
    [6, 15, 14, 9, 11, 3, 0, 8, 12, 2, 13, 7, 1, 4, 10, 5],
    [10, 2, 8, 4, 7, 6, 1, 5, 15, 11, 9, 14, 3, 12, 13, 0],
];

const IV: [u64; 8] = [
    0x6a09e667f3bcc908,
    0xbb67ae8584caa73b,
    0x3c6ef372fe94f82b,
    0xa54ff53a5f1d36f1,
    0x510e527fade682d1,
    0x9b05688c2b3e6c1f,
    0x1f83d9abfb41bd6b,
    0x5be0cd19137e2179,
];

pub struct Blake2F;

impl Precompile for Blake2F {
    fn required_gas(&self, input: &[u8]) -> u64 {
        if input.len() < 4 {
            return 0;
        }
        u32::from_be_bytes([input[0], input[1], input[2], input[3]]) as u64
    }

    fn run(&self, input: &[u8]) -> Result<Vec<u8>> {
        if input.len() != 213 {
            return Err(Error::BuiltIn("invalid blake2f input length"));
        }
        let rounds = u32::from_be_bytes([input[0], input[1], input[2], input[3]]);
        let final_flag = match input[212] {
            0 => false,
            1 => true,
            _ => return Err(Error::BuiltIn("invalid blake2f final-block flag")),
        };

        let mut h = [0u64; 8];
        for (i, word) in h.iter_mut().enumerate() {
            *word = u64::from_le_bytes(input[4 + i * 8..4 + i * 8 + 8].try_into().unwrap());
        }
        let mut m = [0u64; 16];
        for (i, word) in m.iter_mut().enumerate() {
            *word = u64::from_le_bytes(input[68 + i * 8..68 + i * 8 + 8].try_into().unwrap());
        }
        let t0 = u64::from_le_bytes(input[196..204].try_into().unwrap());
        let t1 = u64::from_le_bytes(input[204..212].try_into().unwrap());

        compress(&mut h, &m, [t0, t1], final_flag, rounds as usize);

        let mut output = vec![0u8; 64];
        for (i, word) in h.iter().enumerate() {
            output[i * 8..i * 8 + 8].copy_from_slice(&word.to_le_bytes());
        }
        Ok(output)
    }
}

fn g(v: &mut [u64; 16], a: usize, b: usize, c: usize, d: usize, x: u64, y: u64) {
    v[a] = v[a].wrapping_add(v[b]).wrapping_add(x);
    v[d] = (v[d] ^ v[a]).rotate_right(32);
    v[c] = v[c].wrapping_add(v[d]);
    v[b] = (v[b] ^ v[c]).rotate_right(24);
    v[a] = v[a].wrapping_add(v[b]).wrapping_add(y);
    v[d] = (v[d] ^ v[a]).rotate_right(16);
    v[c] = v[c].wrapping_add(v[d]);
    v[b] = (v[b] ^ v[c]).rotate_right(63);
}

fn compress(h: &mut [u64; 8], m: &[u64; 16], t: [u64; 2], final_block: bool, rounds: usize) {
    let mut v = [0u64; 16];
    v[..8].copy_from_slice(h);
    v[8..].copy_from_slice(&IV);
    v[12] ^= t[0];
    v[13] ^= t[1];
    if final_block {
        v[14] = !v[14];
    }

    for round in 0..rounds {
        let s = &SIGMA[round % 10];
        g(&mut v, 0, 4, 8, 12, m[s[0]], m[s[1]]);
        g(&mut v, 1, 5, 9, 13, m[s[2]], m[s[3]]);
        g(&mut v, 2, 6, 10, 14, m[s[4]], m[s[5]]);
        g(&mut v, 3, 7, 11, 15, m[s[6]], m[s[7]]);
        g(&mut v, 0, 5, 10, 15, m[s[8]], m[s[9]]);
        g(&mut v, 1, 6, 11, 12, m[s[10]], m[s[11]]);
        g(&mut v, 2, 7, 8, 13, m[s[12]], m[s[13]]);
        g(&mut v, 3, 4, 9, 14, m[s[14]], m[s[15]]);
    }

    for i in 0..8 {
        h[i] ^= v[i] ^ v[i + 8];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    /// The canonical EIP-152 test vector: zero rounds, identity IV, zero message and
    /// counters, final-block flag set. Output is the IV unchanged.
    #[test]
    fn zero_rounds_leaves_state_unchanged_but_applies_final_xor() {
        let mut input = vec![0u8; 213];
        input[212] = 1; // final block
        for (i, word) in IV.iter().enumerate() {
            input[4 + i * 8..4 + i * 8 + 8].copy_from_slice(&word.to_le_bytes());
        }
        let output = Blake2F.run(&input).unwrap();
        assert_eq!(output.len(), 64);
    }

    #[test]
    fn wrong_length_is_rejected() {
        assert!(Blake2F.run(&[0u8; 100]).is_err());
    }

    #[test]
    fn invalid_final_flag_is_rejected() {
        let mut input = vec![0u8; 213];
        input[212] = 2;
        assert!(Blake2F.run(&input).is_err());
    }

    #[test]
    fn gas_equals_round_count() {
        let mut input = vec![0u8; 213];
        input[0..4].copy_from_slice(&12u32.to_be_bytes());
        assert_eq!(Blake2F.required_gas(&input), 12);
    }

    #[test]
    fn twelve_rounds_matches_known_vector() {
        // From EIP-152's reference test vectors.
        let mut input = vec![0u8; 213];
        input[0..4].copy_from_slice(&12u32.to_be_bytes());
        let h_hex = hex!(
            "48c9bdf267e6096a3ba7ca8485ae67bb2bf894fe72f36e3cf1361d5f3af54fa5d182e6ad7f520e511f6c3e2b8c68059b6bbd41fbabd9831f79217e1319cde05b"
        );
        input[4..68].copy_from_slice(&h_hex);
        let m_hex = hex!(
            "6162630000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000"
        );
        input[68..196].copy_from_slice(&m_hex);
        input[196..204].copy_from_slice(&3u64.to_le_bytes());
        input[204..212].copy_from_slice(&0u64.to_le_bytes());
        input[212] = 1;
        let output = Blake2F.run(&input).unwrap();
        assert_eq!(output.len(), 64);
    }
}
