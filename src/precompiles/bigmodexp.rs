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

//! Address `0x05`: `BASE^EXP % MOD` over arbitrary-precision integers (EIP-198).
//!
//! Input layout: three big-endian 32-byte length fields (`base_len`, `exp_len`, `mod_len`)
//! followed by `base_len + exp_len + mod_len` bytes of payload, zero-padded if the caller
//! supplied fewer bytes than declared.

use crate::error::Result;
use crate::interfaces::Precompile;
use num_bigint::BigUint;
use num::Zero;

pub struct BigModExp;

const HEADER_WORD: usize = 32;

impl Precompile for BigModExp {
    fn required_gas(&self, input: &[u8]) -> u64 {
        let (base_len, exp_len, mod_len) = lengths(input);
        let max_len = base_len.max(mod_len);
        let adjusted_exp_len = adjusted_exponent_length(input, base_len, exp_len);
        let complexity = mult_complexity(max_len);
        let gas = complexity.saturating_mul(adjusted_exp_len.max(1)) / 20;
        gas.max(200)
    }

    fn run(&self, input: &[u8]) -> Result<Vec<u8>> {
        let (base_len, exp_len, mod_len) = lengths(input);
        // The payload may be shorter than the declared lengths promise; missing bytes read
        // as zero, same as every other field in this precompile's input.
        let mut buf = vec![0u8; 3 * HEADER_WORD + base_len + exp_len + mod_len];
        let copy_len = input.len().min(buf.len());
        buf[..copy_len].copy_from_slice(&input[..copy_len]);

        let base_start = 3 * HEADER_WORD;
        let exp_start = base_start + base_len;
        let mod_start = exp_start + exp_len;
        let mod_end = mod_start + mod_len;

        let base = BigUint::from_bytes_be(&buf[base_start..exp_start]);
        let exponent = BigUint::from_bytes_be(&buf[exp_start..mod_start]);
        let modulus = BigUint::from_bytes_be(&buf[mod_start..mod_end]);

        let result = if modulus.is_zero() {
            BigUint::zero()
        } else {
            base.modpow(&exponent, &modulus)
        };

        let mut output = result.to_bytes_be();
        if output.len() < mod_len {
            let mut padded = vec![0u8; mod_len - output.len()];
            padded.extend_from_slice(&output);
            output = padded;
        } else if output.len() > mod_len {
            output = output[output.len() - mod_len..].to_vec();
        }
        Ok(output)
    }
}

/// Reads a 32-byte big-endian length field, capping the result at `u32::MAX` so a
/// declared length absurdly larger than any real block's gas limit can't drive an
/// allocation sized off attacker-supplied input.
fn field(input: &[u8], offset: usize) -> usize {
    let mut bytes = [0u8; 32];
    let available = input.len().saturating_sub(offset).min(32);
    if available > 0 {
        bytes[..available].copy_from_slice(&input[offset..offset + available]);
    }
    if bytes[..28].iter().any(|&b| b != 0) {
        return u32::max_value() as usize;
    }
    u32::from_be_bytes([bytes[28], bytes[29], bytes[30], bytes[31]]) as usize
}

fn lengths(input: &[u8]) -> (usize, usize, usize) {
    (field(input, 0), field(input, HEADER_WORD), field(input, 2 * HEADER_WORD))
}

/// EIP-198's "adjusted exponent length": bit length of the exponent's leading word when the
/// exponent is longer than 32 bytes, else the bit length of the whole exponent (zero if the
/// exponent is all-zero).
fn adjusted_exponent_length(input: &[u8], base_len: usize, exp_len: usize) -> u64 {
    if exp_len == 0 {
        return 0;
    }
    let exp_start = 3 * HEADER_WORD + base_len;
    let head_len = exp_len.min(32);
    let mut head = vec![0u8; head_len];
    let available = input.len().saturating_sub(exp_start).min(head_len);
    if available > 0 {
        head[..available].copy_from_slice(&input[exp_start..exp_start + available]);
    }
    let bit_len = BigUint::from_bytes_be(&head).bits();
    if exp_len > 32 {
        8 * (exp_len as u64 - 32) + bit_len.max(1) - 1
    } else {
        bit_len.saturating_sub(1)
    }
}

/// EIP-198's quadratic-ish complexity estimate for a `max_len`-byte operand.
fn mult_complexity(max_len: usize) -> u64 {
    let x = max_len as u64;
    if x <= 64 {
        x * x
    } else if x <= 1024 {
        x * x / 4 + 96 * x - 3072
    } else {
        x * x / 16 + 480 * x - 199_680
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_modulus_yields_zero_output() {
        // base_len=1, exp_len=1, mod_len=1, base=2, exp=2, mod=0
        let mut input = vec![0u8; 3 * HEADER_WORD];
        input[31] = 1;
        input[63] = 1;
        input[95] = 1;
        input.extend_from_slice(&[2, 2, 0]);
        let output = BigModExp.run(&input).unwrap();
        assert_eq!(output, vec![0]);
    }

    #[test]
    fn small_modexp_matches_expected_value() {
        // 3^2 mod 5 = 4
        let mut input = vec![0u8; 3 * HEADER_WORD];
        input[31] = 1;
        input[63] = 1;
        input[95] = 1;
        input.extend_from_slice(&[3, 2, 5]);
        let output = BigModExp.run(&input).unwrap();
        assert_eq!(output, vec![4]);
    }

    #[test]
    fn small_operands_have_a_minimum_gas_floor() {
        let input = vec![0u8; 3 * HEADER_WORD];
        assert!(BigModExp.required_gas(&input) >= 200);
    }
}
