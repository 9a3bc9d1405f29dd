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

//! Addresses `0x06`-`0x08`: the `alt_bn128` curve operations used by zk-SNARK verifiers
//! (EIP-196/EIP-197), priced at their post-Istanbul (EIP-1108) rates.

use crate::error::{Error, Result};
use crate::interfaces::Precompile;
use bn::{AffineG1, AffineG2, Fq, Fq2, Fr, Group, Gt, G1, G2};

fn read_fq(input: &[u8], offset: usize) -> Result<Fq> {
    let mut bytes = [0u8; 32];
    let available = input.len().saturating_sub(offset).min(32);
    if available > 0 {
        bytes[..available].copy_from_slice(&input[offset..offset + available]);
    }
    Fq::from_slice(&bytes).map_err(|_| Error::BuiltIn("invalid field element"))
}

fn read_fr(input: &[u8], offset: usize) -> Result<Fr> {
    let mut bytes = [0u8; 32];
    let available = input.len().saturating_sub(offset).min(32);
    if available > 0 {
        bytes[..available].copy_from_slice(&input[offset..offset + available]);
    }
    Fr::from_slice(&bytes).map_err(|_| Error::BuiltIn("invalid scalar"))
}

fn read_g1(input: &[u8], offset: usize) -> Result<G1> {
    let x = read_fq(input, offset)?;
    let y = read_fq(input, offset + 32)?;
    if x.is_zero() && y.is_zero() {
        Ok(G1::zero())
    } else {
        AffineG1::new(x, y)
            .map(Into::into)
            .map_err(|_| Error::BuiltIn("point not on curve"))
    }
}

fn write_g1(point: G1) -> Vec<u8> {
    let mut out = vec![0u8; 64];
    if let Some(affine) = AffineG1::from_jacobian(point) {
        affine.x().to_big_endian(&mut out[0..32]).ok();
        affine.y().to_big_endian(&mut out[32..64]).ok();
    }
    out
}

pub struct Bn256Add;

impl Precompile for Bn256Add {
    fn required_gas(&self, _input: &[u8]) -> u64 {
        150
    }

    fn run(&self, input: &[u8]) -> Result<Vec<u8>> {
        let a = read_g1(input, 0)?;
        let b = read_g1(input, 64)?;
        Ok(write_g1(a + b))
    }
}

pub struct Bn256ScalarMul;

impl Precompile for Bn256ScalarMul {
    fn required_gas(&self, _input: &[u8]) -> u64 {
        6000
    }

    fn run(&self, input: &[u8]) -> Result<Vec<u8>> {
        let point = read_g1(input, 0)?;
        let scalar = read_fr(input, 64)?;
        Ok(write_g1(point * scalar))
    }
}

pub struct Bn256Pairing;

impl Precompile for Bn256Pairing {
    fn required_gas(&self, input: &[u8]) -> u64 {
        let pairs = (input.len() / 192) as u64;
        45_000 + 34_000 * pairs
    }

    fn run(&self, input: &[u8]) -> Result<Vec<u8>> {
        if input.len() % 192 != 0 {
            return Err(Error::BuiltIn("invalid pairing input length"));
        }
        let mut accumulator = Gt::one();
        for chunk in input.chunks(192) {
            let a = read_g1(chunk, 0)?;
            if a.is_zero() {
                continue;
            }
            let x1 = read_fq(chunk, 64)?;
            let x2 = read_fq(chunk, 96)?;
            let y1 = read_fq(chunk, 128)?;
            let y2 = read_fq(chunk, 160)?;
            let twist_x = Fq2::new(x2, x1);
            let twist_y = Fq2::new(y2, y1);
            let b: G2 = if twist_x.is_zero() && twist_y.is_zero() {
                G2::zero()
            } else {
                AffineG2::new(twist_x, twist_y)
                    .map(Into::into)
                    .map_err(|_| Error::BuiltIn("point not on twist curve"))?
            };
            accumulator = accumulator * bn::pairing(a, b);
        }
        let mut output = vec![0u8; 32];
        if accumulator == Gt::one() {
            output[31] = 1;
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_of_identity_points_is_identity() {
        let input = vec![0u8; 128];
        let output = Bn256Add.run(&input).unwrap();
        assert_eq!(output, vec![0u8; 64]);
    }

    #[test]
    fn scalar_mul_by_zero_is_identity() {
        let input = vec![0u8; 96];
        let output = Bn256ScalarMul.run(&input).unwrap();
        assert_eq!(output, vec![0u8; 64]);
    }

    #[test]
    fn empty_pairing_input_is_trivially_true() {
        let output = Bn256Pairing.run(&[]).unwrap();
        let mut expected = vec![0u8; 32];
        expected[31] = 1;
        assert_eq!(output, expected);
    }

    #[test]
    fn pairing_gas_scales_with_pair_count() {
        assert_eq!(Bn256Pairing.required_gas(&[]), 45_000);
        assert_eq!(Bn256Pairing.required_gas(&[0u8; 192]), 79_000);
    }
}
