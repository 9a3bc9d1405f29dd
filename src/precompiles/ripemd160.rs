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

//! Address `0x03`: RIPEMD-160, left-padded to a 32-byte word.

use super::words;
use crate::error::Result;
use crate::interfaces::Precompile;
use ripemd::{Digest, Ripemd160 as Ripemd160Impl};

pub struct Ripemd160;

impl Precompile for Ripemd160 {
    fn required_gas(&self, input: &[u8]) -> u64 {
        600 + 120 * words(input.len())
    }

    fn run(&self, input: &[u8]) -> Result<Vec<u8>> {
        let digest = Ripemd160Impl::digest(input);
        let mut padded = vec![0u8; 32];
        padded[12..].copy_from_slice(&digest);
        Ok(padded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_is_left_padded_to_32_bytes() {
        let output = Ripemd160.run(b"hello").unwrap();
        assert_eq!(output.len(), 32);
        assert_eq!(&output[..12], &[0u8; 12]);
    }

    #[test]
    fn gas_scales_with_word_count() {
        assert_eq!(Ripemd160.required_gas(&[0; 32]), 600 + 120);
    }
}
