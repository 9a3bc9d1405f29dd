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

//! Address `0x02`: SHA-256.

use super::words;
use crate::error::Result;
use crate::interfaces::Precompile;
use sha2::{Digest, Sha256 as Sha256Impl};

pub struct Sha256;

impl Precompile for Sha256 {
    fn required_gas(&self, input: &[u8]) -> u64 {
        60 + 12 * words(input.len())
    }

    fn run(&self, input: &[u8]) -> Result<Vec<u8>> {
        Ok(Sha256Impl::digest(input).to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn hashes_empty_input() {
        let output = Sha256.run(&[]).unwrap();
        assert_eq!(
            output,
            hex!("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b85")
        );
    }

    #[test]
    fn gas_scales_with_word_count() {
        assert_eq!(Sha256.required_gas(&[0; 32]), 60 + 12);
        assert_eq!(Sha256.required_gas(&[0; 33]), 60 + 24);
    }
}
