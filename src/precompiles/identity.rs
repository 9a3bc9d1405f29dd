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

//! Address `0x04`: the identity function, `output = input`.

use super::words;
use crate::error::Result;
use crate::interfaces::Precompile;

pub struct Identity;

impl Precompile for Identity {
    fn required_gas(&self, input: &[u8]) -> u64 {
        15 + 3 * words(input.len())
    }

    fn run(&self, input: &[u8]) -> Result<Vec<u8>> {
        Ok(input.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echoes_input() {
        assert_eq!(Identity.run(b"hello").unwrap(), b"hello");
    }

    #[test]
    fn gas_scales_with_word_count() {
        assert_eq!(Identity.required_gas(&[0; 32]), 15 + 3);
        assert_eq!(Identity.required_gas(&[0; 33]), 15 + 6);
    }
}
