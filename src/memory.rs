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

//! Linear, zero-initialised, only-growing memory with quadratic expansion cost.

use crate::error::{Error, Result};
use crate::schedule::Schedule;
use ethereum_types::U256;

pub struct Memory {
    data: Vec<u8>,
}

/// Rounds `n` up to the next multiple of 32.
fn round_to_words(n: usize) -> usize {
    (n + 31) / 32 * 32
}

/// `C(w) = memory_gas * w + w^2 / quad_coeff_div`, `w` measured in 32-byte words.
fn cost(words: usize, schedule: &Schedule) -> u64 {
    let words = words as u64;
    schedule.memory_gas as u64 * words + (words * words) / schedule.quad_coeff_div as u64
}

impl Memory {
    pub fn new() -> Memory {
        Memory { data: Vec::new() }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Gas required to grow memory to cover `[offset, offset + len)`, or zero if no growth
    /// is needed (including for zero-length accesses, which never grow memory).
    pub fn expansion_gas(&self, offset: U256, len: U256, schedule: &Schedule) -> Result<u64> {
        if len.is_zero() {
            return Ok(0);
        }
        let end = checked_end(offset, len)?;
        let current_words = self.data.len() / 32;
        if end <= self.data.len() {
            return Ok(0);
        }
        let new_words = round_to_words(end) / 32;
        Ok(cost(new_words, schedule) - cost(current_words, schedule))
    }

    fn ensure_capacity(&mut self, end: usize) {
        if end > self.data.len() {
            self.data.resize(round_to_words(end), 0);
        }
    }

    pub fn read_slice(&mut self, offset: U256, len: U256) -> Result<&[u8]> {
        if len.is_zero() {
            return Ok(&[]);
        }
        let offset = to_usize(offset)?;
        let len = to_usize(len)?;
        let end = offset.checked_add(len).ok_or(Error::MemoryOutOfBounds)?;
        self.ensure_capacity(end);
        Ok(&self.data[offset..end])
    }

    pub fn read32(&mut self, offset: U256) -> Result<U256> {
        let slice = self.read_slice(offset, U256::from(32))?;
        Ok(U256::from_big_endian(slice))
    }

    pub fn write_slice(&mut self, offset: U256, value: &[u8]) -> Result<()> {
        if value.is_empty() {
            return Ok(());
        }
        let offset = to_usize(offset)?;
        let end = offset.checked_add(value.len()).ok_or(Error::MemoryOutOfBounds)?;
        self.ensure_capacity(end);
        self.data[offset..end].copy_from_slice(value);
        Ok(())
    }

    pub fn write32(&mut self, offset: U256, value: U256) -> Result<()> {
        let mut bytes = [0u8; 32];
        value.to_big_endian(&mut bytes);
        self.write_slice(offset, &bytes)
    }

    pub fn write_byte(&mut self, offset: U256, value: u8) -> Result<()> {
        self.write_slice(offset, &[value])
    }

    /// Copies a slice from an arbitrary byte source into memory, zero-padding the tail of
    /// the destination when the source runs short (used by CALLDATACOPY/CODECOPY/
    /// EXTCODECOPY/RETURNDATACOPY).
    pub fn copy_from(&mut self, dest_offset: U256, source: &[u8], source_offset: usize, len: U256) -> Result<()> {
        if len.is_zero() {
            return Ok(());
        }
        let len = to_usize(len)?;
        let mut buf = vec![0u8; len];
        if source_offset < source.len() {
            let available = (source.len() - source_offset).min(len);
            buf[..available].copy_from_slice(&source[source_offset..source_offset + available]);
        }
        self.write_slice(dest_offset, &buf)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}

fn checked_end(offset: U256, len: U256) -> Result<usize> {
    let offset = to_usize(offset)?;
    let len = to_usize(len)?;
    offset.checked_add(len).ok_or(Error::MemoryOutOfBounds)
}

fn to_usize(word: U256) -> Result<usize> {
    if word > U256::from(u32::max_value()) {
        // Any real expansion this large would cost more gas than any block could supply;
        // treat it as an immediate bounds failure rather than attempting the allocation.
        Err(Error::MemoryOutOfBounds)
    } else {
        Ok(word.low_u64() as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_length_access_never_grows() {
        let mut m = Memory::new();
        m.read_slice(U256::from(1000), U256::zero()).unwrap();
        assert_eq!(m.size(), 0);
    }

    #[test]
    fn write_then_read_round_trips() {
        let mut m = Memory::new();
        m.write32(U256::zero(), U256::from(0x522)).unwrap();
        assert_eq!(m.read32(U256::zero()).unwrap(), U256::from(0x522));
        assert_eq!(m.size(), 32);
    }

    #[test]
    fn growth_rounds_to_words() {
        let mut m = Memory::new();
        m.write_byte(U256::from(33), 1).unwrap();
        assert_eq!(m.size(), 64);
    }

    #[test]
    fn expansion_cost_matches_quadratic_formula() {
        let m = Memory::new();
        let schedule = Schedule::default();
        // one word: 3*1 + 1/512 = 3
        assert_eq!(m.expansion_gas(U256::zero(), U256::from(32), &schedule).unwrap(), 3);
    }

    #[test]
    fn copy_from_zero_pads_short_source() {
        let mut m = Memory::new();
        m.copy_from(U256::zero(), &[1, 2], 0, U256::from(4)).unwrap();
        assert_eq!(&m.as_slice()[0..4], &[1, 2, 0, 0]);
    }
}
